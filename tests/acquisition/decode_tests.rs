use std::time::Duration;

use memgather::acquisition::ReadCoalescer;
use memgather::common::exception::{AcquireError, ScatterError};
use memgather::scatter::MemoryScatterBackend;

use crate::assert_ok;
use crate::common::logger::init_test_logger;

const LONG: Duration = Duration::from_secs(10);

fn coalescer() -> (ReadCoalescer<MemoryScatterBackend>, MemoryScatterBackend) {
    init_test_logger();
    let backend = MemoryScatterBackend::new();
    let coalescer = ReadCoalescer::new(backend.clone(), 100);
    (coalescer, backend)
}

#[tokio::test]
async fn decodes_eight_byte_integers() {
    let (coalescer, backend) = coalescer();
    backend.poke(0x1000, &0x0123_4567_89ab_cdefu64.to_le_bytes());
    backend.poke(0x1008, &(-42i64).to_le_bytes());

    let unsigned = assert_ok!(coalescer.read_u64(0x1000, LONG));
    let signed = assert_ok!(coalescer.read_i64(0x1008, LONG));
    assert_ok!(coalescer.flush());

    assert_eq!(unsigned.await.unwrap().unwrap(), 0x0123_4567_89ab_cdef);
    assert_eq!(signed.await.unwrap().unwrap(), -42);
    assert_eq!(backend.execution_count(), 1);
}

#[tokio::test]
async fn decodes_four_byte_values() {
    let (coalescer, backend) = coalescer();
    backend.poke(0x2000, &0xdead_beefu32.to_le_bytes());
    backend.poke(0x2004, &(-7i32).to_le_bytes());
    backend.poke(0x2008, &3.25f32.to_le_bytes());

    let unsigned = assert_ok!(coalescer.read_u32(0x2000, LONG));
    let signed = assert_ok!(coalescer.read_i32(0x2004, LONG));
    let float = assert_ok!(coalescer.read_f32(0x2008, LONG));
    assert_ok!(coalescer.flush());

    assert_eq!(unsigned.await.unwrap().unwrap(), 0xdead_beef);
    assert_eq!(signed.await.unwrap().unwrap(), -7);
    assert_eq!(float.await.unwrap().unwrap(), 3.25);
}

#[tokio::test]
async fn decodes_narrow_values_and_doubles() {
    let (coalescer, backend) = coalescer();
    backend.poke(0x3000, &[0x34, 0x12]);
    backend.poke(0x3002, &[0xfe]);
    backend.poke(0x3003, &[0x02]);
    backend.poke(0x3004, &[0x00]);
    backend.poke(0x3008, &(-2.5f64).to_le_bytes());

    let word = assert_ok!(coalescer.read_u16(0x3000, LONG));
    let byte = assert_ok!(coalescer.read_u8(0x3002, LONG));
    let truthy = assert_ok!(coalescer.read_bool(0x3003, LONG));
    let falsy = assert_ok!(coalescer.read_bool(0x3004, LONG));
    let double = assert_ok!(coalescer.read_f64(0x3008, LONG));
    assert_ok!(coalescer.flush());

    assert_eq!(word.await.unwrap().unwrap(), 0x1234);
    assert_eq!(byte.await.unwrap().unwrap(), 0xfe);
    assert!(truthy.await.unwrap().unwrap());
    assert!(!falsy.await.unwrap().unwrap());
    assert_eq!(double.await.unwrap().unwrap(), -2.5);
}

#[tokio::test(start_paused = true)]
async fn typed_reads_ride_the_deadline_policy() {
    let (coalescer, backend) = coalescer();
    backend.poke(0x4000, &7u32.to_le_bytes());

    let start = tokio::time::Instant::now();
    let value = assert_ok!(coalescer.read_u32(0x4000, Duration::from_millis(50)));

    assert_eq!(value.await.unwrap().unwrap(), 7);
    assert!(start.elapsed() >= Duration::from_millis(50));
}

#[tokio::test]
async fn typed_read_propagates_batch_failure() {
    let (coalescer, backend) = coalescer();
    backend.fail_next_execute();

    let value = assert_ok!(coalescer.read_u64(0x5000, LONG));
    let err = coalescer.flush().unwrap_err();
    assert!(matches!(
        err,
        AcquireError::Scatter(ScatterError::ExecuteFailed(_))
    ));

    let delivered = value.await.unwrap();
    assert!(matches!(
        delivered,
        Err(AcquireError::Scatter(ScatterError::ExecuteFailed(_)))
    ));
}
