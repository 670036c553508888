use std::time::Duration;

use tokio::sync::oneshot;

use crate::acquisition::coalescer::ReadCoalescer;
use crate::common::config::Address;
use crate::common::exception::AcquireError;
use crate::scatter::backend::ScatterBackend;

/// Result handle for a typed read.
pub type ValueHandle<T> = oneshot::Receiver<Result<T, AcquireError>>;

/// A fixed-width value decodable from little-endian bytes.
///
/// The trait closes over the small set of encodings the engine supports;
/// one generic [`ReadCoalescer::read_value`] replaces per-type delivery
/// wiring. `decode` is only ever called with exactly `WIDTH` bytes, which
/// the byte-level read path guarantees (a delivered buffer always has the
/// requested length).
pub trait DecodeValue: Sized + Send + 'static {
    const WIDTH: u32;

    fn decode(raw: &[u8]) -> Self;
}

impl DecodeValue for u8 {
    const WIDTH: u32 = 1;

    fn decode(raw: &[u8]) -> Self {
        raw[0]
    }
}

impl DecodeValue for bool {
    const WIDTH: u32 = 1;

    fn decode(raw: &[u8]) -> Self {
        raw[0] != 0
    }
}

impl DecodeValue for u16 {
    const WIDTH: u32 = 2;

    fn decode(raw: &[u8]) -> Self {
        u16::from_le_bytes([raw[0], raw[1]])
    }
}

impl DecodeValue for u32 {
    const WIDTH: u32 = 4;

    fn decode(raw: &[u8]) -> Self {
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(&raw[..4]);
        u32::from_le_bytes(bytes)
    }
}

impl DecodeValue for u64 {
    const WIDTH: u32 = 8;

    fn decode(raw: &[u8]) -> Self {
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&raw[..8]);
        u64::from_le_bytes(bytes)
    }
}

impl DecodeValue for i32 {
    const WIDTH: u32 = 4;

    fn decode(raw: &[u8]) -> Self {
        u32::decode(raw) as i32
    }
}

impl DecodeValue for i64 {
    const WIDTH: u32 = 8;

    fn decode(raw: &[u8]) -> Self {
        u64::decode(raw) as i64
    }
}

impl DecodeValue for f32 {
    const WIDTH: u32 = 4;

    fn decode(raw: &[u8]) -> Self {
        f32::from_bits(u32::decode(raw))
    }
}

impl DecodeValue for f64 {
    const WIDTH: u32 = 8;

    fn decode(raw: &[u8]) -> Self {
        f64::from_bits(u64::decode(raw))
    }
}

impl<B: ScatterBackend> ReadCoalescer<B> {
    /// Queues a `T::WIDTH`-byte read at `address` and decodes the delivered
    /// bytes into `T`, preserving the byte path's single-value delivery
    /// contract. Decoding happens in a spawned task after delivery, off the
    /// batch lock.
    pub fn read_value<T: DecodeValue>(
        &self,
        address: Address,
        max_wait: Duration,
    ) -> Result<ValueHandle<T>, AcquireError> {
        let bytes = self.read(address, T::WIDTH, max_wait)?;
        let (tx, rx) = oneshot::channel();

        tokio::spawn(async move {
            let outcome = match bytes.await {
                Ok(Ok(raw)) => Ok(T::decode(&raw)),
                Ok(Err(e)) => Err(e),
                // The coalescer was dropped without resolving the handle.
                Err(_) => Err(AcquireError::Canceled),
            };
            let _ = tx.send(outcome);
        });

        Ok(rx)
    }

    pub fn read_u8(&self, address: Address, max_wait: Duration) -> Result<ValueHandle<u8>, AcquireError> {
        self.read_value(address, max_wait)
    }

    pub fn read_u16(&self, address: Address, max_wait: Duration) -> Result<ValueHandle<u16>, AcquireError> {
        self.read_value(address, max_wait)
    }

    pub fn read_u32(&self, address: Address, max_wait: Duration) -> Result<ValueHandle<u32>, AcquireError> {
        self.read_value(address, max_wait)
    }

    pub fn read_u64(&self, address: Address, max_wait: Duration) -> Result<ValueHandle<u64>, AcquireError> {
        self.read_value(address, max_wait)
    }

    pub fn read_i32(&self, address: Address, max_wait: Duration) -> Result<ValueHandle<i32>, AcquireError> {
        self.read_value(address, max_wait)
    }

    pub fn read_i64(&self, address: Address, max_wait: Duration) -> Result<ValueHandle<i64>, AcquireError> {
        self.read_value(address, max_wait)
    }

    pub fn read_f32(&self, address: Address, max_wait: Duration) -> Result<ValueHandle<f32>, AcquireError> {
        self.read_value(address, max_wait)
    }

    pub fn read_f64(&self, address: Address, max_wait: Duration) -> Result<ValueHandle<f64>, AcquireError> {
        self.read_value(address, max_wait)
    }

    pub fn read_bool(&self, address: Address, max_wait: Duration) -> Result<ValueHandle<bool>, AcquireError> {
        self.read_value(address, max_wait)
    }
}
