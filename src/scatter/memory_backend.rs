use std::collections::HashMap;
use std::sync::Arc;

use log::trace;
use parking_lot::Mutex;

use crate::common::config::Address;
use crate::common::exception::ScatterError;
use crate::scatter::backend::ScatterBackend;

/// MemoryScatterBackend replicates a scatter-capable acquisition backend on
/// memory. It is primarily used for testing the coalescer and the decode
/// layer without a real target.
///
/// The type is a cheap cloneable handle over shared state, so a test can keep
/// a view of the address space (and the round-trip counter) after moving the
/// backend into a coalescer.
#[derive(Clone, Default)]
pub struct MemoryScatterBackend {
    inner: Arc<Mutex<BackendState>>,
}

#[derive(Default)]
struct BackendState {
    memory: HashMap<Address, u8>,
    reads: Vec<(Address, Vec<u8>)>,
    writes: Vec<(Address, Vec<u8>)>,
    executions: u64,
    fail_next_execute: bool,
    closed: bool,
}

impl MemoryScatterBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes bytes straight into the simulated address space, bypassing the
    /// scatter path. Unset addresses read as zero.
    pub fn poke(&self, address: Address, data: &[u8]) {
        let mut state = self.inner.lock();
        for (i, b) in data.iter().enumerate() {
            state.memory.insert(address + i as Address, *b);
        }
    }

    /// Reads bytes straight out of the simulated address space.
    pub fn peek(&self, address: Address, len: usize) -> Vec<u8> {
        let state = self.inner.lock();
        (0..len)
            .map(|i| *state.memory.get(&(address + i as Address)).unwrap_or(&0))
            .collect()
    }

    /// Number of round trips executed so far.
    pub fn execution_count(&self) -> u64 {
        self.inner.lock().executions
    }

    /// Number of currently registered ranges (reads plus writes).
    pub fn registered(&self) -> usize {
        let state = self.inner.lock();
        state.reads.len() + state.writes.len()
    }

    /// Makes the next `execute` fail without filling any buffer.
    pub fn fail_next_execute(&self) {
        self.inner.lock().fail_next_execute = true;
    }
}

impl ScatterBackend for MemoryScatterBackend {
    fn prepare_read(
        &mut self,
        address: Address,
        size: u32,
        buffer: Vec<u8>,
    ) -> Result<(), ScatterError> {
        let mut state = self.inner.lock();
        if state.closed {
            return Err(ScatterError::Closed);
        }
        if size == 0 {
            return Err(ScatterError::PrepareRejected {
                address,
                size,
                reason: "zero-sized range".to_string(),
            });
        }
        if buffer.len() != size as usize {
            return Err(ScatterError::PrepareRejected {
                address,
                size,
                reason: format!("buffer length {} does not match size", buffer.len()),
            });
        }
        trace!("Registered read of {} bytes at {:#x}", size, address);
        state.reads.push((address, buffer));
        Ok(())
    }

    fn prepare_write(&mut self, address: Address, data: Vec<u8>) -> Result<(), ScatterError> {
        let mut state = self.inner.lock();
        if state.closed {
            return Err(ScatterError::Closed);
        }
        if data.is_empty() {
            return Err(ScatterError::PrepareRejected {
                address,
                size: 0,
                reason: "empty write".to_string(),
            });
        }
        trace!("Registered write of {} bytes at {:#x}", data.len(), address);
        state.writes.push((address, data));
        Ok(())
    }

    fn execute(&mut self) -> Result<Vec<Vec<u8>>, ScatterError> {
        let mut state = self.inner.lock();
        if state.closed {
            return Err(ScatterError::Closed);
        }
        if state.fail_next_execute {
            state.fail_next_execute = false;
            return Err(ScatterError::ExecuteFailed(
                "injected backend failure".to_string(),
            ));
        }

        let writes = std::mem::take(&mut state.writes);
        for (address, data) in writes {
            for (i, b) in data.iter().enumerate() {
                state.memory.insert(address + i as Address, *b);
            }
        }

        let reads = std::mem::take(&mut state.reads);
        let mut filled = Vec::with_capacity(reads.len());
        for (address, mut buffer) in reads {
            for (i, slot) in buffer.iter_mut().enumerate() {
                *slot = *state.memory.get(&(address + i as Address)).unwrap_or(&0);
            }
            filled.push(buffer);
        }

        state.executions += 1;
        trace!(
            "Executed round trip {} ({} read buffers)",
            state.executions,
            filled.len()
        );
        Ok(filled)
    }

    fn clear(&mut self) -> Result<(), ScatterError> {
        let mut state = self.inner.lock();
        state.reads.clear();
        state.writes.clear();
        Ok(())
    }

    fn close(&mut self) {
        let mut state = self.inner.lock();
        state.closed = true;
        state.reads.clear();
        state.writes.clear();
    }
}
