use crate::common::config::Address;
use crate::common::exception::ScatterError;

/// Contract between the coalescer and a scatter-capable backend.
///
/// A backend accumulates registered ranges across `prepare_*` calls and
/// performs them all in one round trip on [`execute`](Self::execute). Read
/// buffers are handed over at registration time and come back filled from
/// `execute`, in registration order; that ordering is the 1:1 link the
/// coalescer relies on to fan results back out.
///
/// `execute` is all-or-nothing: on failure no buffers are returned and the
/// contents of everything registered must be treated as invalid. The task
/// stays registered after a failed execute until [`clear`](Self::clear),
/// which must be safe to call in any state.
///
/// Implementations may block briefly in `execute`; the coalescer serializes
/// all calls, so a backend never sees concurrent access.
pub trait ScatterBackend: Send + 'static {
    /// Registers one read range. `buffer` must be exactly `size` bytes and
    /// `size` must be nonzero; violations are rejected without side effects.
    fn prepare_read(
        &mut self,
        address: Address,
        size: u32,
        buffer: Vec<u8>,
    ) -> Result<(), ScatterError>;

    /// Registers one write range carrying `data`.
    fn prepare_write(&mut self, address: Address, data: Vec<u8>) -> Result<(), ScatterError>;

    /// Performs every registered range in one round trip. On success the
    /// filled read buffers are returned in registration order and writes
    /// have landed; registered reads are consumed either way only by a
    /// successful execute.
    fn execute(&mut self) -> Result<Vec<Vec<u8>>, ScatterError>;

    /// Discards all registered ranges, making the task ready for a new batch.
    fn clear(&mut self) -> Result<(), ScatterError>;

    /// Releases backend resources. Idempotent; every later operation fails
    /// with [`ScatterError::Closed`].
    fn close(&mut self);
}
