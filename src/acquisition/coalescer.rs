use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, trace, warn};
use parking_lot::Mutex;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::common::config::{Address, DEFAULT_PENDING_LIMIT};
use crate::common::exception::{AcquireError, ScatterError};
use crate::scatter::backend::ScatterBackend;

/// Result handle for a byte-level read: resolved exactly once, with the
/// requested bytes or with an explicit error.
pub type ReadHandle = oneshot::Receiver<Result<Vec<u8>, AcquireError>>;

/// Result handle for a coalesced write: resolved once the round trip that
/// carried the write has succeeded or failed.
pub type WriteHandle = oneshot::Receiver<Result<(), AcquireError>>;

enum PendingKind {
    Read(oneshot::Sender<Result<Vec<u8>, AcquireError>>),
    Write(oneshot::Sender<Result<(), AcquireError>>),
}

/// One outstanding request: registered with the scatter task, waiting for
/// the batch it belongs to to flush.
struct Pending {
    address: Address,
    size: u32,
    kind: PendingKind,
    deadline: JoinHandle<()>,
}

struct BatchState<B: ScatterBackend> {
    backend: B,
    pending: Vec<Pending>,
    /// Bumped on every flush and on close; a deadline task that wakes up
    /// holding a stale generation knows its batch is already gone.
    generation: u64,
    closed: bool,
}

/// Turns individual byte-range requests into minimally-many backend round
/// trips.
///
/// All batch state lives behind one exclusive lock, so threshold-triggered
/// and deadline-triggered flushes serialize. [`read`](Self::read) and
/// [`write`](Self::write) never block the caller; only awaiting the returned
/// handle suspends, and that happens outside the lock.
///
/// The coalescer exclusively owns its backend for its whole lifetime; the
/// backend's target address space is fixed at construction.
///
/// Deadline timers are tokio tasks, so `read`/`write` must be called from
/// within a tokio runtime.
pub struct ReadCoalescer<B: ScatterBackend> {
    state: Arc<Mutex<BatchState<B>>>,
    limit: usize,
}

impl<B: ScatterBackend> ReadCoalescer<B> {
    /// Creates a coalescer that force-flushes once more than `limit`
    /// requests are pending.
    pub fn new(backend: B, limit: usize) -> Self {
        Self {
            state: Arc::new(Mutex::new(BatchState {
                backend,
                pending: Vec::new(),
                generation: 0,
                closed: false,
            })),
            limit,
        }
    }

    /// Creates a coalescer with [`DEFAULT_PENDING_LIMIT`].
    pub fn with_default_limit(backend: B) -> Self {
        Self::new(backend, DEFAULT_PENDING_LIMIT)
    }

    /// Queues a read of `size` bytes at `address` and returns its result
    /// handle without blocking.
    ///
    /// The request is flushed no later than `max_wait` from now; a deadline
    /// flush takes the whole current batch with it, so siblings with longer
    /// deadlines ride along. If this request pushes the pending count over
    /// the limit the batch is flushed before returning, and a failure of
    /// that flush is returned here instead of a handle.
    pub fn read(
        &self,
        address: Address,
        size: u32,
        max_wait: Duration,
    ) -> Result<ReadHandle, AcquireError> {
        if size == 0 {
            return Err(AcquireError::ZeroSize);
        }

        let mut state = self.state.lock();
        if state.closed {
            return Err(AcquireError::Closed);
        }

        state
            .backend
            .prepare_read(address, size, vec![0u8; size as usize])?;

        let (tx, rx) = oneshot::channel();
        let deadline = self.arm_deadline(max_wait, state.generation);
        state.pending.push(Pending {
            address,
            size,
            kind: PendingKind::Read(tx),
            deadline,
        });
        trace!(
            "Queued read of {} bytes at {:#x} ({} pending)",
            size,
            address,
            state.pending.len()
        );

        if state.pending.len() > self.limit {
            debug!("Pending count exceeded limit {}, flushing", self.limit);
            Self::flush_locked(&mut state)?;
        }

        Ok(rx)
    }

    /// Queues a write of `data` at `address`, sharing the batch, the count
    /// limit and the deadline policy with reads. The handle resolves to
    /// `Ok(())` once the round trip that carried the write succeeds.
    pub fn write(
        &self,
        address: Address,
        data: Vec<u8>,
        max_wait: Duration,
    ) -> Result<WriteHandle, AcquireError> {
        if data.is_empty() {
            return Err(AcquireError::ZeroSize);
        }

        let mut state = self.state.lock();
        if state.closed {
            return Err(AcquireError::Closed);
        }

        let size = data.len() as u32;
        state.backend.prepare_write(address, data)?;

        let (tx, rx) = oneshot::channel();
        let deadline = self.arm_deadline(max_wait, state.generation);
        state.pending.push(Pending {
            address,
            size,
            kind: PendingKind::Write(tx),
            deadline,
        });
        trace!(
            "Queued write of {} bytes at {:#x} ({} pending)",
            size,
            address,
            state.pending.len()
        );

        if state.pending.len() > self.limit {
            debug!("Pending count exceeded limit {}, flushing", self.limit);
            Self::flush_locked(&mut state)?;
        }

        Ok(rx)
    }

    /// Executes the scatter task for everything currently pending and
    /// resolves every handle. No-op on an empty batch.
    pub fn flush(&self) -> Result<(), AcquireError> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(AcquireError::Closed);
        }
        Self::flush_locked(&mut state)
    }

    /// Number of requests waiting for the next flush.
    pub fn pending(&self) -> usize {
        self.state.lock().pending.len()
    }

    /// Fails every outstanding handle with [`AcquireError::Closed`] and
    /// releases the backend. Idempotent; every later operation fails with
    /// `Closed`.
    pub fn close(&self) -> Result<(), AcquireError> {
        let mut state = self.state.lock();
        if state.closed {
            return Ok(());
        }
        state.closed = true;
        state.generation += 1;

        let outstanding = std::mem::take(&mut state.pending);
        if !outstanding.is_empty() {
            warn!(
                "Closing with {} unresolved requests, failing them",
                outstanding.len()
            );
        }
        for entry in outstanding {
            entry.deadline.abort();
            match entry.kind {
                PendingKind::Read(tx) => {
                    let _ = tx.send(Err(AcquireError::Closed));
                }
                PendingKind::Write(tx) => {
                    let _ = tx.send(Err(AcquireError::Closed));
                }
            }
        }

        if let Err(e) = state.backend.clear() {
            warn!("Clearing scatter task during close failed: {}", e);
        }
        state.backend.close();
        Ok(())
    }

    fn arm_deadline(&self, max_wait: Duration, generation: u64) -> JoinHandle<()> {
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            tokio::time::sleep(max_wait).await;
            let mut state = state.lock();
            // The batch this deadline was armed for may already be flushed
            // (or the coalescer closed); stopping a timer is only best-effort,
            // so the stale case must be a no-op.
            if state.closed || state.generation != generation {
                return;
            }
            trace!("Deadline fired, flushing {} requests", state.pending.len());
            if let Err(e) = Self::flush_locked(&mut state) {
                // No caller to report to on this path.
                error!("Deadline-triggered flush failed: {}", e);
            }
        })
    }

    /// The flush cycle. Always runs under the batch lock. Every drained
    /// request is resolved exactly once, success or failure; the batch and
    /// the scatter registration are reset either way so the task stays
    /// reusable.
    fn flush_locked(state: &mut BatchState<B>) -> Result<(), AcquireError> {
        if state.pending.is_empty() {
            return Ok(());
        }

        state.generation += 1;
        let drained = std::mem::take(&mut state.pending);
        let expected_reads = drained
            .iter()
            .filter(|p| matches!(p.kind, PendingKind::Read(_)))
            .count();
        debug!(
            "Flushing batch of {} requests ({} reads)",
            drained.len(),
            expected_reads
        );

        let executed = state.backend.execute();
        let cleared = state.backend.clear();

        let outcome = match executed {
            Ok(buffers) if buffers.len() != expected_reads => Err(ScatterError::ResultMismatch {
                expected: expected_reads,
                got: buffers.len(),
            }),
            other => other,
        };

        match outcome {
            Ok(buffers) => {
                let mut buffers = buffers.into_iter();
                for entry in drained {
                    // A deadline may be mid-fire right now; abort is
                    // idempotent and the generation bump above already made
                    // the late wakeup a no-op.
                    entry.deadline.abort();
                    match entry.kind {
                        PendingKind::Read(tx) => {
                            let buffer = buffers.next().unwrap_or_default();
                            trace!(
                                "Delivering {} bytes read at {:#x}",
                                entry.size,
                                entry.address
                            );
                            let _ = tx.send(Ok(buffer));
                        }
                        PendingKind::Write(tx) => {
                            trace!(
                                "Confirming {} bytes written at {:#x}",
                                entry.size,
                                entry.address
                            );
                            let _ = tx.send(Ok(()));
                        }
                    }
                }
                cleared?;
                Ok(())
            }
            Err(e) => {
                error!("Batch execution failed, failing {} requests: {}", drained.len(), e);
                for entry in drained {
                    entry.deadline.abort();
                    let failure = AcquireError::Scatter(e.clone());
                    match entry.kind {
                        PendingKind::Read(tx) => {
                            let _ = tx.send(Err(failure));
                        }
                        PendingKind::Write(tx) => {
                            let _ = tx.send(Err(failure));
                        }
                    }
                }
                Err(e.into())
            }
        }
    }
}

impl<B: ScatterBackend> Drop for ReadCoalescer<B> {
    fn drop(&mut self) {
        // Safety net so no handle is ever left silent; a normal shutdown
        // goes through close() explicitly.
        let _ = self.close();
    }
}
