//! Coalescing read engine for remote/slow memory-acquisition backends.
//!
//! # Core Responsibilities
//!
//! - **Coalescing**: many small independent byte reads are accumulated into one
//!   batch and executed as a single scatter round trip against the backend.
//! - **Fan-out**: every request gets its own single-value result handle that is
//!   resolved exactly once, with bytes or with an explicit error.
//! - **Flush policy**: a batch flushes when the pending count exceeds its limit
//!   or when the earliest per-request deadline fires, whichever comes first.
//! - **Typed decoding**: fixed-width little-endian values are decoded off the
//!   batch lock, on top of the byte-level read path.
//!
//! # Submodules
//!
//! - [`common`]: shared configuration, error types and logger setup.
//! - [`scatter`]: the scatter-task backend contract and an in-memory backend.
//! - [`acquisition`]: the [`acquisition::ReadCoalescer`] engine and the typed
//!   decode layer.

pub mod acquisition;
pub mod common;
pub mod scatter;
