//! The read-coalescing engine and its typed decode layer.
//!
//! [`ReadCoalescer`] accumulates byte-level read (and write) requests behind
//! one batch lock and flushes them as a single scatter round trip, either
//! when the pending count exceeds the configured limit or when the earliest
//! per-request deadline fires. [`decode`] builds fixed-width typed reads on
//! top of the byte path.

pub mod coalescer;
pub mod decode;

pub use coalescer::ReadCoalescer;
pub use decode::DecodeValue;
