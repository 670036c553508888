//! Scatter-task backend layer.
//!
//! A scatter task is a reusable batch primitive bound to one target address
//! space: ranges are registered one by one, then executed as a single round
//! trip. [`backend::ScatterBackend`] is the contract the coalescer drives;
//! [`memory_backend::MemoryScatterBackend`] is an in-memory implementation
//! used for testing and local simulation.

pub mod backend;
pub mod memory_backend;

pub use backend::ScatterBackend;
pub use memory_backend::MemoryScatterBackend;
