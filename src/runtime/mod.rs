//! Runtime adapters for driving a run from synchronous code.

#[cfg(feature = "tokio-runtime")]
pub mod tokio_driver;

#[cfg(feature = "tokio-runtime")]
pub use tokio_driver::{block_on_run, build_runtime, worker_threads};
