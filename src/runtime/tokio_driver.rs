//! Tokio runtime driver for synchronous callers.

use anyhow::Context;

use crate::core::{AppResult, RunReport, TaskScheduler};

/// Worker threads for a run over `accounts` accounts: one per account, capped
/// by the CPU count, at least one.
pub fn worker_threads(accounts: usize) -> usize {
    accounts.min(num_cpus::get()).max(1)
}

/// Build a multi-threaded runtime with `worker_threads` workers.
pub fn build_runtime(worker_threads: usize) -> Result<tokio::runtime::Runtime, std::io::Error> {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(worker_threads.max(1))
        .thread_name("slot-sniper-worker")
        .enable_all()
        .build()
}

/// Run `scheduler` to completion on a fresh runtime.
pub fn block_on_run(scheduler: &TaskScheduler) -> AppResult<RunReport> {
    let threads = worker_threads(scheduler.config().accounts.len());
    let runtime = build_runtime(threads).context("failed to build tokio runtime")?;
    tracing::debug!(worker_threads = threads, "runtime ready");
    let report = runtime
        .block_on(scheduler.run())
        .context("configuration rejected")?;
    Ok(report)
}
