//! Interaction with the batch queueing system: script generation, dry-run
//! probing and selection of the queue that finishes a job earliest.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;

pub mod common;
pub mod probe;
pub mod request;
pub mod script;
pub mod select;
pub mod slurm;

pub type QueueFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

/// Raw answer of a scheduler command whose failure is part of the protocol
/// (e.g. a rejected dry run).
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub success: bool,
    /// Stdout and stderr, combined.
    pub text: String,
}

/// Operations that the controller needs from the batch queueing system.
pub trait QueueManager {
    /// Performs a non-committing dry-run submission of `script`.
    fn test_submit<'a>(
        &'a self,
        script: &'a str,
        workdir: &'a Path,
    ) -> QueueFuture<'a, anyhow::Result<CommandOutput>>;

    /// Submits the script stored at `script_path` and returns the job id.
    fn submit<'a>(
        &'a self,
        script_path: &'a Path,
        workdir: &'a Path,
    ) -> QueueFuture<'a, anyhow::Result<String>>;

    /// Working directories of the current user's active (pending or running) jobs.
    fn queued_directories(&self) -> QueueFuture<'_, anyhow::Result<Vec<PathBuf>>>;

    /// Number of the current user's active jobs.
    fn active_job_count(&self) -> QueueFuture<'_, anyhow::Result<usize>>;
}

/// Point-in-time check whether an active job of the current user runs in `path`.
pub async fn is_already_queued(manager: &dyn QueueManager, path: &Path) -> anyhow::Result<bool> {
    let directories = manager.queued_directories().await?;
    Ok(directories
        .iter()
        .any(|directory| crate::common::utils::fs::same_directory(directory, path)))
}
