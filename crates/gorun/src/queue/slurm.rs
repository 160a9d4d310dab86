use anyhow::Context;
use bstr::ByteSlice;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::common::env::{USER, ensure_command, require_env};
use crate::queue::common::{
    check_command_output, combined_output, create_command, parse_submitted_job_id,
};
use crate::queue::{CommandOutput, QueueFuture, QueueManager};

/// Slurm access through `sbatch` and `squeue`.
pub struct SlurmHandler {
    user: String,
    workdir: PathBuf,
}

impl SlurmHandler {
    /// Fails eagerly when the Slurm client tools are not installed.
    pub fn new(workdir: PathBuf) -> crate::Result<Self> {
        ensure_command("sbatch")?;
        ensure_command("squeue")?;
        let user = require_env(USER)?;
        Ok(Self { user, workdir })
    }

    async fn squeue_column(&self, format: &str) -> anyhow::Result<Vec<String>> {
        let arguments = vec!["squeue", "-u", &self.user, "-h", "-o", format];
        log::debug!("Running Slurm command `{}`", arguments.join(" "));
        let output = create_command(arguments, &self.workdir)
            .output()
            .await
            .context("squeue start failed")?;
        let output = check_command_output(output).context("squeue execution failed")?;
        Ok(parse_squeue_column(&output.stdout.to_str_lossy()))
    }
}

/// Non-empty lines of a headerless single-column `squeue` listing.
fn parse_squeue_column(output: &str) -> Vec<String> {
    output
        .lines()
        .map(|line| line.trim())
        .filter(|line| !line.is_empty())
        .map(|line| line.to_string())
        .collect()
}

impl QueueManager for SlurmHandler {
    fn test_submit<'a>(
        &'a self,
        script: &'a str,
        workdir: &'a Path,
    ) -> QueueFuture<'a, anyhow::Result<CommandOutput>> {
        Box::pin(async move {
            // sbatch resolves relative paths in the script against the script location
            let mut file = tempfile::Builder::new()
                .prefix(".gorun-probe-")
                .suffix(".sh")
                .tempfile_in(workdir)
                .context("Cannot create probe script")?;
            file.write_all(script.as_bytes())?;
            file.flush()?;

            let script_path = file.path().display().to_string();
            let arguments = vec!["sbatch", "--test-only", &script_path];
            log::debug!("Running Slurm command `{}`", arguments.join(" "));
            let output = create_command(arguments, workdir)
                .output()
                .await
                .context("sbatch start failed")?;
            Ok(CommandOutput {
                success: output.status.success(),
                text: combined_output(&output),
            })
        })
    }

    fn submit<'a>(
        &'a self,
        script_path: &'a Path,
        workdir: &'a Path,
    ) -> QueueFuture<'a, anyhow::Result<String>> {
        Box::pin(async move {
            let script_path = script_path.display().to_string();
            let arguments = vec!["sbatch", &script_path];
            log::debug!("Running Slurm command `{}`", arguments.join(" "));
            let output = create_command(arguments, workdir)
                .output()
                .await
                .context("sbatch start failed")?;
            let output = check_command_output(output).context("sbatch execution failed")?;
            let output = output
                .stdout
                .to_str()
                .map_err(|e| anyhow::anyhow!("Invalid UTF-8 sbatch output: {:?}", e))?
                .trim();
            log::debug!("Sbatch output: {output}");
            parse_submitted_job_id(output)
        })
    }

    fn queued_directories(&self) -> QueueFuture<'_, anyhow::Result<Vec<PathBuf>>> {
        Box::pin(async move {
            Ok(self
                .squeue_column("%Z")
                .await?
                .into_iter()
                .map(PathBuf::from)
                .collect())
        })
    }

    fn active_job_count(&self) -> QueueFuture<'_, anyhow::Result<usize>> {
        Box::pin(async move { Ok(self.squeue_column("%i").await?.len()) })
    }
}
