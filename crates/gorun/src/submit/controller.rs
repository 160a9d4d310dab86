use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use anyhow::Context;
use chrono::Local;

use crate::common::config::ServerConfig;
use crate::common::env::ensure_command;
use crate::common::error::GorunError;
use crate::job::JobNode;
use crate::job::incar::{INCAR, Incar};
use crate::job::node::has_control_file;
use crate::output::{Output, StatusKind};
use crate::queue::script::{SCRIPT_NAME, build_local_script};
use crate::queue::select::select_best;
use crate::queue::{QueueManager, is_already_queued};
use crate::submit::Outcome;
use crate::submit::backup::{Archiver, backup_entries, next_backup_name};
use crate::submit::prepare::{InputPreparer, LogCleaner};
use crate::submit::request::{
    DEFAULT_JOB_NAME, UserResources, build_job_body, build_resource_request, candidate_queues,
};

/// How often the active job count is re-queried while waiting for capacity.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Output of locally executed runs, appended to on every run.
pub const LOCAL_LOG: &str = "vasp.out";

/// Shell that executes the script of a local run.
pub const LOCAL_SHELL: &str = "bash";

#[derive(Debug, Clone, Default)]
pub struct SubmitOptions {
    pub resources: UserResources,
    /// Restricts the candidates to a single configured queue.
    pub queue: Option<String>,
    pub no_setup: bool,
    pub local: bool,
    /// Submits even if the directory is already queued or converged.
    pub force: bool,
    /// Waits until fewer than this many own jobs are active. `0` means no limit.
    pub max_jobs: Option<usize>,
}

/// Runs one submission pass. All side effects go through the injected
/// collaborators so that each step can be replaced in tests.
pub struct Controller<'a> {
    manager: &'a dyn QueueManager,
    archiver: &'a dyn Archiver,
    preparer: &'a dyn InputPreparer,
    cleaner: &'a dyn LogCleaner,
    output: &'a dyn Output,
    server: &'a ServerConfig,
    vasp_path: PathBuf,
    poll_interval: Duration,
    local_shell: String,
}

impl<'a> Controller<'a> {
    pub fn new(
        manager: &'a dyn QueueManager,
        archiver: &'a dyn Archiver,
        preparer: &'a dyn InputPreparer,
        cleaner: &'a dyn LogCleaner,
        output: &'a dyn Output,
        server: &'a ServerConfig,
        vasp_path: PathBuf,
    ) -> Self {
        Self {
            manager,
            archiver,
            preparer,
            cleaner,
            output,
            server,
            vasp_path,
            poll_interval: DEFAULT_POLL_INTERVAL,
            local_shell: LOCAL_SHELL.to_string(),
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn with_local_shell(mut self, shell: impl Into<String>) -> Self {
        self.local_shell = shell.into();
        self
    }

    fn status(&self, message: &str) {
        self.output.print_status(StatusKind::Progress, message);
    }

    pub async fn run(&self, workdir: &Path, options: &SubmitOptions) -> crate::Result<Outcome> {
        if !options.force {
            self.status(&format!(
                "Checking the queue for jobs in {}",
                workdir.display()
            ));
            if is_already_queued(self.manager, workdir).await? {
                return Ok(Outcome::AlreadyQueued);
            }
        }
        if !has_control_file(workdir) {
            return Ok(Outcome::MissingInput);
        }
        let node = JobNode::discover(workdir)?;
        if !options.force && !node.is_molecular_dynamics() {
            self.status("Checking whether the calculation has converged");
            if node.is_converged() {
                return Ok(Outcome::AlreadyConverged);
            }
        }

        let shell = if options.local {
            Some(ensure_command(&self.local_shell)?)
        } else {
            None
        };

        if let Some(max_jobs) = options.max_jobs.filter(|&max_jobs| max_jobs > 0) {
            self.wait_for_capacity(max_jobs).await?;
        }

        if node.has_output() {
            self.backup(&node)?;
        }
        let directories = node.directories();
        self.status(&format!("Preparing inputs in {} director(ies)", directories.len()));
        for dir in &directories {
            self.preparer.prepare(dir, self.output)?;
        }
        self.status("Removing old Slurm logs");
        for dir in &directories {
            self.cleaner.clean(dir, self.output)?;
        }

        let incar = Incar::from_file(&workdir.join(INCAR))?;
        let body = build_job_body(self.server, &self.vasp_path, &incar, options.no_setup);
        if let Some(shell) = shell {
            let script = build_local_script(&self.server.shebang, &body);
            let script_path = write_script(workdir, &script)?;
            self.run_locally(&shell, &script_path, workdir).await?;
            return Ok(Outcome::RanLocally);
        }

        let job_name = incar.system_name().unwrap_or(DEFAULT_JOB_NAME);
        let candidates: Vec<_> = candidate_queues(self.server, options.queue.as_deref())?
            .into_iter()
            .map(|queue| build_resource_request(self.server, queue, job_name, &options.resources))
            .collect();
        self.status(&format!("Estimating start time in {} queue(s)", candidates.len()));
        let decision = select_best(
            self.manager,
            self.output,
            &candidates,
            &self.server.shebang,
            &body,
            workdir,
        )
        .await?;

        let script_path = write_script(workdir, &decision.script)?;
        let job_id = self
            .manager
            .submit(&script_path, workdir)
            .await
            .map_err(|error| GorunError::DispatchFailed(format!("{error:?}")))?;
        Ok(Outcome::Submitted {
            job_id,
            queue: decision.queue,
        })
    }

    async fn wait_for_capacity(&self, max_jobs: usize) -> crate::Result<()> {
        loop {
            let active = self.manager.active_job_count().await?;
            if active < max_jobs {
                return Ok(());
            }
            self.output.print_status(
                StatusKind::Warning,
                &format!(
                    "{active} jobs in the queue (limit {max_jobs}). Waiting {}",
                    humantime::format_duration(self.poll_interval)
                ),
            );
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    fn backup(&self, node: &JobNode) -> crate::Result<()> {
        let destination = node
            .path()
            .join(next_backup_name(node.path(), Local::now())?);
        self.status(&format!(
            "Backing up {} to {}",
            node.path().display(),
            destination.display()
        ));
        self.archiver
            .archive(&backup_entries(node)?, &destination)?;
        self.status(&format!("Backing up {} ... done", node.path().display()));
        Ok(())
    }

    async fn run_locally(
        &self,
        shell: &Path,
        script_path: &Path,
        workdir: &Path,
    ) -> crate::Result<()> {
        let log_path = workdir.join(LOCAL_LOG);
        let log = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)?;
        let stderr = log.try_clone()?;
        self.status(&format!(
            "Running {} locally, output is appended to {}",
            script_path.display(),
            log_path.display()
        ));

        let mut command = tokio::process::Command::new(shell);
        command
            .arg(script_path)
            .current_dir(workdir)
            .stdin(Stdio::null())
            .stdout(Stdio::from(log))
            .stderr(Stdio::from(stderr));
        log::debug!("Running command {command:?}");
        let status = command
            .status()
            .await
            .with_context(|| format!("Cannot start {}", script_path.display()))?;
        if !status.success() {
            return Err(GorunError::DispatchFailed(format!(
                "Local run exited with {status}, see {}",
                log_path.display()
            )));
        }
        Ok(())
    }
}

fn write_script(workdir: &Path, script: &str) -> crate::Result<PathBuf> {
    let path = workdir.join(SCRIPT_NAME);
    std::fs::write(&path, script)?;
    Ok(path)
}
