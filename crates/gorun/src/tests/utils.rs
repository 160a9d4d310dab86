use std::cell::RefCell;
use std::collections::{BTreeMap, VecDeque};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::Duration;

use chrono::{DateTime, Local};

use crate::job::vasprun::tests::vasprun_xml;
use crate::output::{Output, StatusKind};
use crate::queue::{CommandOutput, QueueFuture, QueueManager};
use crate::submit::Outcome;
use crate::submit::backup::Archiver;
use crate::submit::prepare::{InputPreparer, LogCleaner};

pub fn write_file(dir: &Path, name: &str, content: &str) {
    std::fs::write(dir.join(name), content).unwrap();
}

/// Finished single run: non-empty OUTCAR and a converged vasprun.xml.
pub fn write_converged_run(dir: &Path) {
    write_file(dir, "OUTCAR", "General timing and accounting informations for this job\n");
    write_file(dir, "vasprun.xml", &vasprun_xml(60, 0, &[17]));
}

/// Ordered record of the calls made by the mocked collaborators.
pub type Journal = Rc<RefCell<Vec<String>>>;

pub fn dir_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Answer of `sbatch --test-only` for a job starting after `wait` on `processors` cores.
pub fn test_only_success(partition: &str, wait: Duration, processors: u32) -> CommandOutput {
    let start = Local::now() + chrono::TimeDelta::from_std(wait).unwrap();
    CommandOutput {
        success: true,
        text: format!(
            "sbatch: Job 1234 to start at {} using {processors} processors on nodes cn1 in partition {partition}\n",
            start.format("%Y-%m-%dT%H:%M:%S")
        ),
    }
}

pub fn test_only_unavailable() -> CommandOutput {
    CommandOutput {
        success: false,
        text: "sbatch: error: Batch job submission failed: Invalid account or account/partition combination specified\n".to_string(),
    }
}

fn script_partition(script: &str) -> Option<String> {
    script.lines().find_map(|line| {
        line.strip_prefix("#SBATCH --partition=\"")
            .and_then(|rest| rest.strip_suffix('"'))
            .map(|partition| partition.to_string())
    })
}

#[derive(Default)]
pub struct MockQueue {
    journal: Journal,
    queued: Vec<PathBuf>,
    counts: RefCell<VecDeque<usize>>,
    responses: BTreeMap<String, CommandOutput>,
    submitted: RefCell<Vec<String>>,
}

impl MockQueue {
    pub fn new(journal: &Journal) -> Self {
        Self {
            journal: journal.clone(),
            ..Default::default()
        }
    }

    pub fn with_queued(mut self, dir: &Path) -> Self {
        self.queued.push(dir.to_path_buf());
        self
    }

    /// Successive answers of the active job count; zero once exhausted.
    pub fn with_counts(self, counts: &[usize]) -> Self {
        self.counts.borrow_mut().extend(counts);
        self
    }

    pub fn with_response(mut self, partition: &str, output: CommandOutput) -> Self {
        self.responses.insert(partition.to_string(), output);
        self
    }

    /// Scripts passed to `sbatch`, in order.
    pub fn submitted(&self) -> Vec<String> {
        self.submitted.borrow().clone()
    }

    fn record(&self, event: String) {
        self.journal.borrow_mut().push(event);
    }
}

impl QueueManager for MockQueue {
    fn test_submit<'a>(
        &'a self,
        script: &'a str,
        _workdir: &'a Path,
    ) -> QueueFuture<'a, anyhow::Result<CommandOutput>> {
        Box::pin(async move {
            let partition = script_partition(script).unwrap_or_default();
            self.record(format!("dry-run {partition}"));
            Ok(self
                .responses
                .get(&partition)
                .cloned()
                .unwrap_or_else(|| CommandOutput {
                    success: false,
                    text: "sbatch: error: invalid partition specified".to_string(),
                }))
        })
    }

    fn submit<'a>(
        &'a self,
        script_path: &'a Path,
        _workdir: &'a Path,
    ) -> QueueFuture<'a, anyhow::Result<String>> {
        Box::pin(async move {
            let script = std::fs::read_to_string(script_path)?;
            let mut submitted = self.submitted.borrow_mut();
            submitted.push(script);
            self.record(format!("submit {}", dir_name(script_path)));
            Ok(format!("{}", 1000 + submitted.len()))
        })
    }

    fn queued_directories(&self) -> QueueFuture<'_, anyhow::Result<Vec<PathBuf>>> {
        Box::pin(async move {
            self.record("queued".to_string());
            Ok(self.queued.clone())
        })
    }

    fn active_job_count(&self) -> QueueFuture<'_, anyhow::Result<usize>> {
        Box::pin(async move {
            let count = self.counts.borrow_mut().pop_front().unwrap_or(0);
            self.record(format!("count {count}"));
            Ok(count)
        })
    }
}

/// Records the backup instead of copying; only the destination directory is created.
pub struct MockArchiver {
    journal: Journal,
}

impl MockArchiver {
    pub fn new(journal: &Journal) -> Self {
        Self {
            journal: journal.clone(),
        }
    }
}

impl Archiver for MockArchiver {
    fn archive(&self, entries: &[PathBuf], destination: &Path) -> crate::Result<()> {
        std::fs::create_dir_all(destination)?;
        let names: Vec<_> = entries.iter().map(|entry| dir_name(entry)).collect();
        self.journal
            .borrow_mut()
            .push(format!("archive [{}]", names.join(" ")));
        Ok(())
    }
}

pub struct MockPreparer {
    journal: Journal,
}

impl MockPreparer {
    pub fn new(journal: &Journal) -> Self {
        Self {
            journal: journal.clone(),
        }
    }
}

impl InputPreparer for MockPreparer {
    fn prepare(&self, dir: &Path, _output: &dyn Output) -> crate::Result<()> {
        self.journal
            .borrow_mut()
            .push(format!("prepare {}", dir_name(dir)));
        Ok(())
    }
}

impl LogCleaner for MockPreparer {
    fn clean(&self, dir: &Path, _output: &dyn Output) -> crate::Result<()> {
        self.journal
            .borrow_mut()
            .push(format!("clean {}", dir_name(dir)));
        Ok(())
    }
}

/// Keeps everything that would be shown to the user.
#[derive(Default)]
pub struct RecordingOutput {
    statuses: RefCell<Vec<(StatusKind, String)>>,
    estimates: RefCell<Vec<(String, Option<Duration>)>>,
    selected: RefCell<Vec<String>>,
}

impl RecordingOutput {
    pub fn statuses(&self) -> Vec<String> {
        self.statuses
            .borrow()
            .iter()
            .map(|(_, message)| message.clone())
            .collect()
    }

    pub fn warnings(&self) -> usize {
        self.statuses
            .borrow()
            .iter()
            .filter(|(kind, _)| *kind == StatusKind::Warning)
            .count()
    }

    /// Queue name with its effective runtime, `None` for unavailable queues.
    pub fn estimates(&self) -> Vec<(String, Option<Duration>)> {
        self.estimates.borrow().clone()
    }

    pub fn selected(&self) -> Vec<String> {
        self.selected.borrow().clone()
    }
}

impl Output for RecordingOutput {
    fn print_status(&self, kind: StatusKind, message: &str) {
        self.statuses.borrow_mut().push((kind, message.to_string()));
    }

    fn print_queue_estimate(
        &self,
        queue: &str,
        _wait: Duration,
        effective_runtime: Duration,
        _finish: DateTime<Local>,
    ) {
        self.estimates
            .borrow_mut()
            .push((queue.to_string(), Some(effective_runtime)));
    }

    fn print_queue_unavailable(&self, queue: &str) {
        self.estimates.borrow_mut().push((queue.to_string(), None));
    }

    fn print_queue_selected(&self, queue: &str, _finish: DateTime<Local>) {
        self.selected.borrow_mut().push(queue.to_string());
    }

    fn print_outcome(&self, _outcome: &Outcome) {}

    fn print_error(&self, _error: crate::Error) {}
}
