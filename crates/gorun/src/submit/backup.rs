use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

use crate::common::env::ensure_command;
use crate::job::JobNode;
use crate::queue::common::check_command_output;

const BACKUP_PREFIX: &str = "gorun_";

/// Copies the files of a finished or interrupted run aside before it is restarted.
pub trait Archiver {
    /// Copies `entries` (files or directories) into `destination`, creating it.
    fn archive(&self, entries: &[PathBuf], destination: &Path) -> crate::Result<()>;
}

pub struct RsyncArchiver {
    rsync: PathBuf,
}

impl RsyncArchiver {
    pub fn new() -> crate::Result<Self> {
        Ok(Self {
            rsync: ensure_command("rsync")?,
        })
    }
}

impl Archiver for RsyncArchiver {
    fn archive(&self, entries: &[PathBuf], destination: &Path) -> crate::Result<()> {
        std::fs::create_dir_all(destination)?;
        let mut command = std::process::Command::new(&self.rsync);
        command
            .arg("-a")
            .args(entries)
            .arg(format!("{}/", destination.display()));
        log::debug!("Running command {command:?}");
        check_command_output(command.output()?)?;
        Ok(())
    }
}

/// Index of a backup directory name (`gorun_<N>_<timestamp>`).
fn backup_index(name: &str) -> Option<u64> {
    let rest = name.strip_prefix(BACKUP_PREFIX)?;
    let index = rest.split('_').next()?;
    if index.is_empty() || !index.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    index.parse().ok()
}

/// Name of the next backup directory in `dir`: one above the highest existing
/// index (starting at 1), followed by `now`.
pub fn next_backup_name(dir: &Path, now: DateTime<Local>) -> std::io::Result<String> {
    let mut highest = 0;
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if let Some(index) = entry.file_name().to_str().and_then(backup_index) {
            highest = highest.max(index);
        }
    }
    Ok(format!(
        "{BACKUP_PREFIX}{}_{}",
        highest + 1,
        now.format("%Y_%m_%dT%H_%M_%S")
    ))
}

/// What goes into a backup: every top-level file of the run and, for a
/// composite run, every stage directory.
pub fn backup_entries(node: &JobNode) -> std::io::Result<Vec<PathBuf>> {
    let mut entries = Vec::new();
    for entry in std::fs::read_dir(node.path())? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            entries.push(entry.path());
        }
    }
    entries.sort();
    entries.extend(node.children().iter().map(|child| child.path().to_path_buf()));
    Ok(entries)
}
