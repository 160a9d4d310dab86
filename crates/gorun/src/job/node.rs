use std::path::{Path, PathBuf};

use crate::job::incar::{INCAR, Incar};
use crate::job::vasprun::{VASPRUN, read_convergence};

/// Primary output artifact; a non-empty one means the run has started producing results.
pub const OUTCAR: &str = "OUTCAR";

/// A VASP run rooted in a working directory.
///
/// Multi-stage runs keep each stage in a numerically named subdirectory
/// (`00`, `01`, ...) and are only done when every stage is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobNode {
    SingleRun {
        path: PathBuf,
    },
    CompositeRun {
        path: PathBuf,
        children: Vec<JobNode>,
    },
}

impl JobNode {
    /// Classifies `path` by its control file. Stages of a composite run are
    /// always treated as single runs.
    pub fn discover(path: &Path) -> std::io::Result<Self> {
        if is_composite(path) {
            let children = stage_directories(path)?
                .into_iter()
                .map(|path| JobNode::SingleRun { path })
                .collect();
            Ok(JobNode::CompositeRun {
                path: path.to_path_buf(),
                children,
            })
        } else {
            Ok(JobNode::SingleRun {
                path: path.to_path_buf(),
            })
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            JobNode::SingleRun { path } | JobNode::CompositeRun { path, .. } => path,
        }
    }

    pub fn children(&self) -> &[JobNode] {
        match self {
            JobNode::SingleRun { .. } => &[],
            JobNode::CompositeRun { children, .. } => children,
        }
    }

    /// The node's own directory followed by its stages, in ascending order.
    pub fn directories(&self) -> Vec<&Path> {
        std::iter::once(self.path())
            .chain(self.children().iter().map(|child| child.path()))
            .collect()
    }

    pub fn is_composite(&self) -> bool {
        matches!(self, JobNode::CompositeRun { .. })
    }

    pub fn has_output(&self) -> bool {
        match self {
            JobNode::SingleRun { path } => {
                crate::common::utils::fs::is_non_empty_file(&path.join(OUTCAR))
            }
            JobNode::CompositeRun { children, .. } => children.iter().any(JobNode::has_output),
        }
    }

    /// Never fails: an unreadable or incomplete result artifact means "not converged".
    pub fn is_converged(&self) -> bool {
        if !self.has_output() {
            return false;
        }
        match self {
            JobNode::SingleRun { path } => {
                let artifact = path.join(VASPRUN);
                match read_convergence(&artifact) {
                    Ok(convergence) => convergence.is_converged(),
                    Err(error) => {
                        log::debug!("{} is not converged: {error:#}", path.display());
                        false
                    }
                }
            }
            JobNode::CompositeRun { children, .. } => {
                !children.is_empty() && children.iter().all(JobNode::is_converged)
            }
        }
    }

    pub fn is_molecular_dynamics(&self) -> bool {
        is_molecular_dynamics(self.path())
    }
}

fn read_incar(path: &Path) -> Option<Incar> {
    Incar::from_file(&path.join(INCAR)).ok()
}

pub fn has_control_file(path: &Path) -> bool {
    path.join(INCAR).is_file()
}

pub fn is_composite(path: &Path) -> bool {
    read_incar(path).is_some_and(|incar| incar.is_multi_stage())
}

pub fn is_molecular_dynamics(path: &Path) -> bool {
    read_incar(path).is_some_and(|incar| incar.is_molecular_dynamics())
}

/// Subdirectories whose names are plain numbers, sorted numerically.
fn stage_directories(path: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut stages = Vec::new();
    for entry in std::fs::read_dir(path)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if name.is_empty() || !name.bytes().all(|b| b.is_ascii_digit()) {
            continue;
        }
        if let Ok(index) = name.parse::<u64>() {
            stages.push((index, entry.path()));
        }
    }
    stages.sort();
    Ok(stages.into_iter().map(|(_, path)| path).collect())
}
