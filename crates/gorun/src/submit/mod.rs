//! One submission pass over a VASP working directory: guards, optional
//! waiting for queue capacity, backup, input preparation and dispatch.

use serde::Serialize;

pub mod backup;
pub mod controller;
pub mod prepare;
pub mod request;

pub use controller::{Controller, SubmitOptions};

/// How a submission pass ended. Guards that stop the pass are outcomes, not errors.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Outcome {
    Submitted { job_id: String, queue: String },
    RanLocally,
    AlreadyQueued,
    AlreadyConverged,
    MissingInput,
}

impl Outcome {
    pub fn exit_code(&self) -> i32 {
        match self {
            Outcome::Submitted { .. }
            | Outcome::RanLocally
            | Outcome::AlreadyQueued
            | Outcome::AlreadyConverged => 0,
            Outcome::MissingInput => 1,
        }
    }

    pub fn message(&self) -> String {
        match self {
            Outcome::Submitted { job_id, queue } => {
                format!("Job {job_id} submitted to queue {queue}")
            }
            Outcome::RanLocally => "Local run finished".to_string(),
            Outcome::AlreadyQueued => {
                "A job is already queued for this directory. Exiting without submitting a new job"
                    .to_string()
            }
            Outcome::AlreadyConverged => {
                "The calculation in this directory has already converged. Exiting without submitting a new job"
                    .to_string()
            }
            Outcome::MissingInput => {
                "No INCAR found in this directory. Cannot proceed".to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Outcome;

    #[test]
    fn test_exit_codes() {
        assert_eq!(
            Outcome::Submitted {
                job_id: "1".to_string(),
                queue: "q".to_string()
            }
            .exit_code(),
            0
        );
        assert_eq!(Outcome::AlreadyQueued.exit_code(), 0);
        assert_eq!(Outcome::AlreadyConverged.exit_code(), 0);
        assert_eq!(Outcome::RanLocally.exit_code(), 0);
        assert_eq!(Outcome::MissingInput.exit_code(), 1);
    }

    #[test]
    fn test_serialize_outcome() {
        let value = serde_json::to_value(Outcome::Submitted {
            job_id: "42".to_string(),
            queue: "qcpu".to_string(),
        })
        .unwrap();
        assert_eq!(
            value,
            serde_json::json!({"type": "submitted", "job_id": "42", "queue": "qcpu"})
        );
        assert_eq!(
            serde_json::to_value(Outcome::MissingInput).unwrap(),
            serde_json::json!({"type": "missing-input"})
        );
    }
}
