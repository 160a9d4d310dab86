use std::time::Duration;

use chrono::{DateTime, Local};

use crate::output::{Output, StatusKind};
use crate::submit::Outcome;

/// Prints only the final result, in a machine-friendly form.
#[derive(Default)]
pub struct Quiet;

impl Output for Quiet {
    fn print_status(&self, _kind: StatusKind, _message: &str) {}

    fn print_queue_estimate(
        &self,
        _queue: &str,
        _wait: Duration,
        _effective_runtime: Duration,
        _finish: DateTime<Local>,
    ) {
    }

    fn print_queue_unavailable(&self, _queue: &str) {}

    fn print_queue_selected(&self, _queue: &str, _finish: DateTime<Local>) {}

    fn print_outcome(&self, outcome: &Outcome) {
        match outcome {
            Outcome::Submitted { job_id, .. } => println!("{job_id}"),
            Outcome::RanLocally => println!("LOCAL"),
            Outcome::AlreadyQueued => println!("QUEUED"),
            Outcome::AlreadyConverged => println!("CONVERGED"),
            Outcome::MissingInput => println!("MISSING INPUT"),
        }
    }

    fn print_error(&self, error: crate::Error) {
        eprintln!("{error}");
    }
}
