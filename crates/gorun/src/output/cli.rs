use std::time::Duration;

use chrono::{DateTime, Local};
use colored::Color as Colorization;
use colored::Colorize;
use humantime::format_duration;

use crate::common::manager::slurm::format_slurm_duration;
use crate::output::{Output, StatusKind};
use crate::submit::Outcome;

pub const OUTCOME_COLOR_DONE: Colorization = Colorization::Green;
pub const OUTCOME_COLOR_NOTHING_TO_DO: Colorization = Colorization::Yellow;
pub const OUTCOME_COLOR_FAILED: Colorization = Colorization::Red;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Default)]
pub struct CliOutput;

pub fn outcome_color(outcome: &Outcome) -> Colorization {
    match outcome {
        Outcome::Submitted { .. } | Outcome::RanLocally => OUTCOME_COLOR_DONE,
        Outcome::AlreadyQueued | Outcome::AlreadyConverged => OUTCOME_COLOR_NOTHING_TO_DO,
        Outcome::MissingInput => OUTCOME_COLOR_FAILED,
    }
}

/// Drops the sub-second part of a scheduler estimate before it is shown.
fn whole_seconds(duration: Duration) -> Duration {
    Duration::from_secs(duration.as_secs_f64().round() as u64)
}

impl Output for CliOutput {
    fn print_status(&self, kind: StatusKind, message: &str) {
        match kind {
            StatusKind::Progress => println!("{message}"),
            StatusKind::Warning => println!("{}", message.color(OUTCOME_COLOR_NOTHING_TO_DO)),
        }
    }

    fn print_queue_estimate(
        &self,
        queue: &str,
        wait: Duration,
        effective_runtime: Duration,
        finish: DateTime<Local>,
    ) {
        println!(
            "Candidate time ({}): {} (wait {}, effective runtime {})",
            queue.bold(),
            finish.format(TIME_FORMAT),
            format_duration(whole_seconds(wait)),
            format_slurm_duration(&effective_runtime)
        );
    }

    fn print_queue_unavailable(&self, queue: &str) {
        println!(
            "Candidate time ({}): {}",
            queue.bold(),
            "unavailable".color(OUTCOME_COLOR_NOTHING_TO_DO)
        );
    }

    fn print_queue_selected(&self, queue: &str, finish: DateTime<Local>) {
        println!(
            "Best finish time: {} (queue {})",
            finish.format(TIME_FORMAT).to_string().bold(),
            queue
        );
    }

    fn print_outcome(&self, outcome: &Outcome) {
        println!("{}", outcome.message().color(outcome_color(outcome)));
    }

    fn print_error(&self, error: crate::Error) {
        eprintln!("{}", error.to_string().color(OUTCOME_COLOR_FAILED));
    }
}
