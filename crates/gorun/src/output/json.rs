use std::time::Duration;

use chrono::{DateTime, Local};
use serde_json::json;

use crate::output::{Output, StatusKind};
use crate::submit::Outcome;

/// Prints one JSON object per line for every reported event.
#[derive(Default)]
pub struct JsonOutput;

impl JsonOutput {
    fn print(&self, value: serde_json::Value) {
        println!("{value}");
    }
}

impl Output for JsonOutput {
    fn print_status(&self, kind: StatusKind, message: &str) {
        self.print(json!({
            "event": "status",
            "kind": kind,
            "message": message,
        }));
    }

    fn print_queue_estimate(
        &self,
        queue: &str,
        wait: Duration,
        effective_runtime: Duration,
        finish: DateTime<Local>,
    ) {
        self.print(json!({
            "event": "queue-estimate",
            "queue": queue,
            "wait": wait.as_secs_f64(),
            "effective_runtime": effective_runtime.as_secs_f64(),
            "finish": finish.to_rfc3339(),
        }));
    }

    fn print_queue_unavailable(&self, queue: &str) {
        self.print(json!({
            "event": "queue-unavailable",
            "queue": queue,
        }));
    }

    fn print_queue_selected(&self, queue: &str, finish: DateTime<Local>) {
        self.print(json!({
            "event": "queue-selected",
            "queue": queue,
            "finish": finish.to_rfc3339(),
        }));
    }

    fn print_outcome(&self, outcome: &Outcome) {
        self.print(json!({
            "event": "outcome",
            "outcome": outcome,
            "message": outcome.message(),
            "exit_code": outcome.exit_code(),
        }));
    }

    fn print_error(&self, error: crate::Error) {
        self.print(json!({
            "event": "error",
            "message": error.to_string(),
        }));
    }
}
