//! User-facing status reporting. The controller and the queue selector report
//! through an explicit [`Output`] instance instead of printing directly.

use std::time::Duration;

use chrono::{DateTime, Local};
use serde::Serialize;

use crate::submit::Outcome;

pub mod cli;
pub mod json;
pub mod quiet;

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
pub enum Outputs {
    CLI,
    JSON,
    Quiet,
}

#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum StatusKind {
    /// A pipeline step is starting or has finished.
    Progress,
    /// Something worth attention that does not stop the pipeline.
    Warning,
}

pub trait Output {
    fn print_status(&self, kind: StatusKind, message: &str);

    // Queue selection
    fn print_queue_estimate(
        &self,
        queue: &str,
        wait: Duration,
        effective_runtime: Duration,
        finish: DateTime<Local>,
    );
    fn print_queue_unavailable(&self, queue: &str);
    fn print_queue_selected(&self, queue: &str, finish: DateTime<Local>);

    fn print_outcome(&self, outcome: &Outcome);
    fn print_error(&self, error: crate::Error);
}

pub fn create_output(mode: Outputs) -> Box<dyn Output> {
    match mode {
        Outputs::CLI => Box::<cli::CliOutput>::default(),
        Outputs::JSON => Box::<json::JsonOutput>::default(),
        Outputs::Quiet => Box::<quiet::Quiet>::default(),
    }
}
