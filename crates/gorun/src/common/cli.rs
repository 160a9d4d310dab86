use std::path::PathBuf;

use clap::Parser;

use crate::common::manager::slurm::parse_slurm_time_limit;
use crate::output::Outputs;

#[derive(clap::ValueEnum, Clone)]
pub enum ColorPolicy {
    /// Use colors if the stdout is detected to be a terminal.
    Auto,
    /// Always use colors.
    Always,
    /// Never use colors.
    Never,
}

// Common CLI options
#[derive(Parser)]
pub struct CommonOpts {
    /// Path to the gorun configuration file
    #[arg(
        long,
        value_hint = clap::ValueHint::FilePath,
        env = "GORUN_CONFIG",
        help_heading("GLOBAL OPTIONS")
    )]
    pub config: Option<PathBuf>,

    /// Sets console color policy
    #[arg(
        long,
        default_value_t = ColorPolicy::Auto,
        value_enum,
        help_heading("GLOBAL OPTIONS"),
        hide_short_help(true)
    )]
    pub colors: ColorPolicy,

    /// Sets output formatting
    #[arg(
        long,
        env = "GORUN_OUTPUT_MODE",
        default_value_t = Outputs::CLI,
        value_enum,
        help_heading("GLOBAL OPTIONS"),
        hide_short_help(true)
    )]
    pub output_mode: Outputs,

    /// Enables more detailed log output
    #[arg(long, env = "GORUN_DEBUG", help_heading("GLOBAL OPTIONS"))]
    pub debug: bool,
}

/// Submits the VASP calculation in the current directory to the queue that is
/// expected to finish it first.
#[derive(Parser)]
#[command(author, about, version(crate::GORUN_VERSION), help_expected(true))]
pub struct RootOptions {
    #[clap(flatten)]
    pub common: CommonOpts,

    /// Number of nodes to request (overrides the configured default)
    pub nodes: Option<u32>,

    /// Wall-clock limit to request, e.g. `24:00:00` or `2-00:00:00`
    #[arg(value_parser = parse_slurm_time_limit)]
    pub time: Option<String>,

    /// Consider only this queue
    #[arg(long)]
    pub queue: Option<String>,

    /// Do not put the server's VASP setup into the job script
    #[arg(long)]
    pub no_setup: bool,

    /// Run the calculation directly in this shell instead of submitting it
    #[arg(long)]
    pub local: bool,

    /// Submit even if the job is already queued or converged
    #[arg(long)]
    pub force: bool,

    /// Keep an existing non-empty POTCAR instead of regenerating it
    #[arg(long)]
    pub keep_potcar: bool,

    /// Wait until fewer than N of your jobs are in the queue before submitting
    #[arg(long, value_name = "N")]
    pub max_jobs: Option<usize>,
}
