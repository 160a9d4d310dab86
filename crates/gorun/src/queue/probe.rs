//! Dry-run probing of a single candidate queue with `sbatch --test-only`.
//!
//! A successful probe answers with a line of the form
//! `sbatch: Job <id> to start at <YYYY-MM-DDTHH:MM:SS> using <N> processors on nodes <nodes> in partition <partition>`.

use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Local, NaiveDateTime};
use nom::bytes::complete::{tag, take_till1};
use nom::combinator::{map_res, opt, rest, verify};
use nom::sequence::{preceded, tuple};
use nom_supreme::ParserExt;

use crate::common::error::GorunError;
use crate::common::manager::slurm::parse_slurm_datetime;
use crate::common::parser::{NomResult, consume_all, p_u32, p_u64};
use crate::common::utils::time::local_datetime;
use crate::queue::request::ResourceRequest;
use crate::queue::script::build_batch_script;
use crate::queue::{CommandOutput, QueueManager};

const UNAVAILABLE_MARKER: &str = "Invalid account or account/partition combination specified";
const PERMISSION_DENIED_MARKER: &str = "permission denied";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeResult {
    /// The queue cannot be used by this user/account right now.
    Unavailable,
    Scheduled {
        wait: Duration,
        allocated_processors: u32,
    },
}

impl ProbeResult {
    /// Estimate used when the dry run itself is refused.
    ///
    /// Slurm denies `--test-only` submissions from inside an existing allocation,
    /// so a denial is taken to mean "we are already on a compute node" and the
    /// queue is assumed to start immediately on one processor. This is an
    /// approximation: a genuine permission problem looks the same.
    pub fn denied_fallback() -> Self {
        ProbeResult::Scheduled {
            wait: Duration::ZERO,
            allocated_processors: 1,
        }
    }
}

/// Parsed success line of `sbatch --test-only`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestOnlyEstimate {
    pub job_id: u64,
    pub start: NaiveDateTime,
    pub processors: u32,
    pub nodes: String,
    pub partition: String,
}

fn p_test_only_line(input: &str) -> NomResult<TestOnlyEstimate> {
    let word = || take_till1(|c: char| c.is_whitespace());
    map_res(
        tuple((
            preceded(opt(tag("sbatch: ")), preceded(tag("Job "), p_u64)).context("job id"),
            preceded(tag(" to start at "), word()).context("start time"),
            preceded(tag(" using "), verify(p_u32, |n: &u32| *n > 0)).context("processor count"),
            preceded(tag(" processors on nodes "), word()).context("node list"),
            preceded(tag(" in partition "), rest).context("partition"),
        )),
        |(job_id, start, processors, nodes, partition): (u64, &str, u32, &str, &str)| {
            parse_slurm_datetime(start).map(|start| TestOnlyEstimate {
                job_id,
                start,
                processors,
                nodes: nodes.to_string(),
                partition: partition.trim().to_string(),
            })
        },
    )(input)
}

/// Finds and parses the estimate line in the (combined) output of `sbatch --test-only`.
pub fn parse_test_only_output(output: &str) -> anyhow::Result<TestOnlyEstimate> {
    output
        .lines()
        .map(|line| line.trim())
        .filter(|line| !line.is_empty())
        .find_map(|line| consume_all(p_test_only_line, line).ok())
        .ok_or_else(|| anyhow::anyhow!("Unrecognized sbatch --test-only output:\n{output}"))
}

/// Maps the raw dry-run answer to a probe result.
pub fn interpret_probe_output(
    output: &CommandOutput,
    script: &str,
    now: DateTime<Local>,
) -> crate::Result<ProbeResult> {
    if output.text.contains(UNAVAILABLE_MARKER) {
        log::info!("Unavailable queue/account combination. Skipping");
        return Ok(ProbeResult::Unavailable);
    }
    if output
        .text
        .to_lowercase()
        .contains(PERMISSION_DENIED_MARKER)
    {
        log::warn!(
            "Dry-run submission was denied (running inside an allocation?). Assuming the queue starts immediately"
        );
        return Ok(ProbeResult::denied_fallback());
    }
    let probe_failed = || GorunError::ProbeFailed {
        output: output.text.trim().to_string(),
        script: script.to_string(),
    };
    if !output.success {
        return Err(probe_failed());
    }
    let estimate = parse_test_only_output(&output.text).map_err(|error| {
        log::debug!("{error}");
        probe_failed()
    })?;
    let start = local_datetime(estimate.start)?;
    let wait = (start - now).to_std().unwrap_or(Duration::ZERO);
    log::debug!(
        "Partition {} starts at {} ({} processors on {})",
        estimate.partition,
        estimate.start,
        estimate.processors,
        estimate.nodes
    );
    Ok(ProbeResult::Scheduled {
        wait,
        allocated_processors: estimate.processors,
    })
}

/// Builds the script for `request` and asks the queue when it would start.
pub async fn probe(
    manager: &dyn QueueManager,
    request: &ResourceRequest,
    shebang: &str,
    body: &str,
    workdir: &Path,
) -> crate::Result<ProbeResult> {
    request.validate()?;
    let script = build_batch_script(shebang, request, body);
    probe_script(manager, &script, workdir).await
}

/// Dry-runs an already built script. One probe is exactly one scheduler call.
pub async fn probe_script(
    manager: &dyn QueueManager,
    script: &str,
    workdir: &Path,
) -> crate::Result<ProbeResult> {
    let output = manager.test_submit(script, workdir).await?;
    interpret_probe_output(&output, script, Local::now())
}
