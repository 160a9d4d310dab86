use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Local};
use futures::future::join_all;

use crate::common::error::GorunError;
use crate::output::Output;
use crate::queue::QueueManager;
use crate::queue::probe::{ProbeResult, probe_script};
use crate::queue::request::ResourceRequest;
use crate::queue::script::build_batch_script;

/// The script chosen by [`select_best`] and when it is expected to finish.
#[derive(Debug, Clone)]
pub struct ScheduleDecision {
    pub script: String,
    pub queue: String,
    pub finish: DateTime<Local>,
}

/// Estimated completion of one available candidate, relative to now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompletionEstimate {
    pub wait: Duration,
    /// Time limit inflated by how much less parallel the queue is than the best one.
    pub effective_runtime: Duration,
}

impl CompletionEstimate {
    pub fn offset(&self) -> Duration {
        self.wait + self.effective_runtime
    }
}

/// `wait + (max_processors / processors) * time_limit`, with the scaling done in
/// integer milliseconds so that equal inputs always compare equal.
pub fn estimate_completion(
    wait: Duration,
    processors: u32,
    max_processors: u32,
    time_limit: Duration,
) -> CompletionEstimate {
    let processors = processors.max(1) as u128;
    let scaled = time_limit.as_millis() * max_processors as u128 / processors;
    CompletionEstimate {
        wait,
        effective_runtime: Duration::from_millis(u64::try_from(scaled).unwrap_or(u64::MAX)),
    }
}

/// Computes the completion estimate of every available candidate.
/// `candidates` pairs each probe result with the candidate's time limit.
pub fn estimate_candidates(
    candidates: &[(ProbeResult, Duration)],
) -> Option<Vec<Option<CompletionEstimate>>> {
    let max_processors = candidates
        .iter()
        .filter_map(|(probe, _)| match probe {
            ProbeResult::Scheduled {
                allocated_processors,
                ..
            } => Some(*allocated_processors),
            ProbeResult::Unavailable => None,
        })
        .max()?;
    Some(
        candidates
            .iter()
            .map(|(probe, time_limit)| match probe {
                ProbeResult::Unavailable => None,
                ProbeResult::Scheduled {
                    wait,
                    allocated_processors,
                } => Some(estimate_completion(
                    *wait,
                    *allocated_processors,
                    max_processors,
                    *time_limit,
                )),
            })
            .collect(),
    )
}

/// Index of the earliest estimate; the first one wins ties.
pub fn pick_earliest(estimates: &[Option<CompletionEstimate>]) -> Option<usize> {
    let mut best: Option<(usize, Duration)> = None;
    for (index, estimate) in estimates.iter().enumerate() {
        let Some(estimate) = estimate else {
            continue;
        };
        let offset = estimate.offset();
        if best.is_none_or(|(_, best_offset)| offset < best_offset) {
            best = Some((index, offset));
        }
    }
    best.map(|(index, _)| index)
}

fn finish_time(now: DateTime<Local>, offset: Duration) -> DateTime<Local> {
    chrono::TimeDelta::from_std(offset)
        .ok()
        .and_then(|delta| now.checked_add_signed(delta))
        .unwrap_or(now)
}

/// Builds a script for every candidate request, dry-runs all of them and
/// returns the script that is expected to finish first.
///
/// Candidates that the scheduler reports as unavailable are dropped. When no
/// candidate remains, [`GorunError::NoQueueAvailable`] is returned.
pub async fn select_best(
    manager: &dyn QueueManager,
    output: &dyn Output,
    candidates: &[ResourceRequest],
    shebang: &str,
    body: &str,
    workdir: &Path,
) -> crate::Result<ScheduleDecision> {
    let time_limits = candidates
        .iter()
        .map(|request| {
            request.validate()?;
            request.time_limit()
        })
        .collect::<crate::Result<Vec<_>>>()?;
    let scripts: Vec<String> = candidates
        .iter()
        .map(|request| build_batch_script(shebang, request, body))
        .collect();

    let probes = join_all(
        scripts
            .iter()
            .map(|script| probe_script(manager, script, workdir)),
    )
    .await
    .into_iter()
    .collect::<crate::Result<Vec<_>>>()?;
    let now = Local::now();

    let pairs: Vec<(ProbeResult, Duration)> = probes.into_iter().zip(time_limits).collect();
    let estimates = estimate_candidates(&pairs).ok_or(GorunError::NoQueueAvailable)?;

    for (request, estimate) in candidates.iter().zip(&estimates) {
        let queue = request.partition().unwrap_or_default();
        match estimate {
            Some(estimate) => output.print_queue_estimate(
                queue,
                estimate.wait,
                estimate.effective_runtime,
                finish_time(now, estimate.offset()),
            ),
            None => output.print_queue_unavailable(queue),
        }
    }

    let index = pick_earliest(&estimates).ok_or(GorunError::NoQueueAvailable)?;
    let offset = estimates[index]
        .map(|estimate| estimate.offset())
        .unwrap_or_default();
    let decision = ScheduleDecision {
        script: scripts[index].clone(),
        queue: candidates[index].partition().unwrap_or_default().to_string(),
        finish: finish_time(now, offset),
    };
    output.print_queue_selected(&decision.queue, decision.finish);
    Ok(decision)
}
