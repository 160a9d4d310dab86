use std::path::Path;

use crate::common::config::ServerConfig;
use crate::common::error::GorunError;
use crate::job::incar::Incar;
use crate::queue::request::{JOB_NAME_KEY, NODES_KEY, PARTITION_KEY, ResourceRequest, TIME_KEY};

/// Job name used when `INCAR` has no `SYSTEM` tag.
pub const DEFAULT_JOB_NAME: &str = "unknown";

/// Resources given on the command line.
#[derive(Debug, Clone, Default)]
pub struct UserResources {
    pub nodes: Option<u32>,
    pub time: Option<String>,
}

/// Assembles the directives for submitting to `queue`.
///
/// Layers, from the lowest to the highest precedence; a later layer replaces
/// keys set by an earlier one:
/// 1. the server's `defaults.sbatch`,
/// 2. the queue's own `sbatch` section (empty if the queue has none),
/// 3. `job-name` taken from `INCAR`,
/// 4. `nodes` and `time` given by the user,
/// 5. `partition = <queue>`, which can never be overridden.
pub fn build_resource_request(
    server: &ServerConfig,
    queue: &str,
    job_name: &str,
    user: &UserResources,
) -> ResourceRequest {
    let mut request = ResourceRequest::new();
    request
        .overlay(&server.defaults.sbatch)
        .overlay(server.queue_layer(queue))
        .set(JOB_NAME_KEY, job_name);
    if let Some(nodes) = user.nodes {
        request.set(NODES_KEY, nodes.to_string());
    }
    if let Some(time) = &user.time {
        request.set(TIME_KEY, time.as_str());
    }
    request.set(PARTITION_KEY, queue);
    request
}

/// Queues to probe: all configured ones, or just the one the user asked for.
pub fn candidate_queues<'a>(
    server: &'a ServerConfig,
    selected: Option<&'a str>,
) -> crate::Result<Vec<&'a str>> {
    match selected {
        None => Ok(server.queues.iter().map(|queue| queue.as_str()).collect()),
        Some(queue) if server.queues.iter().any(|q| q == queue) => Ok(vec![queue]),
        Some(queue) => Err(GorunError::ConfigError(format!(
            "Queue `{queue}` is not configured for this server (known queues: {})",
            server.queues.join(", ")
        ))),
    }
}

/// Executable matching the calculation: the non-collinear build for
/// spin-orbit or non-collinear magnetism, the standard one otherwise.
pub fn vasp_executable(incar: &Incar) -> &'static str {
    if incar.is_noncollinear() {
        "vasp_ncl"
    } else {
        "vasp_std"
    }
}

/// Script body shared by every candidate: the server's setup preamble followed
/// by the launch command.
pub fn build_job_body(server: &ServerConfig, vasp_path: &Path, incar: &Incar, no_setup: bool) -> String {
    let setup = if no_setup { "" } else { server.setup.trim() };
    let executable = vasp_path.join("bin").join(vasp_executable(incar));
    format!(
        "{setup}\n\n{} {}\n",
        server.launcher,
        executable.display()
    )
}
