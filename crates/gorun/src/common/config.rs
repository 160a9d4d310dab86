use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer};

use crate::common::env::{CLUSTER_NAME, IMD_GROUP, require_env};
use crate::common::error::GorunError;

/// Directive key/value pairs as they will be passed to `sbatch`.
pub type DirectiveLayer = BTreeMap<String, String>;

pub const DEFAULT_LAUNCHER: &str = "mpiexec";
pub const DEFAULT_SHEBANG: &str = "#!/usr/bin/env bash";

fn default_launcher() -> String {
    DEFAULT_LAUNCHER.to_string()
}

fn default_shebang() -> String {
    DEFAULT_SHEBANG.to_string()
}

/// Contents of `gorun.toml`.
#[derive(Deserialize, Debug)]
pub struct GorunConfig {
    #[serde(default)]
    cluster: ClusterSection,
    #[serde(flatten)]
    servers: BTreeMap<String, ServerConfig>,
}

#[derive(Deserialize, Debug, Default)]
struct ClusterSection {
    /// Server name -> host names that identify it.
    #[serde(default)]
    names: BTreeMap<String, Vec<String>>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "kebab-case")]
pub struct ServerConfig {
    /// Queues (Slurm partitions) that are considered for submission, in order.
    pub queues: Vec<String>,
    /// Shell text executed before the launch command.
    #[serde(rename = "VASP-setup", default)]
    pub setup: String,
    #[serde(default = "default_launcher")]
    pub launcher: String,
    #[serde(default = "default_shebang")]
    pub shebang: String,
    /// Van der Waals kernel staged into runs that request it.
    #[serde(default)]
    pub vdw_kernel: Option<PathBuf>,
    /// Element -> pseudopotential directory overrides (e.g. `Li = "Li_sv"`).
    #[serde(default)]
    pub potcar: BTreeMap<String, String>,
    #[serde(default)]
    pub defaults: QueueSection,
    #[serde(flatten)]
    overrides: BTreeMap<String, QueueSection>,
}

#[derive(Deserialize, Debug, Default, Clone)]
pub struct QueueSection {
    #[serde(default, deserialize_with = "deserialize_directives")]
    pub sbatch: DirectiveLayer,
}

fn deserialize_directives<'de, D>(deserializer: D) -> Result<DirectiveLayer, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = BTreeMap::<String, toml::Value>::deserialize(deserializer)?;
    raw.into_iter()
        .map(|(key, value)| {
            let value = match value {
                toml::Value::String(value) => value,
                toml::Value::Integer(value) => value.to_string(),
                toml::Value::Float(value) => value.to_string(),
                toml::Value::Boolean(value) => value.to_string(),
                other => {
                    return Err(serde::de::Error::custom(format!(
                        "sbatch directive `{key}` must be a scalar, found {}",
                        other.type_str()
                    )));
                }
            };
            Ok((key, value))
        })
        .collect()
}

impl ServerConfig {
    /// Per-queue directive overrides. A queue without its own section has no overrides.
    pub fn queue_layer(&self, queue: &str) -> &DirectiveLayer {
        static EMPTY: DirectiveLayer = BTreeMap::new();
        match self.overrides.get(queue) {
            Some(section) => &section.sbatch,
            None => {
                log::debug!("Queue {queue} has no override section");
                &EMPTY
            }
        }
    }
}

impl GorunConfig {
    pub fn load(path: &Path) -> crate::Result<Self> {
        if !path.is_file() {
            return Err(GorunError::ConfigError(format!(
                "Cannot find config in {}",
                path.display()
            )));
        }
        log::debug!("Loading configuration from {}", path.display());
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> crate::Result<Self> {
        let config: GorunConfig = toml::from_str(content)?;
        for (name, server) in &config.servers {
            if server.queues.is_empty() {
                return Err(GorunError::ConfigError(format!(
                    "Server {name} does not define any queues"
                )));
            }
        }
        Ok(config)
    }

    /// Finds the server section for `host`: first by the `[cluster.names]` table,
    /// then by a section named exactly like the host.
    pub fn resolve_server(&self, host: &str) -> crate::Result<(&str, &ServerConfig)> {
        let by_alias = self
            .cluster
            .names
            .iter()
            .find(|(_, names)| names.iter().any(|name| name == host))
            .map(|(server, _)| server.as_str());
        let name = by_alias.unwrap_or(host);
        self.servers
            .get_key_value(name)
            .map(|(name, server)| (name.as_str(), server))
            .ok_or_else(|| {
                GorunError::ConfigError(format!(
                    "Running on unknown server `{host}`. Please adjust the config."
                ))
            })
    }
}

/// `$IMDGroup/dist/etc/gorun.toml`
pub fn default_config_path() -> crate::Result<PathBuf> {
    let root = require_env(IMD_GROUP)?;
    Ok(PathBuf::from(root).join("dist").join("etc").join("gorun.toml"))
}

/// Name used to look the current machine up in the configuration.
pub fn current_host_name() -> String {
    std::env::var(CLUSTER_NAME)
        .unwrap_or_else(|_| gethostname::gethostname().to_string_lossy().into_owned())
}
