use std::collections::BTreeMap;
use std::time::Duration;

use crate::common::error::GorunError;
use crate::common::manager::slurm::parse_slurm_duration;

pub const NODES_KEY: &str = "nodes";
pub const TIME_KEY: &str = "time";
pub const PARTITION_KEY: &str = "partition";
pub const JOB_NAME_KEY: &str = "job-name";

/// `sbatch` directives for one candidate queue.
///
/// Keys are case-sensitive and unique; they are rendered in sorted order so that
/// the generated script does not depend on how the request was assembled.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceRequest {
    directives: BTreeMap<String, String>,
}

impl ResourceRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.directives.insert(key.into(), value.into());
        self
    }

    /// Overlays `layer` on top of the current directives; keys of `layer` win.
    pub fn overlay<'a, I>(&mut self, layer: I) -> &mut Self
    where
        I: IntoIterator<Item = (&'a String, &'a String)>,
    {
        for (key, value) in layer {
            self.directives.insert(key.clone(), value.clone());
        }
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.directives.get(key).map(|value| value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.directives
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    pub fn partition(&self) -> Option<&str> {
        self.get(PARTITION_KEY)
    }

    /// Wall-clock limit of the request; required before the request is probed.
    pub fn time_limit(&self) -> crate::Result<Duration> {
        let value = self.get(TIME_KEY).ok_or_else(|| {
            GorunError::ConfigError(format!(
                "Queue {} has no `{TIME_KEY}` directive",
                self.partition().unwrap_or("<unnamed>")
            ))
        })?;
        parse_slurm_duration(value).map_err(|error| {
            GorunError::ConfigError(format!("Invalid time limit `{value}`: {error}"))
        })
    }

    /// Checks the directives that every probed request needs.
    pub fn validate(&self) -> crate::Result<()> {
        if self.partition().is_none() {
            return Err(GorunError::ConfigError(format!(
                "Resource request has no `{PARTITION_KEY}` directive"
            )));
        }
        self.time_limit().map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::ResourceRequest;
    use crate::common::error::GorunError;
    use std::collections::BTreeMap;
    use std::time::Duration;

    #[test]
    fn test_overlay_precedence() {
        let lower: BTreeMap<String, String> = [("time", "01:00:00"), ("nodes", "1")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let upper: BTreeMap<String, String> = [("time", "02:00:00")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let mut request = ResourceRequest::new();
        request.overlay(&lower).overlay(&upper);
        assert_eq!(request.get("time"), Some("02:00:00"));
        assert_eq!(request.get("nodes"), Some("1"));
    }

    #[test]
    fn test_keys_are_case_sensitive() {
        let mut request = ResourceRequest::new();
        request.set("Time", "1").set("time", "2");
        assert_eq!(request.iter().count(), 2);
    }

    #[test]
    fn test_validate() {
        let mut request = ResourceRequest::new();
        assert!(matches!(request.validate(), Err(GorunError::ConfigError(_))));
        request.set("partition", "qcpu");
        assert!(matches!(request.validate(), Err(GorunError::ConfigError(_))));
        request.set("time", "soon");
        assert!(matches!(request.validate(), Err(GorunError::ConfigError(_))));
        request.set("time", "1-00:00:00");
        assert!(request.validate().is_ok());
        assert_eq!(request.time_limit().unwrap(), Duration::from_secs(24 * 3600));
    }
}
