use thiserror::Error;

use crate::common::error::GorunError::GenericError;

#[derive(Debug, Error)]
pub enum GorunError {
    #[error(transparent)]
    IoError(#[from] std::io::Error),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Deserialization error: {0}")]
    DeserializationError(String),
    #[error("Command not available: {0}")]
    MissingCommand(String),
    #[error("{0} is not set, while it must be in IMD Group bashrc")]
    MissingEnvironment(String),
    #[error(
        "No queue is available for this job. Check your allocation and grant limits (e.g. with `sacctmgr show assoc user=$USER`)"
    )]
    NoQueueAvailable,
    #[error("Failed to execute sbatch in test mode:\n{output}\nScript:\n-----\n{script}\n-----")]
    ProbeFailed { output: String, script: String },
    #[error("Dispatch failed: {0}")]
    DispatchFailed(String),
    #[error("Error: {0}")]
    GenericError(String),
}

impl From<anyhow::Error> for GorunError {
    fn from(error: anyhow::Error) -> Self {
        Self::GenericError(format!("{error:?}"))
    }
}

impl From<toml::de::Error> for GorunError {
    fn from(error: toml::de::Error) -> Self {
        Self::DeserializationError(error.to_string())
    }
}

impl From<String> for GorunError {
    fn from(e: String) -> Self {
        GenericError(e)
    }
}
