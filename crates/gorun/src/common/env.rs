use std::path::PathBuf;

use crate::common::error::GorunError;

/// Root of the VASP installation; binaries live in `$VASP_PATH/bin`.
pub const VASP_PATH: &str = "VASP_PATH";
/// Root of the pseudopotential library used to assemble POTCAR files.
pub const VASP_PP_PATH: &str = "VASP_PP_PATH";
/// Group installation prefix; the default configuration lives below it.
pub const IMD_GROUP: &str = "IMDGroup";
/// Overrides the host name used to resolve the current server.
pub const CLUSTER_NAME: &str = "CLUSTER_NAME";
pub const USER: &str = "USER";

/// Returns the value of an environment variable that must be set.
pub fn require_env(name: &str) -> crate::Result<String> {
    std::env::var(name).map_err(|_| GorunError::MissingEnvironment(name.to_string()))
}

/// Fails eagerly when an external command cannot be found in `PATH`.
pub fn ensure_command(command: &str) -> crate::Result<PathBuf> {
    which::which(command).map_err(|_| GorunError::MissingCommand(command.to_string()))
}
