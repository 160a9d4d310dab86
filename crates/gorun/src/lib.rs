pub mod common;
pub mod job;
pub mod output;
pub mod queue;
pub mod submit;

#[cfg(test)]
pub(crate) mod tests;

pub type Error = crate::common::error::GorunError;
pub type Result<T> = std::result::Result<T, Error>;

pub const GORUN_VERSION: &str = {
    match option_env!("GORUN_BUILD_VERSION") {
        Some(version) => version,
        None => env!("CARGO_PKG_VERSION"),
    }
};
