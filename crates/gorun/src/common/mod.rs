pub mod cli;
pub mod config;
pub mod env;
pub mod error;
pub mod manager;
pub mod parser;
pub mod setup;
pub mod utils;
