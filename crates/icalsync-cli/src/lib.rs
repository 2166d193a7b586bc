//! CLI, configuration and commands
//!
//! This crate provides the `icalsync` command-line interface.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod filters;
pub mod secret;

pub use cli::Cli;
pub use config::AppConfig;
pub use error::{ClientError, ClientResult};
