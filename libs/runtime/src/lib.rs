//! Process-level runtime support shared by the server binary:
//! layered configuration, logging initialisation and shutdown signals.

pub mod config;
pub mod logging;
pub mod paths;
pub mod shutdown;

pub use config::{AppConfig, CliOverrides, DatabaseConfig, LoggingConfig, ServerConfig};
