//! Configuration management for the dispatch voice agent
//!
//! Supports loading configuration from:
//! - `config/default.{toml,yaml,json}`
//! - `config/{environment}.{toml,yaml,json}`
//! - Environment variables (`DISPATCH_VOICE__` prefix, `__` separator)

pub mod settings;

pub use settings::{
    load_settings, load_settings_from, AgentSettings, ObservabilityConfig, PersistenceConfig,
    RuntimeEnvironment, ServerConfig, Settings,
};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}
