//! Configuration module for Framelink
//!
//! JSON configuration with defaults chosen to match the usual
//! deployment: agent channel on file descriptor 3 (socket activation)
//! and 2048-byte remote reads.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Error, Result};
use crate::relay::CHUNK_LIMIT;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Log configuration
    #[serde(default)]
    pub log: LogConfig,

    /// Relay tuning
    #[serde(default)]
    pub relay: RelayConfig,

    /// Agent channel acquisition
    #[serde(default)]
    pub agent: AgentConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Read size for remote-side reads, in bytes
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// File descriptor carrying the pre-established agent channel
    #[serde(default = "default_agent_fd")]
    pub fd: i32,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_chunk_size() -> usize {
    CHUNK_LIMIT
}

fn default_agent_fd() -> i32 {
    3
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log: LogConfig::default(),
            relay: RelayConfig::default(),
            agent: AgentConfig::default(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
        }
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            fd: default_agent_fd(),
        }
    }
}

impl Config {
    /// Load configuration from a JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read config file: {}", e)))?;
        Self::from_json(&content)
    }

    /// Parse configuration from JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(json)
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.relay.chunk_size == 0 {
            return Err(Error::Config("relay.chunk_size must be non-zero".into()));
        }
        if self.agent.fd < 0 {
            return Err(Error::Config(format!(
                "agent.fd must be a valid descriptor, got {}",
                self.agent.fd
            )));
        }
        Ok(())
    }
}
