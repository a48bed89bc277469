//! Configuration Types
//!
//! All configuration structures with sensible defaults.
//! Supports global (~/.config/spendsql/) and project (.spendsql/) level configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::constants::{llm, network};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Configuration version
    pub version: String,

    /// Completion endpoint settings
    pub llm: LlmConfig,

    /// Prompt resource settings
    pub resources: ResourcesConfig,

    /// Budget database settings
    pub database: DatabaseConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            llm: LlmConfig::default(),
            resources: ResourcesConfig::default(),
            database: DatabaseConfig::default(),
        }
    }
}

impl Config {
    /// Validate configuration values are within acceptable ranges.
    /// Returns `SpendError::Config` on validation failure.
    pub fn validate(&self) -> crate::types::Result<()> {
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(crate::types::SpendError::Config(format!(
                "LLM temperature must be between 0.0 and 2.0, got {}",
                self.llm.temperature
            )));
        }

        if self.llm.connect_timeout_secs == 0 || self.llm.read_timeout_secs == 0 {
            return Err(crate::types::SpendError::Config(
                "LLM timeouts must be greater than 0".to_string(),
            ));
        }

        if self.llm.num_predict == 0 {
            return Err(crate::types::SpendError::Config(
                "LLM num_predict must be greater than 0".to_string(),
            ));
        }

        if self.llm.max_attempts == 0 {
            return Err(crate::types::SpendError::Config(
                "LLM max_attempts must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

// =============================================================================
// LLM Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Endpoint base URL (the generate path is appended)
    pub base_url: String,

    /// Model for SQL generation
    pub sql_model: String,

    /// Model for insight summaries
    pub insights_model: String,

    /// Sampling temperature (0.0 = deterministic)
    pub temperature: f32,

    /// Output length cap
    pub num_predict: u32,

    /// Total attempts per pipeline invocation
    pub max_attempts: u32,

    /// Connect timeout in seconds
    pub connect_timeout_secs: u64,

    /// Read timeout in seconds
    pub read_timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: llm::DEFAULT_API_BASE.to_string(),
            sql_model: llm::DEFAULT_SQL_MODEL.to_string(),
            insights_model: llm::DEFAULT_INSIGHTS_MODEL.to_string(),
            temperature: llm::TEMPERATURE,
            num_predict: llm::NUM_PREDICT,
            max_attempts: llm::MAX_ATTEMPTS,
            connect_timeout_secs: network::CONNECT_TIMEOUT_SECS,
            read_timeout_secs: network::READ_TIMEOUT_SECS,
        }
    }
}

// =============================================================================
// Resources Configuration
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourcesConfig {
    /// Directory whose files override the embedded rules, schema and catalog
    pub dir: Option<PathBuf>,
}

// =============================================================================
// Database Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite database path
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(".spendsql/budget.db"),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
