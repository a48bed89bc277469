//! Configuration Loader (Figment-based)
//!
//! Loads and merges configuration from multiple sources using Figment:
//! 1. Built-in defaults (Serialized)
//! 2. Global config (~/.config/spendsql/config.toml)
//! 3. Project config (.spendsql/config.toml)
//! 4. Environment variables (SPENDSQL_* prefix)

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::types::Config;
use crate::types::{Result, SpendError};

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with full resolution chain using Figment:
    /// defaults → global → project → env vars
    pub fn load() -> Result<Config> {
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        if let Some(global_path) = Self::global_config_path()
            && global_path.exists()
        {
            debug!("Loading global config from: {}", global_path.display());
            figment = figment.merge(Toml::file(&global_path));
        }

        let project_path = Self::project_config_path();
        if project_path.exists() {
            debug!("Loading project config from: {}", project_path.display());
            figment = figment.merge(Toml::file(&project_path));
        }

        Self::extract(figment)
    }

    /// Load from an explicit file (plus env vars), skipping global/project discovery
    pub fn load_from_file(path: &Path) -> Result<Config> {
        if !path.exists() {
            return Err(SpendError::Config(format!(
                "Config file not found: {}",
                path.display()
            )));
        }
        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(path));
        Self::extract(figment)
    }

    fn extract(figment: Figment) -> Result<Config> {
        // SPENDSQL_LLM_SQL_MODEL would split into llm.sql.model, so nested keys
        // with underscores are mapped explicitly.
        let figment = figment.merge(
            Env::prefixed("SPENDSQL_")
                .map(|key| Self::env_key_to_path(key.as_str()).into())
                .lowercase(false),
        );

        let config: Config = figment
            .extract()
            .map_err(|e| SpendError::Config(format!("Configuration error: {}", e)))?;

        config.validate()?;

        Ok(config)
    }

    /// Map `LLM_SQL_MODEL` to `llm.sql_model`: the first segment names the section.
    fn env_key_to_path(key: &str) -> String {
        let lower = key.to_lowercase();
        match lower.split_once('_') {
            Some((section, field)) if matches!(section, "llm" | "resources" | "database") => {
                format!("{}.{}", section, field)
            }
            _ => lower,
        }
    }

    // =========================================================================
    // Path Management
    // =========================================================================

    /// Get path to global config directory (~/.config/spendsql/)
    pub fn global_dir() -> Option<PathBuf> {
        env::var("XDG_CONFIG_HOME")
            .ok()
            .map(PathBuf::from)
            .or_else(|| {
                env::var("HOME")
                    .ok()
                    .map(|home| PathBuf::from(home).join(".config"))
            })
            .map(|p| p.join("spendsql"))
    }

    /// Get path to global config file
    pub fn global_config_path() -> Option<PathBuf> {
        Self::global_dir().map(|dir| dir.join("config.toml"))
    }

    /// Get path to project config file
    pub fn project_config_path() -> PathBuf {
        Self::project_dir().join("config.toml")
    }

    /// Get project data directory
    pub fn project_dir() -> PathBuf {
        PathBuf::from(".spendsql")
    }

    // =========================================================================
    // Config Commands
    // =========================================================================

    /// Show config file paths
    pub fn show_path() {
        println!("Configuration paths:");
        println!();

        if let Some(global) = Self::global_config_path() {
            let exists = if global.exists() { "✓" } else { "✗" };
            println!("  Global:  {} {}", exists, global.display());
        } else {
            println!("  Global:  (not available)");
        }

        let project = Self::project_config_path();
        let exists = if project.exists() { "✓" } else { "✗" };
        println!("  Project: {} {}", exists, project.display());
    }

    /// Render a configuration as TOML or JSON
    pub fn render(config: &Config, as_json: bool) -> Result<String> {
        if as_json {
            Ok(serde_json::to_string_pretty(config)?)
        } else {
            toml::to_string_pretty(config).map_err(|e| SpendError::Config(e.to_string()))
        }
    }

    // =========================================================================
    // Initialization
    // =========================================================================

    /// Initialize project configuration directory
    pub fn init_project(dir: &Path, force: bool) -> Result<PathBuf> {
        fs::create_dir_all(dir)?;

        let config_path = dir.join("config.toml");
        if !config_path.exists() || force {
            fs::write(&config_path, Self::default_project_config())?;
            info!("Created project config: {}", config_path.display());
        } else {
            info!("Project config exists: {}", config_path.display());
        }

        Ok(config_path)
    }

    fn default_project_config() -> String {
        r#"# spendsql Project Configuration
# Settings here override ~/.config/spendsql/config.toml.

version = "1.0"

[llm]
base_url = "http://localhost:11434"
sql_model = "sqlcoder:latest"
insights_model = "deepseek-r1:7b"
max_attempts = 3
connect_timeout_secs = 5
read_timeout_secs = 60

[database]
path = ".spendsql/budget.db"

# [resources]
# dir = ".spendsql/resources"
"#
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_env_key_to_path() {
        assert_eq!(ConfigLoader::env_key_to_path("LLM_SQL_MODEL"), "llm.sql_model");
        assert_eq!(
            ConfigLoader::env_key_to_path("DATABASE_PATH"),
            "database.path"
        );
        assert_eq!(ConfigLoader::env_key_to_path("VERSION"), "version");
    }

    #[test]
    fn test_load_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(
            &path,
            "[llm]\nsql_model = \"custom-coder\"\nmax_attempts = 5\n",
        )
        .unwrap();

        let config = ConfigLoader::load_from_file(&path).unwrap();
        assert_eq!(config.llm.sql_model, "custom-coder");
        assert_eq!(config.llm.max_attempts, 5);
        assert_eq!(config.llm.insights_model, "deepseek-r1:7b");
    }

    #[test]
    fn test_load_from_file_rejects_invalid_values() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, "[llm]\ntemperature = 9.0\n").unwrap();

        assert!(ConfigLoader::load_from_file(&path).is_err());
    }

    #[test]
    fn test_load_from_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("absent.toml");
        assert!(ConfigLoader::load_from_file(&path).is_err());
    }

    #[test]
    fn test_init_project_writes_loadable_config() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join(".spendsql");

        let path = ConfigLoader::init_project(&dir, false).unwrap();
        assert!(path.exists());

        let config = ConfigLoader::load_from_file(&path).unwrap();
        assert_eq!(config.llm.read_timeout_secs, 60);
    }

    #[test]
    fn test_render_toml_and_json() {
        let config = Config::default();
        let toml = ConfigLoader::render(&config, false).unwrap();
        assert!(toml.contains("sql_model"));
        let json = ConfigLoader::render(&config, true).unwrap();
        assert!(json.contains("\"insights_model\""));
    }
}
