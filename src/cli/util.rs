//! CLI Common Utilities
//!
//! Shared configuration, database and pipeline wiring for command handlers.

use std::path::Path;
use std::sync::Arc;

use crate::ai::provider::create_provider;
use crate::config::{Config, ConfigLoader};
use crate::pipeline::{InsightsPipeline, InsightsService, SqlGenerationPipeline};
use crate::resources::PromptResources;
use crate::storage::{Database, SharedDatabase, SqliteBudgetStore, SqliteQueryExecutor};
use crate::types::{Result, SpendError};

/// Resolve configuration from an explicit file or the default chain
pub fn load_config(config_path: Option<&Path>) -> Result<Config> {
    match config_path {
        Some(path) => ConfigLoader::load_from_file(path),
        None => ConfigLoader::load(),
    }
}

/// Command execution context
///
/// Created via `CommandContext::load()` for commands that talk to the
/// database and the completion endpoint.
#[derive(Clone)]
pub struct CommandContext {
    pub config: Config,
    pub db: SharedDatabase,
    pub resources: Arc<PromptResources>,
}

impl CommandContext {
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let config = load_config(config_path)?;
        let db = open_existing_db(&config)?;
        let resources = PromptResources::global(config.resources.dir.as_deref())?;

        Ok(Self {
            config,
            db: Arc::new(db),
            resources,
        })
    }

    pub fn budget_store(&self) -> SqliteBudgetStore {
        SqliteBudgetStore::new(Arc::clone(&self.db))
    }

    pub fn sql_pipeline(&self) -> Result<SqlGenerationPipeline> {
        let llm = &self.config.llm;
        Ok(SqlGenerationPipeline::new(
            create_provider(llm, &llm.sql_model)?,
            Arc::new(self.budget_store()),
            Arc::clone(&self.resources),
            llm.max_attempts,
        ))
    }

    pub fn insights_service(&self) -> Result<InsightsService> {
        let llm = &self.config.llm;
        let insights = InsightsPipeline::new(
            create_provider(llm, &llm.insights_model)?,
            self.resources.insights_rules.clone(),
            llm.max_attempts,
        );
        Ok(InsightsService::new(
            self.sql_pipeline()?,
            Arc::new(SqliteQueryExecutor::new(Arc::clone(&self.db))),
            insights,
        ))
    }
}

/// Open the configured database, which `init` must have created
pub fn open_existing_db(config: &Config) -> Result<Database> {
    let path = &config.database.path;
    if !path.exists() {
        return Err(SpendError::Config(format!(
            "Database not found at {}. Run 'spendsql init' first.",
            path.display()
        )));
    }

    let db = Database::open(path)?;
    db.initialize()?;
    Ok(db)
}

/// Join positional words into one question
pub fn join_prompt(words: &[String]) -> String {
    words.join(" ").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_join_prompt() {
        let words = vec!["How".to_string(), "much".to_string(), "on Fuel?".to_string()];
        assert_eq!(join_prompt(&words), "How much on Fuel?");
        assert_eq!(join_prompt(&[]), "");
    }

    #[test]
    fn test_missing_database_is_config_error() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.database.path = temp_dir.path().join("absent.db");

        let err = open_existing_db(&config).unwrap_err();
        assert!(matches!(err, SpendError::Config(_)));
        assert!(err.to_string().contains("spendsql init"));
    }
}
