//! Init Command
//!
//! Create the project config and budget database, optionally with demo data.

use std::path::Path;
use std::sync::Arc;

use crate::cli::ui::Output;
use crate::cli::util::load_config;
use crate::config::ConfigLoader;
use crate::storage::sample::{SAMPLE_BUDGET_ID, SAMPLE_USER_ID, sample_budget, sample_transactions};
use crate::storage::{Database, SqliteBudgetStore};
use crate::types::Result;

pub fn run(config_path: Option<&Path>, force: bool, sample: bool, out: &Output) -> Result<()> {
    let project_dir = ConfigLoader::project_dir();
    let written = if config_path.is_none() {
        Some(ConfigLoader::init_project(&project_dir, force)?)
    } else {
        None
    };

    let config = load_config(config_path)?;
    let db = Arc::new(Database::open(&config.database.path)?);
    db.initialize()?;

    if let Some(path) = written {
        out.success(&format!("Project config: {}", path.display()));
    }
    out.success(&format!("Budget database: {}", config.database.path.display()));

    if sample {
        let store = SqliteBudgetStore::new(db);
        let inserted = store.import(&sample_budget(), &sample_transactions())?;
        out.success(&format!(
            "Loaded sample budget {} for user {} ({} transactions)",
            SAMPLE_BUDGET_ID, SAMPLE_USER_ID, inserted
        ));
    }

    out.section("Next steps");
    out.info("Start the model server: ollama serve");
    out.info(&format!(
        "Ask a question: spendsql ask --budget-id {} \"How much did I spend on Groceries in March?\"",
        SAMPLE_BUDGET_ID
    ));
    Ok(())
}
