//! Status Command
//!
//! Report configuration, database contents and model availability.

use std::path::Path;
use std::sync::Arc;

use serde_json::json;

use crate::ai::provider::create_provider;
use crate::cli::commands::OutputFormat;
use crate::cli::ui::Output;
use crate::cli::util::load_config;
use crate::resources::PromptResources;
use crate::storage::{Database, SqliteBudgetStore, StoreStats};
use crate::types::Result;

pub async fn run(config_path: Option<&Path>, format: OutputFormat, out: &Output) -> Result<()> {
    let config = load_config(config_path)?;
    let llm = &config.llm;

    let stats = if config.database.path.exists() {
        let db = Database::open(&config.database.path)?;
        db.initialize()?;
        Some(SqliteBudgetStore::new(Arc::new(db)).stats()?)
    } else {
        None
    };

    let resources = PromptResources::global(config.resources.dir.as_deref())?;

    let sql_provider = create_provider(llm, &llm.sql_model)?;
    let insights_provider = create_provider(llm, &llm.insights_model)?;

    // health checks report unavailability as `false`, never as an error
    let sql_ready = sql_provider.health_check().await?;
    let insights_ready = insights_provider.health_check().await?;

    match format {
        OutputFormat::Json => {
            let status = json!({
                "provider": sql_provider.name(),
                "endpoint": sql_provider.endpoint(),
                "models": {
                    "sql": { "name": llm.sql_model, "available": sql_ready },
                    "insights": { "name": llm.insights_model, "available": insights_ready },
                },
                "resources": {
                    "dir": config.resources.dir,
                    "categories": resources.catalog.len(),
                    "multi_word_categories": resources.catalog.multi_word().len(),
                },
                "database": {
                    "path": config.database.path,
                    "initialized": stats.is_some(),
                    "stats": stats,
                },
            });
            out.result(&serde_json::to_string_pretty(&status)?);
        }
        OutputFormat::Text => {
            out.section("Completion endpoint");
            out.field("provider", sql_provider.name());
            out.field("url", sql_provider.endpoint());
            out.field("sql model", model_line(&llm.sql_model, sql_ready));
            out.field("insights", model_line(&llm.insights_model, insights_ready));
            out.field("attempts", llm.max_attempts);

            out.section("Resources");
            match &config.resources.dir {
                Some(dir) => out.field("dir", dir.display()),
                None => out.field("dir", "(embedded)"),
            }
            out.field(
                "categories",
                format!(
                    "{} ({} multi-word)",
                    resources.catalog.len(),
                    resources.catalog.multi_word().len()
                ),
            );

            out.section("Database");
            out.field("path", config.database.path.display());
            match stats {
                Some(StoreStats {
                    budgets,
                    active_budgets,
                    transactions,
                }) => {
                    out.field("budgets", format!("{} ({} active)", budgets, active_budgets));
                    out.field("transactions", transactions);
                }
                None => out.warning("Not initialized. Run 'spendsql init' first."),
            }
        }
    }
    Ok(())
}

fn model_line(model: &str, available: bool) -> String {
    if available {
        format!("{} (available)", model)
    } else {
        format!("{} (unavailable)", model)
    }
}
