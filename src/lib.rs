//! spendsql - Constrained Natural-Language-to-SQL for Budget Data
//!
//! Turns a spending question into a single safe, user-scoped SELECT and,
//! optionally, a short prose summary of its result.
//!
//! ## Core Features
//!
//! - **Constraint Extraction**: categories, months and year read from the question
//! - **Bounded Retries**: every model output is canonicalized and gated; rejected
//!   attempts get a fresh correction hint built from the original prompt
//! - **Safety Gates**: denylist, table shape, user scope, category, month, year
//! - **Insights**: executed rows summarized in a few sentences
//!
//! ## Quick Start
//!
//! ```ignore
//! use spendsql::{Database, PromptResources, SqlGenerationPipeline, SqliteBudgetStore};
//! use spendsql::ai::provider::create_provider;
//!
//! let db = Arc::new(Database::open(".spendsql/budget.db")?);
//! let pipeline = SqlGenerationPipeline::new(
//!     create_provider(&config.llm, &config.llm.sql_model)?,
//!     Arc::new(SqliteBudgetStore::new(db)),
//!     PromptResources::global(None)?,
//!     config.llm.max_attempts,
//! );
//! let context = pipeline.generate(1, "How much did I spend on Groceries in March?").await?;
//! ```
//!
//! ## Modules
//!
//! - [`ai`]: completion provider, prompt builders, SQL validation
//! - [`pipeline`]: constraint extraction, attempt loop, SQL and insights pipelines
//! - [`resources`]: rule text, schema text and category catalog
//! - [`storage`]: SQLite budget store and query executor
//! - [`config`]: layered configuration

pub mod ai;
pub mod cli;
pub mod config;
pub mod constants;
pub mod pipeline;
pub mod resources;
pub mod storage;
pub mod types;

// =============================================================================
// Core Re-exports
// =============================================================================

pub use config::{Config, ConfigLoader};

pub use types::error::{ErrorCategory, Result, ResultExt, SpendError};
pub use types::{BudgetRecord, GeneratedSqlContext, PromptConstraints, Row};

pub use resources::{CategoryCatalog, PromptResources};

pub use storage::{Database, SharedDatabase, SqliteBudgetStore, SqliteQueryExecutor};

// =============================================================================
// Pipeline Re-exports
// =============================================================================

pub use pipeline::{
    BudgetLookup, ConstraintExtractor, InsightsAnswer, InsightsPipeline, InsightsService,
    QueryExecutor, SqlGenerationPipeline,
};
