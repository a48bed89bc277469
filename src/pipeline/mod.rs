//! Generation Pipelines
//!
//! ```text
//! question ─▶ ConstraintExtractor ─▶ SQL prompt ─▶ AttemptLoop(SqlPolicy) ─▶ SQL
//!                                                                         │
//!                                                     QueryExecutor ◀─────┘
//!                                                          │
//!                          insights ◀─ AttemptLoop(InsightsPolicy) ◀─ rows
//! ```
//!
//! Each request owns its constraints and attempt state. Only the prompt
//! resources are shared, and they are immutable after first load.

pub mod attempt;
pub mod extractor;
pub mod insights;
pub mod service;
pub mod sql;

#[cfg(test)]
pub(crate) mod test_support;

pub use attempt::{AttemptLoop, AttemptPolicy, AttemptState};
pub use extractor::ConstraintExtractor;
pub use insights::{InsightsPipeline, clean_insights_output, next_insights_prompt};
pub use service::{InsightsAnswer, InsightsService, QueryExecutor};
pub use sql::{BudgetLookup, PreparedRequest, SqlGenerationPipeline, next_sql_prompt};
