//! Insights Service
//!
//! End-to-end question answering: generate SQL, execute it, summarize.

use std::sync::Arc;

use serde::Serialize;
use tracing::{error, info, instrument};

use super::insights::InsightsPipeline;
use super::sql::SqlGenerationPipeline;
use crate::types::{GeneratedSqlContext, Result, Row};

/// Runs accepted SQL against the budget data store
pub trait QueryExecutor: Send + Sync {
    fn execute(&self, sql: &str) -> Result<Vec<Row>>;
}

/// Executed context plus its summary
#[derive(Debug, Clone, Serialize)]
pub struct InsightsAnswer {
    pub context: GeneratedSqlContext,
    pub insights: String,
}

pub struct InsightsService {
    sql: SqlGenerationPipeline,
    executor: Arc<dyn QueryExecutor>,
    insights: InsightsPipeline,
}

impl InsightsService {
    pub fn new(
        sql: SqlGenerationPipeline,
        executor: Arc<dyn QueryExecutor>,
        insights: InsightsPipeline,
    ) -> Self {
        Self {
            sql,
            executor,
            insights,
        }
    }

    pub fn sql_pipeline(&self) -> &SqlGenerationPipeline {
        &self.sql
    }

    /// Generate and execute SQL without summarizing
    pub async fn fetch_result_set(&self, budget_id: i64, prompt: &str) -> Result<GeneratedSqlContext> {
        let context = self.sql.generate(budget_id, prompt).await?;

        let rows = self.executor.execute(&context.sql_query).inspect_err(|e| {
            error!(sql = %context.sql_query, error = %e, "Query execution failed");
        })?;
        info!(rows = rows.len(), "Query executed");

        Ok(context.with_result_set(rows))
    }

    #[instrument(skip(self, prompt))]
    pub async fn fetch_insights(&self, budget_id: i64, prompt: &str) -> Result<InsightsAnswer> {
        let context = self.fetch_result_set(budget_id, prompt).await?;
        let insights = self.insights.summarize(&context).await?;
        Ok(InsightsAnswer { context, insights })
    }
}
