//! SQL Generation Pipeline
//!
//! prompt + budget id -> constraints -> instruction prompt -> attempt loop
//! -> accepted, canonicalized SQL wrapped in a `GeneratedSqlContext`.

use std::sync::Arc;

use tracing::{info, instrument};

use super::attempt::{AttemptLoop, AttemptPolicy};
use super::extractor::ConstraintExtractor;
use crate::ai::prompt::{render_sql_prompt, sql_correction};
use crate::ai::provider::SharedProvider;
use crate::ai::validation::{ValidationOutcome, check_completion};
use crate::resources::PromptResources;
use crate::types::{BudgetRecord, GeneratedSqlContext, PromptConstraints, Result, SpendError};

pub const PIPELINE_NAME: &str = "SQL generation";

/// Budget lookup collaborator
pub trait BudgetLookup: Send + Sync {
    fn find_budget(&self, budget_id: i64) -> Result<Option<BudgetRecord>>;
}

/// Constraints and first-attempt prompt for one request
#[derive(Debug, Clone)]
pub struct PreparedRequest {
    pub constraints: PromptConstraints,
    pub instruction: String,
}

/// Retry prompt: the original instruction followed by a fresh correction hint
pub fn next_sql_prompt(
    original: &str,
    constraints: &PromptConstraints,
    outcome: &ValidationOutcome,
    raw_output: &str,
) -> String {
    format!("{}\n{}", original, sql_correction(constraints, outcome, raw_output))
}

struct SqlPolicy<'a> {
    constraints: &'a PromptConstraints,
}

impl AttemptPolicy for SqlPolicy<'_> {
    type Output = String;
    type Failure = ValidationOutcome;

    fn pipeline(&self) -> &'static str {
        PIPELINE_NAME
    }

    fn evaluate(&self, raw_output: &str) -> std::result::Result<String, ValidationOutcome> {
        let outcome = check_completion(raw_output, self.constraints);
        match outcome.sql.clone() {
            Some(sql) if outcome.is_accepted() => Ok(sql),
            _ => Err(outcome),
        }
    }

    fn describe(&self, failure: &ValidationOutcome) -> String {
        failure
            .failure_reason()
            .unwrap_or_else(|| "validation failed".to_string())
    }

    fn next_prompt(&self, original: &str, failure: &ValidationOutcome, raw_output: &str) -> String {
        next_sql_prompt(original, self.constraints, failure, raw_output)
    }
}

/// Natural-language question to validated SQL
pub struct SqlGenerationPipeline {
    provider: SharedProvider,
    budgets: Arc<dyn BudgetLookup>,
    resources: Arc<PromptResources>,
    max_attempts: u32,
}

impl SqlGenerationPipeline {
    pub fn new(
        provider: SharedProvider,
        budgets: Arc<dyn BudgetLookup>,
        resources: Arc<PromptResources>,
        max_attempts: u32,
    ) -> Self {
        Self {
            provider,
            budgets,
            resources,
            max_attempts,
        }
    }

    /// Resolve the budget and build the first-attempt prompt. No model call.
    pub fn prepare(&self, budget_id: i64, prompt: &str) -> Result<PreparedRequest> {
        if prompt.trim().is_empty() {
            return Err(SpendError::InvalidInput("prompt must not be blank".to_string()));
        }

        let budget = self
            .budgets
            .find_budget(budget_id)?
            .ok_or(SpendError::BudgetNotFound { budget_id })?;

        let constraints = ConstraintExtractor::new(&self.resources.catalog).extract(prompt, &budget);
        info!(
            budget_id,
            user_id = constraints.user_id,
            categories = ?constraints.required_categories,
            months = ?constraints.months_found,
            year = ?constraints.required_year,
            "Extracted prompt constraints"
        );

        let instruction = render_sql_prompt(
            &constraints,
            &self.resources.sql_rules,
            &self.resources.sql_schema,
        );

        Ok(PreparedRequest {
            constraints,
            instruction,
        })
    }

    #[instrument(skip(self, prompt), fields(model = self.provider.model()))]
    pub async fn generate(&self, budget_id: i64, prompt: &str) -> Result<GeneratedSqlContext> {
        let prepared = self.prepare(budget_id, prompt)?;
        self.run_prepared(&prepared).await
    }

    /// Run the attempt loop for an already prepared request
    pub async fn run_prepared(&self, prepared: &PreparedRequest) -> Result<GeneratedSqlContext> {
        let policy = SqlPolicy {
            constraints: &prepared.constraints,
        };
        let sql = AttemptLoop::new(self.provider.as_ref(), self.max_attempts)
            .run(&prepared.instruction, &policy)
            .await?;

        info!(sql = %sql, "Accepted SQL");
        Ok(GeneratedSqlContext::from_constraints(&prepared.constraints, sql))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use chrono::NaiveDate;

    use super::*;
    use crate::pipeline::test_support::{MemoryBudgets, ScriptedProvider};
    use crate::resources::CategoryCatalog;

    fn budget(budget_id: i64, start: &str, end: &str) -> BudgetRecord {
        BudgetRecord {
            budget_id,
            user_id: 7,
            start_date: NaiveDate::parse_from_str(start, "%Y-%m-%d").ok(),
            end_date: NaiveDate::parse_from_str(end, "%Y-%m-%d").ok(),
            budget_allocated: Some(2000),
            budget_remaining: Some(500),
            is_active: true,
        }
    }

    fn resources() -> Arc<PromptResources> {
        let mut resources = PromptResources::embedded();
        resources.catalog = CategoryCatalog::from_text("Groceries\nUtilities\nDining Out\nFuel\n");
        Arc::new(resources)
    }

    fn pipeline(provider: Arc<ScriptedProvider>, budgets: Arc<MemoryBudgets>) -> SqlGenerationPipeline {
        SqlGenerationPipeline::new(provider, budgets, resources(), 3)
    }

    fn budgets() -> Arc<MemoryBudgets> {
        Arc::new(MemoryBudgets::with([
            budget(1, "2024-01-01", "2024-12-31"),
            budget(2, "2025-05-01", "2025-06-30"),
        ]))
    }

    #[tokio::test]
    async fn test_scenario_a_single_category_month_year() {
        let provider = Arc::new(ScriptedProvider::new([
            "```sql\nSELECT SUM(amount_spend) AS total_spent FROM transaction JOIN budget b ON b.budget_id = transaction.budget_id WHERE b.user_id = 7 AND category = 'Groceries' AND MONTH(time_stamp) = 3 AND YEAR(time_stamp) = 2024;\n```",
        ]));
        let ctx = pipeline(provider.clone(), budgets())
            .generate(1, "How much did I spend on Groceries in March 2024?")
            .await
            .unwrap();

        assert_eq!(provider.call_count(), 1);
        assert_eq!(ctx.required_category.as_deref(), Some("Groceries"));
        assert_eq!(ctx.required_month, Some(3));
        assert_eq!(ctx.required_year, Some(2024));
        assert!(ctx.sql_query.starts_with("SELECT SUM(t.amount_spend)"));
        assert!(ctx.sql_query.contains("FROM `transaction` t JOIN budget b"));
        assert!(ctx.sql_query.contains("t.category = 'Groceries'"));
        assert!(!ctx.sql_query.ends_with(';'));
    }

    #[tokio::test]
    async fn test_scenario_b_multi_month_with_inferred_year() {
        let provider = Arc::new(ScriptedProvider::new([
            // year filter missing: rejected
            "SELECT MONTH(t.time_stamp) AS month, SUM(t.amount_spend) AS total_spent FROM `transaction` t JOIN budget b ON b.budget_id = t.budget_id WHERE b.user_id = 7 AND MONTH(t.time_stamp) IN (5,6) GROUP BY MONTH(t.time_stamp) ORDER BY month",
            "SELECT MONTH(t.time_stamp) AS month, SUM(t.amount_spend) AS total_spent FROM `transaction` t JOIN budget b ON b.budget_id = t.budget_id WHERE b.user_id = 7 AND YEAR(t.time_stamp) = 2025 AND MONTH(t.time_stamp) IN (5,6) GROUP BY MONTH(t.time_stamp) ORDER BY month",
        ]));
        let ctx = pipeline(provider.clone(), budgets())
            .generate(2, "Compare my spending in May and June")
            .await
            .unwrap();

        assert_eq!(provider.call_count(), 2);
        assert_eq!(ctx.required_months, vec![5, 6]);
        assert_eq!(ctx.required_year, Some(2025));
        assert!(ctx.sql_query.contains("YEAR(t.time_stamp) = 2025"));

        let prompts = provider.prompts();
        assert!(prompts[0].contains("MONTH(t.time_stamp) IN (5,6)"));
        assert!(prompts[1].starts_with(&prompts[0]));
        assert!(prompts[1].contains("failed gates: year"));
    }

    #[tokio::test]
    async fn test_scenario_c_top_category_template() {
        let provider = Arc::new(ScriptedProvider::new([
            "SELECT t.category, SUM(t.amount_spend) AS total_spent FROM `transaction` t JOIN budget b ON b.budget_id = t.budget_id WHERE b.user_id = 7 GROUP BY t.category ORDER BY total_spent DESC LIMIT 5",
        ]));
        let ctx = pipeline(provider.clone(), budgets())
            .generate(1, "Where did I overspend?")
            .await
            .unwrap();

        assert!(ctx.required_category.is_none());
        assert!(ctx.required_categories.is_empty());
        assert!(provider.prompts()[0].contains("GROUP BY t.category ORDER BY total_spent DESC LIMIT 5"));
        assert!(ctx.sql_query.contains("GROUP BY t.category"));
    }

    #[tokio::test]
    async fn test_scenario_d_destructive_output_exhausts_attempts() {
        let delete = "DELETE FROM transaction WHERE budget_id = 1";
        let provider = Arc::new(ScriptedProvider::new([delete, delete, delete]));
        let err = pipeline(provider.clone(), budgets())
            .generate(1, "How much did I spend on Fuel?")
            .await
            .unwrap_err();

        assert_eq!(provider.call_count(), 3);
        let prompts = provider.prompts();
        assert!(prompts[1].contains("forbidden or PostgreSQL-only syntax: delete"));
        assert!(prompts[1].contains(delete));
        // the hint is rebuilt each time, never stacked
        assert_eq!(prompts[2].matches("### Correction").count(), 1);

        match err {
            SpendError::RetriesExhausted {
                attempts,
                last_output,
                ..
            } => {
                assert_eq!(attempts, 3);
                assert_eq!(last_output, delete);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_scenario_e_unknown_budget_fails_before_model_call() {
        let provider = Arc::new(ScriptedProvider::new(["SELECT 1"]));
        let budgets = budgets();
        let err = pipeline(provider.clone(), budgets.clone())
            .generate(404, "How much on Fuel?")
            .await
            .unwrap_err();

        assert!(matches!(err, SpendError::BudgetNotFound { budget_id: 404 }));
        assert_eq!(budgets.lookups.load(Ordering::SeqCst), 1);
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn test_blank_prompt_rejected() {
        let provider = Arc::new(ScriptedProvider::new(["SELECT 1"]));
        let err = pipeline(provider.clone(), budgets()).generate(1, "   ").await.unwrap_err();
        assert!(matches!(err, SpendError::InvalidInput(_)));
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn test_transport_error_propagates() {
        let provider = Arc::new(ScriptedProvider::failing("http://localhost:11434/api/generate"));
        let err = pipeline(provider.clone(), budgets())
            .generate(1, "How much on Fuel?")
            .await
            .unwrap_err();
        assert!(matches!(err, SpendError::Transport { .. }));
        assert_eq!(provider.call_count(), 1);
    }

    #[test]
    fn test_next_sql_prompt_is_pure() {
        let pipeline = pipeline(Arc::new(ScriptedProvider::new(Vec::<String>::new())), budgets());
        let prepared = pipeline.prepare(1, "How much on Fuel?").unwrap();
        let outcome = check_completion("nothing useful", &prepared.constraints);

        let a = next_sql_prompt(&prepared.instruction, &prepared.constraints, &outcome, "nothing useful");
        let b = next_sql_prompt(&prepared.instruction, &prepared.constraints, &outcome, "nothing useful");
        assert_eq!(a, b);
        assert!(a.starts_with(&prepared.instruction));
    }
}
