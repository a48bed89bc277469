//! Request-scoped query records shared by both pipelines.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One result row: column name to value
pub type Row = BTreeMap<String, serde_json::Value>;

/// Constraints extracted from the user's question
///
/// Built once per request and read-only afterward. Category and month lists
/// keep first-appearance order and hold no duplicates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptConstraints {
    pub budget_id: i64,
    pub user_id: i64,
    pub prompt: String,
    /// Set only when exactly one category was named
    pub required_category: Option<String>,
    pub required_categories: Vec<String>,
    /// Set only when exactly one month was named
    pub required_month: Option<u32>,
    pub months_found: Vec<u32>,
    pub required_year: Option<i32>,
}

impl PromptConstraints {
    pub fn multi_category(&self) -> bool {
        self.required_categories.len() >= 2
    }

    pub fn multi_month(&self) -> bool {
        self.months_found.len() >= 2
    }

    pub fn has_categories(&self) -> bool {
        !self.required_categories.is_empty()
    }
}

/// Output of SQL generation, later completed with the executed result set
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeneratedSqlContext {
    pub original_prompt: String,
    pub required_category: Option<String>,
    pub required_categories: Vec<String>,
    pub required_month: Option<u32>,
    pub required_months: Vec<u32>,
    pub required_year: Option<i32>,
    pub sql_query: String,
    /// Filled by the query executor
    pub result_set: Option<Vec<Row>>,
}

impl GeneratedSqlContext {
    pub fn from_constraints(constraints: &PromptConstraints, sql_query: String) -> Self {
        Self {
            original_prompt: constraints.prompt.clone(),
            required_category: constraints.required_category.clone(),
            required_categories: constraints.required_categories.clone(),
            required_month: constraints.required_month,
            required_months: if constraints.multi_month() {
                constraints.months_found.clone()
            } else {
                Vec::new()
            },
            required_year: constraints.required_year,
            sql_query,
            result_set: None,
        }
    }

    pub fn with_result_set(mut self, rows: Vec<Row>) -> Self {
        self.result_set = Some(rows);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn constraints(categories: &[&str], months: &[u32]) -> PromptConstraints {
        PromptConstraints {
            budget_id: 3,
            user_id: 7,
            prompt: "question".to_string(),
            required_category: (categories.len() == 1).then(|| categories[0].to_string()),
            required_categories: categories.iter().map(|c| c.to_string()).collect(),
            required_month: (months.len() == 1).then(|| months[0]),
            months_found: months.to_vec(),
            required_year: Some(2024),
        }
    }

    #[test]
    fn test_multi_modes() {
        let c = constraints(&["Groceries", "Utilities"], &[5, 6]);
        assert!(c.multi_category());
        assert!(c.multi_month());

        let c = constraints(&["Groceries"], &[3]);
        assert!(!c.multi_category());
        assert!(!c.multi_month());
        assert!(c.has_categories());
    }

    #[test]
    fn test_context_from_constraints() {
        let c = constraints(&[], &[5, 6]);
        let ctx = GeneratedSqlContext::from_constraints(&c, "SELECT 1".to_string());
        assert_eq!(ctx.required_months, vec![5, 6]);
        assert_eq!(ctx.required_month, None);
        assert!(ctx.result_set.is_none());

        let ctx = ctx.with_result_set(Vec::new());
        assert_eq!(ctx.result_set, Some(Vec::new()));
    }
}
