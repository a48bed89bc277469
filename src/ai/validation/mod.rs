//! Model Output Validation
//!
//! Turns raw completion text into SQL the pipeline may return:
//!
//! 1. `extract`: pull the SELECT statement out of the raw text
//! 2. `canonicalize`: fix mechanically correctable alias deviations
//! 3. `gates`: run the safety, shape, user-scope, category, month and year
//!    gates and record the result in a `ValidationOutcome`
//!
//! Nothing here loosens a gate. Canonicalization only changes syntax shape
//! and never adds a filter.

mod canonicalize;
mod extract;
mod gates;

pub use canonicalize::canonicalize;
pub use extract::{ExtractFailure, extract_select, looks_like_select_body, strip_code_fences};
pub use gates::{
    Gate, SqlValidator, ValidationOutcome, banned_tokens, contains_categories, contains_months,
    contains_single_month, contains_user_scope, contains_year, uses_fact_alias,
};

use crate::types::PromptConstraints;

/// Parse, canonicalize and validate one raw completion
pub fn check_completion(raw_output: &str, constraints: &PromptConstraints) -> ValidationOutcome {
    let validator = SqlValidator::new(constraints);
    match extract_select(raw_output) {
        Ok(sql) => validator.validate(&canonicalize(&sql)),
        Err(failure) => validator.parse_failed(raw_output, failure.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn constraints() -> PromptConstraints {
        PromptConstraints {
            budget_id: 4,
            user_id: 7,
            prompt: "Where did I overspend?".to_string(),
            required_category: None,
            required_categories: Vec::new(),
            required_month: None,
            months_found: Vec::new(),
            required_year: None,
        }
    }

    #[test]
    fn test_near_miss_is_canonicalized_then_accepted() {
        let raw = "```sql\nSELECT category, SUM(amount_spend) AS total_spent FROM transaction JOIN budget b ON b.budget_id = transaction.budget_id WHERE b.user_id = 7 GROUP BY category ORDER BY total_spent DESC LIMIT 5;\n```";
        let outcome = check_completion(raw, &constraints());
        assert!(outcome.is_accepted(), "{:?}", outcome);
        assert_eq!(
            outcome.sql.unwrap(),
            "SELECT t.category, SUM(t.amount_spend) AS total_spent FROM `transaction` t JOIN budget b ON b.budget_id = t.budget_id WHERE b.user_id = 7 GROUP BY t.category ORDER BY total_spent DESC LIMIT 5"
        );
    }

    #[test]
    fn test_missing_join_rejected() {
        let raw = "SELECT SUM(amount_spend) FROM transaction WHERE user_id = 7";
        let outcome = check_completion(raw, &constraints());
        assert!(outcome.missing_user_filter);
        assert!(!outcome.missing_table_alias);
        assert!(!outcome.is_accepted());
    }

    #[test]
    fn test_destructive_output_is_safety_failure() {
        let outcome = check_completion("DELETE FROM transaction WHERE budget_id = 4", &constraints());
        assert!(outcome.sql.is_none());
        assert!(outcome.banned_token_found);
        assert!(outcome.parse_failure.is_some());
    }
}
