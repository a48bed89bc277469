//! SQL generation prompt and its correction hint.

use super::{PromptBuilder, PromptRule};
use crate::ai::validation::ValidationOutcome;
use crate::constants::sql::{FROM_JOIN_TEMPLATE, TOP_CATEGORY_PHRASES};
use crate::types::PromptConstraints;

/// Render the instruction prompt for the SQL model.
///
/// Constraint order is fixed: user scope, join shape, categories, month,
/// year, multi-month template, top-category template.
pub fn render_sql_prompt(constraints: &PromptConstraints, rules: &str, schema: &str) -> String {
    PromptBuilder::new()
        .heading("Instruction")
        .text(rules)
        .heading("Input")
        .labeled("Schema", schema)
        .rules("Constraints", constraint_rules(constraints))
        .labeled("Question", &constraints.prompt)
        .heading("Response")
        .build()
}

fn constraint_rules(c: &PromptConstraints) -> Vec<PromptRule> {
    let user_id = c.user_id;
    let mut rules = vec![
        PromptRule::new(format!("user_id must be {}", user_id)),
        PromptRule::new("You MUST use this FROM/JOIN shape:")
            .detail(FROM_JOIN_TEMPLATE)
            .detail(format!("WHERE b.user_id = {}", user_id))
            .detail("Use t.<column> for all transaction columns; use b.<column> for budget columns.")
            .detail(
                "NEVER use transaction.<column> or bare user_id; NEVER use t.user_id (it does not exist).",
            )
            .detail("Do not alter this join shape."),
    ];

    if c.multi_category() {
        let csv = category_csv(&c.required_categories);
        rules.push(PromptRule::new(format!(
            "categories must be IN ({csv}) (use t.category IN ({csv}))"
        )));
    } else if let Some(category) = &c.required_category {
        let mut rule = PromptRule::new(format!("category must be '{}'", escape_literal(category)));
        if is_compound_category(category) {
            rule = rule.detail(
                "IMPORTANT: Do NOT split this category. Use the exact full string inside single quotes.",
            );
        }
        rules.push(rule);
    }

    if let Some(month) = c.required_month {
        rules.push(PromptRule::new(format!(
            "month must be {month} (use MONTH(time_stamp) = {month})"
        )));
    }

    if let Some(year) = c.required_year {
        rules.push(PromptRule::new(format!(
            "year must be {year} (use YEAR(time_stamp) = {year})"
        )));
    }

    if c.multi_month() {
        let months = month_csv(&c.months_found);
        let mut rule = PromptRule::new(format!("Multi-month comparison requested. Months are: {months}"))
            .detail("Return one row per month with: MONTH(t.time_stamp) AS month, SUM(t.amount_spend) AS total_spent")
            .detail("Use GROUP BY MONTH(t.time_stamp) and ORDER BY month.")
            .detail(format!("Filter months using MONTH(t.time_stamp) IN ({months})."));
        if let Some(year) = c.required_year {
            rule = rule.detail(format!("Also filter by year using YEAR(t.time_stamp) = {year}."));
        }
        rule = rule.detail(format!(
            "TEMPLATE: {FROM_JOIN_TEMPLATE} WHERE b.user_id = {user_id}{} AND MONTH(t.time_stamp) IN ({months})",
            year_clause(c.required_year),
        ));
        rules.push(rule);
    }

    if c.required_category.is_none() && is_top_category_question(&c.prompt) {
        let month_clause = match c.months_found.as_slice() {
            [] => String::new(),
            [month] => format!(" AND MONTH(t.time_stamp) = {month}"),
            months => format!(" AND MONTH(t.time_stamp) IN ({})", month_csv(months)),
        };
        rules.push(
            PromptRule::new("The query MUST return category and an aggregated spend metric per category.")
                .detail("Use this template shape (adjust SELECT as needed):")
                .detail("SELECT t.category, SUM(t.amount_spend) AS total_spent")
                .detail("FROM `transaction` t")
                .detail("JOIN budget b ON b.budget_id = t.budget_id")
                .detail(format!(
                    "WHERE b.user_id = {user_id}{}{month_clause}",
                    year_clause(c.required_year)
                ))
                .detail("GROUP BY t.category ORDER BY total_spent DESC LIMIT 5"),
        );
    }

    rules
}

/// Render the correction hint appended to the original prompt after a
/// rejected attempt. Bullets follow gate order.
pub fn sql_correction(c: &PromptConstraints, outcome: &ValidationOutcome, raw_output: &str) -> String {
    let mut header = String::from("Your previous output was invalid.\n");
    if let Some(reason) = outcome.failure_reason() {
        header.push_str(&format!("Reason: {}\n", reason));
    }
    header.push_str("Rewrite the query in MySQL 8.x syntax ONLY and output ONLY the corrected SQL.\n");
    header.push_str("The corrected SQL MUST start with SELECT.");

    let previous = if raw_output.trim().is_empty() {
        "<empty>"
    } else {
        raw_output.trim()
    };

    let mut builder = PromptBuilder::new().heading("Correction").text(&header);
    let problems = problem_rules(c, outcome);
    if !problems.is_empty() {
        builder = builder.rules("Problems", problems);
    }
    builder
        .labeled("Previous output", previous)
        .text("Corrected SQL:")
        .build()
}

fn problem_rules(c: &PromptConstraints, outcome: &ValidationOutcome) -> Vec<PromptRule> {
    let mut rules = Vec::new();

    if outcome.banned_token_found {
        let found: Vec<&str> = outcome.banned_tokens.iter().map(|t| t.trim()).collect();
        rules.push(
            PromptRule::new(format!(
                "It used forbidden or PostgreSQL-only syntax: {}",
                found.join(", ")
            ))
            .detail("Only a single read-only SELECT statement is allowed.")
            .detail("Use MySQL date math like: DATE_SUB(CURDATE(), INTERVAL 3 MONTH) (never interval '3 month')."),
        );
    }

    if outcome.missing_table_alias {
        rules.push(
            PromptRule::new(
                "You must reference the `transaction` table as `transaction` t and use t.<col> everywhere. Do not write bare transaction.<col>.",
            )
            .detail(format!(
                "Use this template: {} WHERE b.user_id = {}",
                FROM_JOIN_TEMPLATE, c.user_id
            )),
        );
    }

    if outcome.missing_user_filter {
        let mut rule = PromptRule::new(format!(
            "It did NOT include the required filter: user_id = {} (transaction has NO user_id column; you MUST JOIN budget and filter budget.user_id)",
            c.user_id
        ))
        .detail(format!("Use: {} WHERE b.user_id = {}", FROM_JOIN_TEMPLATE, c.user_id));
        if c.multi_month() {
            rule = rule.detail(format!(
                "Also include: MONTH(t.time_stamp) IN ({}){}",
                month_csv(&c.months_found),
                year_clause(c.required_year)
            ));
        }
        rules.push(rule);
    }

    if outcome.missing_category_filter {
        if c.multi_category() {
            rules.push(PromptRule::new(format!(
                "It did NOT include the required category filter: t.category IN ({})",
                category_csv(&c.required_categories)
            )));
        } else if let Some(category) = &c.required_category {
            let mut rule = PromptRule::new(format!(
                "It did NOT include the required filter: t.category = '{}'",
                escape_literal(category)
            ));
            if is_compound_category(category) {
                rule = rule.detail(
                    "IMPORTANT: Use the exact full category string in single quotes; do NOT split it into multiple values.",
                );
            }
            rules.push(rule);
        }
    }

    if outcome.missing_month_filter {
        if c.multi_month() {
            rules.push(
                PromptRule::new(format!(
                    "It did NOT include the required month filter: MONTH(t.time_stamp) IN ({})",
                    month_csv(&c.months_found)
                ))
                .detail("Do NOT use date ranges for months; use MONTH(t.time_stamp) IN (...)."),
            );
        } else if let Some(month) = c.required_month {
            rules.push(
                PromptRule::new(format!(
                    "It did NOT include the required month filter: MONTH(t.time_stamp) = {month}"
                ))
                .detail(format!(
                    "Do NOT use a date range for a single month; use MONTH(t.time_stamp) = {month}."
                )),
            );
        }
    }

    if outcome.missing_year_filter
        && let Some(year) = c.required_year
    {
        rules.push(PromptRule::new(format!(
            "It did NOT include the required year filter: YEAR(t.time_stamp) = {year}"
        )));
    }

    rules
}

/// True when the question asks which category dominates spending
pub fn is_top_category_question(prompt: &str) -> bool {
    let p = prompt.to_lowercase();
    TOP_CATEGORY_PHRASES.iter().any(|phrase| p.contains(phrase))
        || (p.contains("which category") && (p.contains("most") || p.contains("highest")))
}

/// `'A', 'B'` with SQL quote escaping
pub fn category_csv(categories: &[String]) -> String {
    categories
        .iter()
        .map(|c| format!("'{}'", escape_literal(c)))
        .collect::<Vec<_>>()
        .join(", ")
}

fn month_csv(months: &[u32]) -> String {
    let mut sorted = months.to_vec();
    sorted.sort_unstable();
    sorted.dedup();
    sorted
        .iter()
        .map(u32::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

fn year_clause(year: Option<i32>) -> String {
    year.map(|y| format!(" AND YEAR(t.time_stamp) = {y}"))
        .unwrap_or_default()
}

fn escape_literal(value: &str) -> String {
    value.replace('\'', "''")
}

fn is_compound_category(category: &str) -> bool {
    category.contains(' ') || category.contains('&') || category.contains('/')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn constraints(prompt: &str) -> PromptConstraints {
        PromptConstraints {
            budget_id: 1,
            user_id: 7,
            prompt: prompt.to_string(),
            required_category: None,
            required_categories: Vec::new(),
            required_month: None,
            months_found: Vec::new(),
            required_year: None,
        }
    }

    #[test]
    fn test_prompt_layout_and_order() {
        let mut c = constraints("How much did I spend on Groceries in March 2024?");
        c.required_category = Some("Groceries".into());
        c.required_categories = vec!["Groceries".into()];
        c.required_month = Some(3);
        c.months_found = vec![3];
        c.required_year = Some(2024);

        let prompt = render_sql_prompt(&c, "RULES", "SCHEMA");

        assert!(prompt.starts_with("### Instruction\nRULES\n\n### Input\nSchema:\nSCHEMA\n\nConstraints:\n"));
        assert!(prompt.ends_with(
            "Question:\nHow much did I spend on Groceries in March 2024?\n\n### Response\n"
        ));

        let user = prompt.find("- user_id must be 7").unwrap();
        let shape = prompt.find("- You MUST use this FROM/JOIN shape:").unwrap();
        let category = prompt.find("- category must be 'Groceries'").unwrap();
        let month = prompt.find("- month must be 3 (use MONTH(time_stamp) = 3)").unwrap();
        let year = prompt.find("- year must be 2024 (use YEAR(time_stamp) = 2024)").unwrap();
        assert!(user < shape && shape < category && category < month && month < year);
        assert!(prompt.contains("  WHERE b.user_id = 7\n"));
        assert!(!prompt.contains("Multi-month"));
        assert!(!prompt.contains("IMPORTANT: Do NOT split"));
    }

    #[test]
    fn test_prompt_is_deterministic() {
        let c = constraints("Where did I overspend?");
        assert_eq!(
            render_sql_prompt(&c, "R", "S"),
            render_sql_prompt(&c, "R", "S")
        );
    }

    #[test]
    fn test_compound_category_warning() {
        let mut c = constraints("Gifts & Donations last year");
        c.required_category = Some("Gifts & Donations".into());
        c.required_categories = vec!["Gifts & Donations".into()];
        let prompt = render_sql_prompt(&c, "R", "S");
        assert!(prompt.contains("- category must be 'Gifts & Donations'\n  IMPORTANT: Do NOT split"));
    }

    #[test]
    fn test_multi_category_in_list() {
        let mut c = constraints("Groceries vs Dining Out");
        c.required_categories = vec!["Groceries".into(), "Dining Out".into()];
        let prompt = render_sql_prompt(&c, "R", "S");
        assert!(prompt.contains(
            "- categories must be IN ('Groceries', 'Dining Out') (use t.category IN ('Groceries', 'Dining Out'))"
        ));
    }

    #[test]
    fn test_multi_month_template() {
        let mut c = constraints("Compare my spending in June and May");
        c.months_found = vec![6, 5];
        c.required_year = Some(2024);
        let prompt = render_sql_prompt(&c, "R", "S");
        assert!(prompt.contains("- Multi-month comparison requested. Months are: 5,6\n"));
        assert!(prompt.contains("  Use GROUP BY MONTH(t.time_stamp) and ORDER BY month.\n"));
        assert!(prompt.contains(
            "  TEMPLATE: FROM `transaction` t JOIN budget b ON b.budget_id = t.budget_id WHERE b.user_id = 7 AND YEAR(t.time_stamp) = 2024 AND MONTH(t.time_stamp) IN (5,6)\n"
        ));
        assert!(!prompt.contains("- month must be"));
    }

    #[test]
    fn test_top_category_template() {
        let c = constraints("Where did I overspend?");
        let prompt = render_sql_prompt(&c, "R", "S");
        assert!(prompt.contains("- The query MUST return category and an aggregated spend metric per category."));
        assert!(prompt.contains("  SELECT t.category, SUM(t.amount_spend) AS total_spent\n"));
        assert!(prompt.contains("  GROUP BY t.category ORDER BY total_spent DESC LIMIT 5\n"));
    }

    #[test]
    fn test_top_category_skipped_when_category_named() {
        let mut c = constraints("Did I spend the most on Travel?");
        c.required_category = Some("Travel".into());
        c.required_categories = vec!["Travel".into()];
        assert!(!render_sql_prompt(&c, "R", "S").contains("aggregated spend metric per category"));
    }

    #[test]
    fn test_is_top_category_question() {
        assert!(is_top_category_question("Where did I OVERSPEND in May?"));
        assert!(is_top_category_question("Which category had the highest total?"));
        assert!(is_top_category_question("what did I spend the most on"));
        assert!(!is_top_category_question("Which category is Netflix in?"));
        assert!(!is_top_category_question("How much on Fuel?"));
    }

    #[test]
    fn test_category_csv_escapes_quotes() {
        let csv = category_csv(&["Kid's Toys".to_string(), "Fuel".to_string()]);
        assert_eq!(csv, "'Kid''s Toys', 'Fuel'");
    }

    #[test]
    fn test_correction_lists_failed_gates_in_order() {
        let mut c = constraints("Groceries in March 2024");
        c.required_category = Some("Groceries".into());
        c.required_categories = vec!["Groceries".into()];
        c.required_month = Some(3);
        c.months_found = vec![3];
        c.required_year = Some(2024);

        let outcome = ValidationOutcome {
            missing_user_filter: true,
            missing_category_filter: true,
            missing_year_filter: true,
            ..Default::default()
        };

        let hint = sql_correction(&c, &outcome, "SELECT SUM(amount_spend) FROM `transaction` t");

        assert!(hint.starts_with("### Correction\nYour previous output was invalid.\n"));
        let user = hint.find("- It did NOT include the required filter: user_id = 7").unwrap();
        let category = hint.find("- It did NOT include the required filter: t.category = 'Groceries'").unwrap();
        let year = hint.find("- It did NOT include the required year filter: YEAR(t.time_stamp) = 2024").unwrap();
        assert!(user < category && category < year);
        assert!(!hint.contains("required month filter"));
        assert!(hint.ends_with(
            "Previous output:\nSELECT SUM(amount_spend) FROM `transaction` t\n\nCorrected SQL:\n"
        ));
    }

    #[test]
    fn test_correction_for_parse_failure_and_blank_output() {
        let c = constraints("Where did I overspend?");
        let outcome = ValidationOutcome {
            parse_failure: Some("Model returned empty output".into()),
            missing_table_alias: true,
            missing_user_filter: true,
            ..Default::default()
        };
        let hint = sql_correction(&c, &outcome, "   ");
        // a parse failure also reports every gate it could not check
        assert!(hint.contains(
            "Reason: Model returned empty output; failed gates: shape, user-scope\n"
        ));
        assert!(hint.contains("- You must reference the `transaction` table as `transaction` t"));
        assert!(hint.contains("Previous output:\n<empty>\n"));
    }

    #[test]
    fn test_correction_names_banned_tokens() {
        let c = constraints("Fuel");
        let outcome = ValidationOutcome {
            banned_token_found: true,
            banned_tokens: vec![" delete "],
            ..Default::default()
        };
        let hint = sql_correction(&c, &outcome, "DELETE FROM transaction");
        assert!(hint.contains("- It used forbidden or PostgreSQL-only syntax: delete\n"));
        assert!(hint.contains("Only a single read-only SELECT statement is allowed."));
    }
}
