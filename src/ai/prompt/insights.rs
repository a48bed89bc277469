//! Insights prompt and its output-format correction.

use super::PromptBuilder;
use crate::constants::insights::SENTENCE_TARGET;
use crate::types::{GeneratedSqlContext, Result, SpendError};

const AGGREGATE_NOTE: &str = "If the resultSet does not include a 'month' column, treat the totals as aggregated across the requested period (even if the prompt mentions multiple months). Do not assume data is missing.";

const EMPTY_RESULT_NOTE: &str = "The resultSet is empty: there is no matching data for this question. Say so plainly.";

/// Render the insights instruction prompt.
///
/// Requires a non-blank original prompt and a populated result set. An empty
/// result set is valid and is flagged to the model as "no matching data".
pub fn render_insights_prompt(context: &GeneratedSqlContext, rules: &str) -> Result<String> {
    if context.original_prompt.trim().is_empty() {
        return Err(SpendError::InvalidInput(
            "originalPrompt is null/blank".to_string(),
        ));
    }
    let rows = context
        .result_set
        .as_ref()
        .ok_or_else(|| SpendError::InvalidInput("resultSet is null".to_string()))?;

    let result_json = serde_json::to_string(rows)?;

    let mut builder = PromptBuilder::new()
        .heading("Instruction")
        .text(rules)
        .heading("Input")
        .field("originalPrompt", &context.original_prompt);

    if !context.required_categories.is_empty() {
        builder = builder.field(
            "requiredCategories",
            format!("[{}]", context.required_categories.join(", ")),
        );
    } else if let Some(category) = &context.required_category {
        builder = builder.field("requiredCategory", category);
    }
    if let Some(month) = context.required_month {
        builder = builder.field("requiredMonth", month);
    }
    if !context.required_months.is_empty() {
        let months: Vec<String> = context.required_months.iter().map(u32::to_string).collect();
        builder = builder.field("requiredMonths", format!("[{}]", months.join(", ")));
    }
    if let Some(year) = context.required_year {
        builder = builder.field("requiredYear", year);
    }

    builder = builder
        .field("resultSet", result_json)
        .field("note", AGGREGATE_NOTE);
    if rows.is_empty() {
        builder = builder.field("note", EMPTY_RESULT_NOTE);
    }

    Ok(builder.heading("Response").build())
}

/// Output-format reminder appended to the original insights prompt on retry
pub fn insights_correction() -> String {
    format!(
        "IMPORTANT: Return ONLY the final insight text ({}). No markdown. No SQL. No raw rows. End with a complete sentence.\n",
        SENTENCE_TARGET
    )
}
