//! Insights Pipeline
//!
//! Summarizes an executed `GeneratedSqlContext` in a few plain sentences.
//! Acceptance only requires non-blank text once reasoning blocks and code
//! fences are stripped.

use tracing::{info, instrument};

use super::attempt::{AttemptLoop, AttemptPolicy};
use crate::ai::prompt::{insights_correction, render_insights_prompt};
use crate::ai::provider::SharedProvider;
use crate::ai::validation::strip_code_fences;
use crate::types::{GeneratedSqlContext, Result};

pub const PIPELINE_NAME: &str = "Insights generation";

const THINK_OPEN: &str = "<think>";
const THINK_CLOSE: &str = "</think>";

/// Retry prompt for the insights pipeline
pub fn next_insights_prompt(original: &str) -> String {
    format!("{}\n{}", original, insights_correction())
}

/// Drop a leading reasoning block and surrounding code fences.
///
/// An unterminated `<think>` block means the model never got past its
/// reasoning, so nothing usable remains.
pub fn clean_insights_output(raw: &str) -> String {
    let mut text = raw.trim();

    if let Some(rest) = text.strip_prefix(THINK_OPEN) {
        text = match rest.find(THINK_CLOSE) {
            Some(end) => rest[end + THINK_CLOSE.len()..].trim(),
            None => "",
        };
    }

    strip_code_fences(text).trim().to_string()
}

struct InsightsPolicy;

impl AttemptPolicy for InsightsPolicy {
    type Output = String;
    type Failure = &'static str;

    fn pipeline(&self) -> &'static str {
        PIPELINE_NAME
    }

    fn evaluate(&self, raw_output: &str) -> std::result::Result<String, &'static str> {
        let text = clean_insights_output(raw_output);
        if text.is_empty() {
            Err("Model returned empty insights")
        } else {
            Ok(text)
        }
    }

    fn describe(&self, failure: &&'static str) -> String {
        failure.to_string()
    }

    fn next_prompt(&self, original: &str, _failure: &&'static str, _raw_output: &str) -> String {
        next_insights_prompt(original)
    }
}

/// Executed query context to a short prose summary
pub struct InsightsPipeline {
    provider: SharedProvider,
    rules: String,
    max_attempts: u32,
}

impl InsightsPipeline {
    pub fn new(provider: SharedProvider, rules: impl Into<String>, max_attempts: u32) -> Self {
        Self {
            provider,
            rules: rules.into(),
            max_attempts,
        }
    }

    #[instrument(skip_all, fields(model = self.provider.model()))]
    pub async fn summarize(&self, context: &GeneratedSqlContext) -> Result<String> {
        let instruction = render_insights_prompt(context, &self.rules)?;

        let insights = AttemptLoop::new(self.provider.as_ref(), self.max_attempts)
            .run(&instruction, &InsightsPolicy)
            .await?;

        info!(chars = insights.len(), "Insights generated");
        Ok(insights)
    }
}
