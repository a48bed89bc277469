//! Attempt Loop
//!
//! The bounded completion/verification loop shared by both pipelines:
//!
//! ```text
//! Sending -> Parsing -> Validating -> Accepted
//!                                  -> Retrying -> Sending ...
//!                                  -> Exhausted
//! ```
//!
//! Attempts run strictly one after another. Each retry prompt is rebuilt
//! from the ORIGINAL prompt and the immediately preceding attempt; hints
//! never accumulate. Transport errors leave the loop at once and never
//! consume an attempt.

use std::fmt;

use tracing::{debug, info, warn};

use crate::ai::provider::CompletionProvider;
use crate::types::{Result, SpendError};

/// Loop state, reported in attempt logs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptState {
    Sending,
    Parsing,
    Validating,
    Accepted,
    Retrying,
    Exhausted,
}

impl fmt::Display for AttemptState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sending => write!(f, "SENDING"),
            Self::Parsing => write!(f, "PARSING"),
            Self::Validating => write!(f, "VALIDATING"),
            Self::Accepted => write!(f, "ACCEPTED"),
            Self::Retrying => write!(f, "RETRYING"),
            Self::Exhausted => write!(f, "EXHAUSTED"),
        }
    }
}

/// Acceptance rule and correction strategy for one pipeline
pub trait AttemptPolicy {
    type Output;
    type Failure;

    /// Pipeline name used in logs and `RetriesExhausted`
    fn pipeline(&self) -> &'static str;

    /// Parse and validate one raw completion
    fn evaluate(&self, raw_output: &str) -> std::result::Result<Self::Output, Self::Failure>;

    /// One-line failure description
    fn describe(&self, failure: &Self::Failure) -> String;

    /// Prompt for the next attempt. Must depend only on its arguments.
    fn next_prompt(&self, original: &str, failure: &Self::Failure, raw_output: &str) -> String;
}

/// Bounded sequential attempt runner
pub struct AttemptLoop<'a> {
    provider: &'a dyn CompletionProvider,
    max_attempts: u32,
}

impl<'a> AttemptLoop<'a> {
    pub fn new(provider: &'a dyn CompletionProvider, max_attempts: u32) -> Self {
        Self {
            provider,
            max_attempts: max_attempts.max(1),
        }
    }

    pub async fn run<P>(&self, original_prompt: &str, policy: &P) -> Result<P::Output>
    where
        P: AttemptPolicy + Sync,
    {
        let pipeline = policy.pipeline();
        let mut prompt = original_prompt.to_string();
        let mut last_output = String::new();
        let mut last_failure = String::new();

        for attempt in 1..=self.max_attempts {
            info!(
                pipeline,
                provider = self.provider.name(),
                model = self.provider.model(),
                attempt,
                prompt_chars = prompt.len(),
                state = %AttemptState::Sending,
                "Calling completion endpoint"
            );

            let response = self.provider.complete(&prompt).await?;
            debug!(
                pipeline,
                attempt,
                state = %AttemptState::Parsing,
                tokens = response.usage.total(),
                elapsed_ms = response.timing.total_ms,
                api_ms = ?response.timing.api_ms,
                raw = %response.text
            );
            last_output = response.text;

            match policy.evaluate(&last_output) {
                Ok(output) => {
                    info!(pipeline, attempt, state = %AttemptState::Accepted, "Attempt accepted");
                    return Ok(output);
                }
                Err(failure) => {
                    last_failure = policy.describe(&failure);
                    warn!(
                        pipeline,
                        attempt,
                        state = %AttemptState::Validating,
                        reason = %last_failure,
                        "Attempt rejected"
                    );

                    if attempt < self.max_attempts {
                        debug!(pipeline, attempt, state = %AttemptState::Retrying);
                        prompt = policy.next_prompt(original_prompt, &failure, &last_output);
                    }
                }
            }
        }

        warn!(
            pipeline,
            attempts = self.max_attempts,
            state = %AttemptState::Exhausted,
            "Attempt budget exhausted"
        );
        Err(SpendError::retries_exhausted(
            pipeline,
            self.max_attempts,
            &last_output,
            last_failure,
        ))
    }
}
