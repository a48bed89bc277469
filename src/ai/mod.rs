//! Model Integration Layer
//!
//! Completion endpoint client, prompt rendering and output validation.

pub mod prompt;
pub mod provider;
pub mod validation;

pub use prompt::{PromptBuilder, PromptRule, PromptSection};
pub use provider::{
    CompletionProvider, CompletionResponse, OllamaProvider, ProviderConfig,
    ResponseTiming, SharedProvider, TokenUsage, create_provider,
};
pub use validation::{Gate, SqlValidator, ValidationOutcome, check_completion};
