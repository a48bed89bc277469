//! Prompt Builder System
//!
//! Standardized prompt construction for the completion models.
//! Every prompt follows the same instruction layout:
//!
//! ```text
//! ### Instruction
//! <static rules>
//!
//! ### Input
//! <labeled blocks, constraint rules or key/value fields>
//!
//! ### Response
//! ```
//!
//! Rendering is pure and order-preserving: the same sections always produce
//! the same text.

mod insights;
mod sql;

pub use insights::{insights_correction, render_insights_prompt};
pub use sql::{category_csv, is_top_category_question, render_sql_prompt, sql_correction};

/// One constraint bullet with optional indented detail lines
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptRule {
    pub text: String,
    pub details: Vec<String>,
}

impl PromptRule {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            details: Vec::new(),
        }
    }

    pub fn detail(mut self, line: impl Into<String>) -> Self {
        self.details.push(line.into());
        self
    }
}

/// Prompt section types
#[derive(Debug, Clone)]
pub enum PromptSection {
    /// `### Title` line, content follows directly
    Heading(String),
    /// Raw text followed by a blank line
    Text(String),
    /// `Label:` line, content, blank line
    Labeled { label: String, content: String },
    /// `Label:` line followed by bullet rules
    Rules { label: String, rules: Vec<PromptRule> },
    /// `key: value` lines
    Fields(Vec<(String, String)>),
}

/// Prompt builder for consistent prompt construction
#[derive(Debug, Clone, Default)]
pub struct PromptBuilder {
    sections: Vec<PromptSection>,
}

impl PromptBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn heading(mut self, title: &str) -> Self {
        self.sections.push(PromptSection::Heading(title.to_string()));
        self
    }

    pub fn text(mut self, content: &str) -> Self {
        self.sections.push(PromptSection::Text(content.to_string()));
        self
    }

    pub fn labeled(mut self, label: &str, content: &str) -> Self {
        self.sections.push(PromptSection::Labeled {
            label: label.to_string(),
            content: content.to_string(),
        });
        self
    }

    pub fn rules(mut self, label: &str, rules: Vec<PromptRule>) -> Self {
        self.sections.push(PromptSection::Rules {
            label: label.to_string(),
            rules,
        });
        self
    }

    /// Add a `key: value` field, extending the trailing field block if any
    pub fn field(mut self, key: &str, value: impl ToString) -> Self {
        let entry = (key.to_string(), value.to_string());
        match self.sections.last_mut() {
            Some(PromptSection::Fields(fields)) => fields.push(entry),
            _ => self.sections.push(PromptSection::Fields(vec![entry])),
        }
        self
    }

    /// Build the final prompt string. It always ends with exactly one newline.
    pub fn build(self) -> String {
        let mut prompt = String::new();

        for section in self.sections {
            match section {
                PromptSection::Heading(title) => {
                    prompt.push_str(&format!("### {}\n", title));
                }
                PromptSection::Text(content) => {
                    prompt.push_str(content.trim_end());
                    prompt.push_str("\n\n");
                }
                PromptSection::Labeled { label, content } => {
                    prompt.push_str(&format!("{}:\n", label));
                    prompt.push_str(content.trim_end());
                    prompt.push_str("\n\n");
                }
                PromptSection::Rules { label, rules } => {
                    prompt.push_str(&format!("{}:\n", label));
                    for rule in rules {
                        prompt.push_str(&format!("- {}\n", rule.text));
                        for line in rule.details {
                            prompt.push_str(&format!("  {}\n", line));
                        }
                    }
                    prompt.push('\n');
                }
                PromptSection::Fields(fields) => {
                    for (key, value) in fields {
                        prompt.push_str(&format!("{}: {}\n", key, value));
                    }
                    prompt.push('\n');
                }
            }
        }

        let mut prompt = prompt.trim_end().to_string();
        prompt.push('\n');
        prompt
    }
}
