//! Sql Command
//!
//! Generate validated SQL for a question without executing it.

use crate::cli::commands::OutputFormat;
use crate::cli::ui::Output;
use crate::cli::util::CommandContext;
use crate::types::{PromptConstraints, Result};

pub async fn run(
    ctx: &CommandContext,
    budget_id: i64,
    prompt: &str,
    format: OutputFormat,
    dry_run: bool,
    out: &Output,
) -> Result<()> {
    let pipeline = ctx.sql_pipeline()?;
    let prepared = pipeline.prepare(budget_id, prompt)?;

    if dry_run {
        match format {
            OutputFormat::Json => out.result(&serde_json::to_string_pretty(&prepared.constraints)?),
            OutputFormat::Text => {
                print_constraints(&prepared.constraints, out);
                out.section("Prompt");
                out.result(&prepared.instruction);
            }
        }
        return Ok(());
    }

    let context = pipeline.run_prepared(&prepared).await?;
    match format {
        OutputFormat::Json => out.result(&serde_json::to_string_pretty(&context)?),
        OutputFormat::Text => {
            print_constraints(&prepared.constraints, out);
            out.section("SQL");
            out.sql(&context.sql_query);
        }
    }
    Ok(())
}

fn print_constraints(c: &PromptConstraints, out: &Output) {
    out.section("Constraints");
    out.field("user", c.user_id);
    if c.has_categories() {
        out.field("categories", c.required_categories.join(", "));
    }
    if !c.months_found.is_empty() {
        let months: Vec<String> = c.months_found.iter().map(u32::to_string).collect();
        out.field("months", months.join(", "));
    }
    if let Some(year) = c.required_year {
        out.field("year", year);
    }
}
