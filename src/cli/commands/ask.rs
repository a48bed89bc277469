//! Ask Command
//!
//! Answer a spending question end to end: SQL, execution, summary.

use crate::cli::commands::OutputFormat;
use crate::cli::ui::Output;
use crate::cli::util::CommandContext;
use crate::types::Result;

pub async fn run(
    ctx: &CommandContext,
    budget_id: i64,
    prompt: &str,
    show_sql: bool,
    format: OutputFormat,
    out: &Output,
) -> Result<()> {
    let service = ctx.insights_service()?;
    let answer = service.fetch_insights(budget_id, prompt).await?;

    match format {
        OutputFormat::Json => out.result(&serde_json::to_string_pretty(&answer)?),
        OutputFormat::Text => {
            if show_sql {
                out.section("SQL");
                out.sql(&answer.context.sql_query);
                let rows = answer.context.result_set.as_ref().map_or(0, Vec::len);
                out.field("rows", rows);
                out.section("Insights");
            }
            out.result(&answer.insights);
        }
    }
    Ok(())
}
