use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tokio::runtime::Runtime;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use spendsql::cli::commands::{self, OutputFormat};
use spendsql::cli::{CommandContext, Output, join_prompt};
use spendsql::{ErrorCategory, SpendError};

#[derive(Parser)]
#[command(name = "spendsql")]
#[command(
    version,
    about = "Ask questions about your budget in plain English"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (skips global/project discovery)
    #[arg(long, short, global = true, env = "SPENDSQL_CONFIG")]
    config: Option<PathBuf>,

    #[arg(long, global = true)]
    verbose: bool,

    #[arg(long, short, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the project config and budget database
    Init {
        #[arg(long, short, help = "Overwrite existing project config")]
        force: bool,
        #[arg(long, help = "Load a demo budget with six months of spending")]
        sample: bool,
    },

    /// Generate validated SQL for a question
    Sql {
        #[arg(long, short = 'b', help = "Budget to query")]
        budget_id: i64,
        #[arg(required = true, help = "Question in plain English")]
        prompt: Vec<String>,
        #[arg(short = 'f', long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
        #[arg(long = "dry-run", help = "Print constraints and prompt without calling the model")]
        dry_run: bool,
    },

    /// Answer a question with a short spending summary
    Ask {
        #[arg(long, short = 'b', help = "Budget to query")]
        budget_id: i64,
        #[arg(required = true, help = "Question in plain English")]
        prompt: Vec<String>,
        #[arg(long, help = "Also print the generated SQL")]
        show_sql: bool,
        #[arg(short = 'f', long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Show endpoint, model and database status
    Status {
        #[arg(short = 'f', long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration (merged from all sources)
    Show {
        #[arg(short = 'f', long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Show configuration file paths
    Path,
}

/// Set up panic handler for graceful error reporting
fn setup_panic_handler() {
    let default_hook = std::panic::take_hook();

    std::panic::set_hook(Box::new(move |panic_info| {
        let message = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };

        eprintln!("\n\x1b[1;31m━━━ PANIC ━━━\x1b[0m");
        eprintln!("\x1b[31mspendsql encountered an unexpected error:\x1b[0m");
        eprintln!("  {}", message);

        if let Some(location) = panic_info.location() {
            eprintln!(
                "\x1b[90mLocation: {}:{}:{}\x1b[0m",
                location.file(),
                location.line(),
                location.column()
            );
        }

        // backtrace when RUST_BACKTRACE=1
        default_hook(panic_info);
    }));
}

/// Exit status per error category
fn exit_code(error: &anyhow::Error) -> u8 {
    match error.downcast_ref::<SpendError>().map(SpendError::category) {
        Some(ErrorCategory::Input) => 2,
        Some(ErrorCategory::FatalConfig) => 3,
        Some(ErrorCategory::Transport) => 4,
        Some(ErrorCategory::Generation) => 5,
        Some(ErrorCategory::Execution) => 6,
        Some(ErrorCategory::System) | None => 1,
    }
}

fn main() -> ExitCode {
    setup_panic_handler();

    match run_cli() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            Output::new().error(&e.to_string());
            ExitCode::from(exit_code(&e))
        }
    }
}

fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let out = Output::quiet(cli.quiet);
    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Init { force, sample } => {
            commands::init::run(config_path, force, sample, &out)?;
        }
        Commands::Sql {
            budget_id,
            prompt,
            format,
            dry_run,
        } => {
            let ctx = CommandContext::load(config_path)?;
            let rt = Runtime::new()?;
            rt.block_on(commands::sql::run(
                &ctx,
                budget_id,
                &join_prompt(&prompt),
                format,
                dry_run,
                &out,
            ))?;
        }
        Commands::Ask {
            budget_id,
            prompt,
            show_sql,
            format,
        } => {
            let ctx = CommandContext::load(config_path)?;
            let rt = Runtime::new()?;
            rt.block_on(commands::ask::run(
                &ctx,
                budget_id,
                &join_prompt(&prompt),
                show_sql,
                format,
                &out,
            ))?;
        }
        Commands::Status { format } => {
            let rt = Runtime::new()?;
            rt.block_on(commands::status::run(config_path, format, &out))?;
        }
        Commands::Config { action } => match action {
            ConfigAction::Show { format } => commands::config::show(config_path, format)?,
            ConfigAction::Path => commands::config::path()?,
        },
    }

    Ok(())
}
