pub mod ask;
pub mod config;
pub mod init;
pub mod sql;
pub mod status;

/// Output format shared by the commands that print results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    #[value(alias = "toml")]
    Text,
    Json,
}
