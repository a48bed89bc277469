//! Config Command

use std::path::Path;

use crate::cli::commands::OutputFormat;
use crate::cli::util::load_config;
use crate::config::ConfigLoader;
use crate::types::Result;

/// Print the effective configuration
pub fn show(config_path: Option<&Path>, format: OutputFormat) -> Result<()> {
    let config = load_config(config_path)?;
    let rendered = ConfigLoader::render(&config, format == OutputFormat::Json)?;
    println!("{}", rendered.trim_end());
    Ok(())
}

pub fn path() -> Result<()> {
    ConfigLoader::show_path();
    Ok(())
}
