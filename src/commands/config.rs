//! Config command implementation.
//!
//! Generates configuration files in various formats.

use std::fs;
use std::path::PathBuf;

use crate::cli::ConfigFormat;
use crate::config::{render_config, Config};

/// Writes the built-in defaults to `output`, or to stdout when no path (or `-`) is given.
pub fn command_config(output: Option<PathBuf>, format: ConfigFormat) -> anyhow::Result<()> {
    let content = render_config(&Config::default(), format)
        .map_err(|e| anyhow::anyhow!("Failed to render config: {}", e))?;

    match output {
        Some(path) if path.to_string_lossy() != "-" => {
            fs::write(&path, content)?;
            println!("✅ Configuration written to: {}", path.display());
        }
        _ => print!("{}", content),
    }

    Ok(())
}
