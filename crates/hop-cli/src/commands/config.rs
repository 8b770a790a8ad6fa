//! Config command implementations

use std::path::PathBuf;

use anyhow::{Context, Result};

use hop_core::config;

use crate::context::AppContext;

/// Print the path of the config file in use; nothing is created
pub fn config_path(config_path: Option<&PathBuf>) -> Result<()> {
    let path = config_path
        .cloned()
        .unwrap_or_else(config::default_config_path);
    println!("{}", path.display());
    Ok(())
}

/// Print the loaded configuration as TOML
pub fn config_show(ctx: &AppContext) -> Result<()> {
    println!("# Configuration file: {}", ctx.store.path().display());
    println!();

    if ctx.topology.is_empty() {
        println!("# No relay groups configured");
        return Ok(());
    }

    let content =
        toml::to_string_pretty(&ctx.topology).context("Failed to serialize configuration")?;
    println!("{}", content);
    Ok(())
}
