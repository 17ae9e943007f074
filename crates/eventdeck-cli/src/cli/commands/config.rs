//! `eventdeck config` handlers.

use anyhow::{Context, Result};
use eventdeck_core::config::{Config, paths};

pub fn path() {
    println!("{}", paths::config_path().display());
}

/// Writes the commented template; refuses to overwrite.
pub fn init() -> Result<()> {
    let target = paths::config_path();
    Config::init(&target).with_context(|| format!("init config at {}", target.display()))?;
    println!("Wrote default config to {}", target.display());
    println!("Edit api_base_url to point at your events server.");
    Ok(())
}

pub fn generate() -> Result<()> {
    let rendered = Config::generate().context("render default config")?;
    print!("{rendered}");
    Ok(())
}
