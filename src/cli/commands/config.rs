//! Config Command
//!
//! Usage:
//!   weavereview config show [-f json]
//!   weavereview config path

use std::path::Path;

use crate::cli::util::CommandContext;
use crate::config::ConfigLoader;
use crate::types::Result;

/// Print the effective settings after all layers are merged
pub fn show(settings: Option<&Path>, format: &str) -> Result<()> {
    let ctx = CommandContext::load(settings)?;
    println!("{}", ConfigLoader::render(&ctx.config, format == "json")?);
    Ok(())
}

pub fn path() -> Result<()> {
    ConfigLoader::show_path();
    Ok(())
}
