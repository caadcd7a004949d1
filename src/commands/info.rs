// src/commands/info.rs

//! Info command - consumer info for a finished package

use super::{open_kitchen, phase_failed};
use crate::cli::GlobalArgs;
use anyhow::{Context, Result};

pub fn cmd_info(args: &GlobalArgs, compact: bool) -> Result<()> {
    let kitchen = open_kitchen(args)?;
    let info = kitchen.package_info().map_err(phase_failed)?;

    let json = if compact {
        serde_json::to_string(&info)
    } else {
        serde_json::to_string_pretty(&info)
    }
    .context("Failed to serialize consumer info")?;

    println!("{}", json);
    Ok(())
}
