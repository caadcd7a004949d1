// src/commands/options.rs

//! Options and validate commands

use super::{load_recipe, resolve};
use crate::cli::GlobalArgs;
use anyhow::{Context, Result};
use cpython_tool::recipe::validate_recipe;
use serde_json::json;

/// Show the resolved settings and effective option set
pub fn cmd_options(args: &GlobalArgs, as_json: bool) -> Result<()> {
    let recipe = load_recipe(args)?;
    let config = resolve(&recipe)?;
    let settings = &config.settings;

    if as_json {
        let value = json!({
            "name": config.name,
            "version": config.version.to_string(),
            "settings": {
                "os": settings.os.to_string(),
                "arch": settings.arch.to_string(),
                "compiler": settings.compiler.to_string(),
                "build_type": settings.build_type.to_string(),
                "cross_building": settings.is_cross_building(),
            },
            "options": config.options,
            "dependencies": { "zlib": config.dependencies },
            "source": config.source.url,
        });
        let out = serde_json::to_string_pretty(&value).context("Failed to serialize options")?;
        println!("{}", out);
        return Ok(());
    }

    println!("{} {}", config.name, config.version);
    println!("Settings:");
    println!("  os={}", settings.os);
    println!("  arch={}", settings.arch);
    println!("  compiler={}", settings.compiler);
    println!("  build_type={}", settings.build_type);
    if settings.is_cross_building() {
        println!("  (cross-building: fips is not available)");
    }
    println!("Options:");
    for (name, value) in config.options.pairs() {
        println!("  {}={}", name, value);
    }
    println!("Dependencies:");
    println!(
        "  zlib:shared={}",
        if config.dependencies.zlib_shared { "True" } else { "False" }
    );
    println!("Source: {}", config.source.url);
    Ok(())
}

/// Check the recipe and its configuration without running any phase
pub fn cmd_validate(args: &GlobalArgs) -> Result<()> {
    let recipe = load_recipe(args)?;
    let warnings = validate_recipe(&recipe).context("Recipe validation failed")?;
    resolve(&recipe)?;

    for warning in &warnings {
        println!("Warning: {}", warning);
    }
    if warnings.is_empty() {
        println!("[OK] No issues found");
    } else {
        println!("[OK] {} warning(s)", warnings.len());
    }
    Ok(())
}
