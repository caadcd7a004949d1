// src/commands/mod.rs
//! Command handlers for the cpython-tool CLI

mod cook;
mod info;
mod options;

pub use cook::{cmd_build, cmd_cook, cmd_fetch, cmd_package};
pub use info::cmd_info;
pub use options::{cmd_options, cmd_validate};

use crate::cli::GlobalArgs;
use anyhow::{Context, Result, anyhow};
use cpython_tool::recipe::{BuildConfiguration, Kitchen, KitchenConfig, RecipeFile, parse_recipe_file};
use cpython_tool::{Error, Settings};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Recipe file picked up from the working directory when `--config` is absent
pub const DEFAULT_CONFIG_FILE: &str = "cpython-tool.toml";

/// Load the recipe file and apply `-s`/`-o` overrides
pub fn load_recipe(args: &GlobalArgs) -> Result<RecipeFile> {
    let path = match &args.config {
        Some(path) => Some(path.clone()),
        None => Some(PathBuf::from(DEFAULT_CONFIG_FILE)).filter(|p| p.is_file()),
    };

    let mut recipe = match &path {
        Some(path) => {
            debug!("Reading recipe {}", path.display());
            parse_recipe_file(path).with_context(|| format!("Failed to parse recipe: {}", path.display()))?
        }
        None => RecipeFile::default(),
    };

    for assignment in &args.settings {
        let (key, value) = split_assignment(assignment)?;
        recipe.settings.insert(key.to_string(), value.to_string());
    }
    for assignment in &args.options {
        let (key, value) = split_assignment(assignment)?;
        recipe
            .options
            .set(key, value)
            .with_context(|| format!("Invalid option override '{}'", assignment))?;
    }

    if let Some(dir) = &args.work_dir {
        recipe.kitchen.work_dir = Some(dir.clone());
    }
    if let Some(dir) = &args.package_dir {
        recipe.kitchen.package_dir = Some(dir.clone());
    }
    if let Some(jobs) = args.jobs {
        recipe.kitchen.jobs = Some(jobs);
    }

    Ok(recipe)
}

/// Resolve the recipe against the host settings
pub fn resolve(recipe: &RecipeFile) -> Result<BuildConfiguration> {
    let host = Settings::detect_host().context("Cannot detect host settings")?;
    BuildConfiguration::from_recipe(recipe, host).map_err(phase_failed)
}

/// Build a Kitchen from the command line
pub fn open_kitchen(args: &GlobalArgs) -> Result<Kitchen> {
    let recipe = load_recipe(args)?;
    let config = resolve(&recipe)?;
    let kitchen_config = KitchenConfig::from_section(&recipe.kitchen);
    Kitchen::new(config, kitchen_config).context("Failed to prepare working directories")
}

/// Attach the failing phase to a library error
pub fn phase_failed(error: Error) -> anyhow::Error {
    let phase = error.phase().to_string();
    anyhow::Error::new(error).context(format!("{} phase failed", phase))
}

fn split_assignment(assignment: &str) -> Result<(&str, &str)> {
    assignment
        .split_once('=')
        .map(|(k, v)| (k.trim(), v.trim()))
        .filter(|(k, _)| !k.is_empty())
        .ok_or_else(|| anyhow!("Expected KEY=VALUE, got '{}'", assignment))
}

/// Print the warnings collected during a phase
pub fn print_warnings(warnings: &[String]) {
    for warning in warnings {
        println!("Warning: {}", warning);
    }
}

/// Print a path relative to the current directory when possible
pub fn display_path(path: &Path) -> String {
    std::env::current_dir()
        .ok()
        .and_then(|cwd| path.strip_prefix(cwd).ok().map(Path::to_path_buf))
        .unwrap_or_else(|| path.to_path_buf())
        .display()
        .to_string()
}
