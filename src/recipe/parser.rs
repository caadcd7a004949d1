// src/recipe/parser.rs

//! Recipe file parsing

use crate::error::{Error, Result};
use crate::recipe::format::RecipeFile;
use crate::version::PythonVersion;
use std::path::Path;

/// Parse a recipe from a TOML string
pub fn parse_recipe(content: &str) -> Result<RecipeFile> {
    toml::from_str(content).map_err(|e| Error::ParseError(format!("Invalid recipe: {}", e)))
}

/// Parse a recipe from a file
pub fn parse_recipe_file(path: &Path) -> Result<RecipeFile> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::ParseError(format!("Failed to read recipe file {}: {}", path.display(), e))
    })?;

    parse_recipe(&content)
}

/// Validate a recipe, returning non-fatal warnings
pub fn validate_recipe(recipe: &RecipeFile) -> Result<Vec<String>> {
    let mut warnings = Vec::new();

    PythonVersion::parse(&recipe.package.version)?;

    if recipe.source.checksum.is_none() {
        warnings.push("No source checksum pinned; the archive will not be verified".to_string());
    }

    if recipe.options.vulnerability_scan && recipe.security.scanner.trim().is_empty() {
        return Err(Error::ConfigurationError(
            "vulnerability_scan is enabled but no scanner is configured".to_string(),
        ));
    }
    if recipe.options.sbom && recipe.security.sbom_tool.trim().is_empty() {
        return Err(Error::ConfigurationError(
            "sbom is enabled but no sbom_tool is configured".to_string(),
        ));
    }

    if let Some(jobs) = recipe.kitchen.jobs
        && jobs == 0
    {
        warnings.push("kitchen.jobs = 0; falling back to available parallelism".to_string());
    }

    Ok(warnings)
}
