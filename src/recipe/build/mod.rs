// src/recipe/build/mod.rs

//! Build driver: one strategy per OS family
//!
//! The strategy is selected once from the target OS and produces the full
//! list of commands up front. Commands run strictly in order; the first
//! unsuccessful exit aborts the phase.

mod macos;
mod unix;
mod windows;

pub use macos::FrameworkBuild;
pub use unix::AutotoolsBuild;
pub use windows::VendorScriptBuild;

use crate::error::{Error, Result};
use crate::recipe::config::BuildConfiguration;
use crate::recipe::kitchen::{CommandSpec, Cook, KitchenConfig};
use crate::recipe::security::{SbomRecord, SecurityGate};
use crate::settings::OsFamily;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// The build strategy for an OS family
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildStrategy {
    UnixLike(AutotoolsBuild),
    Windows(VendorScriptBuild),
    MacOS(FrameworkBuild),
}

impl BuildStrategy {
    pub fn select(family: OsFamily) -> Self {
        match family {
            OsFamily::UnixLike => Self::UnixLike(AutotoolsBuild),
            OsFamily::Windows => Self::Windows(VendorScriptBuild),
            OsFamily::MacOS => Self::MacOS(FrameworkBuild),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::UnixLike(_) => "autotools",
            Self::Windows(_) => "build.bat",
            Self::MacOS(_) => "framework",
        }
    }

    /// Commands to run, in order
    pub fn steps(&self, config: &BuildConfiguration, kitchen: &KitchenConfig) -> Result<Vec<CommandSpec>> {
        match self {
            Self::UnixLike(s) => Ok(s.steps(config, kitchen)),
            Self::Windows(s) => s.steps(config, kitchen),
            Self::MacOS(s) => Ok(s.steps(config, kitchen)),
        }
    }

    /// Where the build leaves its artifacts
    pub fn outputs(&self, config: &BuildConfiguration, kitchen: &KitchenConfig) -> Result<BuildOutputs> {
        match self {
            Self::UnixLike(s) => Ok(s.outputs(config, kitchen)),
            Self::Windows(s) => s.outputs(config, kitchen),
            Self::MacOS(s) => Ok(s.outputs(config, kitchen)),
        }
    }
}

/// OS-conventional locations of the built interpreter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildOutputs {
    pub family: OsFamily,
    /// Root of everything the build produced (SBOM target)
    pub root: PathBuf,
    pub bin_dir: PathBuf,
    pub lib_dir: PathBuf,
    /// Standard-library source tree
    pub stdlib_dir: PathBuf,
    pub include_dir: PathBuf,
}

/// Persisted summary of the build phase, read back by the packager
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildReport {
    pub version: String,
    pub strategy: String,
    pub outputs: BuildOutputs,
    /// Toolchain variables handed to the build
    pub variables: BTreeMap<String, String>,
    #[serde(default)]
    pub sbom: Option<SbomRecord>,
}

impl BuildReport {
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| Error::ParseError(format!("Failed to serialize build report: {}", e)))?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            Error::NotFound(format!(
                "Build report {} not readable ({}); run the build phase first",
                path.display(),
                e
            ))
        })?;
        serde_json::from_str(&content)
            .map_err(|e| Error::ParseError(format!("Invalid build report: {}", e)))
    }
}

/// Variables describing this build, recorded alongside the outputs
pub fn toolchain_variables(config: &BuildConfiguration) -> BTreeMap<String, String> {
    let mut vars = BTreeMap::new();
    vars.insert("CPYTHON_VERSION".to_string(), config.version.to_string());
    vars.insert(
        "ENABLE_FIPS".to_string(),
        if config.options.fips_enabled() { "ON" } else { "OFF" }.to_string(),
    );
    vars.insert("PYTHON_OPTIMIZE".to_string(), config.options.optimize.to_string());
    vars.insert(
        "PYTHON_SHARED".to_string(),
        if config.options.shared { "ON" } else { "OFF" }.to_string(),
    );
    vars
}

/// Run the build phase and write the build report
pub fn build(config: &BuildConfiguration, kitchen: &KitchenConfig, cook: &mut Cook<'_>) -> Result<BuildReport> {
    let source_dir = kitchen.source_dir();
    if !source_dir.is_dir() {
        return Err(Error::NotFound(format!(
            "Source directory {} missing; run the source phase first",
            source_dir.display()
        )));
    }

    let strategy = BuildStrategy::select(config.family());
    info!(
        "Building Python {} for {} {} with the {} strategy",
        config.version,
        config.settings.os,
        config.settings.arch,
        strategy.name()
    );

    for step in strategy.steps(config, kitchen)? {
        cook.run_step(&step)?;
    }

    let outputs = strategy.outputs(config, kitchen)?;

    let sbom = if config.options.sbom {
        SecurityGate::new(&config.security).generate_sbom(
            cook,
            &outputs.root,
            &kitchen.sbom_path(),
            config.options.sbom_failure_policy,
        )?
    } else {
        None
    };

    let report = BuildReport {
        version: config.version.to_string(),
        strategy: strategy.name().to_string(),
        outputs,
        variables: toolchain_variables(config),
        sbom,
    };
    report.save(&kitchen.report_path())?;

    Ok(report)
}
