// src/recipe/info.rs

//! Consumer info: what downstream tools need to locate the interpreter

use crate::error::{Error, Result};
use crate::recipe::config::BuildConfiguration;
use crate::recipe::package::StagedArtifact;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Package name published to consumers
pub const CONSUMER_PKG_NAME: &str = "python";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvAction {
    /// Set the variable, replacing any value
    Define,
    /// Add to the front of a path list
    Prepend,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnvEntry {
    pub name: String,
    pub value: String,
    pub action: EnvAction,
}

impl EnvEntry {
    fn define(name: &str, value: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            value: value.into(),
            action: EnvAction::Define,
        }
    }

    fn prepend(name: &str, value: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            value: value.into(),
            action: EnvAction::Prepend,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConsumerInfo {
    pub pkg_name: String,
    /// Absolute path of the interpreter consumers should run
    pub interpreter: PathBuf,
    pub bindirs: Vec<PathBuf>,
    pub libdirs: Vec<PathBuf>,
    /// `tools.python:*` configuration values
    pub conf: BTreeMap<String, String>,
    pub buildenv: Vec<EnvEntry>,
}

impl ConsumerInfo {
    pub fn env(&self, name: &str) -> Option<&EnvEntry> {
        self.buildenv.iter().find(|e| e.name == name)
    }
}

/// Derive consumer info from the configuration and the staged layout
///
/// `package_dir` should be absolute; published paths are joined onto it.
pub fn consumer_info(
    config: &BuildConfiguration,
    package_dir: &Path,
    artifact: &StagedArtifact,
) -> Result<ConsumerInfo> {
    let bin = package_dir.join("bin");
    let lib = package_dir.join("lib");
    let mut bindirs = vec![bin.clone()];
    let mut libdirs = vec![lib];

    let mirror = if config.options.enable_zero_copy {
        let root = artifact
            .mirror
            .as_ref()
            .map(|m| package_dir.join(m))
            .filter(|root| root.join("bin").is_dir())
            .ok_or_else(|| {
                Error::PackagingError(format!(
                    "Zero-copy is enabled but {} has no toolchain mirror",
                    package_dir.display()
                ))
            })?;
        bindirs.push(root.join("bin"));
        libdirs.push(root.join("lib"));
        Some(root)
    } else {
        None
    };

    let interpreter_dir = mirror.as_ref().map(|m| m.join("bin")).unwrap_or(bin);
    let interpreter = interpreter_dir.join(config.interpreter_name());
    let optimize = config.options.optimize.to_string();

    let mut conf = BTreeMap::new();
    conf.insert(
        "tools.python:python".to_string(),
        interpreter.to_string_lossy().into_owned(),
    );
    conf.insert("tools.python:optimize".to_string(), optimize.clone());

    let mut buildenv = vec![
        EnvEntry::define("PYTHONHOME", package_dir.to_string_lossy().into_owned()),
        EnvEntry::define("PYTHONOPTIMIZE", optimize),
    ];
    if artifact.fips_verified {
        buildenv.push(EnvEntry::define("PYTHON_FIPS", "1"));
    }
    if let Some(root) = &mirror {
        buildenv.push(EnvEntry::define("PYTHON_ROOT", root.to_string_lossy().into_owned()));
        buildenv.push(EnvEntry::prepend(
            "PATH",
            root.join("bin").to_string_lossy().into_owned(),
        ));
    }

    Ok(ConsumerInfo {
        pkg_name: CONSUMER_PKG_NAME.to_string(),
        interpreter,
        bindirs,
        libdirs,
        conf,
        buildenv,
    })
}
