// src/recipe/options.rs

//! Option model: the configurable switches of the recipe and their domains

use crate::error::{Error, Result};
use crate::settings::{Os, Settings};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Optimize level published to consumers
///
/// Only the enumerated strings are accepted; the value is passed through and
/// never checked against the interpreter build itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum OptimizeLevel {
    #[serde(rename = "0")]
    O0,
    #[serde(rename = "1")]
    O1,
    #[default]
    #[serde(rename = "2")]
    O2,
    #[serde(rename = "3")]
    O3,
}

impl OptimizeLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::O0 => "0",
            Self::O1 => "1",
            Self::O2 => "2",
            Self::O3 => "3",
        }
    }
}

impl FromStr for OptimizeLevel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "0" => Ok(Self::O0),
            "1" => Ok(Self::O1),
            "2" => Ok(Self::O2),
            "3" => Ok(Self::O3),
            other => Err(Error::ConfigurationError(format!(
                "Invalid optimize value '{}' (expected one of 0, 1, 2, 3)",
                other
            ))),
        }
    }
}

impl fmt::Display for OptimizeLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What to do when SBOM generation fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SbomFailurePolicy {
    /// Abort the build with `SecurityGateError`
    Fatal,
    /// Log a warning and continue without an SBOM
    #[default]
    Warn,
}

impl FromStr for SbomFailurePolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "fatal" => Ok(Self::Fatal),
            "warn" => Ok(Self::Warn),
            other => Err(Error::ConfigurationError(format!(
                "Invalid sbom_failure_policy '{}' (expected fatal or warn)",
                other
            ))),
        }
    }
}

/// Option values as declared by the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RecipeOptions {
    /// Build the interpreter as a shared library
    pub shared: bool,
    /// FIPS-mode build; `None` means the caller left it at its default
    pub fips: Option<bool>,
    pub optimize: OptimizeLevel,
    /// Create the `cpython-toolchain` symlink mirror
    pub enable_zero_copy: bool,
    /// Generate an SBOM after the build
    pub sbom: bool,
    /// Run the vulnerability scanner against the package
    pub vulnerability_scan: bool,
    pub sbom_failure_policy: SbomFailurePolicy,
}

impl Default for RecipeOptions {
    fn default() -> Self {
        Self {
            shared: false,
            fips: None,
            optimize: OptimizeLevel::O2,
            enable_zero_copy: true,
            sbom: false,
            vulnerability_scan: false,
            sbom_failure_policy: SbomFailurePolicy::Warn,
        }
    }
}

impl RecipeOptions {
    /// Apply a single `key=value` assignment (`-o shared=True`)
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "shared" => self.shared = parse_bool(key, value)?,
            "fips" => self.fips = Some(parse_bool(key, value)?),
            "optimize" => self.optimize = value.parse()?,
            "enable_zero_copy" => self.enable_zero_copy = parse_bool(key, value)?,
            "sbom" => self.sbom = parse_bool(key, value)?,
            "vulnerability_scan" => self.vulnerability_scan = parse_bool(key, value)?,
            "sbom_failure_policy" => self.sbom_failure_policy = value.parse()?,
            _ => {
                return Err(Error::ConfigurationError(format!("Unknown option '{}'", key)));
            }
        }
        Ok(())
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.to_lowercase().as_str() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(Error::ConfigurationError(format!(
            "Invalid value '{}' for option '{}' (expected True or False)",
            value, key
        ))),
    }
}

/// Option set after applying the settings-dependent rules
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EffectiveOptions {
    pub shared: bool,
    /// Absent whenever the build is a cross-build
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fips: Option<bool>,
    pub optimize: OptimizeLevel,
    pub enable_zero_copy: bool,
    pub sbom: bool,
    pub vulnerability_scan: bool,
    pub sbom_failure_policy: SbomFailurePolicy,
}

impl EffectiveOptions {
    /// Resolve declared options against the settings
    ///
    /// FIPS cannot be built while cross-compiling: a default value is
    /// dropped, an explicit `fips=True` is a configuration error.
    pub fn resolve(options: &RecipeOptions, settings: &Settings) -> Result<Self> {
        let fips = if settings.is_cross_building() {
            if options.fips == Some(true) {
                return Err(Error::ConfigurationError(
                    "fips=True is not available when cross-building".to_string(),
                ));
            }
            debug!("Cross-building: removing fips option");
            None
        } else {
            Some(options.fips.unwrap_or(false))
        };

        Ok(Self {
            shared: options.shared,
            fips,
            optimize: options.optimize,
            enable_zero_copy: options.enable_zero_copy,
            sbom: options.sbom,
            vulnerability_scan: options.vulnerability_scan,
            sbom_failure_policy: options.sbom_failure_policy,
        })
    }

    pub fn fips_enabled(&self) -> bool {
        self.fips.unwrap_or(false)
    }

    /// Names of the options present in the set, in declaration order
    pub fn names(&self) -> Vec<&'static str> {
        self.pairs().into_iter().map(|(name, _)| name).collect()
    }

    /// `(name, value)` pairs in Conan's `True`/`False` spelling
    pub fn pairs(&self) -> Vec<(&'static str, String)> {
        let flag = |b: bool| if b { "True" } else { "False" }.to_string();

        let mut pairs = vec![("shared", flag(self.shared))];
        if let Some(fips) = self.fips {
            pairs.push(("fips", flag(fips)));
        }
        pairs.push(("optimize", self.optimize.to_string()));
        pairs.push(("enable_zero_copy", flag(self.enable_zero_copy)));
        pairs.push(("sbom", flag(self.sbom)));
        pairs.push(("vulnerability_scan", flag(self.vulnerability_scan)));
        pairs.push((
            "sbom_failure_policy",
            match self.sbom_failure_policy {
                SbomFailurePolicy::Fatal => "fatal".to_string(),
                SbomFailurePolicy::Warn => "warn".to_string(),
            },
        ));
        pairs
    }
}

/// Options pushed onto the zlib dependency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct DependencyOptions {
    pub zlib_shared: bool,
}

/// A shared interpreter on Windows needs a shared zlib as well
pub fn propagate_dependency_options(settings: &Settings, options: &EffectiveOptions) -> DependencyOptions {
    DependencyOptions {
        zlib_shared: settings.os == Os::Windows && options.shared,
    }
}
