// src/recipe/format.rs

//! Recipe configuration file format
//!
//! The file is TOML and every table is optional; anything left out falls
//! back to the built-in defaults (CPython 3.12.7 for the running host).
//!
//! ```toml
//! [package]
//! version = "3.12.7"
//!
//! [settings]
//! os = "Linux"
//! arch = "x86_64"
//! compiler = "gcc"
//! compiler_version = "13"
//! build_type = "Release"
//!
//! [options]
//! shared = false
//! optimize = "2"
//! enable_zero_copy = true
//!
//! [source]
//! checksum = "sha256:..."
//!
//! [kitchen]
//! work_dir = "build"
//! package_dir = "package"
//!
//! [security]
//! sbom_tool = "syft"
//! scanner = "trivy"
//! ```

use crate::recipe::options::RecipeOptions;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Default upstream version packaged by this recipe
pub const DEFAULT_VERSION: &str = "3.12.7";

/// Package name published to consumers
pub const PACKAGE_NAME: &str = "cpython-tool";

/// A complete recipe configuration file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RecipeFile {
    pub package: PackageSection,

    /// Settings as `key = "value"` pairs, applied over the detected host
    pub settings: BTreeMap<String, String>,

    pub options: RecipeOptions,

    pub source: SourceSection,

    pub kitchen: KitchenSection,

    pub security: SecuritySection,
}

/// Package metadata section
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PackageSection {
    /// Upstream CPython version
    pub version: String,
}

impl Default for PackageSection {
    fn default() -> Self {
        Self {
            version: DEFAULT_VERSION.to_string(),
        }
    }
}

/// Source archive section
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SourceSection {
    /// Archive URL override; `%(version)s` is substituted
    pub url: Option<String>,

    /// Pinned archive checksum (`sha256:...`)
    pub checksum: Option<String>,
}

/// Working locations and build parallelism
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct KitchenSection {
    /// Extracted sources, install prefix and build report live here
    pub work_dir: Option<PathBuf>,

    /// Final package layout
    pub package_dir: Option<PathBuf>,

    /// Downloaded archives
    pub source_cache: Option<PathBuf>,

    /// Parallel make jobs
    pub jobs: Option<u32>,

    /// Root of the zlib dependency (`include/`, `lib/`)
    pub zlib_root: Option<PathBuf>,
}

/// External security tool names
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SecuritySection {
    pub sbom_tool: String,
    pub scanner: String,
}

impl Default for SecuritySection {
    fn default() -> Self {
        Self {
            sbom_tool: "syft".to_string(),
            scanner: "trivy".to_string(),
        }
    }
}
