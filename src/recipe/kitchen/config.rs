// src/recipe/kitchen/config.rs

//! Configuration types for the Kitchen

use crate::recipe::format::KitchenSection;
use crate::recipe::info::ConsumerInfo;
use crate::recipe::package::StagedArtifact;
use std::path::{Path, PathBuf};

/// Working locations and parallelism for one invocation
///
/// Every path is derived deterministically so that phases run by separate
/// processes find each other's outputs.
#[derive(Debug, Clone)]
pub struct KitchenConfig {
    /// Extracted sources, install prefix, build report and SBOM
    pub work_dir: PathBuf,
    /// Final package layout
    pub package_dir: PathBuf,
    /// Directory for downloaded source archives
    pub source_cache: PathBuf,
    /// Number of parallel make jobs
    pub jobs: u32,
    /// Root of the zlib dependency, used for the macOS include path
    pub zlib_root: Option<PathBuf>,
}

impl Default for KitchenConfig {
    fn default() -> Self {
        let source_cache = dirs::cache_dir()
            .map(|d| d.join("cpython-tool").join("sources"))
            .unwrap_or_else(|| PathBuf::from("build/sources"));

        Self {
            work_dir: PathBuf::from("build"),
            package_dir: PathBuf::from("package"),
            source_cache,
            jobs: default_jobs(),
            zlib_root: None,
        }
    }
}

fn default_jobs() -> u32 {
    std::thread::available_parallelism()
        .map(|p| p.get() as u32)
        .unwrap_or(4)
}

impl KitchenConfig {
    /// Apply the `[kitchen]` table over the defaults
    pub fn from_section(section: &KitchenSection) -> Self {
        let defaults = Self::default();
        Self {
            work_dir: section.work_dir.clone().unwrap_or(defaults.work_dir),
            package_dir: section.package_dir.clone().unwrap_or(defaults.package_dir),
            source_cache: section.source_cache.clone().unwrap_or(defaults.source_cache),
            jobs: section.jobs.filter(|j| *j > 0).unwrap_or(defaults.jobs),
            zlib_root: section.zlib_root.clone(),
        }
    }

    /// Configuration rooted at a single scratch directory
    pub fn in_dir(root: &Path) -> Self {
        Self {
            work_dir: root.join("build"),
            package_dir: root.join("package"),
            source_cache: root.join("sources"),
            jobs: default_jobs(),
            zlib_root: None,
        }
    }

    /// Extracted source tree
    pub fn source_dir(&self) -> PathBuf {
        self.work_dir.join("source")
    }

    /// `--prefix` for the configure-based strategies
    pub fn install_dir(&self) -> PathBuf {
        self.work_dir.join("install")
    }

    pub fn report_path(&self) -> PathBuf {
        self.work_dir.join("build-report.json")
    }

    /// SBOM produced by the build phase
    pub fn sbom_path(&self) -> PathBuf {
        self.work_dir.join("sbom.json")
    }

    pub fn log_path(&self) -> PathBuf {
        self.work_dir.join("build.log")
    }
}

/// Result of cooking the whole recipe
#[derive(Debug)]
pub struct CookResult {
    /// Package directory, marked publishable
    pub package_dir: PathBuf,
    pub artifact: StagedArtifact,
    pub info: ConsumerInfo,
    /// Build log
    pub log: String,
    /// Warnings generated during build and packaging
    pub warnings: Vec<String>,
}
