// src/recipe/kitchen/mod.rs

//! Kitchen: runs the phases of the recipe
//!
//! Each phase can be invoked on its own (the outer package manager calls
//! them one at a time) or all together through [`Kitchen::cook`]:
//! - Source: download the upstream archive into the cache and unpack it
//! - Build: run the OS strategy's commands, optionally generate an SBOM
//! - Package: stage the canonical layout, mirror, scan, mark publishable
//! - Info: publish interpreter location and environment for consumers
//!
//! Phases hand data to each other only through the work and package
//! directories, so separate processes can run them in sequence.

mod archive;
mod config;
mod cook;
mod runner;
#[cfg(test)]
pub(crate) mod testing;

pub use archive::{download_file, extract_archive};
pub use config::{CookResult, KitchenConfig};
pub use cook::Cook;
pub use runner::{CommandOutput, CommandRunner, CommandSpec, SystemRunner};

use crate::error::{Error, Result};
use crate::hash;
use crate::recipe::build::{self, BuildReport};
use crate::recipe::config::BuildConfiguration;
use crate::recipe::info::{ConsumerInfo, consumer_info};
use crate::recipe::package::{self, StagedArtifact};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

/// The Kitchen: where the interpreter is cooked
pub struct Kitchen {
    config: BuildConfiguration,
    kitchen_config: KitchenConfig,
    runner: Arc<dyn CommandRunner>,
}

impl Kitchen {
    /// Create a Kitchen that runs real processes
    pub fn new(config: BuildConfiguration, kitchen_config: KitchenConfig) -> Result<Self> {
        Self::with_runner(config, kitchen_config, Arc::new(SystemRunner))
    }

    /// Create a Kitchen with a custom command runner
    ///
    /// Directories are made absolute up front; published paths and the
    /// zero-copy links must not depend on the working directory.
    pub fn with_runner(
        config: BuildConfiguration,
        mut kitchen_config: KitchenConfig,
        runner: Arc<dyn CommandRunner>,
    ) -> Result<Self> {
        kitchen_config.work_dir = std::path::absolute(&kitchen_config.work_dir)?;
        kitchen_config.package_dir = std::path::absolute(&kitchen_config.package_dir)?;
        kitchen_config.source_cache = std::path::absolute(&kitchen_config.source_cache)?;

        Ok(Self {
            config,
            kitchen_config,
            runner,
        })
    }

    pub fn config(&self) -> &BuildConfiguration {
        &self.config
    }

    pub fn kitchen_config(&self) -> &KitchenConfig {
        &self.kitchen_config
    }

    /// Start a cook session for running phases
    pub fn new_cook(&self) -> Cook<'_> {
        Cook::new(self.runner.as_ref())
    }

    /// Source phase: fetch the archive and unpack it into the source dir
    pub fn fetch(&self) -> Result<PathBuf> {
        let archive = self.fetch_source()?;

        let source_dir = self.kitchen_config.source_dir();
        if source_dir.exists() {
            debug!("Removing previous sources at {}", source_dir.display());
            fs::remove_dir_all(&source_dir).map_err(|e| {
                Error::ExtractionError(format!("Failed to remove {}: {}", source_dir.display(), e))
            })?;
        }

        info!("Unpacking {}", archive.display());
        archive::extract_archive(&archive, &source_dir)?;
        Ok(source_dir)
    }

    /// Fetch the source archive (with caching)
    pub(crate) fn fetch_source(&self) -> Result<PathBuf> {
        let source = &self.config.source;
        let cache = &self.kitchen_config.source_cache;
        fs::create_dir_all(cache).map_err(|e| cache_error("create", cache, e))?;

        let cached_path = cache.join(source.archive_filename());

        if cached_path.exists() {
            match &source.checksum {
                Some(checksum) => match hash::verify_file(&cached_path, checksum).map_err(source_io) {
                    Ok(()) => {
                        debug!("Using cached source: {}", cached_path.display());
                        return Ok(cached_path);
                    }
                    Err(Error::ChecksumMismatch { .. }) => {
                        warn!("Cached file checksum mismatch, re-downloading");
                        fs::remove_file(&cached_path).map_err(|e| cache_error("remove", &cached_path, e))?;
                    }
                    Err(e) => return Err(e),
                },
                None => {
                    debug!("Using cached source (unverified): {}", cached_path.display());
                    return Ok(cached_path);
                }
            }
        }

        info!("Downloading: {}", source.url);
        let mut temp = NamedTempFile::new_in(cache).map_err(|e| cache_error("create a download in", cache, e))?;
        archive::download_file(&source.url, temp.as_file_mut())?;
        temp.as_file_mut()
            .flush()
            .map_err(|e| cache_error("write", temp.path(), e))?;

        // The temp file is discarded on a mismatch
        if let Some(checksum) = &source.checksum {
            hash::verify_file(temp.path(), checksum).map_err(source_io)?;
        }

        temp.persist(&cached_path)
            .map_err(|e| cache_error("store", &cached_path, e.error))?;
        Ok(cached_path)
    }

    /// Build phase
    pub fn build(&self, cook: &mut Cook<'_>) -> Result<BuildReport> {
        build::build(&self.config, &self.kitchen_config, cook)
    }

    /// Package phase
    pub fn package(&self, cook: &mut Cook<'_>) -> Result<StagedArtifact> {
        package::package(&self.config, &self.kitchen_config, cook)
    }

    /// Info phase: read the finished package and derive consumer info
    pub fn package_info(&self) -> Result<ConsumerInfo> {
        let package_dir = &self.kitchen_config.package_dir;
        let artifact = StagedArtifact::load(package_dir)?;

        let version = self.config.version.to_string();
        if artifact.version != version || artifact.family != self.config.family() {
            return Err(Error::PackagingError(format!(
                "{} holds {} for {:?}, expected {} for {:?}",
                package_dir.display(),
                artifact.version,
                artifact.family,
                version,
                self.config.family()
            )));
        }

        // PYTHON_FIPS may only be published for an interpreter that passed the self-check
        if artifact.fips_verified != self.config.options.fips_enabled() {
            return Err(Error::PackagingError(format!(
                "{} was packaged with fips_verified={}, but fips is {} for this invocation",
                package_dir.display(),
                artifact.fips_verified,
                if self.config.options.fips_enabled() { "enabled" } else { "disabled" }
            )));
        }

        consumer_info(&self.config, package_dir, &artifact)
    }

    /// Run every phase in order
    ///
    /// The build log is written to the work directory whether or not the
    /// phases succeed.
    pub fn cook(&self) -> Result<CookResult> {
        info!(
            "Cooking {} version {} for {} {}",
            self.config.name, self.config.version, self.config.settings.os, self.config.settings.arch
        );

        let mut cook = self.new_cook();

        let result: Result<(StagedArtifact, ConsumerInfo)> = (|| {
            info!("Fetching source...");
            let source_dir = self.fetch()?;
            cook.log_line(&format!("=== source ===\n{}", source_dir.display()));

            info!("Building...");
            self.build(&mut cook)?;

            info!("Packaging...");
            let artifact = self.package(&mut cook)?;

            let info = self.package_info()?;
            Ok((artifact, info))
        })();

        let log_path = self.kitchen_config.log_path();
        if let Err(e) = cook.write_log(&log_path) {
            warn!("Failed to write build log {}: {}", log_path.display(), e);
        }

        let (artifact, info) = result?;
        Ok(CookResult {
            package_dir: self.kitchen_config.package_dir.clone(),
            artifact,
            info,
            log: cook.log,
            warnings: cook.warnings,
        })
    }
}

/// Filesystem failures in the source cache belong to the source phase
fn cache_error(action: &str, path: &Path, e: std::io::Error) -> Error {
    Error::DownloadError(format!("Failed to {} {}: {}", action, path.display(), e))
}

fn source_io(e: Error) -> Error {
    match e {
        Error::Io(e) => Error::DownloadError(e.to_string()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recipe::parser::parse_recipe;
    use crate::settings::{Arch, BuildType, Compiler, CompilerKind, Os, Settings};
    use std::fs::File;
    use super::testing::RecordingRunner;
    use xz2::write::XzEncoder;

    fn linux() -> Settings {
        Settings {
            os: Os::Linux,
            arch: Arch::X86_64,
            compiler: Compiler::new(CompilerKind::Gcc, "13"),
            build_type: BuildType::Release,
            build_os: None,
            build_arch: None,
        }
    }

    fn write_source_archive(path: &Path) {
        let file = File::create(path).unwrap();
        let mut builder = tar::Builder::new(XzEncoder::new(file, 6));
        for (name, data) in [
            ("Python-3.12.7/configure", &b"#!/bin/sh\n"[..]),
            ("Python-3.12.7/Lib/os.py", &b""[..]),
        ] {
            let mut header = tar::Header::new_gnu();
            header.set_size(data.len() as u64);
            header.set_mode(0o755);
            header.set_cksum();
            builder.append_data(&mut header, name, data).unwrap();
        }
        builder.into_inner().unwrap().finish().unwrap();
    }

    fn kitchen(recipe: &str, root: &Path) -> Kitchen {
        let config = BuildConfiguration::from_recipe(&parse_recipe(recipe).unwrap(), linux()).unwrap();
        Kitchen::with_runner(config, KitchenConfig::in_dir(root), Arc::new(RecordingRunner::new())).unwrap()
    }

    #[test]
    fn test_fetch_uses_verified_cache() {
        let temp = tempfile::tempdir().unwrap();
        let cache = temp.path().join("sources");
        fs::create_dir_all(&cache).unwrap();
        let archive = cache.join("Python-3.12.7.tar.xz");
        write_source_archive(&archive);
        let checksum = hash::hash_file(&archive).unwrap();

        let recipe = format!(
            "[source]\nurl = \"http://127.0.0.1:9/Python-%(version)s.tar.xz\"\nchecksum = \"{}\"\n",
            checksum
        );
        let kitchen = kitchen(&recipe, temp.path());

        let source_dir = kitchen.fetch().unwrap();
        assert!(source_dir.join("configure").is_file());
        assert!(source_dir.join("Lib/os.py").is_file());
    }

    #[test]
    fn test_fetch_redownloads_on_cache_mismatch() {
        let temp = tempfile::tempdir().unwrap();
        let cache = temp.path().join("sources");
        fs::create_dir_all(&cache).unwrap();
        fs::write(cache.join("Python-3.12.7.tar.xz"), "stale").unwrap();

        let recipe = "[source]\nurl = \"http://127.0.0.1:9/Python-%(version)s.tar.xz\"\nchecksum = \"sha256:b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9\"\n";
        let kitchen = kitchen(recipe, temp.path());

        let err = kitchen.fetch().unwrap_err();
        assert!(matches!(err, Error::DownloadError(_)));
        assert!(!cache.join("Python-3.12.7.tar.xz").exists());
    }

    #[test]
    fn test_unusable_source_cache_fails_source_phase() {
        let temp = tempfile::tempdir().unwrap();
        // A plain file where the cache directory should be
        fs::write(temp.path().join("sources"), "not a directory").unwrap();
        let kitchen = kitchen("", temp.path());

        let err = kitchen.fetch().unwrap_err();
        assert!(matches!(err, Error::DownloadError(_)));
        assert_eq!(err.phase(), "source");
    }

    #[test]
    fn test_paths_made_absolute() {
        let config = BuildConfiguration::from_recipe(&parse_recipe("").unwrap(), linux()).unwrap();
        let kitchen = Kitchen::new(config, KitchenConfig::default()).unwrap();
        assert!(kitchen.kitchen_config().work_dir.is_absolute());
        assert!(kitchen.kitchen_config().package_dir.is_absolute());
    }

    #[test]
    fn test_info_requires_publishable_package() {
        let temp = tempfile::tempdir().unwrap();
        let kitchen = kitchen("", temp.path());
        assert!(matches!(kitchen.package_info(), Err(Error::PackagingError(_))));
    }

    #[test]
    fn test_cook_writes_log_on_failure() {
        let temp = tempfile::tempdir().unwrap();
        let cache = temp.path().join("sources");
        fs::create_dir_all(&cache).unwrap();
        write_source_archive(&cache.join("Python-3.12.7.tar.xz"));

        let config = BuildConfiguration::from_recipe(&parse_recipe("").unwrap(), linux()).unwrap();
        let runner = Arc::new(RecordingRunner::new().fail_phase("configure", 1));
        let kitchen = Kitchen::with_runner(config, KitchenConfig::in_dir(temp.path()), runner).unwrap();

        let err = kitchen.cook().unwrap_err();
        assert_eq!(err.phase(), "configure");
        let log = fs::read_to_string(kitchen.kitchen_config().log_path()).unwrap();
        assert!(log.contains("=== configure (exit Some(1)) ==="));
    }
}
