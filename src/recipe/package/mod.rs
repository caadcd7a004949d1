// src/recipe/package/mod.rs

//! Packager: copies build outputs into the canonical package layout
//!
//! The package directory is only publishable once the marker file exists.
//! The marker is removed before anything is staged and written after every
//! other step, including the security gate, has succeeded. A failure at any
//! point therefore leaves a directory consumers refuse to read.

mod mirror;
mod stage;

pub use mirror::{LinkOutcome, Linker, MIRROR_DIR, MIRROR_ENTRIES, MirrorReport, SystemLinker, ZeroCopyMirror};
pub use stage::{StagedFile, Stager, copy_dir_all};

use crate::error::{Error, Result};
use crate::hash;
use crate::recipe::build::{BuildOutputs, BuildReport};
use crate::recipe::config::BuildConfiguration;
use crate::recipe::kitchen::{CommandSpec, Cook, KitchenConfig};
use crate::recipe::security::SecurityGate;
use crate::settings::OsFamily;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Marker written last; its presence makes the package publishable
pub const MARKER_FILE: &str = ".cpython-tool.json";

/// SBOM name inside the package
pub const SBOM_FILE: &str = "sbom.json";

/// Static archives never enter the package
const EXCLUDED_EXTENSIONS: [&str; 1] = ["a"];

const FIPS_CHECK: &str = "import _hashlib, sys; sys.exit(0 if _hashlib.get_fips_mode() else 1)";

/// The staged package, as recorded in the marker file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagedArtifact {
    pub name: String,
    pub version: String,
    pub family: OsFamily,
    /// Interpreter path relative to the package directory
    pub interpreter: PathBuf,
    pub files: Vec<StagedFile>,
    /// Mirror root relative to the package directory
    #[serde(default)]
    pub mirror: Option<PathBuf>,
    #[serde(default)]
    pub sbom: Option<PathBuf>,
    pub fips_verified: bool,
    pub staged_at: DateTime<Utc>,
}

impl StagedArtifact {
    pub fn marker_path(package_dir: &Path) -> PathBuf {
        package_dir.join(MARKER_FILE)
    }

    pub fn is_publishable(package_dir: &Path) -> bool {
        Self::marker_path(package_dir).is_file()
    }

    /// Read the marker of a finished package
    pub fn load(package_dir: &Path) -> Result<Self> {
        let marker = Self::marker_path(package_dir);
        let content = fs::read_to_string(&marker).map_err(|_| {
            Error::PackagingError(format!(
                "{} is not a publishable package (no {})",
                package_dir.display(),
                MARKER_FILE
            ))
        })?;
        serde_json::from_str(&content)
            .map_err(|e| Error::ParseError(format!("Invalid package marker {}: {}", marker.display(), e)))
    }

    fn write_marker(&self, package_dir: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| Error::PackagingError(format!("Failed to serialize package marker: {}", e)))?;
        fs::write(Self::marker_path(package_dir), json)?;
        Ok(())
    }
}

/// Run the packaging phase
pub fn package(config: &BuildConfiguration, kitchen: &KitchenConfig, cook: &mut Cook<'_>) -> Result<StagedArtifact> {
    let report = BuildReport::load(&kitchen.report_path())?;
    if report.outputs.family != config.family() {
        return Err(Error::PackagingError(format!(
            "Build report is for {:?} but the configuration targets {:?}",
            report.outputs.family,
            config.family()
        )));
    }

    let package_dir = &kitchen.package_dir;
    let marker = StagedArtifact::marker_path(package_dir);
    if marker.exists() {
        debug!("Removing stale marker {}", marker.display());
        fs::remove_file(&marker)?;
    }
    fs::create_dir_all(package_dir)?;

    info!("Packaging {} {} into {}", config.name, config.version, package_dir.display());

    let mut stager = Stager::new(package_dir);
    let interpreter = match config.family() {
        OsFamily::UnixLike | OsFamily::MacOS => stage_prefix_layout(config, &report.outputs, &mut stager)?,
        OsFamily::Windows => stage_windows_layout(config, &report.outputs, &mut stager)?,
    };

    let sbom = match &report.sbom {
        Some(record) => {
            hash::verify_file(&record.path, &record.checksum()?).map_err(|e| {
                Error::PackagingError(format!("SBOM {} changed since the build: {}", record.path.display(), e))
            })?;
            stager.copy_file(&record.path, Path::new(SBOM_FILE))?;
            Some(PathBuf::from(SBOM_FILE))
        }
        None => None,
    };

    let files = stager.into_staged();
    info!("Staged {} files", files.len());

    let mirror = prepare_mirror(config, package_dir, cook)?;

    let fips_verified = if config.options.fips_enabled() {
        verify_fips(config, package_dir, &interpreter, cook)?;
        true
    } else {
        false
    };

    if config.options.vulnerability_scan {
        SecurityGate::new(&config.security).scan(cook, package_dir)?;
    }

    let artifact = StagedArtifact {
        name: config.name.clone(),
        version: config.version.to_string(),
        family: config.family(),
        interpreter,
        files,
        mirror,
        sbom,
        fips_verified,
        staged_at: Utc::now(),
    };
    artifact.write_marker(package_dir)?;
    info!("Package {} is publishable", package_dir.display());

    Ok(artifact)
}

/// bin/, lib/, lib/python<X.Y>/ and include/ from an install prefix
fn stage_prefix_layout(config: &BuildConfiguration, outputs: &BuildOutputs, stager: &mut Stager<'_>) -> Result<PathBuf> {
    let bin = Path::new("bin");
    let lib = Path::new("lib");

    if stager.copy_matching(&outputs.bin_dir, "python*", bin, &EXCLUDED_EXTENSIONS)? == 0 {
        return Err(Error::PackagingError(format!(
            "No interpreter found in {}",
            outputs.bin_dir.display()
        )));
    }
    stager.copy_matching(&outputs.lib_dir, "libpython*", lib, &EXCLUDED_EXTENSIONS)?;
    if config.family() == OsFamily::MacOS {
        stage_framework_library(config, outputs, stager)?;
    }
    stager.copy_tree(
        &outputs.stdlib_dir,
        &lib.join(config.stdlib_dirname()),
        &EXCLUDED_EXTENSIONS,
    )?;
    if outputs.include_dir.is_dir() {
        stager.copy_tree(&outputs.include_dir, Path::new("include"), &EXCLUDED_EXTENSIONS)?;
    }

    let interpreter = bin.join(config.interpreter_name());
    ensure_interpreter(config, outputs, stager, &interpreter)?;
    Ok(interpreter)
}

/// A framework's `lib/libpython<X.Y>.dylib` is a link to `../Python`, which
/// lies outside `lib/`; the library itself takes the link's place
fn stage_framework_library(config: &BuildConfiguration, outputs: &BuildOutputs, stager: &mut Stager<'_>) -> Result<()> {
    let library = outputs.root.join("Python");
    if !library.is_file() {
        return Err(Error::PackagingError(format!(
            "Framework library {} is missing",
            library.display()
        )));
    }

    let dylib = Path::new("lib").join(format!("libpython{}.dylib", config.version.short()));
    debug!("Publishing {} as {}", library.display(), dylib.display());
    stager.copy_file(&library, &dylib)
}

/// `make install` only ships `python3` and `python3.12`; add a `python` entry
fn ensure_interpreter(
    config: &BuildConfiguration,
    outputs: &BuildOutputs,
    stager: &mut Stager<'_>,
    interpreter: &Path,
) -> Result<()> {
    let versioned = format!("python{}", config.version.short());
    let candidates = [versioned.as_str(), "python3"];

    if outputs.bin_dir.join(config.interpreter_name()).exists() {
        return Ok(());
    }
    let Some(source) = candidates
        .iter()
        .map(|name| outputs.bin_dir.join(name))
        .find(|p| p.exists())
    else {
        return Err(Error::PackagingError(format!(
            "No python executable in {}",
            outputs.bin_dir.display()
        )));
    };

    debug!("Publishing {} as {}", source.display(), interpreter.display());
    stager.copy_file(&source, interpreter)
}

/// PCbuild outputs plus the source tree's Lib/ and Include/
fn stage_windows_layout(config: &BuildConfiguration, outputs: &BuildOutputs, stager: &mut Stager<'_>) -> Result<PathBuf> {
    let bin = Path::new("bin");
    let lib = Path::new("lib");

    let exes = stager.copy_matching(&outputs.bin_dir, "python*.exe", bin, &[])?;
    if exes == 0 {
        return Err(Error::PackagingError(format!(
            "No python*.exe found in {}",
            outputs.bin_dir.display()
        )));
    }
    stager.copy_matching(&outputs.bin_dir, "python*.dll", bin, &[])?;
    // Debug builds name it python312_d.dll
    let runtime = format!("python{}", config.version.nodot());
    if ![".dll", "_d.dll"]
        .iter()
        .any(|suffix| outputs.bin_dir.join(format!("{}{}", runtime, suffix)).is_file())
    {
        return Err(Error::PackagingError(format!(
            "Runtime library {}.dll not found in {}",
            runtime,
            outputs.bin_dir.display()
        )));
    }
    stager.copy_matching(&outputs.lib_dir, "*.pyd", lib, &[])?;
    stager.copy_tree(
        &outputs.stdlib_dir,
        &lib.join(config.stdlib_dirname()),
        &EXCLUDED_EXTENSIONS,
    )?;
    if outputs.include_dir.is_dir() {
        stager.copy_tree(&outputs.include_dir, Path::new("include"), &[])?;
    }

    let interpreter = bin.join(config.interpreter_name());
    let debug_exe = outputs.bin_dir.join("python_d.exe");
    if !outputs.bin_dir.join("python.exe").exists() && debug_exe.exists() {
        stager.copy_file(&debug_exe, &interpreter)?;
    }
    Ok(interpreter)
}

/// Build the mirror when zero-copy is enabled, otherwise drop a stale one
fn prepare_mirror(config: &BuildConfiguration, package_dir: &Path, cook: &mut Cook<'_>) -> Result<Option<PathBuf>> {
    if !config.options.enable_zero_copy {
        let stale = package_dir.join(MIRROR_DIR);
        if fs::symlink_metadata(&stale).is_ok() {
            info!("Zero-copy disabled; removing {}", stale.display());
            fs::remove_dir_all(&stale)?;
        }
        return Ok(None);
    }

    let report = ZeroCopyMirror::new(package_dir).build()?;
    for warning in report.warnings {
        cook.warn(warning);
    }
    Ok(Some(PathBuf::from(MIRROR_DIR)))
}

/// Run the packaged interpreter and require FIPS mode to be reported
fn verify_fips(config: &BuildConfiguration, package_dir: &Path, interpreter: &Path, cook: &mut Cook<'_>) -> Result<()> {
    info!("Verifying FIPS mode of the packaged interpreter");

    let program = package_dir.join(interpreter);
    let mut spec = CommandSpec::new("fips-check", program.to_string_lossy().into_owned(), package_dir)
        .args(["-c", FIPS_CHECK])
        .env("PYTHONHOME", package_dir.to_string_lossy().into_owned());
    if config.options.shared && config.family() == OsFamily::UnixLike {
        spec = spec.env("LD_LIBRARY_PATH", package_dir.join("lib").to_string_lossy().into_owned());
    }

    let output = cook.run_tool(&spec).map_err(|e| {
        Error::PackagingError(format!("FIPS self-check could not run: {}", e))
    })?;
    if !output.success() {
        return Err(Error::PackagingError(format!(
            "FIPS self-check failed (exit {:?}): {}",
            output.code,
            output.stderr.trim()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recipe::format::RecipeFile;
    use crate::recipe::kitchen::testing::RecordingRunner;
    use crate::recipe::options::RecipeOptions;
    use crate::recipe::security::SbomRecord;
    use crate::settings::{Arch, BuildType, Compiler, CompilerKind, Os, Settings};
    use std::collections::BTreeMap;

    fn config(options: RecipeOptions) -> BuildConfiguration {
        let settings = Settings {
            os: Os::Linux,
            arch: Arch::X86_64,
            compiler: Compiler::new(CompilerKind::Gcc, "13"),
            build_type: BuildType::Release,
            build_os: None,
            build_arch: None,
        };
        let recipe = RecipeFile {
            options,
            ..RecipeFile::default()
        };
        BuildConfiguration::from_recipe(&recipe, settings).unwrap()
    }

    /// Lay out a fake `make install` tree and its build report
    fn fake_install(kitchen: &KitchenConfig, sbom: Option<SbomRecord>) -> BuildOutputs {
        let root = kitchen.install_dir();
        let outputs = BuildOutputs {
            family: OsFamily::UnixLike,
            bin_dir: root.join("bin"),
            lib_dir: root.join("lib"),
            stdlib_dir: root.join("lib/python3.12"),
            include_dir: root.join("include"),
            root: root.clone(),
        };
        fs::create_dir_all(&outputs.bin_dir).unwrap();
        fs::create_dir_all(outputs.stdlib_dir.join("config-3.12-x86_64-linux-gnu")).unwrap();
        fs::create_dir_all(outputs.include_dir.join("python3.12")).unwrap();
        fs::write(outputs.bin_dir.join("python3.12"), "elf").unwrap();
        fs::write(outputs.bin_dir.join("python3.12-config"), "#!/bin/sh").unwrap();
        fs::write(outputs.stdlib_dir.join("os.py"), "").unwrap();
        fs::write(
            outputs.stdlib_dir.join("config-3.12-x86_64-linux-gnu/libpython3.12.a"),
            "ar",
        )
        .unwrap();
        fs::write(outputs.include_dir.join("python3.12/Python.h"), "").unwrap();

        BuildReport {
            version: "3.12.7".to_string(),
            strategy: "autotools".to_string(),
            outputs: outputs.clone(),
            variables: BTreeMap::new(),
            sbom,
        }
        .save(&kitchen.report_path())
        .unwrap();
        outputs
    }

    #[test]
    fn test_package_layout() {
        let temp = tempfile::tempdir().unwrap();
        let kitchen = KitchenConfig::in_dir(temp.path());
        fake_install(&kitchen, None);
        let runner = RecordingRunner::new();
        let mut cook = Cook::new(&runner);

        let artifact = package(&config(RecipeOptions::default()), &kitchen, &mut cook).unwrap();
        let pkg = &kitchen.package_dir;

        assert!(pkg.join("bin/python").is_file());
        assert!(pkg.join("bin/python3.12").is_file());
        assert!(pkg.join("lib/python3.12/os.py").is_file());
        assert!(!pkg.join("lib/python3.12/config-3.12-x86_64-linux-gnu/libpython3.12.a").exists());
        assert!(pkg.join("include/python3.12/Python.h").is_file());
        assert_eq!(artifact.interpreter, PathBuf::from("bin/python"));
        assert_eq!(artifact.mirror, Some(PathBuf::from(MIRROR_DIR)));
        assert!(pkg.join(MIRROR_DIR).join("bin").exists());
        assert!(StagedArtifact::is_publishable(pkg));
        assert_eq!(StagedArtifact::load(pkg).unwrap(), artifact);
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn test_without_build_report() {
        let temp = tempfile::tempdir().unwrap();
        let kitchen = KitchenConfig::in_dir(temp.path());
        let runner = RecordingRunner::new();
        let mut cook = Cook::new(&runner);
        assert!(matches!(
            package(&config(RecipeOptions::default()), &kitchen, &mut cook),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_zero_copy_disabled_removes_mirror() {
        let temp = tempfile::tempdir().unwrap();
        let kitchen = KitchenConfig::in_dir(temp.path());
        fake_install(&kitchen, None);
        fs::create_dir_all(kitchen.package_dir.join(MIRROR_DIR).join("bin")).unwrap();
        let runner = RecordingRunner::new();
        let mut cook = Cook::new(&runner);

        let options = RecipeOptions {
            enable_zero_copy: false,
            ..RecipeOptions::default()
        };
        let artifact = package(&config(options), &kitchen, &mut cook).unwrap();
        assert!(artifact.mirror.is_none());
        assert!(!kitchen.package_dir.join(MIRROR_DIR).exists());
    }

    #[test]
    fn test_scan_failure_leaves_package_unpublishable() {
        let temp = tempfile::tempdir().unwrap();
        let kitchen = KitchenConfig::in_dir(temp.path());
        fake_install(&kitchen, None);
        // A previous successful run left a marker behind
        fs::create_dir_all(&kitchen.package_dir).unwrap();
        fs::write(kitchen.package_dir.join(MARKER_FILE), "{}").unwrap();

        let runner = RecordingRunner::new().fail_phase("scan", 1);
        let mut cook = Cook::new(&runner);
        let options = RecipeOptions {
            vulnerability_scan: true,
            ..RecipeOptions::default()
        };

        let result = package(&config(options), &kitchen, &mut cook);
        assert!(matches!(result, Err(Error::SecurityGateError(_))));
        assert!(!StagedArtifact::is_publishable(&kitchen.package_dir));
        assert!(StagedArtifact::load(&kitchen.package_dir).is_err());
    }

    #[test]
    fn test_sbom_copied_after_hash_check() {
        let temp = tempfile::tempdir().unwrap();
        let kitchen = KitchenConfig::in_dir(temp.path());
        fs::create_dir_all(&kitchen.work_dir).unwrap();
        fs::write(kitchen.sbom_path(), "{\"bomFormat\":\"CycloneDX\"}").unwrap();
        let record = SbomRecord {
            path: kitchen.sbom_path(),
            sha256: hash::hash_file(&kitchen.sbom_path()).unwrap().as_str().to_string(),
        };
        fake_install(&kitchen, Some(record));
        let runner = RecordingRunner::new();
        let mut cook = Cook::new(&runner);

        let artifact = package(&config(RecipeOptions::default()), &kitchen, &mut cook).unwrap();
        assert_eq!(artifact.sbom, Some(PathBuf::from(SBOM_FILE)));
        assert!(kitchen.package_dir.join(SBOM_FILE).is_file());
    }

    #[test]
    fn test_tampered_sbom_rejected() {
        let temp = tempfile::tempdir().unwrap();
        let kitchen = KitchenConfig::in_dir(temp.path());
        fs::create_dir_all(&kitchen.work_dir).unwrap();
        fs::write(kitchen.sbom_path(), "original").unwrap();
        let record = SbomRecord {
            path: kitchen.sbom_path(),
            sha256: hash::hash_file(&kitchen.sbom_path()).unwrap().as_str().to_string(),
        };
        fake_install(&kitchen, Some(record));
        fs::write(kitchen.sbom_path(), "edited").unwrap();
        let runner = RecordingRunner::new();
        let mut cook = Cook::new(&runner);

        let result = package(&config(RecipeOptions::default()), &kitchen, &mut cook);
        assert!(matches!(result, Err(Error::PackagingError(_))));
        assert!(!StagedArtifact::is_publishable(&kitchen.package_dir));
    }

    #[test]
    fn test_fips_self_check() {
        let temp = tempfile::tempdir().unwrap();
        let kitchen = KitchenConfig::in_dir(temp.path());
        fake_install(&kitchen, None);
        let options = RecipeOptions {
            fips: Some(true),
            ..RecipeOptions::default()
        };

        let runner = RecordingRunner::new();
        let mut cook = Cook::new(&runner);
        let artifact = package(&config(options.clone()), &kitchen, &mut cook).unwrap();
        assert!(artifact.fips_verified);
        assert_eq!(runner.phases(), vec!["fips-check"]);
        assert!(runner.calls()[0].program.ends_with("python"));

        let runner = RecordingRunner::new().fail_phase("fips-check", 1);
        let mut cook = Cook::new(&runner);
        let result = package(&config(options), &kitchen, &mut cook);
        assert!(matches!(result, Err(Error::PackagingError(_))));
        assert!(!StagedArtifact::is_publishable(&kitchen.package_dir));
    }

    #[cfg(unix)]
    #[test]
    fn test_framework_library_staged_into_lib() {
        let temp = tempfile::tempdir().unwrap();
        let kitchen = KitchenConfig::in_dir(temp.path());
        let settings = Settings {
            os: Os::Macos,
            arch: Arch::Armv8,
            compiler: Compiler::new(CompilerKind::AppleClang, "15"),
            build_type: BuildType::Release,
            build_os: None,
            build_arch: None,
        };
        let recipe = RecipeFile {
            options: RecipeOptions {
                enable_zero_copy: false,
                ..RecipeOptions::default()
            },
            ..RecipeFile::default()
        };
        let config = BuildConfiguration::from_recipe(&recipe, settings).unwrap();

        let root = kitchen.install_dir().join("Frameworks/Python.framework/Versions/3.12");
        let outputs = BuildOutputs {
            family: OsFamily::MacOS,
            bin_dir: root.join("bin"),
            lib_dir: root.join("lib"),
            stdlib_dir: root.join("lib/python3.12"),
            include_dir: root.join("include"),
            root: root.clone(),
        };
        fs::create_dir_all(&outputs.bin_dir).unwrap();
        fs::create_dir_all(&outputs.stdlib_dir).unwrap();
        fs::write(outputs.bin_dir.join("python3.12"), "macho").unwrap();
        fs::write(outputs.stdlib_dir.join("os.py"), "").unwrap();
        fs::write(root.join("Python"), "framework dylib").unwrap();
        std::os::unix::fs::symlink("../Python", outputs.lib_dir.join("libpython3.12.dylib")).unwrap();
        BuildReport {
            version: "3.12.7".to_string(),
            strategy: "framework".to_string(),
            outputs,
            variables: BTreeMap::new(),
            sbom: None,
        }
        .save(&kitchen.report_path())
        .unwrap();

        let runner = RecordingRunner::new();
        let mut cook = Cook::new(&runner);
        let artifact = package(&config, &kitchen, &mut cook).unwrap();

        let dylib = kitchen.package_dir.join("lib/libpython3.12.dylib");
        assert!(!fs::symlink_metadata(&dylib).unwrap().file_type().is_symlink());
        assert_eq!(fs::read_to_string(&dylib).unwrap(), "framework dylib");
        let entries = artifact
            .files
            .iter()
            .filter(|f| f.destination == Path::new("lib/libpython3.12.dylib"))
            .count();
        assert_eq!(entries, 1);
    }

    #[test]
    fn test_windows_requires_runtime_dll() {
        let temp = tempfile::tempdir().unwrap();
        let kitchen = KitchenConfig::in_dir(temp.path());
        let settings = Settings {
            os: Os::Windows,
            arch: Arch::X86_64,
            compiler: Compiler::new(CompilerKind::Msvc, "193"),
            build_type: BuildType::Release,
            build_os: None,
            build_arch: None,
        };
        let recipe = RecipeFile {
            options: RecipeOptions {
                enable_zero_copy: false,
                ..RecipeOptions::default()
            },
            ..RecipeFile::default()
        };
        let config = BuildConfiguration::from_recipe(&recipe, settings).unwrap();

        let source = kitchen.source_dir();
        let root = source.join("PCbuild/amd64");
        fs::create_dir_all(&root).unwrap();
        fs::create_dir_all(source.join("Lib")).unwrap();
        fs::write(root.join("python.exe"), "pe").unwrap();
        fs::write(source.join("Lib/os.py"), "").unwrap();
        BuildReport {
            version: "3.12.7".to_string(),
            strategy: "build.bat".to_string(),
            outputs: BuildOutputs {
                family: OsFamily::Windows,
                bin_dir: root.clone(),
                lib_dir: root.clone(),
                stdlib_dir: source.join("Lib"),
                include_dir: source.join("Include"),
                root: root.clone(),
            },
            variables: BTreeMap::new(),
            sbom: None,
        }
        .save(&kitchen.report_path())
        .unwrap();

        let runner = RecordingRunner::new();
        let mut cook = Cook::new(&runner);
        assert!(matches!(
            package(&config, &kitchen, &mut cook),
            Err(Error::PackagingError(_))
        ));

        fs::write(root.join("python312_d.dll"), "pe").unwrap();
        let mut cook = Cook::new(&runner);
        package(&config, &kitchen, &mut cook).unwrap();
        assert!(kitchen.package_dir.join("bin/python312_d.dll").is_file());
    }
}
