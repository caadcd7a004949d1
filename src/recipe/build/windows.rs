// src/recipe/build/windows.rs

//! Windows: the vendor `PCbuild\build.bat` script
//!
//! There is no install step; binaries and extension modules are read straight
//! from the per-platform output directory under `PCbuild`.

use crate::error::{Error, Result};
use crate::recipe::config::BuildConfiguration;
use crate::recipe::kitchen::{CommandSpec, KitchenConfig};
use crate::settings::Arch;

use super::BuildOutputs;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VendorScriptBuild;

impl VendorScriptBuild {
    pub fn steps(&self, config: &BuildConfiguration, kitchen: &KitchenConfig) -> Result<Vec<CommandSpec>> {
        let source_dir = kitchen.source_dir();
        let (platform, _) = platform(config.settings.arch)?;
        let toolset = config.settings.compiler.msvc_toolset()?;
        let script = source_dir.join("PCbuild").join("build.bat");

        let spec = CommandSpec::new("build", script.to_string_lossy().into_owned(), &source_dir)
            .args(["-e", "-p", platform, "-c", configuration(config)])
            .arg(format!("/p:PlatformToolset={}", toolset));

        Ok(vec![spec])
    }

    pub fn outputs(&self, config: &BuildConfiguration, kitchen: &KitchenConfig) -> Result<BuildOutputs> {
        let source_dir = kitchen.source_dir();
        let (_, out_dir) = platform(config.settings.arch)?;
        let root = source_dir.join("PCbuild").join(out_dir);

        Ok(BuildOutputs {
            family: config.family(),
            bin_dir: root.clone(),
            lib_dir: root.clone(),
            stdlib_dir: source_dir.join("Lib"),
            include_dir: source_dir.join("Include"),
            root,
        })
    }
}

/// `-p` value and output directory for an architecture
fn platform(arch: Arch) -> Result<(&'static str, &'static str)> {
    match arch {
        Arch::X86 => Ok(("Win32", "win32")),
        Arch::X86_64 => Ok(("x64", "amd64")),
        Arch::Armv8 => Ok(("ARM64", "arm64")),
        other => Err(Error::ConfigurationError(format!(
            "build.bat has no platform for arch '{}'",
            other
        ))),
    }
}

/// build.bat only knows Release and Debug
fn configuration(config: &BuildConfiguration) -> &'static str {
    if config.settings.build_type.is_debug() {
        "Debug"
    } else {
        "Release"
    }
}
