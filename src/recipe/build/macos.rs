// src/recipe/build/macos.rs

//! macOS: framework build

use crate::recipe::config::BuildConfiguration;
use crate::recipe::kitchen::{CommandSpec, KitchenConfig};

use super::BuildOutputs;
use super::unix::{configure_step, make_steps, prefix_outputs};

/// Framework-enabled configure strategy used on macOS
///
/// A framework build always produces a shared `Python` library, so the
/// shared/static switch is not passed to configure.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameworkBuild;

impl FrameworkBuild {
    pub fn steps(&self, config: &BuildConfiguration, kitchen: &KitchenConfig) -> Vec<CommandSpec> {
        let install_dir = kitchen.install_dir();

        let mut configure = configure_step(config, kitchen).arg(format!(
            "--enable-framework={}",
            install_dir.join("Frameworks").display()
        ));
        if let Some(zlib) = &kitchen.zlib_root {
            configure = configure
                .env("CPPFLAGS", format!("-I{}", zlib.join("include").display()))
                .env("LDFLAGS", format!("-L{}", zlib.join("lib").display()));
        }

        let [make, install] = make_steps(kitchen);
        // Keep IDLE.app and friends inside the install prefix
        let install = install.arg(format!(
            "PYTHONAPPSDIR={}",
            install_dir.join("Applications").display()
        ));

        vec![configure, make, install]
    }

    pub fn outputs(&self, config: &BuildConfiguration, kitchen: &KitchenConfig) -> BuildOutputs {
        let root = kitchen
            .install_dir()
            .join("Frameworks")
            .join("Python.framework")
            .join("Versions")
            .join(config.version.short());
        prefix_outputs(config, root)
    }
}
