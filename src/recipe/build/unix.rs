// src/recipe/build/unix.rs

//! Linux and FreeBSD: configure, make, make install

use crate::recipe::config::BuildConfiguration;
use crate::recipe::kitchen::{CommandSpec, KitchenConfig};
use crate::settings::{Arch, Os};

use super::BuildOutputs;

/// Enables the OpenSSL-only cipher configuration used for FIPS builds
pub(super) const FIPS_CONFIGURE_FLAG: &str = "--with-ssl-default-suites=openssl";

/// Autotools strategy used on Linux and FreeBSD
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AutotoolsBuild;

impl AutotoolsBuild {
    pub fn steps(&self, config: &BuildConfiguration, kitchen: &KitchenConfig) -> Vec<CommandSpec> {
        let configure = configure_step(config, kitchen).arg(shared_flag(config));
        let [make, install] = make_steps(kitchen);
        vec![configure, make, install]
    }

    pub fn outputs(&self, config: &BuildConfiguration, kitchen: &KitchenConfig) -> BuildOutputs {
        prefix_outputs(config, kitchen.install_dir())
    }
}

fn shared_flag(config: &BuildConfiguration) -> &'static str {
    if config.options.shared {
        "--enable-shared"
    } else {
        "--disable-shared"
    }
}

/// `./configure` with the arguments shared by every configure-based build
pub(super) fn configure_step(config: &BuildConfiguration, kitchen: &KitchenConfig) -> CommandSpec {
    let source_dir = kitchen.source_dir();
    let install_dir = kitchen.install_dir();
    let settings = &config.settings;

    let mut spec = CommandSpec::new(
        "configure",
        source_dir.join("configure").to_string_lossy().into_owned(),
        &source_dir,
    )
    .arg(format!("--prefix={}", install_dir.display()))
    .args([
        "--enable-optimizations",
        "--without-ensurepip",
        "--enable-loadable-sqlite-extensions",
    ]);

    if config.options.fips_enabled() {
        spec = spec.arg(FIPS_CONFIGURE_FLAG);
    }

    if settings.build_type.is_debug() {
        spec = spec.arg("--with-pydebug");
    }

    let build_arch = settings.build_arch.unwrap_or(settings.arch);
    let build_os = settings.build_os.unwrap_or(settings.os);
    if !build_arch.is_x86() {
        spec = spec.arg(format!("--build={}", gnu_triple(build_os, build_arch)));
    }
    if settings.is_cross_building() {
        spec = spec.arg(format!("--host={}", gnu_triple(settings.os, settings.arch)));
    }

    spec
}

/// `make -j<jobs>` followed by `make install`
pub(super) fn make_steps(kitchen: &KitchenConfig) -> [CommandSpec; 2] {
    let source_dir = kitchen.source_dir();
    [
        CommandSpec::new("make", "make", &source_dir).arg(format!("-j{}", kitchen.jobs)),
        CommandSpec::new("install", "make", &source_dir).arg("install"),
    ]
}

/// Standard prefix layout below `root`
pub(super) fn prefix_outputs(config: &BuildConfiguration, root: std::path::PathBuf) -> BuildOutputs {
    BuildOutputs {
        family: config.family(),
        bin_dir: root.join("bin"),
        lib_dir: root.join("lib"),
        stdlib_dir: root.join("lib").join(config.stdlib_dirname()),
        include_dir: root.join("include"),
        root,
    }
}

fn gnu_triple(os: Os, arch: Arch) -> String {
    let cpu = arch.gnu_cpu();
    match (os, arch) {
        (Os::FreeBsd, _) => format!("{}-unknown-freebsd", cpu),
        (Os::Macos, _) => format!("{}-apple-darwin", cpu),
        (_, Arch::Armv7) => format!("{}-unknown-linux-gnueabihf", cpu),
        _ => format!("{}-unknown-linux-gnu", cpu),
    }
}
