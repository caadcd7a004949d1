// tests/common/mod.rs

//! Shared test utilities and helpers for integration tests.

#![allow(dead_code)]

use cpython_tool::hash::{self, Checksum};
use cpython_tool::recipe::kitchen::CommandOutput;
use cpython_tool::recipe::{
    BuildConfiguration, CommandRunner, CommandSpec, Kitchen, KitchenConfig, parse_recipe,
};
use cpython_tool::{Arch, BuildType, Compiler, CompilerKind, Os, Settings};
use std::collections::HashMap;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use xz2::write::XzEncoder;

pub const VERSION: &str = "3.12.7";

/// Stands in for configure, make, build.bat, syft and trivy
///
/// Successful install/build steps lay down the tree the real tool would
/// produce, so the packager has something to stage.
#[derive(Default)]
pub struct FakeToolchain {
    calls: Mutex<Vec<CommandSpec>>,
    exit_codes: HashMap<String, i32>,
}

impl FakeToolchain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every command of `phase` exit with `code`
    pub fn fail(mut self, phase: &str, code: i32) -> Self {
        self.exit_codes.insert(phase.to_string(), code);
        self
    }

    pub fn calls(&self) -> Vec<CommandSpec> {
        self.calls.lock().unwrap().clone()
    }

    pub fn phases(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.phase).collect()
    }
}

impl CommandRunner for FakeToolchain {
    fn run(&self, spec: &CommandSpec) -> cpython_tool::Result<CommandOutput> {
        self.calls.lock().unwrap().push(spec.clone());

        let code = self.exit_codes.get(&spec.phase).copied().unwrap_or(0);
        if code == 0 {
            simulate(spec);
        }

        Ok(CommandOutput {
            code: Some(code),
            stdout: format!("{} ok", spec.phase),
            stderr: if code == 0 {
                String::new()
            } else {
                format!("{} failed with {}", spec.phase, code)
            },
        })
    }
}

fn simulate(spec: &CommandSpec) {
    match spec.phase.as_str() {
        "install" => {
            let install = spec.workdir.parent().unwrap().join("install");
            if install.exists() {
                fs::remove_dir_all(&install).unwrap();
            }
            if spec.args.iter().any(|a| a.starts_with("PYTHONAPPSDIR=")) {
                write_framework_tree(&install.join("Frameworks/Python.framework/Versions/3.12"));
            } else {
                write_prefix_tree(&install);
            }
        }
        "build" => {
            let platform = spec
                .args
                .iter()
                .skip_while(|a| *a != "-p")
                .nth(1)
                .unwrap();
            let out = match platform.as_str() {
                "Win32" => "win32",
                "ARM64" => "arm64",
                _ => "amd64",
            };
            let out = spec.workdir.join("PCbuild").join(out);
            fs::create_dir_all(&out).unwrap();
            for name in ["python.exe", "pythonw.exe", "python312.dll", "python3.dll", "_ssl.pyd", "_sqlite3.pyd"] {
                fs::write(out.join(name), name).unwrap();
            }
        }
        "sbom" => {
            let target = spec
                .args
                .iter()
                .find_map(|a| a.strip_prefix("cyclonedx-json="))
                .unwrap();
            fs::write(target, r#"{"bomFormat":"CycloneDX","specVersion":"1.5"}"#).unwrap();
        }
        _ => {}
    }
}

/// What `make install` leaves below a prefix
pub fn write_prefix_tree(root: &Path) {
    write_common_tree(root);
    fs::write(root.join("lib/libpython3.12.so.1.0"), "shared object").unwrap();

    #[cfg(unix)]
    std::os::unix::fs::symlink("libpython3.12.so.1.0", root.join("lib/libpython3.12.so")).unwrap();
}

/// A framework version directory: the library is `Python`, linked from `lib/`
pub fn write_framework_tree(root: &Path) {
    write_common_tree(root);
    fs::write(root.join("Python"), "framework dylib").unwrap();

    #[cfg(unix)]
    std::os::unix::fs::symlink("../Python", root.join("lib/libpython3.12.dylib")).unwrap();
}

fn write_common_tree(root: &Path) {
    let stdlib = root.join("lib/python3.12");
    fs::create_dir_all(root.join("bin")).unwrap();
    fs::create_dir_all(stdlib.join("config-3.12-x86_64-linux-gnu")).unwrap();
    fs::create_dir_all(stdlib.join("json")).unwrap();
    fs::create_dir_all(root.join("include/python3.12")).unwrap();

    fs::write(root.join("bin/python3.12"), "interpreter").unwrap();
    fs::write(stdlib.join("os.py"), "import abc\n").unwrap();
    fs::write(stdlib.join("json/__init__.py"), "").unwrap();
    fs::write(stdlib.join("config-3.12-x86_64-linux-gnu/libpython3.12.a"), "archive").unwrap();
    fs::write(root.join("include/python3.12/Python.h"), "#pragma once\n").unwrap();

    #[cfg(unix)]
    std::os::unix::fs::symlink("python3.12", root.join("bin/python3")).unwrap();
}

/// Put an upstream-shaped source archive into the cache, returning its checksum
pub fn seed_source_cache(cache: &Path) -> Checksum {
    fs::create_dir_all(cache).unwrap();
    let archive = cache.join(format!("Python-{}.tar.xz", VERSION));

    let file = File::create(&archive).unwrap();
    let mut builder = tar::Builder::new(XzEncoder::new(file, 6));
    let prefix = format!("Python-{}", VERSION);
    for (name, data) in [
        ("configure", &b"#!/bin/sh\n"[..]),
        ("Lib/os.py", &b"import abc\n"[..]),
        ("Include/Python.h", &b"#pragma once\n"[..]),
        ("PCbuild/build.bat", &b"@echo off\n"[..]),
    ] {
        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(0o755);
        header.set_cksum();
        builder
            .append_data(&mut header, format!("{}/{}", prefix, name), data)
            .unwrap();
    }
    builder.into_inner().unwrap().finish().unwrap();

    hash::hash_file(&archive).unwrap()
}

pub fn settings(os: Os) -> Settings {
    let compiler = match os {
        Os::Windows => Compiler::new(CompilerKind::Msvc, "193"),
        Os::Macos => Compiler::new(CompilerKind::AppleClang, "15"),
        _ => Compiler::new(CompilerKind::Gcc, "13"),
    };
    Settings {
        os,
        arch: Arch::X86_64,
        compiler,
        build_type: BuildType::Release,
        build_os: None,
        build_arch: None,
    }
}

/// A scratch workspace with a seeded source cache
pub struct Workspace {
    pub dir: tempfile::TempDir,
    pub checksum: Checksum,
}

impl Workspace {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let checksum = seed_source_cache(&dir.path().join("sources"));
        Self { dir, checksum }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn package_dir(&self) -> PathBuf {
        self.root().join("package")
    }

    /// Kitchen for `os` with `options` appended to the `[options]` table
    pub fn kitchen(&self, os: Os, options: &str, runner: Arc<FakeToolchain>) -> Kitchen {
        let recipe = format!(
            "[source]\nurl = \"http://127.0.0.1:9/Python-%(version)s.tar.xz\"\nchecksum = \"{}\"\n\n[options]\n{}\n",
            self.checksum, options
        );
        let config = BuildConfiguration::from_recipe(&parse_recipe(&recipe).unwrap(), settings(os)).unwrap();
        Kitchen::with_runner(config, KitchenConfig::in_dir(self.root()), runner).unwrap()
    }
}
