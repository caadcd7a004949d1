// src/settings/mod.rs

//! Build settings: target OS, architecture, compiler and build type
//!
//! Settings are supplied by the orchestrator (or detected from the running
//! host) and never change during an invocation. Names follow the Conan
//! conventions (`Linux`, `Macos`, `armv8`, `apple-clang`, `Release`) so the
//! values an orchestrator already has can be passed through unchanged.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Target operating system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Os {
    Linux,
    FreeBsd,
    Windows,
    Macos,
}

/// The three build strategies an OS can map to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OsFamily {
    /// Linux and FreeBSD: autotools configure/make/install
    UnixLike,
    /// Vendor `PCbuild\build.bat` script
    Windows,
    /// Framework-enabled configure/make/install
    MacOS,
}

impl Os {
    pub fn family(&self) -> OsFamily {
        match self {
            Self::Linux | Self::FreeBsd => OsFamily::UnixLike,
            Self::Windows => OsFamily::Windows,
            Self::Macos => OsFamily::MacOS,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Linux => "Linux",
            Self::FreeBsd => "FreeBSD",
            Self::Windows => "Windows",
            Self::Macos => "Macos",
        }
    }

    /// OS of the running process, if supported
    pub fn host() -> Option<Self> {
        match std::env::consts::OS {
            "linux" => Some(Self::Linux),
            "freebsd" => Some(Self::FreeBsd),
            "windows" => Some(Self::Windows),
            "macos" => Some(Self::Macos),
            _ => None,
        }
    }
}

impl FromStr for Os {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "linux" => Ok(Self::Linux),
            "freebsd" => Ok(Self::FreeBsd),
            "windows" => Ok(Self::Windows),
            "macos" | "darwin" => Ok(Self::Macos),
            _ => Err(Error::ConfigurationError(format!(
                "Unsupported os '{}' (expected Linux, FreeBSD, Windows or Macos)",
                s
            ))),
        }
    }
}

impl fmt::Display for Os {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Target CPU architecture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arch {
    X86,
    X86_64,
    Armv7,
    Armv8,
    Ppc64le,
    S390x,
    Riscv64,
}

impl Arch {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::X86 => "x86",
            Self::X86_64 => "x86_64",
            Self::Armv7 => "armv7",
            Self::Armv8 => "armv8",
            Self::Ppc64le => "ppc64le",
            Self::S390x => "s390x",
            Self::Riscv64 => "riscv64",
        }
    }

    pub fn is_x86(&self) -> bool {
        matches!(self, Self::X86 | Self::X86_64)
    }

    /// CPU part of a GNU target triple
    pub fn gnu_cpu(&self) -> &'static str {
        match self {
            Self::X86 => "i686",
            Self::X86_64 => "x86_64",
            Self::Armv7 => "armv7l",
            Self::Armv8 => "aarch64",
            Self::Ppc64le => "powerpc64le",
            Self::S390x => "s390x",
            Self::Riscv64 => "riscv64",
        }
    }

    /// Architecture of the running process, if supported
    pub fn host() -> Option<Self> {
        match std::env::consts::ARCH {
            "x86" => Some(Self::X86),
            "x86_64" => Some(Self::X86_64),
            "arm" => Some(Self::Armv7),
            "aarch64" => Some(Self::Armv8),
            "powerpc64" => Some(Self::Ppc64le),
            "s390x" => Some(Self::S390x),
            "riscv64" => Some(Self::Riscv64),
            _ => None,
        }
    }
}

impl FromStr for Arch {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "x86" | "i686" => Ok(Self::X86),
            "x86_64" | "amd64" => Ok(Self::X86_64),
            "armv7" | "armv7hf" => Ok(Self::Armv7),
            "armv8" | "arm64" | "aarch64" => Ok(Self::Armv8),
            "ppc64le" => Ok(Self::Ppc64le),
            "s390x" => Ok(Self::S390x),
            "riscv64" => Ok(Self::Riscv64),
            _ => Err(Error::ConfigurationError(format!("Unsupported arch '{}'", s))),
        }
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Compiler family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompilerKind {
    Gcc,
    Clang,
    AppleClang,
    Msvc,
}

impl CompilerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gcc => "gcc",
            Self::Clang => "clang",
            Self::AppleClang => "apple-clang",
            Self::Msvc => "msvc",
        }
    }
}

impl FromStr for CompilerKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "gcc" => Ok(Self::Gcc),
            "clang" => Ok(Self::Clang),
            "apple-clang" => Ok(Self::AppleClang),
            "msvc" | "visual studio" => Ok(Self::Msvc),
            _ => Err(Error::ConfigurationError(format!("Unsupported compiler '{}'", s))),
        }
    }
}

/// Compiler family plus version string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Compiler {
    pub kind: CompilerKind,
    pub version: String,
}

impl Compiler {
    pub fn new(kind: CompilerKind, version: impl Into<String>) -> Self {
        Self {
            kind,
            version: version.into(),
        }
    }

    /// MSBuild platform toolset for an msvc compiler version
    ///
    /// Accepts both the `19x` compiler numbering and the Visual Studio
    /// release numbering (`15`, `16`, `17`).
    pub fn msvc_toolset(&self) -> Result<&'static str> {
        if self.kind != CompilerKind::Msvc {
            return Err(Error::ConfigurationError(format!(
                "{} has no MSBuild platform toolset",
                self.kind.as_str()
            )));
        }
        match self.version.as_str() {
            "191" | "15" => Ok("v141"),
            "192" | "16" => Ok("v142"),
            "193" | "194" | "17" => Ok("v143"),
            other => Err(Error::ConfigurationError(format!(
                "Unsupported msvc version '{}' (expected 191-194 or 15-17)",
                other
            ))),
        }
    }
}

impl fmt::Display for Compiler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind.as_str(), self.version)
    }
}

/// CMake-style build type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BuildType {
    #[default]
    Release,
    Debug,
    RelWithDebInfo,
    MinSizeRel,
}

impl BuildType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Release => "Release",
            Self::Debug => "Debug",
            Self::RelWithDebInfo => "RelWithDebInfo",
            Self::MinSizeRel => "MinSizeRel",
        }
    }

    pub fn is_debug(&self) -> bool {
        *self == Self::Debug
    }
}

impl FromStr for BuildType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "release" => Ok(Self::Release),
            "debug" => Ok(Self::Debug),
            "relwithdebinfo" => Ok(Self::RelWithDebInfo),
            "minsizerel" => Ok(Self::MinSizeRel),
            _ => Err(Error::ConfigurationError(format!("Unsupported build_type '{}'", s))),
        }
    }
}

impl fmt::Display for BuildType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Settings tuple for one invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub os: Os,
    pub arch: Arch,
    pub compiler: Compiler,
    pub build_type: BuildType,
    /// OS of the build machine when it differs from the target
    pub build_os: Option<Os>,
    /// Architecture of the build machine when it differs from the target
    pub build_arch: Option<Arch>,
}

impl Settings {
    /// Settings describing the running host, with its conventional compiler
    pub fn detect_host() -> Result<Self> {
        let os = Os::host().ok_or_else(|| {
            Error::ConfigurationError(format!("Unsupported host os '{}'", std::env::consts::OS))
        })?;
        let arch = Arch::host().ok_or_else(|| {
            Error::ConfigurationError(format!(
                "Unsupported host arch '{}'",
                std::env::consts::ARCH
            ))
        })?;
        let compiler = match os {
            Os::Linux => Compiler::new(CompilerKind::Gcc, "13"),
            Os::FreeBsd => Compiler::new(CompilerKind::Clang, "16"),
            Os::Macos => Compiler::new(CompilerKind::AppleClang, "15"),
            Os::Windows => Compiler::new(CompilerKind::Msvc, "193"),
        };

        Ok(Self {
            os,
            arch,
            compiler,
            build_type: BuildType::Release,
            build_os: None,
            build_arch: None,
        })
    }

    /// Whether the build machine differs from the target
    pub fn is_cross_building(&self) -> bool {
        self.build_os.is_some_and(|os| os != self.os)
            || self.build_arch.is_some_and(|arch| arch != self.arch)
    }

    /// Apply a single `key=value` setting
    ///
    /// Keys: `os`, `arch`, `compiler`, `compiler.version`, `build_type`,
    /// `build_os` (alias `os_build`), `build_arch` (alias `arch_build`).
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "os" => self.os = value.parse()?,
            "arch" => self.arch = value.parse()?,
            "compiler" => self.compiler.kind = value.parse()?,
            "compiler.version" | "compiler_version" => self.compiler.version = value.to_string(),
            "build_type" => self.build_type = value.parse()?,
            "build_os" | "os_build" => self.build_os = Some(value.parse()?),
            "build_arch" | "arch_build" => self.build_arch = Some(value.parse()?),
            _ => {
                return Err(Error::ConfigurationError(format!("Unknown setting '{}'", key)));
            }
        }
        Ok(())
    }

    /// Check that the compiler can drive the build strategy for this OS
    pub fn validate(&self) -> Result<()> {
        let is_msvc = self.compiler.kind == CompilerKind::Msvc;
        match self.os.family() {
            OsFamily::Windows => {
                if !is_msvc {
                    return Err(Error::ConfigurationError(format!(
                        "Windows builds require msvc, got {}",
                        self.compiler
                    )));
                }
                self.compiler.msvc_toolset()?;
            }
            OsFamily::UnixLike | OsFamily::MacOS => {
                if is_msvc {
                    return Err(Error::ConfigurationError(format!(
                        "msvc cannot build for {}",
                        self.os
                    )));
                }
            }
        }

        if self.compiler.version.trim().is_empty() {
            return Err(Error::ConfigurationError(
                "compiler.version must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}
