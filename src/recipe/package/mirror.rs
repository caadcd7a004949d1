// src/recipe/package/mirror.rs

//! Zero-copy mirror: `cpython-toolchain/{bin,lib,include}` linked back into
//! the package
//!
//! Linking is idempotent. A link already resolving to the right source is
//! left alone, a link pointing elsewhere is replaced, and a real file or
//! directory in the way is never overwritten. When the filesystem refuses
//! the link the entry is copied instead and a warning is recorded.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::stage::copy_dir_all;

/// Mirror directory name below the package root
pub const MIRROR_DIR: &str = "cpython-toolchain";

/// Package subdirectories mirrored
pub const MIRROR_ENTRIES: [&str; 3] = ["bin", "lib", "include"];

/// Creates directory symlinks
pub trait Linker {
    fn symlink_dir(&self, target: &Path, link: &Path) -> io::Result<()>;
}

/// Platform symlinks
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemLinker;

impl Linker for SystemLinker {
    #[cfg(unix)]
    fn symlink_dir(&self, target: &Path, link: &Path) -> io::Result<()> {
        std::os::unix::fs::symlink(target, link)
    }

    #[cfg(windows)]
    fn symlink_dir(&self, target: &Path, link: &Path) -> io::Result<()> {
        std::os::windows::fs::symlink_dir(target, link)
    }

    #[cfg(not(any(unix, windows)))]
    fn symlink_dir(&self, _target: &Path, _link: &Path) -> io::Result<()> {
        Err(io::Error::new(io::ErrorKind::Unsupported, "symlinks not supported"))
    }
}

/// What happened to one mirror entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkOutcome {
    Created,
    Unchanged,
    Replaced,
    /// Symlink failed; the entry is a full copy
    Copied,
    /// A real file or directory is in the way
    Skipped,
}

#[derive(Debug, Clone, Default)]
pub struct MirrorReport {
    pub root: PathBuf,
    pub entries: Vec<(String, LinkOutcome)>,
    pub warnings: Vec<String>,
}

impl MirrorReport {
    pub fn outcome(&self, name: &str) -> Option<LinkOutcome> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, o)| *o)
    }
}

pub struct ZeroCopyMirror<L: Linker = SystemLinker> {
    package_dir: PathBuf,
    linker: L,
}

impl ZeroCopyMirror<SystemLinker> {
    pub fn new(package_dir: &Path) -> Self {
        Self::with_linker(package_dir, SystemLinker)
    }
}

impl<L: Linker> ZeroCopyMirror<L> {
    pub fn with_linker(package_dir: &Path, linker: L) -> Self {
        Self {
            package_dir: package_dir.to_path_buf(),
            linker,
        }
    }

    pub fn root(&self) -> PathBuf {
        self.package_dir.join(MIRROR_DIR)
    }

    /// Link every package entry that exists into the mirror
    pub fn build(&self) -> Result<MirrorReport> {
        let root = self.root();
        fs::create_dir_all(&root)?;

        let mut report = MirrorReport {
            root: root.clone(),
            ..MirrorReport::default()
        };

        for name in MIRROR_ENTRIES {
            let source = self.package_dir.join(name);
            if !source.is_dir() {
                debug!("Package has no {}/, not mirrored", name);
                continue;
            }

            let (outcome, warning) = self.link_entry(&source, &root.join(name))?;
            report.entries.push((name.to_string(), outcome));
            if let Some(w) = warning {
                report.warnings.push(w);
            }
        }

        info!("Zero-copy mirror ready at {}", root.display());
        Ok(report)
    }

    /// Point `dest` at `source`
    pub fn link_entry(&self, source: &Path, dest: &Path) -> Result<(LinkOutcome, Option<String>)> {
        let source = fs::canonicalize(source).map_err(|e| {
            Error::PackagingError(format!("Cannot resolve {}: {}", source.display(), e))
        })?;

        match fs::symlink_metadata(dest) {
            Ok(meta) if meta.file_type().is_symlink() => {
                if resolves_to(dest, &source) {
                    debug!("{} already points at {}", dest.display(), source.display());
                    return Ok((LinkOutcome::Unchanged, None));
                }
                remove_link(dest)?;
                let (outcome, warning) = self.create(&source, dest)?;
                let outcome = match outcome {
                    LinkOutcome::Created => LinkOutcome::Replaced,
                    other => other,
                };
                Ok((outcome, warning))
            }
            Ok(_) => {
                let message = format!(
                    "{} exists and is not a symlink; leaving it in place",
                    dest.display()
                );
                warn!("{}", message);
                Ok((LinkOutcome::Skipped, Some(message)))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => self.create(&source, dest),
            Err(e) => Err(e.into()),
        }
    }

    fn create(&self, source: &Path, dest: &Path) -> Result<(LinkOutcome, Option<String>)> {
        match self.linker.symlink_dir(source, dest) {
            Ok(()) => {
                debug!("Linked {} -> {}", dest.display(), source.display());
                Ok((LinkOutcome::Created, None))
            }
            Err(e) => {
                copy_dir_all(source, dest).map_err(|copy_err| {
                    Error::PackagingError(format!(
                        "Symlink {} failed ({}) and copy fallback failed: {}",
                        dest.display(),
                        e,
                        copy_err
                    ))
                })?;
                let message = format!(
                    "zero-copy not achieved for {}: symlink failed ({}), copied instead",
                    dest.display(),
                    e
                );
                warn!("{}", message);
                Ok((LinkOutcome::Copied, Some(message)))
            }
        }
    }
}

fn resolves_to(link: &Path, source: &Path) -> bool {
    let Ok(target) = fs::read_link(link) else {
        return false;
    };
    let target = match link.parent() {
        Some(parent) if target.is_relative() => parent.join(target),
        _ => target,
    };
    fs::canonicalize(target).is_ok_and(|resolved| resolved == source)
}

fn remove_link(link: &Path) -> Result<()> {
    // Directory symlinks on Windows must be removed as directories
    fs::remove_file(link)
        .or_else(|_| fs::remove_dir(link))
        .map_err(|e| Error::PackagingError(format!("Cannot replace {}: {}", link.display(), e)))
}
