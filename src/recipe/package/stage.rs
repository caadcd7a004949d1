// src/recipe/package/stage.rs

//! File copy helpers used while staging the package layout
//!
//! Symlinks are recreated rather than followed where the platform supports
//! it, so `libpython3.12.so -> libpython3.12.so.1.0` survives staging.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// A file copied into the package
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagedFile {
    pub source: PathBuf,
    /// Path relative to the package directory
    pub destination: PathBuf,
}

/// Copies build outputs below a package root
pub struct Stager<'a> {
    package_dir: &'a Path,
    staged: Vec<StagedFile>,
}

impl<'a> Stager<'a> {
    pub fn new(package_dir: &'a Path) -> Self {
        Self {
            package_dir,
            staged: Vec::new(),
        }
    }

    /// Copy every entry of `src_dir` matching `pattern` into `dest` (relative)
    ///
    /// Returns the number of entries copied; a missing `src_dir` copies nothing.
    pub fn copy_matching(&mut self, src_dir: &Path, pattern: &str, dest: &Path, exclude: &[&str]) -> Result<usize> {
        // Only `pattern` is a glob; the directory may contain `[`, `*` or `?`
        let escaped = glob::Pattern::escape(&src_dir.to_string_lossy());
        let full = Path::new(&escaped).join(pattern);
        let full = full.to_string_lossy();
        let entries = glob::glob(&full)
            .map_err(|e| Error::PackagingError(format!("Invalid pattern {}: {}", full, e)))?;

        let mut count = 0;
        for entry in entries {
            let path = entry.map_err(|e| Error::PackagingError(format!("Cannot read {}: {}", e.path().display(), e)))?;
            if is_excluded(&path, exclude) {
                continue;
            }
            let Some(name) = path.file_name() else { continue };
            let target = dest.join(name);

            if path.is_dir() && !is_symlink(&path) {
                count += self.copy_tree(&path, &target, exclude)?;
            } else {
                self.copy_file(&path, &target)?;
                count += 1;
            }
        }
        Ok(count)
    }

    /// Recursively copy `src` into `dest` (relative), skipping excluded extensions
    pub fn copy_tree(&mut self, src: &Path, dest: &Path, exclude: &[&str]) -> Result<usize> {
        if !src.is_dir() {
            return Err(Error::PackagingError(format!(
                "Expected directory {} is missing",
                src.display()
            )));
        }

        let mut count = 0;
        for entry in WalkDir::new(src).follow_links(false) {
            let entry = entry.map_err(|e| Error::PackagingError(format!("Walking {}: {}", src.display(), e)))?;
            let rel = entry
                .path()
                .strip_prefix(src)
                .map_err(|e| Error::PackagingError(e.to_string()))?;
            let target = dest.join(rel);

            if entry.file_type().is_dir() {
                fs::create_dir_all(self.package_dir.join(&target))?;
                continue;
            }
            if is_excluded(entry.path(), exclude) {
                debug!("Excluding {}", entry.path().display());
                continue;
            }

            self.copy_file(entry.path(), &target)?;
            count += 1;
        }
        Ok(count)
    }

    /// Copy a single file to `dest` (relative), preserving symlinks
    pub fn copy_file(&mut self, src: &Path, dest: &Path) -> Result<()> {
        let absolute = self.package_dir.join(dest);
        if let Some(parent) = absolute.parent() {
            fs::create_dir_all(parent)?;
        }
        if fs::symlink_metadata(&absolute).is_ok() {
            fs::remove_file(&absolute)?;
        }

        copy_entry(src, &absolute).map_err(|e| {
            Error::PackagingError(format!(
                "Failed to copy {} to {}: {}",
                src.display(),
                absolute.display(),
                e
            ))
        })?;

        self.staged.retain(|f| f.destination != dest);
        self.staged.push(StagedFile {
            source: src.to_path_buf(),
            destination: dest.to_path_buf(),
        });
        Ok(())
    }

    pub fn into_staged(self) -> Vec<StagedFile> {
        self.staged
    }
}

fn is_symlink(path: &Path) -> bool {
    fs::symlink_metadata(path)
        .map(|m| m.file_type().is_symlink())
        .unwrap_or(false)
}

fn is_excluded(path: &Path, exclude: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| exclude.contains(&ext))
}

#[cfg(unix)]
fn copy_entry(src: &Path, dest: &Path) -> std::io::Result<()> {
    if is_symlink(src) {
        let target = fs::read_link(src)?;
        std::os::unix::fs::symlink(target, dest)
    } else {
        fs::copy(src, dest).map(|_| ())
    }
}

#[cfg(not(unix))]
fn copy_entry(src: &Path, dest: &Path) -> std::io::Result<()> {
    fs::copy(src, dest).map(|_| ())
}

/// Plain recursive copy of a directory to an absolute destination
pub fn copy_dir_all(src: &Path, dest: &Path) -> std::io::Result<u64> {
    let mut copied = 0;
    for entry in WalkDir::new(src).follow_links(true) {
        let entry = entry.map_err(std::io::Error::other)?;
        let rel = entry.path().strip_prefix(src).map_err(std::io::Error::other)?;
        let target = dest.join(rel);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(entry.path(), &target)?;
            copied += 1;
        }
    }
    Ok(copied)
}
