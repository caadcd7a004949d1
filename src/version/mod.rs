// src/version/mod.rs

//! CPython release version handling
//!
//! Upstream versions look like `3.12.7` or `3.13.0rc1`. The numeric
//! `major.minor.micro` prefix selects the download directory, while the
//! `major.minor` pair names the standard-library directory (`lib/python3.12`).

use crate::error::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// A parsed CPython release version
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PythonVersion {
    pub major: u32,
    pub minor: u32,
    pub micro: u32,
    /// Pre-release suffix such as `a1`, `b2`, `rc1` (empty for finals)
    pub suffix: String,
}

impl PythonVersion {
    /// Parse a version string
    ///
    /// Examples:
    /// - "3.12.7" → 3, 12, 7, ""
    /// - "3.13.0rc1" → 3, 13, 0, "rc1"
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        let mut parts = s.splitn(3, '.');

        let major = parse_component(s, parts.next())?;
        let minor = parse_component(s, parts.next())?;

        let rest = parts
            .next()
            .ok_or_else(|| Error::ParseError(format!("Missing micro version in '{}'", s)))?;
        let digits_end = rest
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(rest.len());
        let micro = parse_component(s, Some(&rest[..digits_end]))?;
        let suffix = rest[digits_end..].to_string();

        if !suffix.is_empty()
            && !["a", "b", "rc"]
                .iter()
                .any(|p| suffix.strip_prefix(p).is_some_and(|n| n.parse::<u32>().is_ok()))
        {
            return Err(Error::ParseError(format!(
                "Invalid pre-release suffix '{}' in '{}'",
                suffix, s
            )));
        }

        Ok(Self {
            major,
            minor,
            micro,
            suffix,
        })
    }

    /// `major.minor`, as used in `lib/python<major.minor>`
    pub fn short(&self) -> String {
        format!("{}.{}", self.major, self.minor)
    }

    /// `major.minor.micro` without any pre-release suffix
    pub fn release(&self) -> String {
        format!("{}.{}.{}", self.major, self.minor, self.micro)
    }

    /// Compact `major minor` form used by Windows DLL names (`python312.dll`)
    pub fn nodot(&self) -> String {
        format!("{}{}", self.major, self.minor)
    }
}

fn parse_component(full: &str, part: Option<&str>) -> Result<u32> {
    let part = part.ok_or_else(|| Error::ParseError(format!("Incomplete version '{}'", full)))?;
    part.parse::<u32>()
        .map_err(|e| Error::ParseError(format!("Invalid version component '{}' in '{}': {}", part, full, e)))
}

impl FromStr for PythonVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for PythonVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.release(), self.suffix)
    }
}
