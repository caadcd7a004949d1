// src/hash.rs

//! SHA-256 checksums for source archives and SBOM reports
//!
//! Checksums are written in prefixed form (`sha256:<hex>`), the same form the
//! configuration file uses to pin a source archive.

use crate::error::{Error, Result};
use sha2::{Digest, Sha256};
use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use std::str::FromStr;

const ALGORITHM: &str = "sha256";

/// A SHA-256 digest as lowercase hex
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Checksum {
    value: String,
}

impl Checksum {
    /// Create a checksum from a hex digest, validating length and characters
    pub fn new(value: impl Into<String>) -> Result<Self> {
        let value = value.into();

        if value.len() != 64 {
            return Err(Error::ParseError(format!(
                "invalid sha256 length: expected 64, got {}",
                value.len()
            )));
        }
        if !value.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(Error::ParseError(format!("invalid hex in checksum: {}", value)));
        }

        Ok(Self {
            value: value.to_lowercase(),
        })
    }

    /// Hex digest without prefix
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.value
    }

    /// Format as `sha256:<hex>`
    pub fn to_prefixed_string(&self) -> String {
        format!("{}:{}", ALGORITHM, self.value)
    }
}

impl FromStr for Checksum {
    type Err = Error;

    /// Parse `sha256:<hex>`; an unprefixed digest is taken as SHA-256
    fn from_str(s: &str) -> Result<Self> {
        match s.split_once(':') {
            Some((algo, hash)) if algo.eq_ignore_ascii_case(ALGORITHM) => Self::new(hash),
            Some((algo, _)) => Err(Error::ParseError(format!(
                "Unsupported checksum algorithm: {} (supported: sha256)",
                algo
            ))),
            None => Self::new(s),
        }
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_prefixed_string())
    }
}

/// Compute the SHA-256 of data from a reader
pub fn hash_reader<R: Read>(reader: &mut R) -> io::Result<Checksum> {
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];

    loop {
        let n = reader.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }

    Ok(Checksum {
        value: hex::encode(hasher.finalize()),
    })
}

/// Compute the SHA-256 of a file, streaming its content
pub fn hash_file(path: &Path) -> Result<Checksum> {
    let mut file = File::open(path)?;
    Ok(hash_reader(&mut file)?)
}

/// Verify a file matches an expected checksum
pub fn verify_file(path: &Path, expected: &Checksum) -> Result<()> {
    let actual = hash_file(path)?;
    if &actual == expected {
        Ok(())
    } else {
        Err(Error::ChecksumMismatch {
            expected: expected.to_prefixed_string(),
            actual: actual.to_prefixed_string(),
        })
    }
}
