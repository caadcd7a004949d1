// src/error.rs

//! Error types for the recipe phases
//!
//! Every phase propagates one of these up to the orchestrator; nothing is
//! retried and no partial package is ever marked publishable.

use thiserror::Error;

/// Errors produced while configuring, fetching, building or packaging
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid setting or option combination (e.g. FIPS while cross-building)
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// Source archive could not be retrieved
    #[error("Download error: {0}")]
    DownloadError(String),

    /// Source archive could not be unpacked
    #[error("Extraction error: {0}")]
    ExtractionError(String),

    /// A build command exited unsuccessfully
    #[error("{phase} phase failed with exit code {code:?}\n{output}")]
    BuildCommandError {
        phase: String,
        code: Option<i32>,
        output: String,
    },

    /// Staging the package layout failed
    #[error("Packaging error: {0}")]
    PackagingError(String),

    /// SBOM generation (fatal policy) or vulnerability scan failed
    #[error("Security gate failed: {0}")]
    SecurityGateError(String),

    #[error("Checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Name of the recipe phase this error belongs to, for orchestrator reports
    pub fn phase(&self) -> &str {
        match self {
            Self::ConfigurationError(_) | Self::ParseError(_) => "configure",
            Self::DownloadError(_) | Self::ExtractionError(_) | Self::ChecksumMismatch { .. } => {
                "source"
            }
            Self::BuildCommandError { phase, .. } => phase,
            Self::SecurityGateError(_) => "security",
            Self::PackagingError(_) | Self::NotFound(_) | Self::Io(_) => "package",
        }
    }
}

/// Result alias used throughout the library
pub type Result<T> = std::result::Result<T, Error>;
