// src/recipe/mod.rs

//! The CPython tool recipe
//!
//! Builds a CPython interpreter from the upstream source release and lays it
//! out as a tool package that other builds can run but never link against.
//!
//! # Culinary Terminology
//!
//! - **Recipe**: the TOML file describing version, settings and options
//! - **Kitchen**: owns the configuration and runs the phases
//! - **Cook**: one session of external commands and its build log
//!
//! # Example Recipe
//!
//! ```toml
//! [package]
//! version = "3.12.7"
//!
//! [settings]
//! os = "Linux"
//! arch = "x86_64"
//!
//! [options]
//! shared = true
//! optimize = "2"
//! enable_zero_copy = true
//! vulnerability_scan = true
//!
//! [source]
//! checksum = "sha256:..."
//! ```
//!
//! # Phases
//!
//! Source, build, package and info run strictly in order. Every phase
//! receives the same immutable [`BuildConfiguration`]; a failed phase leaves
//! the package directory without its publishable marker.

pub mod build;
pub mod config;
pub mod format;
pub mod info;
pub mod kitchen;
pub mod options;
pub mod package;
pub mod parser;
pub mod security;

pub use build::{BuildOutputs, BuildReport, BuildStrategy};
pub use config::{BuildConfiguration, SourceSpec};
pub use format::RecipeFile;
pub use info::{ConsumerInfo, EnvAction, EnvEntry, consumer_info};
pub use kitchen::{CommandRunner, CommandSpec, Cook, CookResult, Kitchen, KitchenConfig, SystemRunner};
pub use options::{EffectiveOptions, OptimizeLevel, RecipeOptions, SbomFailurePolicy};
pub use package::{StagedArtifact, ZeroCopyMirror};
pub use parser::{parse_recipe, parse_recipe_file, validate_recipe};
pub use security::{SbomRecord, SecurityGate};
