// src/lib.rs

//! cpython-tool
//!
//! Builds and packages a CPython interpreter as a build-time tool dependency.
//!
//! # Architecture
//!
//! - Explicit configuration: settings and options resolve once into a
//!   `BuildConfiguration` that every phase takes by reference
//! - One build strategy per OS family, selected once
//! - External tools behind a `CommandRunner` trait
//! - Publishable marker written last, so failed runs never look finished

mod error;
pub mod hash;
pub mod recipe;
pub mod settings;
pub mod version;

pub use error::{Error, Result};
pub use recipe::{BuildConfiguration, ConsumerInfo, Cook, CookResult, Kitchen, KitchenConfig, RecipeFile, StagedArtifact};
pub use settings::{Arch, BuildType, Compiler, CompilerKind, Os, OsFamily, Settings};
pub use version::PythonVersion;
