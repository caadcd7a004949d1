// src/cli/mod.rs
//! CLI definitions for cpython-tool
//!
//! Each phase is its own subcommand so an outer package manager can drive
//! them one at a time; `cook` runs them all. The command implementations
//! are in the `commands` module.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "cpython-tool")]
#[command(author = "cpython-tool Contributors")]
#[command(version)]
#[command(about = "Build and package CPython as a build-time tool", long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Flags shared by every subcommand; they override the recipe file
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Recipe file (default: cpython-tool.toml when present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Setting override, e.g. `-s os=Windows` (repeatable)
    #[arg(short = 's', long = "setting", value_name = "KEY=VALUE", global = true)]
    pub settings: Vec<String>,

    /// Option override, e.g. `-o shared=True` (repeatable)
    #[arg(short = 'o', long = "option", value_name = "KEY=VALUE", global = true)]
    pub options: Vec<String>,

    /// Working directory for sources, install tree and build report
    #[arg(long, global = true)]
    pub work_dir: Option<PathBuf>,

    /// Package output directory
    #[arg(long, global = true)]
    pub package_dir: Option<PathBuf>,

    /// Number of parallel make jobs
    #[arg(short, long, global = true)]
    pub jobs: Option<u32>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Download the upstream archive and unpack it
    Fetch,

    /// Build the interpreter from fetched sources
    Build,

    /// Stage the package layout from a finished build
    Package,

    /// Print consumer info for a finished package as JSON
    Info {
        /// Single-line JSON
        #[arg(long)]
        compact: bool,
    },

    /// Run every phase: fetch, build, package, info
    Cook,

    /// Show the resolved settings and effective options
    Options {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check the recipe file without building
    Validate,
}
