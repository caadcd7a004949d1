// src/main.rs

use anyhow::Result;
use clap::Parser;

mod cli;
mod commands;

use cli::{Cli, Commands};

fn main() -> Result<()> {
    // Logs go to stderr; stdout carries command output such as `info` JSON
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Fetch => commands::cmd_fetch(&cli.global),
        Commands::Build => commands::cmd_build(&cli.global),
        Commands::Package => commands::cmd_package(&cli.global),
        Commands::Info { compact } => commands::cmd_info(&cli.global, compact),
        Commands::Cook => commands::cmd_cook(&cli.global),
        Commands::Options { json } => commands::cmd_options(&cli.global, json),
        Commands::Validate => commands::cmd_validate(&cli.global),
    }
}
