// src/commands/cook.rs

//! Phase commands - fetch, build, package, cook

use super::{display_path, open_kitchen, phase_failed, print_warnings};
use crate::cli::GlobalArgs;
use anyhow::Result;
use cpython_tool::recipe::Cook;
use cpython_tool::Kitchen;
use tracing::warn;

/// Download and unpack the sources
pub fn cmd_fetch(args: &GlobalArgs) -> Result<()> {
    let kitchen = open_kitchen(args)?;
    println!("Fetching {}", kitchen.config().source.url);

    let source_dir = kitchen.fetch().map_err(phase_failed)?;
    println!("[OK] Sources ready at {}", display_path(&source_dir));
    Ok(())
}

/// Build from previously fetched sources
pub fn cmd_build(args: &GlobalArgs) -> Result<()> {
    let kitchen = open_kitchen(args)?;
    let mut cook = kitchen.new_cook();

    let result = kitchen.build(&mut cook);
    finish_session(&kitchen, &cook);
    let report = result.map_err(phase_failed)?;

    println!("[OK] Built Python {} ({})", report.version, report.strategy);
    println!("  Outputs: {}", display_path(&report.outputs.root));
    if let Some(sbom) = &report.sbom {
        println!("  SBOM: {} (sha256 {})", display_path(&sbom.path), sbom.sha256);
    }
    Ok(())
}

/// Stage the package from a finished build
pub fn cmd_package(args: &GlobalArgs) -> Result<()> {
    let kitchen = open_kitchen(args)?;
    let mut cook = kitchen.new_cook();

    let result = kitchen.package(&mut cook);
    finish_session(&kitchen, &cook);
    let artifact = result.map_err(phase_failed)?;

    println!(
        "[OK] Packaged {} files into {}",
        artifact.files.len(),
        display_path(&kitchen.kitchen_config().package_dir)
    );
    if let Some(mirror) = &artifact.mirror {
        println!("  Zero-copy mirror: {}", mirror.display());
    }
    Ok(())
}

/// Run all phases
pub fn cmd_cook(args: &GlobalArgs) -> Result<()> {
    let kitchen = open_kitchen(args)?;
    let config = kitchen.config();
    println!(
        "Cooking Python {} for {} {} ({})",
        config.version, config.settings.os, config.settings.arch, config.settings.build_type
    );

    let result = kitchen.cook().map_err(phase_failed)?;
    print_warnings(&result.warnings);

    println!("[OK] Package ready at {}", display_path(&result.package_dir));
    println!("  Interpreter: {}", result.info.interpreter.display());
    println!("  Build log: {}", display_path(&kitchen.kitchen_config().log_path()));
    Ok(())
}

/// Persist the session log and surface its warnings
fn finish_session(kitchen: &Kitchen, cook: &Cook<'_>) {
    let log_path = kitchen.kitchen_config().log_path();
    if let Err(e) = cook.write_log(&log_path) {
        warn!("Failed to write build log {}: {}", log_path.display(), e);
    }
    print_warnings(cook.warnings());
}
