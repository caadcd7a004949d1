// build.rs

use clap::{Arg, ArgAction, Command};
use clap_mangen::Man;
use std::env;
use std::fs;
use std::path::PathBuf;

/// Common argument: repeatable KEY=VALUE override
fn assignment_arg(id: &'static str, short: char, long: &'static str, help: &'static str) -> Arg {
    Arg::new(id)
        .short(short)
        .long(long)
        .value_name("KEY=VALUE")
        .action(ArgAction::Append)
        .global(true)
        .help(help)
}

fn build_cli() -> Command {
    Command::new("cpython-tool")
        .version(env!("CARGO_PKG_VERSION"))
        .author("cpython-tool Contributors")
        .about("Build and package CPython as a build-time tool")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("PATH")
                .global(true)
                .help("Recipe file (default: cpython-tool.toml when present)"),
        )
        .arg(assignment_arg("setting", 's', "setting", "Setting override, e.g. os=Windows"))
        .arg(assignment_arg("option", 'o', "option", "Option override, e.g. shared=True"))
        .arg(
            Arg::new("work_dir")
                .long("work-dir")
                .value_name("PATH")
                .global(true)
                .help("Working directory for sources, install tree and build report"),
        )
        .arg(
            Arg::new("package_dir")
                .long("package-dir")
                .value_name("PATH")
                .global(true)
                .help("Package output directory"),
        )
        .arg(
            Arg::new("jobs")
                .short('j')
                .long("jobs")
                .value_name("N")
                .global(true)
                .help("Number of parallel make jobs"),
        )
        .subcommand(Command::new("fetch").about("Download the upstream archive and unpack it"))
        .subcommand(Command::new("build").about("Build the interpreter from fetched sources"))
        .subcommand(Command::new("package").about("Stage the package layout from a finished build"))
        .subcommand(
            Command::new("info")
                .about("Print consumer info for a finished package as JSON")
                .arg(
                    Arg::new("compact")
                        .long("compact")
                        .action(ArgAction::SetTrue)
                        .help("Single-line JSON"),
                ),
        )
        .subcommand(Command::new("cook").about("Run every phase: fetch, build, package, info"))
        .subcommand(
            Command::new("options")
                .about("Show the resolved settings and effective options")
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Print as JSON"),
                ),
        )
        .subcommand(Command::new("validate").about("Check the recipe file without building"))
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    // Create man directory - use CARGO_MANIFEST_DIR which is always set by cargo
    let manifest_dir = match env::var("CARGO_MANIFEST_DIR") {
        Ok(dir) => PathBuf::from(dir),
        Err(e) => {
            println!("cargo:warning=CARGO_MANIFEST_DIR not set: {}", e);
            return;
        }
    };
    let man_dir = manifest_dir.join("man");

    if let Err(e) = fs::create_dir_all(&man_dir) {
        println!("cargo:warning=Failed to create man directory: {}", e);
        return;
    }

    let man = Man::new(build_cli());
    let mut buffer = Vec::new();

    if let Err(e) = man.render(&mut buffer) {
        println!("cargo:warning=Failed to render man page: {}", e);
        return;
    }

    let man_path = man_dir.join("cpython-tool.1");
    if let Err(e) = fs::write(&man_path, buffer) {
        println!("cargo:warning=Failed to write man page: {}", e);
    }
}
