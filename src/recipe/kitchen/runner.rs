// src/recipe/kitchen/runner.rs

//! External command execution
//!
//! Build steps and security tools are described as [`CommandSpec`] values and
//! handed to a [`CommandRunner`]. The system runner waits for each process
//! synchronously and captures its output; timeouts are left to the tools.

use crate::error::{Error, Result};
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

/// One external command invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    /// Phase name used in logs and errors (`configure`, `make`, `sbom`, ...)
    pub phase: String,
    pub program: String,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
    pub workdir: PathBuf,
}

impl CommandSpec {
    pub fn new(phase: &str, program: impl Into<String>, workdir: &Path) -> Self {
        Self {
            phase: phase.to_string(),
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
            workdir: workdir.to_path_buf(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: &str, value: impl Into<String>) -> Self {
        self.env.push((key.to_string(), value.into()));
        self
    }

    /// Whether any argument equals `arg`
    pub fn has_arg(&self, arg: &str) -> bool {
        self.args.iter().any(|a| a == arg)
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Captured result of a finished process
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, `None` when killed by a signal
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Executes command specs; implemented by the system runner and test fakes
pub trait CommandRunner: Send + Sync {
    /// Run the command to completion
    ///
    /// Returns `Err` only when the process could not be started; a nonzero
    /// exit is reported through [`CommandOutput::code`].
    fn run(&self, spec: &CommandSpec) -> Result<CommandOutput>;
}

/// Runs commands as child processes of this one
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, spec: &CommandSpec) -> Result<CommandOutput> {
        debug!("[{}] {}", spec.phase, spec);

        let program = resolve_program(spec)?;
        let output = Command::new(&program)
            .args(&spec.args)
            .current_dir(&spec.workdir)
            .envs(spec.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .output()
            .map_err(|e| Error::BuildCommandError {
                phase: spec.phase.clone(),
                code: None,
                output: format!("failed to start {}: {}", program.display(), e),
            })?;

        Ok(CommandOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Bare program names are looked up on PATH; paths are used as given
fn resolve_program(spec: &CommandSpec) -> Result<PathBuf> {
    let program = Path::new(&spec.program);
    if program.components().count() > 1 {
        return Ok(program.to_path_buf());
    }
    which::which(&spec.program).map_err(|e| Error::BuildCommandError {
        phase: spec.phase.clone(),
        code: None,
        output: format!("{} not found in PATH: {}", spec.program, e),
    })
}
