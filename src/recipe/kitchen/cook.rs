// src/recipe/kitchen/cook.rs

//! Cook: runs the external commands of one invocation and keeps its log

use crate::error::{Error, Result};
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

use super::runner::{CommandOutput, CommandRunner, CommandSpec};

/// A single cook operation
pub struct Cook<'a> {
    runner: &'a dyn CommandRunner,
    /// Build log accumulator
    pub(crate) log: String,
    /// Warnings
    pub(crate) warnings: Vec<String>,
}

impl<'a> Cook<'a> {
    pub fn new(runner: &'a dyn CommandRunner) -> Self {
        Self {
            runner,
            log: String::new(),
            warnings: Vec::new(),
        }
    }

    /// Run a build step; any unsuccessful exit is fatal
    pub fn run_step(&mut self, spec: &CommandSpec) -> Result<CommandOutput> {
        info!("Running {} phase", spec.phase);
        debug!("Command: {}", spec);

        let output = self.spawn(spec)?;

        if !output.success() {
            return Err(Error::BuildCommandError {
                phase: spec.phase.clone(),
                code: output.code,
                output: output.stderr,
            });
        }

        Ok(output)
    }

    /// Run a tool whose exit code the caller interprets
    pub fn run_tool(&mut self, spec: &CommandSpec) -> Result<CommandOutput> {
        debug!("Running {}: {}", spec.phase, spec);
        self.spawn(spec)
    }

    fn spawn(&mut self, spec: &CommandSpec) -> Result<CommandOutput> {
        match self.runner.run(spec) {
            Ok(output) => {
                self.log_build_output(&spec.phase, &output);
                Ok(output)
            }
            Err(e) => {
                self.log_line(&format!("=== {} ===\n{}", spec.phase, e));
                Err(e)
            }
        }
    }

    pub fn warn(&mut self, message: String) {
        warn!("{}", message);
        self.warnings.push(message);
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn log(&self) -> &str {
        &self.log
    }

    pub fn log_line(&mut self, line: &str) {
        self.log.push_str(line);
        self.log.push('\n');
    }

    /// Persist the accumulated log
    pub fn write_log(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, &self.log)?;
        Ok(())
    }

    /// Log step output (stdout/stderr) with a phase header
    fn log_build_output(&mut self, phase: &str, output: &CommandOutput) {
        self.log_line(&format!("=== {} (exit {:?}) ===", phase, output.code));
        if !output.stdout.is_empty() {
            self.log.push_str(&output.stdout);
            self.log.push('\n');
        }
        if !output.stderr.is_empty() {
            self.log.push_str(&output.stderr);
            self.log.push('\n');
        }
    }
}
