// src/recipe/kitchen/testing.rs

//! Recording command runner for unit tests

use crate::error::Result;
use std::collections::HashMap;
use std::sync::Mutex;

use super::runner::{CommandOutput, CommandRunner, CommandSpec};

type Hook = Box<dyn Fn(&CommandSpec) + Send + Sync>;

/// Records every spec and answers with configured exit codes
#[derive(Default)]
pub struct RecordingRunner {
    calls: Mutex<Vec<CommandSpec>>,
    exit_codes: HashMap<String, i32>,
    hooks: HashMap<String, Hook>,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every command of `phase` exit with `code`
    pub fn fail_phase(mut self, phase: &str, code: i32) -> Self {
        self.exit_codes.insert(phase.to_string(), code);
        self
    }

    /// Run `hook` whenever a command of `phase` is executed
    pub fn on_phase(mut self, phase: &str, hook: impl Fn(&CommandSpec) + Send + Sync + 'static) -> Self {
        self.hooks.insert(phase.to_string(), Box::new(hook));
        self
    }

    pub fn calls(&self) -> Vec<CommandSpec> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn phases(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.phase).collect()
    }
}

impl CommandRunner for RecordingRunner {
    fn run(&self, spec: &CommandSpec) -> Result<CommandOutput> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(spec.clone());
        }
        if let Some(hook) = self.hooks.get(&spec.phase) {
            hook(spec);
        }
        let code = self.exit_codes.get(&spec.phase).copied().unwrap_or(0);
        Ok(CommandOutput {
            code: Some(code),
            stdout: format!("{} ran", spec.phase),
            stderr: if code == 0 {
                String::new()
            } else {
                format!("{} failed", spec.phase)
            },
        })
    }
}
