//! CLI command execution helpers
//!
//! Wraps the `cadence` binary with an isolated config location and
//! convenient assertion methods.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Command;

/// CLI command builder
pub struct CadenceCommand {
    binary_path: PathBuf,
    args: Vec<String>,
    env: HashMap<String, String>,
}

impl CadenceCommand {
    /// Create a new command whose config lives at `config_path`
    pub fn new(config_path: impl AsRef<Path>) -> Self {
        let mut env = HashMap::new();
        env.insert(
            "CADENCE_CONFIG".to_string(),
            config_path.as_ref().display().to_string(),
        );
        env.insert("NO_COLOR".to_string(), "1".to_string());

        Self {
            binary_path: PathBuf::from(env!("CARGO_BIN_EXE_cadence")),
            args: Vec::new(),
            env,
        }
    }

    /// Add command arguments
    pub fn args(&mut self, args: &[&str]) -> &mut Self {
        self.args.extend(args.iter().map(|s| s.to_string()));
        self
    }

    /// Execute command and capture its output
    pub fn execute(&self) -> Result<CommandResult> {
        let output = Command::new(&self.binary_path)
            .args(&self.args)
            .envs(&self.env)
            .env_remove("RUST_LOG")
            .output()
            .context("Failed to execute command")?;

        Ok(CommandResult {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            exit_code: output.status.code().unwrap_or(-1),
        })
    }

    /// Execute and assert success
    pub fn assert_success(&self) -> Result<CommandResult> {
        let result = self.execute()?;

        if !result.success() {
            anyhow::bail!(
                "Command failed (exit code: {}):\nArgs: {:?}\nStdout: {}\nStderr: {}",
                result.exit_code,
                self.args,
                result.stdout,
                result.stderr
            );
        }

        Ok(result)
    }

    /// Execute and expect failure
    pub fn assert_failure(&self) -> Result<CommandResult> {
        let result = self.execute()?;

        if result.success() {
            anyhow::bail!(
                "Command should have failed but succeeded:\nArgs: {:?}\nStdout: {}",
                self.args,
                result.stdout
            );
        }

        Ok(result)
    }
}

/// Command execution result
#[derive(Debug, Clone)]
pub struct CommandResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl CommandResult {
    /// Check if command succeeded
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Check if stdout contains text
    pub fn contains_stdout(&self, text: &str) -> bool {
        self.stdout.contains(text)
    }

    /// Check if stderr contains text
    pub fn contains_stderr(&self, text: &str) -> bool {
        self.stderr.contains(text)
    }

    /// Lines of the fire timeline (`t=...`)
    pub fn fire_lines(&self) -> Vec<String> {
        self.stdout
            .lines()
            .filter(|line| line.starts_with("t="))
            .map(str::to_string)
            .collect()
    }
}

/// Macro for convenient command construction
///
/// Usage:
/// ```ignore
/// cadence!(config, "simulate", "debounce", "--calls", "0,50").assert_success()?;
/// ```
#[macro_export]
macro_rules! cadence {
    ($config:expr, $($arg:expr),*) => {{
        let mut cmd = $crate::common::cli::CadenceCommand::new($config);
        cmd.args(&[$($arg),*]);
        cmd
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fire_lines() {
        let result = CommandResult {
            stdout: "Debounce (delay 200ms)\nt=300ms fire #1 (call 2)\n1 invocations for 3 calls\n"
                .to_string(),
            stderr: String::new(),
            exit_code: 0,
        };
        assert_eq!(result.fire_lines(), vec!["t=300ms fire #1 (call 2)"]);
    }
}
