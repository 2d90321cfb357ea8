//! Shared test infrastructure for integration tests.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

/// Isolated environment for running the compiled `leadsync` binary.
///
/// The child process starts from an empty environment, so no credentials leak
/// in from the developer's shell and every integration resolves to mock.
pub struct TestEnv {
    pub temp_dir: TempDir,
    vars: Vec<(String, String)>,
}

impl TestEnv {
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().expect("create temp dir"),
            vars: Vec::new(),
        }
    }

    /// Add an environment variable for the child process.
    pub fn var(mut self, name: &str, value: &str) -> Self {
        self.vars.push((name.to_string(), value.to_string()));
        self
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.temp_dir.path().join(name)
    }

    /// Run `leadsync` with `args`; `--dotenv` always points at a file that
    /// does not exist.
    pub fn run(&self, args: &[&str]) -> Output {
        let missing_dotenv = self.path("absent.env");
        let mut command = Command::new(env!("CARGO_BIN_EXE_leadsync"));
        command
            .env_clear()
            .env("HOME", self.temp_dir.path())
            .current_dir(self.temp_dir.path())
            .args(args)
            .arg("--dotenv")
            .arg(&missing_dotenv);
        if let Some(path) = std::env::var_os("PATH") {
            command.env("PATH", path);
        }
        for (name, value) in &self.vars {
            command.env(name, value);
        }
        command.output().expect("spawn leadsync")
    }
}

pub fn stdout_json(output: &Output) -> serde_json::Value {
    assert!(
        output.status.success(),
        "leadsync failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).unwrap_or_else(|err| {
        panic!(
            "stdout is not JSON ({err}): {}",
            String::from_utf8_lossy(&output.stdout)
        )
    })
}

pub fn read_lines(path: &Path) -> Vec<String> {
    std::fs::read_to_string(path)
        .unwrap_or_else(|err| panic!("read {}: {err}", path.display()))
        .lines()
        .map(str::to_string)
        .collect()
}
