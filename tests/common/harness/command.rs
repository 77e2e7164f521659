//! Fluent wrapper around assert_cmd::Command.

// Allow dead code since not every test binary uses every helper
#![allow(dead_code)]

use assert_cmd::Command;
use serde::de::DeserializeOwned;
use std::path::Path;

/// Fluent wrapper around `assert_cmd::Command` for the `lessonexport` binary.
pub struct LessonCommand {
    args: Vec<String>,
}

impl LessonCommand {
    /// Creates a new command for the `lessonexport` binary.
    pub fn new() -> Self {
        Self { args: Vec::new() }
    }

    /// Sets the `--config` option.
    pub fn config(self, path: &Path) -> Self {
        self.args(["--config".to_string(), path.to_string_lossy().to_string()])
    }

    /// Sets the `--database` option.
    pub fn database(self, path: &Path) -> Self {
        self.args(["--database".to_string(), path.to_string_lossy().to_string()])
    }

    /// Adds arguments to the command.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.args
            .extend(args.into_iter().map(|s| s.as_ref().to_string()));
        self
    }

    /// Returns the current arguments (for testing).
    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    /// Runs the command and returns an Assert for making assertions.
    #[allow(deprecated)]
    pub fn assert(self) -> assert_cmd::assert::Assert {
        let mut cmd =
            Command::cargo_bin("lessonexport").expect("Failed to find lessonexport binary");
        cmd.env_remove("RUST_LOG");
        cmd.args(&self.args);
        cmd.assert()
    }

    /// Runs the command, expects success, and returns stdout as a string.
    pub fn output_success(self) -> String {
        let output = self.assert().success().get_output().stdout.clone();
        String::from_utf8(output).expect("Output was not valid UTF-8")
    }

    /// Runs the command, expects success, and parses stdout as JSON.
    pub fn output_json<T: DeserializeOwned>(self) -> T {
        let output = self.output_success();
        serde_json::from_str(&output).expect("Failed to parse output as JSON")
    }

    // ===========================================
    // Command Shortcuts
    // ===========================================

    /// Configures for the `export` command.
    pub fn export(self, lesson: i64) -> Self {
        self.args(["export".to_string(), lesson.to_string()])
    }

    /// Configures for the `reorder` command.
    pub fn reorder(self, lesson: i64) -> Self {
        self.args(["reorder".to_string(), lesson.to_string()])
    }

    /// Configures for the `links` command.
    pub fn links(self, lesson: i64) -> Self {
        self.args(["links".to_string(), lesson.to_string()])
    }

    /// Configures for the `sweep` command.
    pub fn sweep(self) -> Self {
        self.args(["sweep"])
    }

    /// Sets `--user`.
    pub fn user(self, user: i64) -> Self {
        self.args(["--user".to_string(), user.to_string()])
    }

    // ===========================================
    // Format Options
    // ===========================================

    /// Adds `--format json` to the command.
    pub fn format_json(self) -> Self {
        self.args(["--format", "json"])
    }
}

impl Default for LessonCommand {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_runs_binary() {
        LessonCommand::new().args(["--help"]).assert().success();
    }

    #[test]
    fn test_command_shortcuts() {
        let cmd = LessonCommand::new().export(4).user(2).format_json();
        assert_eq!(
            cmd.get_args(),
            ["export", "4", "--user", "2", "--format", "json"]
        );
    }
}
