//! Test utilities and mocks for vcbridge unit tests.
//!
//! The toolchain layer starts processes only through [`ToolRunner`], so tests
//! swap in a [`MockRunner`] that returns canned output, records every command,
//! and can write the side files a real tool would leave behind.
//!
//! # Example
//!
//! ```rust,ignore
//! use vcbridge::test_support::{fake_session, MockRunner};
//!
//! #[test]
//! fn test_example() {
//!     let runner = MockRunner::new();
//!     runner.expect_contains("cl.exe", ToolOutput::ok("a.cpp"));
//!
//!     // Hand `runner` to an orchestrator...
//! }
//! ```

pub mod fixtures;

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::builder::error::ToolchainError;
use crate::builder::toolchain::{CommandSpec, ToolOutput, ToolRunner};

// Re-export fixtures for convenience
pub use fixtures::*;

impl ToolOutput {
    /// Successful run with the given stdout.
    pub fn ok(stdout: impl Into<String>) -> Self {
        ToolOutput {
            code: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// Failed run with the given exit code and stdout.
    pub fn failed(code: i32, stdout: impl Into<String>) -> Self {
        ToolOutput {
            code: Some(code),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn with_stderr(mut self, stderr: impl Into<String>) -> Self {
        self.stderr = stderr.into();
        self
    }
}

/// Pattern for matching command lines in [`MockRunner`].
#[derive(Debug, Clone)]
pub enum CommandPattern {
    /// Exact match on the full quoted command line.
    Exact(String),
    /// Match if the command line starts with prefix.
    StartsWith(String),
    /// Match if the command line contains substring.
    Contains(String),
    /// Match any command.
    Any,
}

impl CommandPattern {
    pub fn matches(&self, cmd: &str) -> bool {
        match self {
            CommandPattern::Exact(s) => cmd == s,
            CommandPattern::StartsWith(s) => cmd.starts_with(s),
            CommandPattern::Contains(s) => cmd.contains(s),
            CommandPattern::Any => true,
        }
    }
}

/// Expectation for a command execution.
#[derive(Debug, Clone)]
pub struct CommandExpectation {
    pub pattern: CommandPattern,
    pub output: ToolOutput,
    /// Files written when matched, as a tool would
    pub writes: Vec<(PathBuf, String)>,
    /// Number of times this expectation can be used (None = unlimited).
    pub times: Option<usize>,
    pub used: usize,
}

impl CommandExpectation {
    pub fn new(pattern: CommandPattern, output: ToolOutput) -> Self {
        CommandExpectation {
            pattern,
            output,
            writes: Vec::new(),
            times: None,
            used: 0,
        }
    }

    /// Write `contents` to `path` whenever this expectation matches.
    pub fn writes(mut self, path: impl AsRef<Path>, contents: impl Into<String>) -> Self {
        self.writes
            .push((path.as_ref().to_path_buf(), contents.into()));
        self
    }

    /// Set the number of times this expectation can be used.
    pub fn times(mut self, n: usize) -> Self {
        self.times = Some(n);
        self
    }

    pub fn available(&self) -> bool {
        match self.times {
            Some(n) => self.used < n,
            None => true,
        }
    }
}

#[derive(Debug, Default)]
struct MockState {
    expectations: Vec<CommandExpectation>,
    calls: Vec<CommandSpec>,
    default_output: Option<ToolOutput>,
}

/// Mock tool runner.
///
/// Expectations are tried in insertion order against the quoted command line.
/// Unmatched commands fail with a spawn error.
#[derive(Debug, Default)]
pub struct MockRunner {
    state: Mutex<MockState>,
}

impl MockRunner {
    pub fn new() -> Self {
        MockRunner::default()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Add an expectation for an exact command line.
    pub fn expect(&self, cmd: &str, output: ToolOutput) -> &Self {
        self.expect_pattern(CommandExpectation::new(
            CommandPattern::Exact(cmd.to_string()),
            output,
        ))
    }

    /// Add an expectation for a command line containing a substring.
    pub fn expect_contains(&self, substring: &str, output: ToolOutput) -> &Self {
        self.expect_pattern(CommandExpectation::new(
            CommandPattern::Contains(substring.to_string()),
            output,
        ))
    }

    pub fn expect_pattern(&self, expectation: CommandExpectation) -> &Self {
        self.state().expectations.push(expectation);
        self
    }

    /// Set a default output for commands that don't match any expectation.
    pub fn set_default(&self, output: ToolOutput) -> &Self {
        self.state().default_output = Some(output);
        self
    }

    /// All commands run so far.
    pub fn calls(&self) -> Vec<CommandSpec> {
        self.state().calls.clone()
    }

    /// Check that every expectation with a count was used exactly that often.
    pub fn verify(&self) -> Result<(), String> {
        for (i, exp) in self.state().expectations.iter().enumerate() {
            if let Some(expected) = exp.times {
                if exp.used != expected {
                    return Err(format!(
                        "expectation {} was used {} times, expected {}",
                        i, exp.used, expected
                    ));
                }
            }
        }
        Ok(())
    }
}

impl ToolRunner for MockRunner {
    fn run(&self, cmd: &CommandSpec) -> Result<ToolOutput, ToolchainError> {
        let line = cmd.command_line();
        let mut state = self.state();
        state.calls.push(cmd.clone());

        let matched = state
            .expectations
            .iter_mut()
            .find(|exp| exp.available() && exp.pattern.matches(&line));

        let (output, writes) = match matched {
            Some(exp) => {
                exp.used += 1;
                (exp.output.clone(), exp.writes.clone())
            }
            None => match state.default_output.clone() {
                Some(output) => (output, Vec::new()),
                None => {
                    return Err(ToolchainError::Spawn {
                        program: cmd.program.clone(),
                        source: std::io::Error::other(format!("unexpected command: {}", line)),
                    })
                }
            },
        };
        drop(state);

        for (path, contents) in writes {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| ToolchainError::io(parent, e))?;
            }
            std::fs::write(&path, contents).map_err(|e| ToolchainError::io(&path, e))?;
        }

        Ok(output)
    }
}

/// Common test assertions.
pub mod assertions {
    /// Assert that a result is Ok and return the value.
    pub fn assert_ok<T, E: std::fmt::Debug>(result: Result<T, E>) -> T {
        match result {
            Ok(v) => v,
            Err(e) => panic!("expected Ok, got Err: {:?}", e),
        }
    }

    /// Assert that a result is Err and return the error.
    pub fn assert_err<T: std::fmt::Debug, E>(result: Result<T, E>) -> E {
        match result {
            Ok(v) => panic!("expected Err, got Ok: {:?}", v),
            Err(e) => e,
        }
    }

    /// Assert that a command has an argument.
    pub fn assert_has_arg(cmd: &crate::builder::toolchain::CommandSpec, arg: &str) {
        assert!(
            cmd.has_arg(arg),
            "expected argument `{}` in `{}`",
            arg,
            cmd.command_line()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_mock_runner_basic() {
        let runner = MockRunner::new();
        runner.expect("cl.exe /nologo", ToolOutput::ok("banner"));
        runner.expect_contains("link.exe", ToolOutput::failed(1120, "LNK1120"));

        let out = runner
            .run(&CommandSpec::new("cl.exe").arg("/nologo"))
            .unwrap();
        assert!(out.success());
        assert_eq!(out.stdout, "banner");

        let out = runner.run(&CommandSpec::new("C:\\VS\\link.exe")).unwrap();
        assert_eq!(out.code, Some(1120));
        assert_eq!(runner.calls().len(), 2);
    }

    #[test]
    fn test_mock_runner_unexpected() {
        let runner = MockRunner::new();
        let err = runner.run(&CommandSpec::new("unknown")).unwrap_err();
        assert!(matches!(err, ToolchainError::Spawn { .. }));
    }

    #[test]
    fn test_mock_runner_writes_side_files() {
        let tmp = TempDir::new().unwrap();
        let report = tmp.path().join("out").join("a.d.json");

        let runner = MockRunner::new();
        runner.expect_pattern(
            CommandExpectation::new(CommandPattern::Any, ToolOutput::ok(""))
                .writes(&report, "{}")
                .times(1),
        );

        runner.run(&CommandSpec::new("cl.exe")).unwrap();
        assert_eq!(std::fs::read_to_string(&report).unwrap(), "{}");
        assert!(runner.verify().is_ok());
        assert!(runner.run(&CommandSpec::new("cl.exe")).is_err());
    }

    #[test]
    fn test_assertions() {
        use assertions::*;

        let ok_result: Result<i32, &str> = Ok(42);
        assert_eq!(assert_ok(ok_result), 42);

        let err_result: Result<i32, &str> = Err("error");
        assert_eq!(assert_err(err_result), "error");
    }
}
