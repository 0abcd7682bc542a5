//! Visual C++ toolchain driver.
//!
//! A build run starts by asking the [`EnvironmentBridge`] for a
//! [`ToolchainSession`]: it finds an installation, runs `vcvarsall.bat` once
//! for the target architecture, and keeps the captured environment as an
//! immutable value. Every later compile or link goes through a
//! [`ToolRunner`], which layers that environment onto the child process; the
//! current process environment is never modified.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::builder::depfile::DependencyRecord;
use crate::builder::error::ToolchainError;
use crate::builder::quote::join_command_line;
use crate::core::arch::Architecture;
use crate::core::request::{CompileRequest, LinkRequest};
use crate::util::process::ProcessBuilder;

mod detect;
mod env;
mod msvc;
mod session;

pub use detect::{
    default_candidates, release_year, select_install, version_tag_from_path, BridgeSettings,
    CompanionDependency, EnvironmentBridge, InstallCandidate, SelectedInstall, EDITIONS,
    REQUIRED_VARS,
};
pub use env::CapturedEnv;
pub use msvc::MsvcToolchain;
pub use session::{InstallRoots, Tool, ToolPaths, ToolchainSession};

/// How the bytes a tool writes to one stream become text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputEncoding {
    /// UTF-8 with invalid sequences replaced. For output that is only shown
    /// to the user.
    #[default]
    Lossy,
    /// UTF-8; anything else is a configuration error.
    Utf8,
    /// UTF-16LE, as `cmd /u` writes it; anything else is a configuration error.
    Utf16Le,
}

impl fmt::Display for OutputEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputEncoding::Lossy | OutputEncoding::Utf8 => write!(f, "UTF-8"),
            OutputEncoding::Utf16Le => write!(f, "UTF-16LE"),
        }
    }
}

/// Decode one captured stream of `program`.
pub(crate) fn decode_output(
    bytes: &[u8],
    encoding: OutputEncoding,
    program: &Path,
    stream: &str,
) -> Result<String, ToolchainError> {
    let invalid = || {
        ToolchainError::Configuration(format!(
            "{} wrote {} that is not valid {}",
            program.display(),
            stream,
            encoding
        ))
    };

    match encoding {
        OutputEncoding::Lossy => Ok(String::from_utf8_lossy(bytes).into_owned()),
        OutputEncoding::Utf8 => String::from_utf8(bytes.to_vec()).map_err(|_| invalid()),
        OutputEncoding::Utf16Le => {
            if bytes.len() % 2 != 0 {
                return Err(invalid());
            }
            let units: Vec<u16> = bytes
                .chunks_exact(2)
                .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
                .collect();
            String::from_utf16(&units).map_err(|_| invalid())
        }
    }
}

/// A command to execute, with program, arguments, and environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    /// The program to run (e.g., "cl.exe")
    pub program: PathBuf,
    /// Command arguments
    pub args: Vec<String>,
    /// Environment variables to set
    pub env: Vec<(String, String)>,
    pub stdout_encoding: OutputEncoding,
    pub stderr_encoding: OutputEncoding,
}

impl CommandSpec {
    /// Create a new command spec.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        CommandSpec {
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
            stdout_encoding: OutputEncoding::default(),
            stderr_encoding: OutputEncoding::default(),
        }
    }

    /// Add an argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add multiple arguments.
    pub fn args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args.extend(args.into_iter().map(|a| a.into()));
        self
    }

    /// Add an environment variable.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn stdout_encoding(mut self, encoding: OutputEncoding) -> Self {
        self.stdout_encoding = encoding;
        self
    }

    pub fn stderr_encoding(mut self, encoding: OutputEncoding) -> Self {
        self.stderr_encoding = encoding;
        self
    }

    /// Whether any argument equals `arg`.
    pub fn has_arg(&self, arg: &str) -> bool {
        self.args.iter().any(|a| a == arg)
    }

    /// The full command line, quoted the way the tool will split it.
    pub fn command_line(&self) -> String {
        let program = self.program.to_string_lossy();
        join_command_line(std::iter::once(&*program).chain(self.args.iter().map(String::as_str)))
    }
}

/// Captured result of running a tool.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    /// Exit code; `None` if the process was terminated by a signal
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Standard output followed by standard error.
    ///
    /// `cl` and `link` print diagnostics on stdout, so failures report both.
    pub fn combined(&self) -> String {
        match (self.stdout.trim().is_empty(), self.stderr.trim().is_empty()) {
            (true, _) => self.stderr.clone(),
            (_, true) => self.stdout.clone(),
            _ => format!("{}\n{}", self.stdout.trim_end(), self.stderr),
        }
    }
}

/// Starts child processes. The only path by which this layer runs tools.
pub trait ToolRunner: Send + Sync {
    fn run(&self, cmd: &CommandSpec) -> Result<ToolOutput, ToolchainError>;
}

/// Runs tools as real child processes, blocking until they exit.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl ToolRunner for ProcessRunner {
    fn run(&self, cmd: &CommandSpec) -> Result<ToolOutput, ToolchainError> {
        let mut builder = ProcessBuilder::new(&cmd.program).args(&cmd.args);
        for (key, value) in &cmd.env {
            builder = builder.env(key, value);
        }

        tracing::debug!("running {}", builder.display_command());

        let output = builder.exec().map_err(|source| ToolchainError::Spawn {
            program: cmd.program.clone(),
            source,
        })?;

        Ok(ToolOutput {
            code: output.status.code(),
            stdout: decode_output(&output.stdout, cmd.stdout_encoding, &cmd.program, "stdout")?,
            stderr: decode_output(&output.stderr, cmd.stderr_encoding, &cmd.program, "stderr")?,
        })
    }
}

/// The operations a build scheduler needs from a toolchain.
///
/// Every call names the architecture it expects; an implementation bound to a
/// different architecture fails with a configuration error before running
/// anything.
pub trait Toolchain: Send + Sync {
    /// Architecture this toolchain was initialized for.
    fn architecture(&self) -> Architecture;

    /// Compile one source file, writing its object and dependency files.
    fn compile(
        &self,
        arch: Architecture,
        request: &CompileRequest,
    ) -> Result<DependencyRecord, ToolchainError>;

    /// Produce a static library, DLL, or executable. Returns the artifact path.
    fn link(&self, arch: Architecture, request: &LinkRequest) -> Result<PathBuf, ToolchainError>;

    /// Object file extension for a given source.
    fn object_extension(&self, source: &Path) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_line_quotes_arguments() {
        let cmd = CommandSpec::new("C:\\VS\\bin\\cl.exe")
            .arg("/nologo")
            .arg("/IC:\\Program Files\\include")
            .arg("a.cpp");
        assert_eq!(
            cmd.command_line(),
            "C:\\VS\\bin\\cl.exe /nologo \"/IC:\\Program Files\\include\" a.cpp"
        );
    }

    #[test]
    fn test_combined_output() {
        let out = ToolOutput {
            code: Some(2),
            stdout: "a.cpp\na.cpp(1): error C1083\n".to_string(),
            stderr: String::new(),
        };
        assert!(!out.success());
        assert_eq!(out.combined(), "a.cpp\na.cpp(1): error C1083\n");

        let both = ToolOutput {
            code: Some(1),
            stdout: "out\n".to_string(),
            stderr: "err\n".to_string(),
        };
        assert_eq!(both.combined(), "out\nerr\n");
    }

    #[test]
    fn test_process_runner_reports_missing_program() {
        let err = ProcessRunner
            .run(&CommandSpec::new("vcbridge-definitely-missing-tool"))
            .unwrap_err();
        assert!(matches!(err, ToolchainError::Spawn { .. }));
    }

    fn utf16le(text: &str) -> Vec<u8> {
        text.encode_utf16().flat_map(u16::to_le_bytes).collect()
    }

    #[test]
    fn test_decode_wide_set_output() {
        let bytes = utf16le("PATH=C:\\Users\\José\\bin\r\nINCLUDE=C:\\Kits\r\n");
        let text = decode_output(&bytes, OutputEncoding::Utf16Le, Path::new("cmd.exe"), "stdout")
            .unwrap();
        assert_eq!(text, "PATH=C:\\Users\\José\\bin\r\nINCLUDE=C:\\Kits\r\n");
    }

    #[test]
    fn test_decode_rejects_truncated_wide_output() {
        let mut bytes = utf16le("PATH=C:\\bin");
        bytes.pop();
        let err = decode_output(&bytes, OutputEncoding::Utf16Le, Path::new("cmd.exe"), "stdout")
            .unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("not valid UTF-16LE"));
    }

    #[test]
    fn test_decode_code_page_bytes() {
        // "Jos\xe9" as a Windows-1252 console writes it
        let bytes = b"Note: including file: C:\\Users\\Jos\xe9\\a.h\r\n";

        let err = decode_output(bytes, OutputEncoding::Utf8, Path::new("cl.exe"), "stderr")
            .unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("cl.exe wrote stderr"));

        let shown = decode_output(bytes, OutputEncoding::Lossy, Path::new("cl.exe"), "stderr")
            .unwrap();
        assert!(shown.contains('\u{FFFD}'));
    }
}
