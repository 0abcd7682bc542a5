//! Toolchain error types and diagnostics.

use std::io;
use std::path::PathBuf;

use miette::Diagnostic as MietteDiagnostic;
use thiserror::Error;

use crate::core::arch::Architecture;
use crate::util::diagnostic::{suggestions, Diagnostic};

/// Broad error category, used by callers to decide what to keep and what to retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing installation, architecture mismatch, unsupported option.
    /// Fatal and never worth retrying.
    Configuration,
    /// An external tool exited with a failure status.
    ToolInvocation,
    /// The object file is valid but its dependency report is not.
    DependencyExtraction,
    /// Local filesystem error.
    Io,
}

/// Error raised by the toolchain layer.
#[derive(Debug, Error, MietteDiagnostic)]
pub enum ToolchainError {
    #[error("no Visual C++ installation found")]
    #[diagnostic(
        code(vcbridge::env::not_found),
        help("Install Visual Studio or the Build Tools, or list the install root under [toolchain] candidates")
    )]
    ToolchainNotFound { searched: Vec<PathBuf> },

    #[error("session is initialized for {session}, but the request targets {requested}")]
    #[diagnostic(
        code(vcbridge::config::arch_mismatch),
        help("Create a separate session for each architecture")
    )]
    ArchitectureMismatch {
        session: Architecture,
        requested: Architecture,
    },

    #[error("`{var}` is not set after running {}", script.display())]
    #[diagnostic(code(vcbridge::env::missing_variable))]
    MissingEnvironment { var: String, script: PathBuf },

    #[error("environment setup script {} failed (exit code {code:?})", script.display())]
    #[diagnostic(code(vcbridge::env::setup_failed))]
    SetupScriptFailed {
        script: PathBuf,
        code: Option<i32>,
        output: String,
    },

    #[error("{0}")]
    #[diagnostic(code(vcbridge::config::invalid))]
    Configuration(String),

    #[error("failed to start `{}`", program.display())]
    #[diagnostic(code(vcbridge::exec::spawn))]
    Spawn {
        program: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("compilation failed for {} (exit code {code:?})", source_file.display())]
    #[diagnostic(code(vcbridge::compile::failed))]
    CompileFailed {
        source_file: PathBuf,
        code: Option<i32>,
        output: String,
    },

    #[error("linking failed for {} (exit code {code:?})", target.display())]
    #[diagnostic(code(vcbridge::link::failed))]
    LinkFailed {
        target: PathBuf,
        code: Option<i32>,
        output: String,
    },

    #[error("could not read dependency report for {}: {reason}", source_file.display())]
    #[diagnostic(
        code(vcbridge::compile::dependencies),
        help("The object file is usable; rebuild it to regenerate its dependency file")
    )]
    DependencyExtractionFailed {
        source_file: PathBuf,
        report: PathBuf,
        reason: String,
    },

    #[error("I/O error on {}", path.display())]
    #[diagnostic(code(vcbridge::io))]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ToolchainError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        ToolchainError::Io {
            path: path.into(),
            source,
        }
    }

    /// Category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ToolchainError::ToolchainNotFound { .. }
            | ToolchainError::ArchitectureMismatch { .. }
            | ToolchainError::MissingEnvironment { .. }
            | ToolchainError::SetupScriptFailed { .. }
            | ToolchainError::Configuration(_) => ErrorKind::Configuration,
            ToolchainError::Spawn { .. }
            | ToolchainError::CompileFailed { .. }
            | ToolchainError::LinkFailed { .. } => ErrorKind::ToolInvocation,
            ToolchainError::DependencyExtractionFailed { .. } => ErrorKind::DependencyExtraction,
            ToolchainError::Io { .. } => ErrorKind::Io,
        }
    }

    pub fn is_configuration(&self) -> bool {
        self.kind() == ErrorKind::Configuration
    }

    /// Captured tool output, for invocation failures.
    pub fn tool_output(&self) -> Option<&str> {
        match self {
            ToolchainError::CompileFailed { output, .. }
            | ToolchainError::LinkFailed { output, .. }
            | ToolchainError::SetupScriptFailed { output, .. } => Some(output),
            _ => None,
        }
    }

    /// Convert to a user-friendly diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        let mut diag = Diagnostic::error(self.to_string());

        match self {
            ToolchainError::ToolchainNotFound { searched } => {
                for root in searched {
                    diag = diag.with_context(format!("searched {}", root.display()));
                }
                diag = diag
                    .with_suggestion("Install the \"Desktop development with C++\" workload")
                    .with_suggestion("Add the install root to [toolchain] candidates in .vcbridge/config.toml")
                    .with_suggestion(suggestions::NO_INSTALL);
            }
            ToolchainError::ArchitectureMismatch { session, .. } => {
                diag = diag.with_suggestion(format!(
                    "Pass --arch {} or initialize another session",
                    session
                ));
            }
            ToolchainError::MissingEnvironment { script, .. } => {
                diag = diag
                    .with_location(script)
                    .with_suggestion("Repair the Visual Studio installation");
            }
            ToolchainError::SetupScriptFailed { script, output, .. } => {
                diag = diag.with_location(script);
                for line in output.lines().filter(|l| !l.trim().is_empty()).take(10) {
                    diag = diag.with_context(line.trim());
                }
            }
            ToolchainError::CompileFailed { output, .. }
            | ToolchainError::LinkFailed { output, .. } => {
                for line in output.lines().filter(|l| !l.trim().is_empty()) {
                    diag = diag.with_context(line.trim_end());
                }
                diag = diag.with_suggestion(suggestions::TOOL_FAILED);
            }
            ToolchainError::DependencyExtractionFailed { report, .. } => {
                diag = diag
                    .with_location(report)
                    .with_suggestion("Delete the object file to force a rebuild");
            }
            ToolchainError::Spawn { source, .. } | ToolchainError::Io { source, .. } => {
                diag = diag.with_context(source.to_string());
            }
            ToolchainError::Configuration(_) => {}
        }

        diag
    }
}
