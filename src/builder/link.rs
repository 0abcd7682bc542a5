//! Archiver and linker invocation.

use std::fs;
use std::path::{Path, PathBuf};

use crate::builder::error::ToolchainError;
use crate::builder::quote::join_command_line;
use crate::builder::toolchain::{CommandSpec, Tool, ToolRunner, ToolchainSession};
use crate::core::arch::Architecture;
use crate::core::request::{LinkRequest, TargetType};
use crate::util::fs::create_parent_dir;

/// Longest command line passed directly; longer ones go through a response file.
///
/// `CreateProcess` accepts 32767 characters, but `cmd`-hosted tools stop at
/// 8191.
pub const RESPONSE_FILE_THRESHOLD: usize = 8000;

/// Produces static libraries, DLLs, and executables.
pub struct LinkOrchestrator<'a> {
    session: &'a ToolchainSession,
    runner: &'a dyn ToolRunner,
}

impl<'a> LinkOrchestrator<'a> {
    pub fn new(session: &'a ToolchainSession, runner: &'a dyn ToolRunner) -> Self {
        LinkOrchestrator { session, runner }
    }

    /// Link `request`, returning the artifact path.
    pub fn link(&self, arch: Architecture, request: &LinkRequest) -> Result<PathBuf, ToolchainError> {
        self.session.check_arch(arch)?;

        if !request.frameworks.is_empty() || !request.framework_paths.is_empty() {
            tracing::debug!("ignoring frameworks for {}", request.target.display());
        }

        create_parent_dir(&request.target).map_err(|e| ToolchainError::io(&request.target, e))?;

        let cmd = match request.options.target_type {
            TargetType::Static => self.archive_command(request),
            TargetType::Dynamic | TargetType::Executable => self.link_command(request),
        };
        let cmd = with_response_file(cmd, &request.target)?;

        let output = self.runner.run(&cmd)?;
        if !output.success() {
            return Err(ToolchainError::LinkFailed {
                target: request.target.clone(),
                code: output.code,
                output: output.combined(),
            });
        }

        tracing::debug!("linked {}", request.target.display());
        Ok(request.target.clone())
    }

    /// `lib` invocation for a static library.
    pub fn archive_command(&self, request: &LinkRequest) -> CommandSpec {
        self.session
            .command(Tool::Archiver)
            .arg("/nologo")
            .args(self.session.variant().archiver_flags().iter().copied())
            .arg(format!("/MACHINE:{}", self.session.architecture().machine()))
            .arg(format!("/OUT:{}", request.target.display()))
            .args(request.objects.iter().map(|o| o.display().to_string()))
    }

    /// `link` invocation for a DLL or executable.
    pub fn link_command(&self, request: &LinkRequest) -> CommandSpec {
        let arch = self.session.architecture();
        let options = &request.options;

        let mut cmd = self.session.command(Tool::Linker).arg("/nologo");
        if options.target_type == TargetType::Dynamic {
            cmd = cmd.arg("/DLL");
        }

        cmd = cmd
            .arg(format!("/MACHINE:{}", arch.machine()))
            .args(self.session.variant().linker_flags().iter().copied())
            .arg(options.interface.subsystem_flag())
            .arg("/MANIFEST:EMBED");

        if let Some(ref manifest) = options.manifest {
            cmd = cmd.arg(format!("/MANIFESTINPUT:{}", manifest.display()));
        }

        cmd.arg(format!("/OUT:{}", request.target.display()))
            .args(request.objects.iter().map(|o| o.display().to_string()))
            .args(request.lib_paths.iter().map(|d| format!("/LIBPATH:{}", d.display())))
            .args(request.libs.iter().map(|l| library_file_name(l)))
            .args(
                options
                    .force_link_symbols
                    .iter()
                    .map(|s| format!("/INCLUDE:{}", arch.decorate_symbol(s))),
            )
            .args(request.extra_args.iter().cloned())
    }
}

/// `foo` → `foo.lib`; names already carrying the extension are kept.
fn library_file_name(name: &str) -> String {
    let has_ext = Path::new(name)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("lib"));
    if has_ext {
        name.to_string()
    } else {
        format!("{}.lib", name)
    }
}

/// Path of the response file for `target`.
pub fn response_file_path(target: &Path) -> PathBuf {
    let mut name = target.as_os_str().to_owned();
    name.push(".rsp");
    PathBuf::from(name)
}

/// Move the arguments into `<target>.rsp` when the command line is too long.
fn with_response_file(cmd: CommandSpec, target: &Path) -> Result<CommandSpec, ToolchainError> {
    if cmd.command_line().len() <= RESPONSE_FILE_THRESHOLD {
        return Ok(cmd);
    }

    let rsp = response_file_path(target);
    let mut contents = join_command_line(&cmd.args);
    contents.push_str("\r\n");
    fs::write(&rsp, contents).map_err(|e| ToolchainError::io(&rsp, e))?;

    tracing::debug!(
        "{} arguments written to {}",
        cmd.args.len(),
        rsp.display()
    );

    Ok(CommandSpec {
        args: vec![format!("@{}", rsp.display())],
        ..cmd
    })
}
