//! The architecture-locked state shared by every compile and link.

use std::path::{Path, PathBuf};

use crate::builder::depfile::ExclusionRoots;
use crate::builder::error::ToolchainError;
use crate::core::arch::Architecture;
use crate::core::variant::BuildVariant;

use super::{CapturedEnv, CommandSpec};

/// One of the tools a session resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    Compiler,
    Linker,
    Archiver,
    ResourceCompiler,
    CodeGenerator,
}

impl Tool {
    pub const ALL: [Tool; 5] = [
        Tool::Compiler,
        Tool::Linker,
        Tool::Archiver,
        Tool::ResourceCompiler,
        Tool::CodeGenerator,
    ];

    /// Executable name looked up on the captured `PATH`.
    pub fn executable(&self) -> &'static str {
        match self {
            Tool::Compiler => "cl.exe",
            Tool::Linker => "link.exe",
            Tool::Archiver => "lib.exe",
            Tool::ResourceCompiler => "rc.exe",
            Tool::CodeGenerator => "midl.exe",
        }
    }
}

/// Absolute paths of the resolved tools.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolPaths {
    pub compiler: PathBuf,
    pub linker: PathBuf,
    pub archiver: PathBuf,
    pub resource_compiler: PathBuf,
    pub code_generator: PathBuf,
}

impl ToolPaths {
    /// Resolve every tool from the captured `PATH`.
    pub fn resolve(env: &CapturedEnv, script: &Path) -> Result<Self, ToolchainError> {
        let find = |tool: Tool| {
            env.find_tool(tool.executable()).ok_or_else(|| {
                ToolchainError::Configuration(format!(
                    "`{}` is not on the PATH set up by {}",
                    tool.executable(),
                    script.display()
                ))
            })
        };

        Ok(ToolPaths {
            compiler: find(Tool::Compiler)?,
            linker: find(Tool::Linker)?,
            archiver: find(Tool::Archiver)?,
            resource_compiler: find(Tool::ResourceCompiler)?,
            code_generator: find(Tool::CodeGenerator)?,
        })
    }

    pub fn get(&self, tool: Tool) -> &Path {
        match tool {
            Tool::Compiler => &self.compiler,
            Tool::Linker => &self.linker,
            Tool::Archiver => &self.archiver,
            Tool::ResourceCompiler => &self.resource_compiler,
            Tool::CodeGenerator => &self.code_generator,
        }
    }
}

/// Installation directories known to a session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallRoots {
    /// Visual Studio installation root (the edition directory)
    pub vendor_root: PathBuf,
    /// Windows SDK root (`WindowsSdkDir`)
    pub sdk_root: PathBuf,
    /// Root of the companion dependency, if one is configured
    pub companion_root: Option<PathBuf>,
    /// `<VCToolsInstallDir>/include`
    pub system_include_dir: PathBuf,
    /// Additional configured exclusion roots
    pub extra_exclusions: Vec<PathBuf>,
}

/// A toolchain initialized for one architecture and variant.
///
/// Built once per run by the environment bridge and never mutated. Share it
/// behind an `Arc` to compile from several threads; a build for another
/// architecture needs a second session.
#[derive(Debug, Clone)]
pub struct ToolchainSession {
    arch: Architecture,
    variant: BuildVariant,
    tools: ToolPaths,
    env: CapturedEnv,
    roots: InstallRoots,
}

impl ToolchainSession {
    pub fn new(
        arch: Architecture,
        variant: BuildVariant,
        tools: ToolPaths,
        env: CapturedEnv,
        roots: InstallRoots,
    ) -> Self {
        ToolchainSession {
            arch,
            variant,
            tools,
            env,
            roots,
        }
    }

    pub fn architecture(&self) -> Architecture {
        self.arch
    }

    pub fn variant(&self) -> BuildVariant {
        self.variant
    }

    pub fn tools(&self) -> &ToolPaths {
        &self.tools
    }

    pub fn env(&self) -> &CapturedEnv {
        &self.env
    }

    pub fn roots(&self) -> &InstallRoots {
        &self.roots
    }

    /// Directories whose headers are left out of dependency files.
    pub fn exclusion_roots(&self) -> ExclusionRoots {
        let mut roots = ExclusionRoots::default();
        roots.add(&self.roots.vendor_root);
        roots.add(&self.roots.sdk_root);
        if let Some(ref companion) = self.roots.companion_root {
            roots.add(companion);
        }
        for extra in &self.roots.extra_exclusions {
            roots.add(extra);
        }
        roots
    }

    /// Fail unless `requested` is the session's architecture.
    pub fn check_arch(&self, requested: Architecture) -> Result<(), ToolchainError> {
        if requested == self.arch {
            Ok(())
        } else {
            Err(ToolchainError::ArchitectureMismatch {
                session: self.arch,
                requested,
            })
        }
    }

    /// A command for `tool` carrying the captured environment.
    pub fn command(&self, tool: Tool) -> CommandSpec {
        let mut cmd = CommandSpec::new(self.tools.get(tool));
        for (key, value) in self.env.iter() {
            cmd = cmd.env(key, value);
        }
        cmd
    }

    /// Include arguments the code generator needs explicitly.
    ///
    /// `midl` does not pick up the toolchain headers from `INCLUDE` the way
    /// `cl` does.
    pub fn codegen_include_args(&self) -> Vec<String> {
        vec![
            "/I".to_string(),
            self.roots.system_include_dir.display().to_string(),
        ]
    }
}
