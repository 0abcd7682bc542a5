//! Compiler invocation for one source file.
//!
//! Ordinary C and C++ sources are compiled by `cl`, which writes a
//! `/sourceDependencies` JSON report next to the dependency file. Resource
//! scripts and interface definitions are compiled by tools that cannot report
//! their includes, so `cl` first preprocesses them with `/showIncludes` and
//! its include notes stand in for the report.

use std::path::Path;

use crate::builder::compile_db::{CompileCommand, CompileDatabase};
use crate::builder::depfile::{
    DependencyRecord, DependencyRecorder, HeaderSource, ShowIncludes, SourceDependencies,
};
use crate::builder::error::ToolchainError;
use crate::builder::toolchain::{
    CommandSpec, OutputEncoding, Tool, ToolOutput, ToolRunner, ToolchainSession,
};
use crate::core::arch::Architecture;
use crate::core::request::{CompileRequest, SourceKind};
use crate::core::variant::compose_macros;
use crate::util::fs::{create_parent_dir, remove_file_if_exists};

/// Options passed to every ordinary compile.
pub const COMPILER_FIXED_FLAGS: &[&str] = &["/nologo", "/c", "/utf-8", "/std:c++17", "/EHsc", "/we4834"];

/// Options for the include-enumerating preprocess pass.
pub const PREPROCESS_FLAGS: &[&str] = &["/nologo", "/EP", "/showIncludes", "/TC"];

/// Keeps `Note: including file:` in English whatever the installed language.
const ENGLISH_LANGID: (&str, &str) = ("VSLANG", "1033");

/// Runs the compile pipeline for each [`CompileRequest`].
pub struct CompileOrchestrator<'a> {
    session: &'a ToolchainSession,
    runner: &'a dyn ToolRunner,
    recorder: DependencyRecorder,
    database: Option<&'a CompileDatabase>,
}

impl<'a> CompileOrchestrator<'a> {
    pub fn new(session: &'a ToolchainSession, runner: &'a dyn ToolRunner) -> Self {
        CompileOrchestrator {
            session,
            runner,
            recorder: DependencyRecorder::new(session.exclusion_roots()),
            database: None,
        }
    }

    /// Record ordinary compiles into `database`.
    pub fn with_database(mut self, database: &'a CompileDatabase) -> Self {
        self.database = Some(database);
        self
    }

    /// Compile one source file, writing its object and dependency files.
    pub fn compile(
        &self,
        arch: Architecture,
        request: &CompileRequest,
    ) -> Result<DependencyRecord, ToolchainError> {
        self.session.check_arch(arch)?;

        for path in [&request.object, &request.dep_file] {
            create_parent_dir(path).map_err(|e| ToolchainError::io(path, e))?;
        }

        if !request.framework_paths.is_empty() {
            tracing::debug!(
                "ignoring {} framework path(s) for {}",
                request.framework_paths.len(),
                request.source.display()
            );
        }

        match request.kind() {
            SourceKind::Source => self.compile_source(request),
            SourceKind::ResourceScript => {
                self.compile_preprocessed(request, "RC_INVOKED", self.resource_command(request))
            }
            SourceKind::InterfaceDefinition => {
                self.compile_preprocessed(request, "__midl", self.interface_command(request))
            }
        }
    }

    fn compile_source(&self, request: &CompileRequest) -> Result<DependencyRecord, ToolchainError> {
        let report = request.report_path();
        // A report left by an earlier compile must not stand in for this one.
        remove_file_if_exists(&report).map_err(|e| ToolchainError::io(&report, e))?;

        let cmd = self.source_command(request);
        let output = self.runner.run(&cmd)?;
        check_compile(request, &output)?;

        if let Some(database) = self.database {
            database.record(CompileCommand::from_spec(&request.source, &request.object, &cmd));
        }

        let dependencies = SourceDependencies::read(&report, &request.source)?;
        self.record(request, &dependencies)
    }

    fn compile_preprocessed(
        &self,
        request: &CompileRequest,
        marker: &str,
        cmd: CommandSpec,
    ) -> Result<DependencyRecord, ToolchainError> {
        let preprocessed = self.runner.run(&self.preprocess_command(request, marker))?;
        check_compile(request, &preprocessed)?;
        let record = self.recorder.record(
            &request.object,
            &request.source,
            &ShowIncludes::new(&preprocessed.stderr),
        );

        let output = self.runner.run(&cmd)?;
        check_compile(request, &output)?;
        record.write(&request.dep_file)?;
        Ok(record)
    }

    fn record(
        &self,
        request: &CompileRequest,
        headers: &dyn HeaderSource,
    ) -> Result<DependencyRecord, ToolchainError> {
        self.recorder
            .write(&request.dep_file, &request.object, &request.source, headers)
    }

    fn macros(&self, request: &CompileRequest) -> Vec<String> {
        compose_macros(self.session.variant(), &request.macros)
    }

    /// `cl` invocation for an ordinary source.
    pub fn source_command(&self, request: &CompileRequest) -> CommandSpec {
        let variant = self.session.variant();

        self.session
            .command(Tool::Compiler)
            .args(COMPILER_FIXED_FLAGS.iter().copied())
            .args(variant.compiler_flags().iter().copied())
            .args(self.macros(request).iter().map(|m| format!("/D{}", m)))
            .args(request.include_dirs.iter().map(|d| format!("/I{}", d.display())))
            .arg(request.options.runtime.flag(variant))
            .arg("/sourceDependencies")
            .arg(request.report_path().display().to_string())
            .arg(format!("/Fo{}", request.object.display()))
            .arg(request.source.display().to_string())
    }

    /// `cl` preprocess-only invocation that lists includes on stderr.
    pub fn preprocess_command(&self, request: &CompileRequest, marker: &str) -> CommandSpec {
        self.session
            .command(Tool::Compiler)
            .env(ENGLISH_LANGID.0, ENGLISH_LANGID.1)
            .stderr_encoding(OutputEncoding::Utf8)
            .args(PREPROCESS_FLAGS.iter().copied())
            .arg(format!("/D{}", marker))
            .args(self.macros(request).iter().map(|m| format!("/D{}", m)))
            .args(request.include_dirs.iter().map(|d| format!("/I{}", d.display())))
            .arg(request.source.display().to_string())
    }

    /// `rc` invocation producing the `.res` object.
    pub fn resource_command(&self, request: &CompileRequest) -> CommandSpec {
        let mut cmd = self.session.command(Tool::ResourceCompiler).arg("/nologo");
        for m in self.macros(request) {
            cmd = cmd.arg("/d").arg(m);
        }
        for dir in &request.include_dirs {
            cmd = cmd.arg("/i").arg(dir.display().to_string());
        }
        cmd.arg("/fo")
            .arg(request.object.display().to_string())
            .arg(request.source.display().to_string())
    }

    /// `midl` invocation producing a type library, with the header and
    /// proxy sources next to it.
    pub fn interface_command(&self, request: &CompileRequest) -> CommandSpec {
        let out_dir = request
            .object
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        let stem = request
            .source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        let mut cmd = self
            .session
            .command(Tool::CodeGenerator)
            .arg("/nologo")
            .args(self.session.codegen_include_args());
        for dir in &request.include_dirs {
            cmd = cmd.arg("/I").arg(dir.display().to_string());
        }
        for m in self.macros(request) {
            cmd = cmd.arg("/D").arg(m);
        }
        cmd.arg("/env")
            .arg(self.session.architecture().midl_env())
            .arg("/out")
            .arg(out_dir.display().to_string())
            .arg("/h")
            .arg(format!("{}.h", stem))
            .arg("/tlb")
            .arg(request.object.display().to_string())
            .arg(request.source.display().to_string())
    }
}

fn check_compile(request: &CompileRequest, output: &ToolOutput) -> Result<(), ToolchainError> {
    if output.success() {
        Ok(())
    } else {
        Err(ToolchainError::CompileFailed {
            source_file: request.source.clone(),
            code: output.code,
            output: output.combined(),
        })
    }
}
