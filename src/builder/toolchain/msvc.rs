//! MSVC toolchain implementation.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::builder::compile::CompileOrchestrator;
use crate::builder::compile_db::CompileDatabase;
use crate::builder::depfile::DependencyRecord;
use crate::builder::error::ToolchainError;
use crate::builder::link::LinkOrchestrator;
use crate::core::arch::Architecture;
use crate::core::request::{CompileRequest, LinkRequest, SourceKind};

use super::{Toolchain, ToolRunner, ToolchainSession};

/// MSVC toolchain (Windows).
///
/// Cheap to clone; clones share the session, runner, and compile database.
#[derive(Clone)]
pub struct MsvcToolchain {
    session: Arc<ToolchainSession>,
    runner: Arc<dyn ToolRunner>,
    database: Option<Arc<CompileDatabase>>,
}

impl MsvcToolchain {
    pub fn new(session: Arc<ToolchainSession>, runner: Arc<dyn ToolRunner>) -> Self {
        MsvcToolchain {
            session,
            runner,
            database: None,
        }
    }

    /// Collect compile-database entries for every ordinary compile.
    pub fn with_database(mut self, database: Arc<CompileDatabase>) -> Self {
        self.database = Some(database);
        self
    }

    pub fn session(&self) -> &ToolchainSession {
        &self.session
    }

    pub fn database(&self) -> Option<&CompileDatabase> {
        self.database.as_deref()
    }
}

impl std::fmt::Debug for MsvcToolchain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MsvcToolchain")
            .field("arch", &self.session.architecture())
            .field("variant", &self.session.variant())
            .field("compiler", &self.session.tools().compiler)
            .finish()
    }
}

impl Toolchain for MsvcToolchain {
    fn architecture(&self) -> Architecture {
        self.session.architecture()
    }

    fn compile(
        &self,
        arch: Architecture,
        request: &CompileRequest,
    ) -> Result<DependencyRecord, ToolchainError> {
        let mut orchestrator = CompileOrchestrator::new(&self.session, self.runner.as_ref());
        if let Some(ref database) = self.database {
            orchestrator = orchestrator.with_database(database);
        }
        orchestrator.compile(arch, request)
    }

    fn link(&self, arch: Architecture, request: &LinkRequest) -> Result<PathBuf, ToolchainError> {
        LinkOrchestrator::new(&self.session, self.runner.as_ref()).link(arch, request)
    }

    fn object_extension(&self, source: &Path) -> &str {
        match SourceKind::of(source) {
            SourceKind::ResourceScript => "res",
            SourceKind::InterfaceDefinition => "tlb",
            SourceKind::Source => "obj",
        }
    }
}
