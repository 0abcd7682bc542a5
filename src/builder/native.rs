//! Native build driver.
//!
//! Compiles a list of sources in parallel against one toolchain and links the
//! results into a single artifact. Every listed source is compiled on every
//! run; deciding what is out of date belongs to the caller.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use rayon::prelude::*;

use crate::builder::depfile::DependencyRecord;
use crate::builder::error::ToolchainError;
use crate::builder::toolchain::Toolchain;
use crate::core::request::{CompileRequest, LinkOptions, LinkRequest, SourceKind};
use crate::core::variant::RuntimeLinkage;

/// Sources and settings for one artifact.
#[derive(Debug, Clone)]
pub struct BuildPlan {
    pub sources: Vec<PathBuf>,
    /// Directory for objects and dependency files
    pub out_dir: PathBuf,
    pub macros: Vec<String>,
    pub include_dirs: Vec<PathBuf>,
    pub runtime: RuntimeLinkage,
    pub target: PathBuf,
    pub link_options: LinkOptions,
    pub lib_paths: Vec<PathBuf>,
    pub libs: Vec<String>,
    pub extra_link_args: Vec<String>,
}

impl BuildPlan {
    pub fn new(
        sources: Vec<PathBuf>,
        out_dir: impl Into<PathBuf>,
        target: impl Into<PathBuf>,
        link_options: LinkOptions,
    ) -> Self {
        BuildPlan {
            sources,
            out_dir: out_dir.into(),
            macros: Vec::new(),
            include_dirs: Vec::new(),
            runtime: RuntimeLinkage::default(),
            target: target.into(),
            link_options,
            lib_paths: Vec::new(),
            libs: Vec::new(),
            extra_link_args: Vec::new(),
        }
    }
}

/// Result of a successful build.
#[derive(Debug, Clone)]
pub struct BuildOutcome {
    pub records: Vec<DependencyRecord>,
    pub artifact: PathBuf,
}

/// Object path for `source` inside `out_dir`.
pub fn object_path_for(out_dir: &Path, source: &Path, extension: &str) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    out_dir.join(format!("{}.{}", stem, extension))
}

/// Dependency file path for an object.
pub fn dep_path_for(object: &Path) -> PathBuf {
    let mut name = object.as_os_str().to_owned();
    name.push(".d");
    PathBuf::from(name)
}

/// Compiles and links a [`BuildPlan`].
pub struct NativeBuilder<'a> {
    toolchain: &'a dyn Toolchain,
    jobs: Option<usize>,
}

impl<'a> NativeBuilder<'a> {
    pub fn new(toolchain: &'a dyn Toolchain) -> Self {
        NativeBuilder {
            toolchain,
            jobs: None,
        }
    }

    /// Limit parallel compiles (default: one per CPU).
    pub fn with_jobs(mut self, jobs: Option<usize>) -> Self {
        self.jobs = jobs;
        self
    }

    /// One compile request per source.
    ///
    /// Fails if two sources would write the same object file.
    pub fn compile_requests(&self, plan: &BuildPlan) -> Result<Vec<CompileRequest>, ToolchainError> {
        let mut owners: HashMap<PathBuf, &Path> = HashMap::new();
        let mut requests = Vec::with_capacity(plan.sources.len());

        for source in &plan.sources {
            let ext = self.toolchain.object_extension(source);
            let object = object_path_for(&plan.out_dir, source, ext);

            if let Some(previous) = owners.insert(object.clone(), source.as_path()) {
                return Err(ToolchainError::Configuration(format!(
                    "{} and {} would both compile to {}",
                    previous.display(),
                    source.display(),
                    object.display()
                )));
            }

            let dep_file = dep_path_for(&object);
            requests.push(
                CompileRequest::new(source, object, dep_file)
                    .with_macros(plan.macros.iter().cloned())
                    .with_include_dirs(plan.include_dirs.iter().cloned())
                    .with_runtime(plan.runtime),
            );
        }

        Ok(requests)
    }

    /// Compile every source, then link once.
    pub fn build(&self, plan: &BuildPlan) -> Result<BuildOutcome, ToolchainError> {
        let arch = self.toolchain.architecture();
        let requests = self.compile_requests(plan)?;

        tracing::info!("compiling {} files for {}", requests.len(), arch);

        let mut pool = rayon::ThreadPoolBuilder::new();
        if let Some(jobs) = self.jobs {
            pool = pool.num_threads(jobs);
        }
        let pool = pool
            .build()
            .map_err(|e| ToolchainError::Configuration(format!("cannot start compile workers: {}", e)))?;

        let records = pool.install(|| {
            requests
                .par_iter()
                .map(|request| self.toolchain.compile(arch, request))
                .collect::<Result<Vec<_>, _>>()
        })?;

        // Type libraries are build outputs, not link inputs.
        let objects = requests
            .iter()
            .filter(|r| r.kind() != SourceKind::InterfaceDefinition)
            .map(|r| r.object.clone())
            .collect();

        let mut link = LinkRequest::new(&plan.target, objects, plan.link_options.clone());
        link.lib_paths = plan.lib_paths.clone();
        link.libs = plan.libs.clone();
        link.extra_args = plan.extra_link_args.clone();

        tracing::info!("linking {}", plan.target.display());
        let artifact = self.toolchain.link(arch, &link)?;

        Ok(BuildOutcome { records, artifact })
    }
}
