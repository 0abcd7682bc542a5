//! Locating a Visual Studio installation and capturing its environment.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::builder::error::ToolchainError;
use crate::core::arch::Architecture;
use crate::core::variant::BuildVariant;
use crate::util::process::command_interpreter;

use super::{
    CapturedEnv, CommandSpec, InstallRoots, OutputEncoding, ToolPaths, ToolRunner,
    ToolchainSession,
};

/// Edition directories looked for under each installation root, best first.
pub const EDITIONS: &[&str] = &["Enterprise", "Professional", "Community", "BuildTools"];

/// Variables the setup script must define.
pub const REQUIRED_VARS: &[&str] = &["PATH", "INCLUDE", "LIB", "VCToolsInstallDir", "WindowsSdkDir"];

static VERSION_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)msvc(\d{4})").unwrap());

/// A directory that may hold a Visual Studio installation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallCandidate {
    /// Year directory, e.g. `C:\Program Files\Microsoft Visual Studio\2022`
    pub root: PathBuf,
    /// Version it provides, e.g. `2022`
    pub version: String,
}

impl InstallCandidate {
    pub fn new(root: impl Into<PathBuf>, version: impl Into<String>) -> Self {
        InstallCandidate {
            root: root.into(),
            version: version.into(),
        }
    }

    /// First edition directory present under this root.
    fn find_edition(&self, editions: &[String]) -> Option<(String, PathBuf)> {
        editions
            .iter()
            .map(|edition| (edition.clone(), self.root.join(edition)))
            .find(|(_, dir)| dir.is_dir())
    }
}

/// Standard installation roots, newest first.
pub fn default_candidates() -> Vec<InstallCandidate> {
    let program_files =
        std::env::var("ProgramFiles").unwrap_or_else(|_| "C:\\Program Files".to_string());
    let program_files_x86 = std::env::var("ProgramFiles(x86)")
        .unwrap_or_else(|_| "C:\\Program Files (x86)".to_string());

    let vs = |base: &str, year: &str| {
        InstallCandidate::new(
            PathBuf::from(base).join("Microsoft Visual Studio").join(year),
            year,
        )
    };

    vec![
        vs(&program_files, "2022"),
        vs(&program_files_x86, "2019"),
        vs(&program_files_x86, "2017"),
    ]
}

/// A prebuilt dependency whose binaries were built by a specific toolchain.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompanionDependency {
    pub root: PathBuf,
    /// Explicit version tag; derived from the root's name when absent
    pub version_tag: Option<String>,
}

impl CompanionDependency {
    /// The toolchain version this dependency expects.
    pub fn tag(&self) -> Option<String> {
        self.version_tag
            .clone()
            .or_else(|| version_tag_from_path(&self.root))
    }
}

/// Extract the `YYYY` of an `msvcYYYY` directory name.
///
/// ```
/// use std::path::Path;
/// use vcbridge::builder::toolchain::version_tag_from_path;
///
/// assert_eq!(
///     version_tag_from_path(Path::new("C:/Qt/5.15.2/msvc2019_64")),
///     Some("2019".to_string())
/// );
/// ```
pub fn version_tag_from_path(path: &Path) -> Option<String> {
    let name = path.file_name()?.to_str()?;
    VERSION_TAG.captures(name).map(|caps| caps[1].to_string())
}

/// Release year of a `VisualStudioVersion` such as `16.0`.
pub fn release_year(version: &str) -> Option<&'static str> {
    match version.split('.').next()?.trim() {
        "15" => Some("2017"),
        "16" => Some("2019"),
        "17" => Some("2022"),
        "18" => Some("2026"),
        _ => None,
    }
}

/// The installation chosen for a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedInstall {
    pub root: PathBuf,
    pub version: String,
    pub edition: String,
    /// `<root>/<edition>`
    pub edition_dir: PathBuf,
}

impl SelectedInstall {
    pub fn vcvarsall(&self) -> PathBuf {
        self.edition_dir
            .join("VC")
            .join("Auxiliary")
            .join("Build")
            .join("vcvarsall.bat")
    }
}

/// Choose an installation.
///
/// Candidates whose version equals the companion tag are tried first, then
/// every candidate in the given order; the first with an edition directory
/// wins.
pub fn select_install(
    candidates: &[InstallCandidate],
    editions: &[String],
    companion_tag: Option<&str>,
) -> Result<SelectedInstall, ToolchainError> {
    let preferred = candidates
        .iter()
        .filter(|c| companion_tag.is_some_and(|tag| c.version == tag));

    for candidate in preferred.chain(candidates.iter()) {
        if let Some((edition, edition_dir)) = candidate.find_edition(editions) {
            tracing::debug!(
                "selected Visual Studio {} {} at {}",
                candidate.version,
                edition,
                edition_dir.display()
            );
            return Ok(SelectedInstall {
                root: candidate.root.clone(),
                version: candidate.version.clone(),
                edition,
                edition_dir,
            });
        }
        tracing::trace!("no edition under {}", candidate.root.display());
    }

    Err(ToolchainError::ToolchainNotFound {
        searched: candidates.iter().map(|c| c.root.clone()).collect(),
    })
}

/// Everything the bridge needs to produce a session.
#[derive(Debug, Clone)]
pub struct BridgeSettings {
    pub arch: Architecture,
    pub variant: BuildVariant,
    pub candidates: Vec<InstallCandidate>,
    pub editions: Vec<String>,
    pub companion: Option<CompanionDependency>,
    pub extra_exclusions: Vec<PathBuf>,
    /// Reuse an already configured developer prompt environment
    pub use_developer_prompt: bool,
}

impl BridgeSettings {
    pub fn new(arch: Architecture, variant: BuildVariant) -> Self {
        BridgeSettings {
            arch,
            variant,
            candidates: default_candidates(),
            editions: EDITIONS.iter().map(|e| e.to_string()).collect(),
            companion: None,
            extra_exclusions: Vec::new(),
            use_developer_prompt: true,
        }
    }
}

/// Produces a [`ToolchainSession`] by running the setup script once.
pub struct EnvironmentBridge<'a> {
    runner: &'a dyn ToolRunner,
}

impl<'a> EnvironmentBridge<'a> {
    pub fn new(runner: &'a dyn ToolRunner) -> Self {
        EnvironmentBridge { runner }
    }

    /// Locate an installation, capture its environment, and resolve tools.
    pub fn initialize(&self, settings: &BridgeSettings) -> Result<ToolchainSession, ToolchainError> {
        if settings.use_developer_prompt {
            let current = CapturedEnv::from_os_vars(std::env::vars_os());
            if let Some(session) = Self::from_current_env(settings, current)? {
                tracing::info!("using the {} developer prompt environment", settings.arch);
                return Ok(session);
            }
        }

        let tag = settings.companion.as_ref().and_then(CompanionDependency::tag);
        let selected = select_install(&settings.candidates, &settings.editions, tag.as_deref())?;
        let script = selected.vcvarsall();

        tracing::info!(
            "initializing Visual Studio {} {} for {}",
            selected.version,
            selected.edition,
            settings.arch
        );

        let env = self.capture(&script, settings.arch)?;
        build_session(settings, env, &script, selected.edition_dir)
    }

    /// Run `vcvarsall.bat` for `arch` and parse the resulting environment.
    pub fn capture(&self, script: &Path, arch: Architecture) -> Result<CapturedEnv, ToolchainError> {
        let batch = write_setup_batch(script, arch)?;

        // `/u` makes `set` write UTF-16LE whatever the console code page.
        let cmd = CommandSpec::new(command_interpreter())
            .args(["/u", "/d", "/c"])
            .arg(batch.to_string_lossy())
            .stdout_encoding(OutputEncoding::Utf16Le);
        let output = self.runner.run(&cmd)?;

        if !output.success() {
            return Err(ToolchainError::SetupScriptFailed {
                script: script.to_path_buf(),
                code: output.code,
                // The script's own echoes arrive as UTF-16LE too.
                output: output.combined().replace('\0', ""),
            });
        }

        let env = CapturedEnv::parse_set_output(&output.stdout);
        tracing::debug!("captured {} environment variables", env.len());
        Ok(env)
    }

    /// Build a session from an environment that a developer prompt already
    /// configured for `settings.arch`.
    ///
    /// Returns `None` when the environment targets no architecture or another
    /// one, or when a companion dependency asks for a different release.
    pub fn from_current_env(
        settings: &BridgeSettings,
        env: CapturedEnv,
    ) -> Result<Option<ToolchainSession>, ToolchainError> {
        let target = env
            .get("VSCMD_ARG_TGT_ARCH")
            .and_then(Architecture::from_vscmd_target);
        if target != Some(settings.arch) {
            return Ok(None);
        }

        if let Some(tag) = settings.companion.as_ref().and_then(CompanionDependency::tag) {
            let year = env
                .get("VisualStudioVersion")
                .or_else(|| env.get("VSCMD_VER"))
                .and_then(release_year);
            if year != Some(tag.as_str()) {
                tracing::debug!(
                    "developer prompt is Visual Studio {}, companion wants {}",
                    year.unwrap_or("unknown"),
                    tag
                );
                return Ok(None);
            }
        }

        let vendor_root = env
            .get("VSINSTALLDIR")
            .map(|dir| PathBuf::from(dir.trim_end_matches('\\')))
            .unwrap_or_default();
        let script = vendor_root
            .join("VC")
            .join("Auxiliary")
            .join("Build")
            .join("vcvarsall.bat");

        build_session(settings, env, &script, vendor_root).map(Some)
    }
}

/// Contents of the helper batch file.
///
/// The setup script's own chatter goes to stderr so stdout carries only `set`.
pub(crate) fn setup_batch_contents(script: &Path, arch: Architecture) -> String {
    format!(
        "@echo off\r\ncall \"{}\" {} 1>&2\r\nif errorlevel 1 exit /b 1\r\nset\r\n",
        script.display(),
        arch.vcvars_arg()
    )
}

fn write_setup_batch(script: &Path, arch: Architecture) -> Result<tempfile::TempPath, ToolchainError> {
    let temp_dir = std::env::temp_dir();
    let mut file = tempfile::Builder::new()
        .prefix("vcbridge-vcvars")
        .suffix(".bat")
        .tempfile()
        .map_err(|e| ToolchainError::io(&temp_dir, e))?;

    file.write_all(setup_batch_contents(script, arch).as_bytes())
        .map_err(|e| ToolchainError::io(file.path(), e))?;

    // Closed so cmd can read it; removed when dropped.
    Ok(file.into_temp_path())
}

fn build_session(
    settings: &BridgeSettings,
    env: CapturedEnv,
    script: &Path,
    vendor_root: PathBuf,
) -> Result<ToolchainSession, ToolchainError> {
    for var in REQUIRED_VARS {
        env.require(var, script)?;
    }

    let tools = ToolPaths::resolve(&env, script)?;
    let roots = InstallRoots {
        vendor_root,
        sdk_root: PathBuf::from(env.require("WindowsSdkDir", script)?),
        companion_root: settings.companion.as_ref().map(|c| c.root.clone()),
        system_include_dir: PathBuf::from(env.require("VCToolsInstallDir", script)?).join("include"),
        extra_exclusions: settings.extra_exclusions.clone(),
    };

    tracing::debug!("compiler: {}", tools.compiler.display());

    Ok(ToolchainSession::new(
        settings.arch,
        settings.variant,
        tools,
        env,
        roots,
    ))
}
