//! Configuration file support for vcbridge.
//!
//! Two configuration file locations are read:
//! - Global: `~/.vcbridge/config.toml` - User-wide defaults
//! - Project: `.vcbridge/config.toml` - Project-specific overrides
//!
//! Project config takes precedence over global config.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

use crate::builder::toolchain::{BridgeSettings, CompanionDependency, InstallCandidate};
use crate::core::arch::Architecture;
use crate::core::variant::BuildVariant;

/// vcbridge configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub toolchain: ToolchainSection,
    pub companion: CompanionSection,
    pub dependencies: DependenciesSection,
    pub build: BuildSection,
}

/// Installation lookup and session defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolchainSection {
    /// Default target architecture (x86, x64, arm64)
    pub arch: Option<String>,

    /// Default build variant (debug, release)
    pub variant: Option<String>,

    /// Installation roots to search, in preference order.
    /// Empty means the standard Visual Studio locations.
    pub candidates: Vec<InstallCandidate>,

    /// Edition directories to look for, best first
    pub editions: Vec<String>,

    /// Reuse a developer prompt environment when it targets the same arch
    pub use_developer_prompt: Option<bool>,
}

/// A prebuilt dependency that pins the toolchain version.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CompanionSection {
    pub root: Option<PathBuf>,

    /// Overrides the `msvcYYYY` tag read from the root's name
    pub version_tag: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DependenciesSection {
    /// Extra directory trees whose headers are never recorded
    pub exclude: Vec<PathBuf>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildSection {
    /// Parallel compiles (None = one per CPU)
    pub jobs: Option<usize>,

    /// Write compile_commands.json next to the objects
    pub compile_commands: bool,
}

impl Config {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    /// Load configuration with fallback to defaults if file doesn't exist.
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            Self::load(path).unwrap_or_else(|e| {
                tracing::warn!("Failed to load config from {}: {}", path.display(), e);
                Self::default()
            })
        } else {
            Self::default()
        }
    }

    /// Merge another config into this one (other takes precedence).
    pub fn merge(&mut self, other: Config) {
        if other.toolchain.arch.is_some() {
            self.toolchain.arch = other.toolchain.arch;
        }
        if other.toolchain.variant.is_some() {
            self.toolchain.variant = other.toolchain.variant;
        }
        if !other.toolchain.candidates.is_empty() {
            self.toolchain.candidates = other.toolchain.candidates;
        }
        if !other.toolchain.editions.is_empty() {
            self.toolchain.editions = other.toolchain.editions;
        }
        if other.toolchain.use_developer_prompt.is_some() {
            self.toolchain.use_developer_prompt = other.toolchain.use_developer_prompt;
        }

        if other.companion.root.is_some() {
            self.companion.root = other.companion.root;
        }
        if other.companion.version_tag.is_some() {
            self.companion.version_tag = other.companion.version_tag;
        }

        // Exclusions accumulate
        self.dependencies.exclude.extend(other.dependencies.exclude);

        if other.build.jobs.is_some() {
            self.build.jobs = other.build.jobs;
        }
        if other.build.compile_commands {
            self.build.compile_commands = true;
        }
    }

    /// Configured architecture, or x64.
    pub fn arch(&self) -> Result<Architecture> {
        match self.toolchain.arch {
            Some(ref s) => s.parse().map_err(|e: String| anyhow!(e)),
            None => Ok(Architecture::X64),
        }
    }

    /// Configured variant, or debug.
    pub fn variant(&self) -> Result<BuildVariant> {
        match self.toolchain.variant {
            Some(ref s) => s.parse().map_err(|e: String| anyhow!(e)),
            None => Ok(BuildVariant::default()),
        }
    }

    pub fn companion(&self) -> Option<CompanionDependency> {
        self.companion.root.as_ref().map(|root| CompanionDependency {
            root: root.clone(),
            version_tag: self.companion.version_tag.clone(),
        })
    }

    /// Settings for the environment bridge; explicit values win over config.
    pub fn bridge_settings(
        &self,
        arch: Option<Architecture>,
        variant: Option<BuildVariant>,
    ) -> Result<BridgeSettings> {
        let arch = match arch {
            Some(a) => a,
            None => self.arch()?,
        };
        let variant = match variant {
            Some(v) => v,
            None => self.variant()?,
        };

        let mut settings = BridgeSettings::new(arch, variant);
        if !self.toolchain.candidates.is_empty() {
            settings.candidates = self.toolchain.candidates.clone();
        }
        if !self.toolchain.editions.is_empty() {
            settings.editions = self.toolchain.editions.clone();
        }
        if let Some(use_prompt) = self.toolchain.use_developer_prompt {
            settings.use_developer_prompt = use_prompt;
        }
        settings.companion = self.companion();
        settings.extra_exclusions = self.dependencies.exclude.clone();

        Ok(settings)
    }
}

/// Load merged configuration from global and project locations.
///
/// Order of precedence (highest to lowest):
/// 1. Project config (.vcbridge/config.toml)
/// 2. Global config (~/.vcbridge/config.toml)
/// 3. Defaults
pub fn load_config(global_path: &Path, project_path: &Path) -> Config {
    let mut config = Config::default();

    if global_path.exists() {
        config.merge(Config::load_or_default(global_path));
    }

    if project_path.exists() {
        config.merge(Config::load_or_default(project_path));
    }

    config
}

/// Get the global vcbridge config directory (~/.vcbridge).
pub fn global_config_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(".vcbridge"))
}

/// Get the global config path (~/.vcbridge/config.toml).
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("config.toml"))
}

/// Get the project config path (.vcbridge/config.toml).
pub fn project_config_path(project_root: &Path) -> PathBuf {
    project_root.join(".vcbridge").join("config.toml")
}
