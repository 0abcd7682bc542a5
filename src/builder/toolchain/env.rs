//! Environment captured from the Visual Studio setup script.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::builder::error::ToolchainError;

/// Environment variables produced by `vcvarsall.bat`.
///
/// Names are stored uppercased, since Windows treats them case-insensitively
/// and `set` reports them with their original casing (`Path`, `INCLUDE`, ...).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapturedEnv {
    vars: BTreeMap<String, String>,
}

impl CapturedEnv {
    /// Parse the output of `set`.
    ///
    /// Lines without `=` and the hidden per-drive variables (`=C:=C:\`) are skipped.
    pub fn parse_set_output(output: &str) -> Self {
        let vars = output
            .lines()
            .filter(|line| !line.starts_with('='))
            .filter_map(|line| line.split_once('='))
            .filter(|(key, _)| !key.trim().is_empty())
            .map(|(key, value)| (key.trim().to_uppercase(), value.trim_end_matches('\r').to_string()))
            .collect();
        CapturedEnv { vars }
    }

    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        CapturedEnv {
            vars: vars
                .into_iter()
                .map(|(k, v)| (k.as_ref().to_uppercase(), v.into()))
                .collect(),
        }
    }

    /// Build from OS strings such as [`std::env::vars_os`], skipping pairs
    /// that are not valid Unicode.
    pub fn from_os_vars<I>(vars: I) -> Self
    where
        I: IntoIterator<Item = (OsString, OsString)>,
    {
        Self::from_vars(vars.into_iter().filter_map(|(key, value)| {
            match (key.into_string(), value.into_string()) {
                (Ok(key), Ok(value)) => Some((key, value)),
                (key, _) => {
                    tracing::trace!("skipping non-Unicode variable {:?}", key);
                    None
                }
            }
        }))
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(&key.to_uppercase()).map(String::as_str)
    }

    /// Look up a variable the setup script must have set.
    pub fn require(&self, key: &str, script: &Path) -> Result<&str, ToolchainError> {
        self.get(key)
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ToolchainError::MissingEnvironment {
                var: key.to_string(),
                script: script.to_path_buf(),
            })
    }

    /// Directories on the captured `PATH`, in order.
    pub fn path_dirs(&self) -> Vec<PathBuf> {
        self.get("PATH")
            .map(|path| {
                path.split(';')
                    .map(str::trim)
                    .filter(|dir| !dir.is_empty())
                    .map(PathBuf::from)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Find an executable on the captured `PATH`.
    pub fn find_tool(&self, exe: &str) -> Option<PathBuf> {
        self.path_dirs()
            .into_iter()
            .map(|dir| dir.join(exe))
            .find(|candidate| candidate.is_file())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}
