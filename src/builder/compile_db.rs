//! `compile_commands.json` output for editors and analysis tools.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::builder::toolchain::CommandSpec;
use crate::util::fs::write_string;

/// compile_commands.json entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompileCommand {
    pub directory: String,
    pub file: String,
    pub arguments: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
}

impl CompileCommand {
    /// Entry for the command that compiled `source` into `object`.
    ///
    /// The directory is the current working directory, so relative paths in
    /// the arguments resolve the way they did for the compiler.
    pub fn from_spec(source: &Path, object: &Path, spec: &CommandSpec) -> Self {
        let directory = std::env::current_dir()
            .map(|d| d.display().to_string())
            .unwrap_or_else(|_| ".".to_string());

        let mut arguments = Vec::with_capacity(spec.args.len() + 1);
        arguments.push(spec.program.display().to_string());
        arguments.extend(spec.args.iter().cloned());

        CompileCommand {
            directory,
            file: source.display().to_string(),
            arguments,
            output: Some(object.display().to_string()),
        }
    }

    /// Write this entry alone as a one-element fragment.
    pub fn write_fragment(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(std::slice::from_ref(self))?;
        write_string(path, &json)
    }
}

/// Entries collected from concurrent compiles.
#[derive(Debug, Default)]
pub struct CompileDatabase {
    entries: Mutex<Vec<CompileCommand>>,
}

impl CompileDatabase {
    pub fn new() -> Self {
        CompileDatabase::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<CompileCommand>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Add an entry, replacing any earlier one for the same source and object.
    pub fn record(&self, command: CompileCommand) {
        let mut entries = self.lock();
        entries.retain(|e| !(e.file == command.file && e.output == command.output));
        entries.push(command);
    }

    /// Entries sorted by file.
    pub fn entries(&self) -> Vec<CompileCommand> {
        let mut entries = self.lock().clone();
        entries.sort_by(|a, b| a.file.cmp(&b.file));
        entries
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Write every entry as a JSON array.
    pub fn write(&self, path: &Path) -> Result<PathBuf> {
        let json = serde_json::to_string_pretty(&self.entries())
            .context("failed to serialize compile database")?;
        write_string(path, &json)?;
        Ok(path.to_path_buf())
    }
}
