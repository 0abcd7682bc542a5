//! Dependency files for incremental builds.
//!
//! The compiler reports the headers a translation unit pulled in through one
//! of two channels: a `/sourceDependencies` JSON report for ordinary sources,
//! or `/showIncludes` notes when a resource script is run through the
//! preprocessor. Both are adapted to [`HeaderSource`] and fed to a single
//! [`DependencyRecorder`], which normalizes each path, drops headers under an
//! exclusion root, and writes a Makefile-style dependency file.
//!
//! Headers from the toolchain, the Windows SDK, and companion dependencies are
//! never recorded. There are thousands of them and they change only when the
//! installation does, so omitting them keeps dependency loading fast at the
//! cost of not noticing a vendor header edit.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

use crate::builder::error::ToolchainError;

static INCLUDE_NOTE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*note:\s*including file:\s*(.+?)\s*$").unwrap());

/// Normalize a path for comparison: forward slashes, lowercase, no trailing slash.
pub fn normalize_path(path: &str) -> String {
    let mut normalized = path.trim().replace('\\', "/").to_lowercase();
    while normalized.len() > 1 && normalized.ends_with('/') {
        normalized.pop();
    }
    normalized
}

/// Directories whose contents are never recorded as dependencies.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExclusionRoots {
    roots: Vec<String>,
}

impl ExclusionRoots {
    pub fn new<I, P>(roots: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut set = ExclusionRoots::default();
        for root in roots {
            set.add(root);
        }
        set
    }

    pub fn add(&mut self, root: impl AsRef<Path>) {
        let normalized = normalize_path(&root.as_ref().to_string_lossy());
        if !normalized.is_empty() && !self.roots.contains(&normalized) {
            self.roots.push(normalized);
        }
    }

    /// Whether an already-normalized path lies under any root.
    pub fn excludes(&self, normalized: &str) -> bool {
        self.roots.iter().any(|root| {
            normalized == root
                || (normalized.starts_with(root.as_str())
                    && normalized.as_bytes().get(root.len()) == Some(&b'/'))
        })
    }

    pub fn roots(&self) -> &[String] {
        &self.roots
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }
}

/// Something that can enumerate the headers a compile discovered.
pub trait HeaderSource {
    /// Call `emit` once per discovered header path, in discovery order.
    fn for_each_header(&self, emit: &mut dyn FnMut(&str));
}

/// The JSON report written by `cl /sourceDependencies`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SourceDependencies {
    pub version: String,
    pub data: SourceDependencyData,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SourceDependencyData {
    pub source: String,
    #[serde(default)]
    pub includes: Vec<String>,
    #[serde(default)]
    pub imported_header_units: Vec<String>,
}

impl SourceDependencies {
    pub fn parse(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Read and parse a report file.
    ///
    /// Any failure is a [`ToolchainError::DependencyExtractionFailed`] for
    /// `source`, since the compile that produced it already succeeded.
    pub fn read(report: &Path, source: &Path) -> Result<Self, ToolchainError> {
        let fail = |reason: String| ToolchainError::DependencyExtractionFailed {
            source_file: source.to_path_buf(),
            report: report.to_path_buf(),
            reason,
        };

        let contents = fs::read_to_string(report).map_err(|e| fail(e.to_string()))?;
        SourceDependencies::parse(&contents).map_err(|e| fail(format!("malformed report: {}", e)))
    }
}

impl HeaderSource for SourceDependencies {
    fn for_each_header(&self, emit: &mut dyn FnMut(&str)) {
        for path in self.data.includes.iter().chain(&self.data.imported_header_units) {
            emit(path);
        }
    }
}

/// `Note: including file:` lines captured from `cl /showIncludes`.
#[derive(Debug, Clone, Copy)]
pub struct ShowIncludes<'a> {
    output: &'a str,
}

impl<'a> ShowIncludes<'a> {
    pub fn new(output: &'a str) -> Self {
        ShowIncludes { output }
    }
}

impl HeaderSource for ShowIncludes<'_> {
    fn for_each_header(&self, emit: &mut dyn FnMut(&str)) {
        for line in self.output.lines() {
            if let Some(caps) = INCLUDE_NOTE.captures(line) {
                emit(&caps[1]);
            }
        }
    }
}

/// Normalized dependency information for one object file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyRecord {
    pub object: PathBuf,
    pub source: PathBuf,
    /// Normalized header paths, first-seen order, no duplicates
    pub headers: Vec<String>,
}

impl DependencyRecord {
    /// Render as a Makefile-style dependency file.
    ///
    /// ```text
    /// out/a.obj: \
    ///   src/a.cpp \
    ///   c:/project/include/my\ header.h
    /// ```
    pub fn to_makefile(&self) -> String {
        let mut out = escape_dep_path(&self.object.to_string_lossy());
        out.push_str(": \\\n  ");
        out.push_str(&escape_dep_path(&self.source.to_string_lossy()));
        for header in &self.headers {
            out.push_str(" \\\n  ");
            out.push_str(&escape_dep_path(header));
        }
        out.push('\n');
        out
    }

    /// Write the dependency file, creating parent directories.
    pub fn write(&self, path: &Path) -> Result<(), ToolchainError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| ToolchainError::io(parent, e))?;
        }
        fs::write(path, self.to_makefile()).map_err(|e| ToolchainError::io(path, e))
    }
}

fn escape_dep_path(path: &str) -> String {
    path.replace('\\', "/").replace(' ', "\\ ")
}

/// Turns discovered header lists into dependency records.
#[derive(Debug, Clone, Default)]
pub struct DependencyRecorder {
    exclusions: ExclusionRoots,
}

impl DependencyRecorder {
    pub fn new(exclusions: ExclusionRoots) -> Self {
        DependencyRecorder { exclusions }
    }

    pub fn exclusions(&self) -> &ExclusionRoots {
        &self.exclusions
    }

    /// Collect, normalize, and filter the headers from `headers`.
    pub fn record(
        &self,
        object: &Path,
        source: &Path,
        headers: &dyn HeaderSource,
    ) -> DependencyRecord {
        let mut seen = HashSet::new();
        let mut kept = Vec::new();
        let mut excluded = 0usize;

        headers.for_each_header(&mut |raw| {
            let normalized = normalize_path(raw);
            if normalized.is_empty() || !seen.insert(normalized.clone()) {
                return;
            }
            if self.exclusions.excludes(&normalized) {
                excluded += 1;
            } else {
                kept.push(normalized);
            }
        });

        tracing::trace!(
            "{}: {} headers recorded, {} excluded",
            source.display(),
            kept.len(),
            excluded
        );

        DependencyRecord {
            object: object.to_path_buf(),
            source: source.to_path_buf(),
            headers: kept,
        }
    }

    /// Record and write the dependency file in one step.
    pub fn write(
        &self,
        dep_file: &Path,
        object: &Path,
        source: &Path,
        headers: &dyn HeaderSource,
    ) -> Result<DependencyRecord, ToolchainError> {
        let record = self.record(object, source, headers);
        record.write(dep_file)?;
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    struct Listed(Vec<&'static str>);

    impl HeaderSource for Listed {
        fn for_each_header(&self, emit: &mut dyn FnMut(&str)) {
            for h in &self.0 {
                emit(h);
            }
        }
    }

    #[test]
    fn test_exclusion_filtering() {
        let recorder = DependencyRecorder::new(ExclusionRoots::new(["c:/toolchain", "c:/sdk"]));
        let record = recorder.record(
            Path::new("a.obj"),
            Path::new("a.cpp"),
            &Listed(vec!["c:/toolchain/include/x.h", "c:/project/y.h"]),
        );
        assert_eq!(record.headers, vec!["c:/project/y.h"]);
    }

    #[test]
    fn test_exclusion_is_case_and_separator_insensitive() {
        let roots = ExclusionRoots::new(["C:\\Program Files\\Microsoft Visual Studio\\2019\\"]);
        let recorder = DependencyRecorder::new(roots);
        let record = recorder.record(
            Path::new("a.obj"),
            Path::new("a.cpp"),
            &Listed(vec![
                "c:/program files/microsoft visual studio/2019/vc/include/vector",
                "C:\\Program Files\\Microsoft Visual Studio\\2019Preview\\x.h",
            ]),
        );
        // A sibling directory sharing the prefix is not under the root.
        assert_eq!(
            record.headers,
            vec!["c:/program files/microsoft visual studio/2019preview/x.h"]
        );
    }

    #[test]
    fn test_duplicates_removed_in_order() {
        let recorder = DependencyRecorder::default();
        let record = recorder.record(
            Path::new("a.obj"),
            Path::new("a.cpp"),
            &Listed(vec!["B.h", "a.h", "b.h", "A.H"]),
        );
        assert_eq!(record.headers, vec!["b.h", "a.h"]);
    }

    #[test]
    fn test_show_includes_parsing() {
        let output = "version.rc\n\
                      Note: including file: C:\\proj\\resource.h\n\
                      Note: including file:  C:\\Kits\\10\\Include\\um\\winver.h\n\
                      note: including file:   C:\\proj\\brand.h  \n\
                      #define IDI_ICON 101\n";
        let mut seen = Vec::new();
        ShowIncludes::new(output).for_each_header(&mut |p| seen.push(p.to_string()));
        assert_eq!(
            seen,
            vec![
                "C:\\proj\\resource.h",
                "C:\\Kits\\10\\Include\\um\\winver.h",
                "C:\\proj\\brand.h"
            ]
        );
    }

    #[test]
    fn test_source_dependencies_parsing() {
        let json = r#"{
            "Version": "1.1",
            "Data": {
                "Source": "c:\\proj\\a.cpp",
                "ProvidedModule": "",
                "Includes": ["c:\\proj\\a.h", "c:\\sdk\\windows.h"],
                "ImportedModules": [],
                "ImportedHeaderUnits": []
            }
        }"#;
        let report = SourceDependencies::parse(json).unwrap();
        assert_eq!(report.version, "1.1");

        let recorder = DependencyRecorder::new(ExclusionRoots::new(["c:/sdk"]));
        let record = recorder.record(Path::new("a.obj"), Path::new("a.cpp"), &report);
        assert_eq!(record.headers, vec!["c:/proj/a.h"]);
    }

    #[test]
    fn test_missing_report_is_extraction_error() {
        let tmp = TempDir::new().unwrap();
        let err = SourceDependencies::read(&tmp.path().join("nope.json"), Path::new("a.cpp"))
            .unwrap_err();
        assert!(matches!(err, ToolchainError::DependencyExtractionFailed { .. }));
    }

    #[test]
    fn test_malformed_report_is_extraction_error() {
        let tmp = TempDir::new().unwrap();
        let report = tmp.path().join("a.d.json");
        fs::write(&report, "{ \"Version\": ").unwrap();
        let err = SourceDependencies::read(&report, Path::new("a.cpp")).unwrap_err();
        assert!(err.to_string().contains("malformed report"));
    }

    #[test]
    fn test_makefile_format() {
        let record = DependencyRecord {
            object: PathBuf::from("out\\a.obj"),
            source: PathBuf::from("src\\a.cpp"),
            headers: vec!["c:/proj/my header.h".to_string(), "c:/proj/b.h".to_string()],
        };
        assert_eq!(
            record.to_makefile(),
            "out/a.obj: \\\n  src/a.cpp \\\n  c:/proj/my\\ header.h \\\n  c:/proj/b.h\n"
        );
    }

    #[test]
    fn test_record_is_stable_across_runs() {
        let recorder = DependencyRecorder::new(ExclusionRoots::new(["c:/sdk"]));
        let notes = "Note: including file: C:\\proj\\a.h\nNote: including file: c:\\sdk\\w.h\n";
        let first = recorder.record(Path::new("a.res"), Path::new("a.rc"), &ShowIncludes::new(notes));
        let second = recorder.record(Path::new("a.res"), Path::new("a.rc"), &ShowIncludes::new(notes));
        assert_eq!(first, second);
    }

    #[test]
    fn test_write_creates_parent() {
        let tmp = TempDir::new().unwrap();
        let dep = tmp.path().join("deps").join("a.d");
        let recorder = DependencyRecorder::default();
        recorder
            .write(&dep, Path::new("a.obj"), Path::new("a.cpp"), &Listed(vec!["x.h"]))
            .unwrap();
        assert_eq!(
            fs::read_to_string(&dep).unwrap(),
            "a.obj: \\\n  a.cpp \\\n  x.h\n"
        );
    }
}
