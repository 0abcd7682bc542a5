//! Compile and link requests issued by the build scheduler.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::builder::error::ToolchainError;
use crate::core::variant::RuntimeLinkage;

/// Kind of source file, which decides the compile pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// Windows resource script (`.rc`)
    ResourceScript,
    /// COM interface definition (`.idl`), compiled by `midl`
    InterfaceDefinition,
    /// C or C++ translation unit
    Source,
}

impl SourceKind {
    /// Classify a path by extension (case-insensitive).
    pub fn of(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("rc") => SourceKind::ResourceScript,
            Some(ext) if ext.eq_ignore_ascii_case("idl") => SourceKind::InterfaceDefinition,
            _ => SourceKind::Source,
        }
    }
}

/// Per-compile options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompileOptions {
    /// CRT linkage
    #[serde(default)]
    pub runtime: RuntimeLinkage,
}

/// One source file to compile.
#[derive(Debug, Clone)]
pub struct CompileRequest {
    /// Source file to compile
    pub source: PathBuf,
    /// Output object file (`.obj`; `.res` for resource scripts, `.tlb` for interfaces)
    pub object: PathBuf,
    /// Dependency file to write
    pub dep_file: PathBuf,
    /// Caller macros (`NAME` or `NAME=VALUE`)
    pub macros: Vec<String>,
    /// Include directories
    pub include_dirs: Vec<PathBuf>,
    /// Framework search paths (not meaningful for this toolchain)
    pub framework_paths: Vec<PathBuf>,
    pub options: CompileOptions,
}

impl CompileRequest {
    /// Create a request with no macros, includes, or options.
    pub fn new(
        source: impl Into<PathBuf>,
        object: impl Into<PathBuf>,
        dep_file: impl Into<PathBuf>,
    ) -> Self {
        CompileRequest {
            source: source.into(),
            object: object.into(),
            dep_file: dep_file.into(),
            macros: Vec::new(),
            include_dirs: Vec::new(),
            framework_paths: Vec::new(),
            options: CompileOptions::default(),
        }
    }

    pub fn with_macros(mut self, macros: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.macros.extend(macros.into_iter().map(Into::into));
        self
    }

    pub fn with_include_dirs(mut self, dirs: impl IntoIterator<Item = impl Into<PathBuf>>) -> Self {
        self.include_dirs.extend(dirs.into_iter().map(Into::into));
        self
    }

    pub fn with_runtime(mut self, runtime: RuntimeLinkage) -> Self {
        self.options.runtime = runtime;
        self
    }

    pub fn kind(&self) -> SourceKind {
        SourceKind::of(&self.source)
    }

    /// Path of the `/sourceDependencies` report written next to the dep file.
    pub fn report_path(&self) -> PathBuf {
        let mut name = self.dep_file.as_os_str().to_owned();
        name.push(".json");
        PathBuf::from(name)
    }
}

/// Kind of linked artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetType {
    /// DLL
    Dynamic,
    /// Static library (`lib.exe`)
    Static,
    /// Executable
    Executable,
}

impl TargetType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetType::Dynamic => "dynamic",
            TargetType::Static => "static",
            TargetType::Executable => "executable",
        }
    }
}

impl fmt::Display for TargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TargetType {
    type Err = ToolchainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "dynamic" | "dll" | "sharedlib" => Ok(TargetType::Dynamic),
            "static" | "staticlib" | "lib" => Ok(TargetType::Static),
            "executable" | "exe" => Ok(TargetType::Executable),
            _ => Err(ToolchainError::Configuration(format!(
                "unknown target type '{}'; expected 'dynamic', 'static', or 'executable'",
                s
            ))),
        }
    }
}

/// Subsystem of a DLL or executable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterfaceKind {
    #[default]
    Console,
    Windowed,
}

impl InterfaceKind {
    /// Minimum OS version stamped into the PE header (Windows 7).
    pub const MIN_OS_VERSION: &'static str = "6.01";

    /// Linker `/SUBSYSTEM` option.
    pub fn subsystem_flag(&self) -> String {
        let name = match self {
            InterfaceKind::Console => "CONSOLE",
            InterfaceKind::Windowed => "WINDOWS",
        };
        format!("/SUBSYSTEM:{},{}", name, Self::MIN_OS_VERSION)
    }
}

impl FromStr for InterfaceKind {
    type Err = ToolchainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "console" => Ok(InterfaceKind::Console),
            "windowed" | "gui" | "windows" => Ok(InterfaceKind::Windowed),
            _ => Err(ToolchainError::Configuration(format!(
                "unknown interface kind '{}'; expected 'console' or 'windowed'",
                s
            ))),
        }
    }
}

/// Per-link options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkOptions {
    pub target_type: TargetType,
    /// Ignored for static libraries
    pub interface: InterfaceKind,
    /// Symbols kept alive against `/OPT:REF`, undecorated
    pub force_link_symbols: Vec<String>,
    /// Extra manifest merged into the embedded one
    pub manifest: Option<PathBuf>,
}

impl LinkOptions {
    pub fn new(target_type: TargetType) -> Self {
        LinkOptions {
            target_type,
            interface: InterfaceKind::default(),
            force_link_symbols: Vec::new(),
            manifest: None,
        }
    }

    /// Build options from textual names, as read from a build description.
    ///
    /// The interface name is only parsed for targets that have a subsystem,
    /// so a static library never fails on it.
    pub fn from_names(target_type: &str, interface: Option<&str>) -> Result<Self, ToolchainError> {
        let target_type: TargetType = target_type.parse()?;
        let interface = match (target_type, interface) {
            (TargetType::Static, _) | (_, None) => InterfaceKind::default(),
            (_, Some(name)) => name.parse()?,
        };
        Ok(LinkOptions {
            interface,
            ..LinkOptions::new(target_type)
        })
    }

    pub fn with_interface(mut self, interface: InterfaceKind) -> Self {
        self.interface = interface;
        self
    }

    pub fn with_force_link_symbols(
        mut self,
        symbols: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.force_link_symbols
            .extend(symbols.into_iter().map(Into::into));
        self
    }
}

/// One artifact to link.
#[derive(Debug, Clone)]
pub struct LinkRequest {
    /// Output file
    pub target: PathBuf,
    pub objects: Vec<PathBuf>,
    /// Library search paths
    pub lib_paths: Vec<PathBuf>,
    /// Library names, with or without `.lib`
    pub libs: Vec<String>,
    /// Framework search paths (not meaningful for this toolchain)
    pub framework_paths: Vec<PathBuf>,
    /// Frameworks (not meaningful for this toolchain)
    pub frameworks: Vec<String>,
    /// Raw arguments appended after everything else
    pub extra_args: Vec<String>,
    pub options: LinkOptions,
}

impl LinkRequest {
    pub fn new(target: impl Into<PathBuf>, objects: Vec<PathBuf>, options: LinkOptions) -> Self {
        LinkRequest {
            target: target.into(),
            objects,
            lib_paths: Vec::new(),
            libs: Vec::new(),
            framework_paths: Vec::new(),
            frameworks: Vec::new(),
            extra_args: Vec::new(),
            options,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_kind() {
        assert_eq!(SourceKind::of(Path::new("app/version.rc")), SourceKind::ResourceScript);
        assert_eq!(SourceKind::of(Path::new("app/VERSION.RC")), SourceKind::ResourceScript);
        assert_eq!(SourceKind::of(Path::new("app/main.cpp")), SourceKind::Source);
        assert_eq!(SourceKind::of(Path::new("com/api.idl")), SourceKind::InterfaceDefinition);
        assert_eq!(SourceKind::of(Path::new("Makefile")), SourceKind::Source);
    }

    #[test]
    fn test_report_path_appends_extension() {
        let req = CompileRequest::new("a.cpp", "out/a.obj", "out/a.d");
        assert_eq!(req.report_path(), PathBuf::from("out/a.d.json"));
    }

    #[test]
    fn test_static_ignores_invalid_interface() {
        let opts = LinkOptions::from_names("static", Some("hologram")).unwrap();
        assert_eq!(opts.target_type, TargetType::Static);
    }

    #[test]
    fn test_invalid_interface_rejected_for_exe() {
        let err = LinkOptions::from_names("executable", Some("hologram")).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_unknown_target_type() {
        let err = LinkOptions::from_names("framework", None).unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("framework"));
    }

    #[test]
    fn test_subsystem_flags() {
        assert_eq!(InterfaceKind::Console.subsystem_flag(), "/SUBSYSTEM:CONSOLE,6.01");
        assert_eq!(InterfaceKind::Windowed.subsystem_flag(), "/SUBSYSTEM:WINDOWS,6.01");
    }
}
