//! Test fixtures for common toolchain scenarios.

use std::path::{Path, PathBuf};

use crate::builder::toolchain::{CapturedEnv, InstallRoots, Tool, ToolPaths, ToolchainSession};
use crate::core::arch::Architecture;
use crate::core::variant::BuildVariant;

/// Root of the pretend Visual Studio installation.
pub const FAKE_VS_ROOT: &str = "C:\\VS\\2019\\Community";
/// Root of the pretend Windows SDK.
pub const FAKE_SDK_ROOT: &str = "C:\\Kits\\10";
/// Root of the pretend companion dependency.
pub const FAKE_COMPANION_ROOT: &str = "C:\\deps\\msvc2019_64";

const FAKE_TOOLS_DIR: &str = "C:\\VS\\2019\\Community\\VC\\Tools\\MSVC\\14.29.30133";

/// Tool paths under the pretend installation.
pub fn fake_tools() -> ToolPaths {
    let bin = PathBuf::from(FAKE_TOOLS_DIR).join("bin");
    ToolPaths {
        compiler: bin.join("cl.exe"),
        linker: bin.join("link.exe"),
        archiver: bin.join("lib.exe"),
        resource_compiler: PathBuf::from(FAKE_SDK_ROOT).join("bin").join("rc.exe"),
        code_generator: PathBuf::from(FAKE_SDK_ROOT).join("bin").join("midl.exe"),
    }
}

/// Environment as `vcvarsall.bat` would leave it.
pub fn fake_env() -> CapturedEnv {
    CapturedEnv::from_vars([
        ("PATH", format!("{}\\bin;C:\\Windows", FAKE_TOOLS_DIR)),
        ("INCLUDE", format!("{}\\include;{}\\Include", FAKE_TOOLS_DIR, FAKE_SDK_ROOT)),
        ("LIB", format!("{}\\lib\\x64", FAKE_TOOLS_DIR)),
        ("VCToolsInstallDir", format!("{}\\", FAKE_TOOLS_DIR)),
        ("WindowsSdkDir", format!("{}\\", FAKE_SDK_ROOT)),
    ])
}

/// A session that never touches the filesystem until a tool is run.
pub fn fake_session(arch: Architecture, variant: BuildVariant) -> ToolchainSession {
    ToolchainSession::new(
        arch,
        variant,
        fake_tools(),
        fake_env(),
        InstallRoots {
            vendor_root: PathBuf::from(FAKE_VS_ROOT),
            sdk_root: PathBuf::from(FAKE_SDK_ROOT),
            companion_root: Some(PathBuf::from(FAKE_COMPANION_ROOT)),
            system_include_dir: PathBuf::from(FAKE_TOOLS_DIR).join("include"),
            extra_exclusions: Vec::new(),
        },
    )
}

/// Create `<root>/bin` holding an empty file for every tool.
pub fn fake_tool_dir(root: &Path) -> PathBuf {
    let bin = root.join("bin");
    std::fs::create_dir_all(&bin).unwrap();
    for tool in Tool::ALL {
        std::fs::write(bin.join(tool.executable()), "").unwrap();
    }
    bin
}

/// A `/sourceDependencies` report listing `includes`.
pub fn source_dependencies_json(source: &str, includes: &[&str]) -> String {
    let includes = includes
        .iter()
        .map(|i| format!("\"{}\"", i.replace('\\', "\\\\")))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        r#"{{
    "Version": "1.1",
    "Data": {{
        "Source": "{}",
        "ProvidedModule": "",
        "Includes": [{}],
        "ImportedModules": [],
        "ImportedHeaderUnits": []
    }}
}}"#,
        source.replace('\\', "\\\\"),
        includes
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::depfile::SourceDependencies;

    #[test]
    fn test_source_dependencies_fixture_parses() {
        let json = source_dependencies_json("c:\\p\\a.cpp", &["c:\\p\\a.h", "C:\\Kits\\10\\w.h"]);
        let report = SourceDependencies::parse(&json).unwrap();
        assert_eq!(report.data.source, "c:\\p\\a.cpp");
        assert_eq!(report.data.includes.len(), 2);
    }

    #[test]
    fn test_fake_session_is_complete() {
        let session = fake_session(Architecture::X64, BuildVariant::Release);
        assert_eq!(session.variant(), BuildVariant::Release);
        assert!(session.env().get("WindowsSdkDir").is_some());
    }
}
