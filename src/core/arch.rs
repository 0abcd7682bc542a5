//! Target architectures understood by the Visual C++ toolchain.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Target CPU architecture.
///
/// A session is locked to one architecture for its whole lifetime; every
/// compile and link request repeats the architecture so mismatches are caught
/// before any tool runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Architecture {
    /// 32-bit x86
    X86,
    /// x86_64 / AMD64
    X64,
    /// AArch64
    Arm64,
}

impl Architecture {
    /// All supported architectures.
    pub const ALL: [Architecture; 3] = [Architecture::X86, Architecture::X64, Architecture::Arm64];

    /// Short name, as used in config files and on the command line.
    pub fn as_str(&self) -> &'static str {
        match self {
            Architecture::X86 => "x86",
            Architecture::X64 => "x64",
            Architecture::Arm64 => "arm64",
        }
    }

    /// Argument passed to `vcvarsall.bat` to select this target.
    pub fn vcvars_arg(&self) -> &'static str {
        match self {
            Architecture::X86 => "x86",
            Architecture::X64 => "x64",
            Architecture::Arm64 => "x64_arm64",
        }
    }

    /// Value of the linker/librarian `/MACHINE:` option.
    pub fn machine(&self) -> &'static str {
        match self {
            Architecture::X86 => "X86",
            Architecture::X64 => "X64",
            Architecture::Arm64 => "ARM64",
        }
    }

    /// Value of the `midl /env` option.
    pub fn midl_env(&self) -> &'static str {
        match self {
            Architecture::X86 => "win32",
            Architecture::X64 => "x64",
            Architecture::Arm64 => "arm64",
        }
    }

    /// Whether pointers are 32 bits wide.
    pub fn is_32bit(&self) -> bool {
        matches!(self, Architecture::X86)
    }

    /// Decorate a C symbol name the way the compiler emits it.
    ///
    /// On x86 `__cdecl` symbols carry a leading underscore; other
    /// architectures use the undecorated name.
    pub fn decorate_symbol(&self, symbol: &str) -> String {
        if self.is_32bit() {
            format!("_{}", symbol)
        } else {
            symbol.to_string()
        }
    }

    /// Match the `VSCMD_ARG_TGT_ARCH` value set by a developer prompt.
    pub fn from_vscmd_target(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "x86" => Some(Architecture::X86),
            "x64" | "amd64" => Some(Architecture::X64),
            "arm64" => Some(Architecture::Arm64),
            _ => None,
        }
    }
}

impl fmt::Display for Architecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Architecture {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "x86" | "i686" | "win32" => Ok(Architecture::X86),
            "x64" | "x86_64" | "amd64" => Ok(Architecture::X64),
            "arm64" | "aarch64" => Ok(Architecture::Arm64),
            _ => Err(format!(
                "unknown architecture '{}'; expected 'x86', 'x64', or 'arm64'",
                s
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decorate_symbol() {
        assert_eq!(Architecture::X86.decorate_symbol("init_hooks"), "_init_hooks");
        assert_eq!(Architecture::X64.decorate_symbol("init_hooks"), "init_hooks");
        assert_eq!(Architecture::Arm64.decorate_symbol("init_hooks"), "init_hooks");
    }

    #[test]
    fn test_parse_aliases() {
        assert_eq!("amd64".parse::<Architecture>().unwrap(), Architecture::X64);
        assert_eq!("AArch64".parse::<Architecture>().unwrap(), Architecture::Arm64);
        assert_eq!("Win32".parse::<Architecture>().unwrap(), Architecture::X86);
        assert!("mips".parse::<Architecture>().is_err());
    }

    #[test]
    fn test_vscmd_target() {
        assert_eq!(Architecture::from_vscmd_target("x64"), Some(Architecture::X64));
        assert_eq!(Architecture::from_vscmd_target("ARM64"), Some(Architecture::Arm64));
        assert_eq!(Architecture::from_vscmd_target("arm"), None);
    }
}
