//! Build variants and the fixed flag tables they select.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Preprocessor macros defined for every compile, regardless of variant.
pub const PLATFORM_MACROS: &[&str] = &[
    "WIN32",
    "_WINDOWS",
    "UNICODE",
    "_UNICODE",
    "NOMINMAX",
    "WINVER=0x0601",
    "_WIN32_WINNT=0x0601",
];

/// Build variant (profile).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildVariant {
    #[default]
    Debug,
    Release,
}

impl BuildVariant {
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildVariant::Debug => "debug",
            BuildVariant::Release => "release",
        }
    }

    pub fn is_debug(&self) -> bool {
        matches!(self, BuildVariant::Debug)
    }

    /// Macros defined only in this variant.
    pub fn macros(&self) -> &'static [&'static str] {
        match self {
            BuildVariant::Debug => &["_DEBUG"],
            BuildVariant::Release => &["NDEBUG"],
        }
    }

    /// Optimization and debug-info options for `cl`.
    pub fn compiler_flags(&self) -> &'static [&'static str] {
        match self {
            // /Z7 keeps debug info in the object, so parallel compiles never
            // contend for a shared PDB.
            BuildVariant::Debug => &["/Od", "/Z7", "/RTC1"],
            BuildVariant::Release => &["/O2", "/Oi", "/GL", "/Gy", "/Z7"],
        }
    }

    /// Options for `link` when producing a DLL or executable.
    pub fn linker_flags(&self) -> &'static [&'static str] {
        match self {
            BuildVariant::Debug => &["/DEBUG:FASTLINK", "/INCREMENTAL"],
            BuildVariant::Release => &[
                "/DEBUG:FULL",
                "/OPT:REF",
                "/OPT:ICF",
                "/LTCG",
                "/INCREMENTAL:NO",
            ],
        }
    }

    /// Options for `lib` when producing a static library.
    ///
    /// Release objects are compiled with `/GL`, so the archive must be
    /// created with link-time code generation as well.
    pub fn archiver_flags(&self) -> &'static [&'static str] {
        match self {
            BuildVariant::Debug => &[],
            BuildVariant::Release => &["/LTCG"],
        }
    }
}

impl fmt::Display for BuildVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BuildVariant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "debug" | "dev" => Ok(BuildVariant::Debug),
            "release" => Ok(BuildVariant::Release),
            _ => Err(format!(
                "invalid build variant '{}'; expected 'debug' or 'release'",
                s
            )),
        }
    }
}

/// How the C/C++ runtime library is linked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeLinkage {
    /// Dynamic CRT (/MD, /MDd)
    #[default]
    Dynamic,
    /// Static CRT (/MT, /MTd)
    Static,
}

impl RuntimeLinkage {
    /// Compiler flag for this linkage in the given variant.
    pub fn flag(&self, variant: BuildVariant) -> &'static str {
        match (self, variant) {
            (RuntimeLinkage::Static, BuildVariant::Debug) => "/MTd",
            (RuntimeLinkage::Static, BuildVariant::Release) => "/MT",
            (RuntimeLinkage::Dynamic, BuildVariant::Debug) => "/MDd",
            (RuntimeLinkage::Dynamic, BuildVariant::Release) => "/MD",
        }
    }
}

impl FromStr for RuntimeLinkage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "dynamic" | "shared" => Ok(RuntimeLinkage::Dynamic),
            "static" => Ok(RuntimeLinkage::Static),
            _ => Err(format!(
                "invalid runtime linkage '{}'; expected 'static' or 'dynamic'",
                s
            )),
        }
    }
}

/// Compose the macro set for one compile.
///
/// Platform macros come first, then the variant's, then the caller's.
/// Duplicates are kept; nothing from the first two groups is ever dropped.
pub fn compose_macros(variant: BuildVariant, caller: &[String]) -> Vec<String> {
    let mut macros = Vec::with_capacity(PLATFORM_MACROS.len() + 2 + caller.len());
    macros.extend(PLATFORM_MACROS.iter().map(|m| m.to_string()));
    macros.extend(variant.macros().iter().map(|m| m.to_string()));
    macros.extend(caller.iter().cloned());
    macros
}
