//! Core data types shared by the toolchain layer.
//!
//! - Target architectures
//! - Build variants and their flag tables
//! - Compile and link requests

pub mod arch;
pub mod request;
pub mod variant;

pub use arch::Architecture;
pub use request::{
    CompileOptions, CompileRequest, InterfaceKind, LinkOptions, LinkRequest, SourceKind, TargetType,
};
pub use variant::{BuildVariant, RuntimeLinkage};
