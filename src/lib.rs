//! vcbridge - drives the Visual C++ toolchain for a build scheduler
//!
//! This crate locates a Visual Studio installation, captures the environment
//! its setup script produces, and runs `cl`, `rc`, `midl`, `lib`, and `link`
//! with that environment, writing Makefile-style dependency files for every
//! object it produces.

pub mod builder;
pub mod core;
pub mod util;

/// Test utilities and mocks for vcbridge unit tests.
///
/// This module is only available when compiling with `--cfg test` or
/// running tests. It provides a mock tool runner and session fixtures.
#[cfg(test)]
pub mod test_support;

pub use crate::builder::{
    BuildPlan, CompileOrchestrator, DependencyRecord, EnvironmentBridge, LinkOrchestrator,
    MsvcToolchain, NativeBuilder, Toolchain, ToolchainError, ToolchainSession,
};
pub use crate::core::{Architecture, BuildVariant, CompileRequest, LinkRequest};
pub use crate::util::config::Config;
