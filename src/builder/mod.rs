//! Compiling and linking with the Visual C++ toolchain.
//!
//! [`toolchain`] turns an installation into a [`ToolchainSession`];
//! [`compile`] and [`link`] issue the tool invocations against it, with
//! [`depfile`] recording what each compile read.

pub mod compile;
pub mod compile_db;
pub mod depfile;
pub mod error;
pub mod link;
pub mod native;
pub mod quote;
pub mod toolchain;

pub use compile::CompileOrchestrator;
pub use compile_db::{CompileCommand, CompileDatabase};
pub use depfile::{DependencyRecord, DependencyRecorder, ExclusionRoots};
pub use error::{ErrorKind, ToolchainError};
pub use link::LinkOrchestrator;
pub use native::{BuildPlan, NativeBuilder};
pub use toolchain::{
    CommandSpec, EnvironmentBridge, MsvcToolchain, ProcessRunner, Toolchain, ToolchainSession,
    ToolRunner,
};
