//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// vcbridge - run the Visual C++ toolchain with dependency tracking
#[derive(Parser)]
#[command(name = "vcbridge")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Locate an installation and show the captured environment
    Env(EnvArgs),

    /// Compile one source file and write its dependency file
    Compile(CompileArgs),

    /// Link objects into an executable, DLL, or static library
    Link(LinkArgs),

    /// Compile many sources in parallel, then link them
    Build(BuildArgs),

    /// Join arguments into a Windows command line
    Quote(QuoteArgs),

    /// Write a dependency file from compiler include output
    Deps(DepsArgs),
}

/// Options that select the toolchain session.
#[derive(Args, Clone)]
pub struct SessionArgs {
    /// Target architecture (x86, x64, arm64)
    #[arg(long)]
    pub arch: Option<String>,

    /// Build in release mode
    #[arg(short, long)]
    pub release: bool,

    /// Always run vcvarsall.bat, even inside a developer prompt
    #[arg(long)]
    pub no_dev_prompt: bool,
}

#[derive(Args)]
pub struct EnvArgs {
    #[command(flatten)]
    pub session: SessionArgs,

    /// Print every captured environment variable
    #[arg(long)]
    pub vars: bool,
}

#[derive(Args)]
pub struct CompileArgs {
    #[command(flatten)]
    pub session: SessionArgs,

    /// Source file (.cpp, .c, .rc, .idl)
    pub source: PathBuf,

    /// Object file to write
    #[arg(short, long)]
    pub output: PathBuf,

    /// Dependency file (defaults to <output>.d)
    #[arg(long)]
    pub dep_file: Option<PathBuf>,

    /// Preprocessor macro, NAME or NAME=VALUE
    #[arg(short = 'D', long = "define")]
    pub macros: Vec<String>,

    /// Include directory
    #[arg(short = 'I', long = "include")]
    pub include_dirs: Vec<PathBuf>,

    /// C runtime linkage (static, dynamic)
    #[arg(long, default_value = "dynamic")]
    pub runtime: String,

    /// Write a compile_commands.json fragment for this file
    #[arg(long)]
    pub compile_commands: Option<PathBuf>,
}

/// Library and subsystem options shared by `link` and `build`.
#[derive(Args, Clone)]
pub struct LinkTargetArgs {
    /// Artifact kind (executable, dynamic, static)
    #[arg(long = "type", default_value = "executable")]
    pub target_type: String,

    /// Subsystem for executables and DLLs (console, windowed)
    #[arg(long)]
    pub interface: Option<String>,

    /// Library search path
    #[arg(short = 'L', long = "lib-path")]
    pub lib_paths: Vec<PathBuf>,

    /// Library to link, with or without .lib
    #[arg(short = 'l', long = "lib")]
    pub libs: Vec<String>,

    /// Symbol to keep alive against dead-code stripping
    #[arg(long = "force-link")]
    pub force_link_symbols: Vec<String>,

    /// Extra manifest merged into the embedded one
    #[arg(long)]
    pub manifest: Option<PathBuf>,

    /// Raw linker arguments, after `--`
    #[arg(last = true)]
    pub extra_args: Vec<String>,
}

#[derive(Args)]
pub struct LinkArgs {
    #[command(flatten)]
    pub session: SessionArgs,

    /// Artifact to produce
    #[arg(short, long)]
    pub output: PathBuf,

    /// Object files
    #[arg(required = true)]
    pub objects: Vec<PathBuf>,

    // Flattened last so the raw `--` arguments stay the final positional.
    #[command(flatten)]
    pub target: LinkTargetArgs,
}

#[derive(Args)]
pub struct BuildArgs {
    #[command(flatten)]
    pub session: SessionArgs,

    /// Source files or glob patterns
    #[arg(required = true)]
    pub sources: Vec<String>,

    /// Artifact to produce
    #[arg(short, long)]
    pub output: PathBuf,

    /// Directory for objects and dependency files
    #[arg(long, default_value = "build")]
    pub out_dir: PathBuf,

    /// Preprocessor macro, NAME or NAME=VALUE
    #[arg(short = 'D', long = "define")]
    pub macros: Vec<String>,

    /// Include directory
    #[arg(short = 'I', long = "include")]
    pub include_dirs: Vec<PathBuf>,

    /// C runtime linkage (static, dynamic)
    #[arg(long, default_value = "dynamic")]
    pub runtime: String,

    /// Number of parallel jobs
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Emit compile_commands.json into the output directory
    #[arg(long)]
    pub emit_compile_commands: bool,

    #[command(flatten)]
    pub target: LinkTargetArgs,
}

#[derive(Args)]
pub struct QuoteArgs {
    /// Split a command line into arguments instead of joining
    #[arg(long, conflicts_with = "args")]
    pub split: Option<String>,

    /// Arguments to join
    #[arg(allow_hyphen_values = true, trailing_var_arg = true)]
    pub args: Vec<String>,
}

#[derive(Args)]
pub struct DepsArgs {
    /// `/showIncludes` output, or a `/sourceDependencies` JSON report
    pub input: PathBuf,

    /// Object file named as the dependency target
    #[arg(long)]
    pub object: PathBuf,

    /// Source file (defaults to the report's source for JSON input)
    #[arg(long)]
    pub source: Option<PathBuf>,

    /// Directory tree whose headers are not recorded
    #[arg(long)]
    pub exclude: Vec<PathBuf>,

    /// Dependency file to write (defaults to stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}
