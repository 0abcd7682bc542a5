//! vcbridge CLI - drive the Visual C++ toolchain from the command line

use std::io::IsTerminal;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use vcbridge::builder::ToolchainError;
use vcbridge::util::diagnostic::emit;

mod cli;
mod commands;

use cli::{Cli, Commands};

fn main() {
    let cli = Cli::parse();
    let color = !cli.no_color && std::io::stderr().is_terminal();

    if let Err(e) = run(cli) {
        match e.downcast_ref::<ToolchainError>() {
            Some(err) => emit(&err.to_diagnostic(), color),
            None => eprintln!("error: {:#}", e),
        }
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let filter = if cli.verbose {
        EnvFilter::new("vcbridge=debug")
    } else {
        EnvFilter::new("vcbridge=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .without_time()
        .init();

    match cli.command {
        Commands::Env(args) => commands::env::execute(args),
        Commands::Compile(args) => commands::compile::execute(args),
        Commands::Link(args) => commands::link::execute(args),
        Commands::Build(args) => commands::build::execute(args),
        Commands::Quote(args) => commands::quote::execute(args),
        Commands::Deps(args) => commands::deps::execute(args),
    }
}
