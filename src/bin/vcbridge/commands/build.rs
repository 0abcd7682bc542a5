//! `vcbridge build` command

use std::sync::Arc;

use anyhow::{bail, Context, Result};

use super::{current_config, link_options, open_session, parse_runtime};
use crate::cli::BuildArgs;
use vcbridge::builder::toolchain::ProcessRunner;
use vcbridge::builder::{BuildPlan, CompileDatabase, MsvcToolchain, NativeBuilder};
use vcbridge::util::diagnostic::suggestions;
use vcbridge::util::fs::glob_files;

pub fn execute(args: BuildArgs) -> Result<()> {
    let config = current_config()?;
    let session = open_session(&args.session, &config)?;

    let cwd = std::env::current_dir().context("failed to determine current directory")?;
    let sources = glob_files(&cwd, &args.sources)?;
    if sources.is_empty() {
        bail!("no source files matched\nhelp: {}", suggestions::NO_SOURCES);
    }

    let mut plan = BuildPlan::new(
        sources,
        &args.out_dir,
        &args.output,
        link_options(&args.target)?,
    );
    plan.macros = args.macros;
    plan.include_dirs = args.include_dirs;
    plan.runtime = parse_runtime(&args.runtime)?;
    plan.lib_paths = args.target.lib_paths;
    plan.libs = args.target.libs;
    plan.extra_link_args = args.target.extra_args;

    // Jobs: CLI > config > None (one per CPU)
    let jobs = args.jobs.or(config.build.jobs);
    let emit_compile_commands = args.emit_compile_commands || config.build.compile_commands;

    let mut toolchain = MsvcToolchain::new(Arc::new(session), Arc::new(ProcessRunner));
    if emit_compile_commands {
        toolchain = toolchain.with_database(Arc::new(CompileDatabase::new()));
    }

    let outcome = NativeBuilder::new(&toolchain).with_jobs(jobs).build(&plan)?;

    if let Some(database) = toolchain.database() {
        let path = args.out_dir.join("compile_commands.json");
        match database.write(&path) {
            Ok(path) => tracing::info!("wrote {}", path.display()),
            Err(e) => tracing::warn!("compile database not written: {:#}", e),
        }
    }

    eprintln!(
        "    Finished `{}` -> {} ({} objects)",
        plan.link_options.target_type,
        outcome.artifact.display(),
        outcome.records.len()
    );

    Ok(())
}
