//! `vcbridge compile` command

use std::sync::Arc;

use anyhow::Result;

use super::{current_config, open_session, parse_runtime};
use crate::cli::CompileArgs;
use vcbridge::builder::native::dep_path_for;
use vcbridge::builder::toolchain::ProcessRunner;
use vcbridge::builder::{CompileDatabase, MsvcToolchain, Toolchain};
use vcbridge::core::CompileRequest;

pub fn execute(args: CompileArgs) -> Result<()> {
    let config = current_config()?;
    let session = open_session(&args.session, &config)?;
    let arch = session.architecture();

    let dep_file = args.dep_file.unwrap_or_else(|| dep_path_for(&args.output));
    let request = CompileRequest::new(&args.source, &args.output, &dep_file)
        .with_macros(args.macros)
        .with_include_dirs(args.include_dirs)
        .with_runtime(parse_runtime(&args.runtime)?);

    let database = Arc::new(CompileDatabase::new());
    let toolchain = MsvcToolchain::new(Arc::new(session), Arc::new(ProcessRunner))
        .with_database(database.clone());

    let record = toolchain.compile(arch, &request)?;

    if let Some(path) = args.compile_commands {
        match database.entries().first() {
            Some(entry) => {
                if let Err(e) = entry.write_fragment(&path) {
                    tracing::warn!("compile database not written: {:#}", e);
                }
            }
            None => tracing::debug!("no compile database entry for {}", args.source.display()),
        }
    }

    eprintln!(
        "    Compiled {} -> {} ({} headers tracked)",
        args.source.display(),
        args.output.display(),
        record.headers.len()
    );

    Ok(())
}
