//! `vcbridge deps` command
//!
//! Turns saved compiler include output into a dependency file without
//! running any tool.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};

use crate::cli::DepsArgs;
use vcbridge::builder::depfile::{ShowIncludes, SourceDependencies};
use vcbridge::builder::{DependencyRecord, DependencyRecorder, ExclusionRoots};
use vcbridge::util::fs::read_to_string;

pub fn execute(args: DepsArgs) -> Result<()> {
    let recorder = DependencyRecorder::new(ExclusionRoots::new(&args.exclude));
    let record = if is_json_report(&args.input) {
        from_report(&recorder, &args)?
    } else {
        from_show_includes(&recorder, &args)?
    };

    match args.output {
        Some(ref path) => {
            record.write(path)?;
            eprintln!(
                "    Wrote {} ({} headers)",
                path.display(),
                record.headers.len()
            );
        }
        None => print!("{}", record.to_makefile()),
    }

    Ok(())
}

fn is_json_report(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

fn from_report(recorder: &DependencyRecorder, args: &DepsArgs) -> Result<DependencyRecord> {
    let contents = read_to_string(&args.input)?;
    let report = SourceDependencies::parse(&contents)
        .with_context(|| format!("malformed dependency report: {}", args.input.display()))?;

    let source = args
        .source
        .clone()
        .unwrap_or_else(|| PathBuf::from(&report.data.source));

    Ok(recorder.record(&args.object, &source, &report))
}

fn from_show_includes(recorder: &DependencyRecorder, args: &DepsArgs) -> Result<DependencyRecord> {
    let source = args
        .source
        .as_ref()
        .ok_or_else(|| anyhow!("--source is required for /showIncludes input"))?;
    let contents = read_to_string(&args.input)?;

    Ok(recorder.record(&args.object, source, &ShowIncludes::new(&contents)))
}
