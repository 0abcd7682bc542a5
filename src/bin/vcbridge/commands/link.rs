//! `vcbridge link` command

use anyhow::Result;

use super::{current_config, link_options, open_session};
use crate::cli::LinkArgs;
use vcbridge::builder::toolchain::ProcessRunner;
use vcbridge::builder::LinkOrchestrator;
use vcbridge::core::LinkRequest;

pub fn execute(args: LinkArgs) -> Result<()> {
    let config = current_config()?;
    let session = open_session(&args.session, &config)?;

    let mut request = LinkRequest::new(&args.output, args.objects, link_options(&args.target)?);
    request.lib_paths = args.target.lib_paths;
    request.libs = args.target.libs;
    request.extra_args = args.target.extra_args;

    let artifact =
        LinkOrchestrator::new(&session, &ProcessRunner).link(session.architecture(), &request)?;

    eprintln!(
        "    Finished `{}` -> {}",
        request.options.target_type,
        artifact.display()
    );

    Ok(())
}
