//! `vcbridge env` command

use anyhow::Result;

use super::{current_config, open_session};
use crate::cli::EnvArgs;
use vcbridge::builder::toolchain::Tool;

pub fn execute(args: EnvArgs) -> Result<()> {
    let config = current_config()?;
    let session = open_session(&args.session, &config)?;
    let roots = session.roots();

    println!("Toolchain:");
    println!();
    println!("  Arch:    {}", session.architecture());
    println!("  Variant: {}", session.variant());
    println!("  Install: {}", roots.vendor_root.display());
    println!("  SDK:     {}", roots.sdk_root.display());
    println!("  Include: {}", roots.system_include_dir.display());
    if let Some(ref companion) = roots.companion_root {
        println!("  Companion: {}", companion.display());
    }

    println!();
    println!("Tools:");
    for tool in Tool::ALL {
        println!("  {:<10} {}", tool.executable(), session.tools().get(tool).display());
    }

    println!();
    println!("Excluded from dependency files:");
    for root in session.exclusion_roots().roots() {
        println!("  {}", root);
    }

    if args.vars {
        println!();
        println!("Environment ({} variables):", session.env().len());
        for (key, value) in session.env().iter() {
            println!("  {}={}", key, value);
        }
    }

    Ok(())
}
