//! Command implementations

pub mod build;
pub mod compile;
pub mod deps;
pub mod env;
pub mod link;
pub mod quote;

use anyhow::{anyhow, Context, Result};

use crate::cli::{LinkTargetArgs, SessionArgs};
use vcbridge::builder::toolchain::{BridgeSettings, EnvironmentBridge, ProcessRunner};
use vcbridge::builder::ToolchainSession;
use vcbridge::core::{Architecture, BuildVariant, LinkOptions, RuntimeLinkage};
use vcbridge::util::config::{global_config_path, load_config, project_config_path};
use vcbridge::util::Config;

/// Global config merged with the current directory's project config.
pub fn current_config() -> Result<Config> {
    let cwd = std::env::current_dir().context("failed to determine current directory")?;
    let global = global_config_path().unwrap_or_default();
    Ok(load_config(&global, &project_config_path(&cwd)))
}

/// Bridge settings from config, with command-line overrides applied.
pub fn bridge_settings(args: &SessionArgs, config: &Config) -> Result<BridgeSettings> {
    let arch = args
        .arch
        .as_deref()
        .map(|s| s.parse::<Architecture>())
        .transpose()
        .map_err(|e| anyhow!(e))?;
    let variant = args.release.then_some(BuildVariant::Release);

    let mut settings = config.bridge_settings(arch, variant)?;
    if args.no_dev_prompt {
        settings.use_developer_prompt = false;
    }
    Ok(settings)
}

/// Initialize a session for this invocation.
pub fn open_session(args: &SessionArgs, config: &Config) -> Result<ToolchainSession> {
    let settings = bridge_settings(args, config)?;
    let session = EnvironmentBridge::new(&ProcessRunner).initialize(&settings)?;
    Ok(session)
}

pub fn parse_runtime(value: &str) -> Result<RuntimeLinkage> {
    value.parse().map_err(|e: String| anyhow!(e))
}

pub fn link_options(args: &LinkTargetArgs) -> Result<LinkOptions> {
    let mut options = LinkOptions::from_names(&args.target_type, args.interface.as_deref())?
        .with_force_link_symbols(args.force_link_symbols.iter().cloned());
    options.manifest = args.manifest.clone();
    Ok(options)
}
