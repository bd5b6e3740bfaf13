//! Command implementations

pub mod apply;
pub mod plan;
pub mod render;

use anyhow::{Context as AnyhowContext, Result, bail};
use iamkit::Client;
use std::path::{Path, PathBuf};

use crate::Context;
use crate::config::{self, CloudupConfig};

/// Loaded config and the directory relative policy files resolve against
pub struct Loaded {
    pub config: CloudupConfig,
    pub base_dir: PathBuf,
}

/// Load the config selected by `--config` or the default location
pub fn load(ctx: &Context) -> Result<Loaded> {
    let path = config::resolve_path(ctx.config.as_deref())?;
    if !path.exists() {
        bail!(
            "Config file not found: {}\nCreate it or pass --config <PATH>",
            path.display()
        );
    }
    log::info!("Using config {}", path.display());

    let config = CloudupConfig::load(&path)?;
    Ok(Loaded {
        config,
        base_dir: base_dir(&path),
    })
}

fn base_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// AWS client for the configured profile and region
pub fn client(config: &CloudupConfig) -> Result<Client> {
    let settings = config.aws.settings();
    match Client::new(settings) {
        Ok(client) => Ok(client),
        Err(e) => {
            let advice = e.category().advice();
            Err(e).with_context(|| format!("Could not set up the AWS client. {advice}"))
        }
    }
}
