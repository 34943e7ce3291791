use std::path::Path;

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use ftpgate_common::{FtpgateConfig, FtpgateConfigStore};
use tracing::*;

pub fn load_config(path: &Path) -> Result<FtpgateConfig> {
    let store: FtpgateConfigStore = Config::builder()
        .add_source(File::from(path))
        .add_source(Environment::with_prefix("FTPGATE"))
        .build()
        .context("Could not load config")?
        .try_deserialize()
        .context("Could not parse config")?;

    let config = FtpgateConfig {
        store,
        paths_relative_to: path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default(),
    };

    info!(
        "Using config: {path:?} (accounts: {:?}, admin: {})",
        config.accounts_file(),
        config.store.admin_name,
    );
    Ok(config)
}

/// The `--accounts` flag wins over the config file.
pub fn cli_config(cli: &crate::Cli) -> Result<FtpgateConfig> {
    match &cli.accounts {
        Some(accounts) => Ok(FtpgateConfig {
            store: FtpgateConfigStore::for_accounts_file(accounts),
            paths_relative_to: std::env::current_dir()?,
        }),
        None => load_config(&cli.config),
    }
}
