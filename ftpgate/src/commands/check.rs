use anyhow::{Context, Result};
use ftpgate_core::{CredentialStore, CredentialStoreEnum};
use tracing::*;

use crate::config::cli_config;

pub(crate) async fn command(cli: &crate::Cli) -> Result<()> {
    let config = cli_config(cli)?;
    let store = CredentialStoreEnum::from_config(&config)
        .await
        .with_context(|| format!("Could not load accounts from {:?}", config.accounts_file()))?;

    let names = store.list_names().await?;
    let admin = store.admin_name().await;
    if !names.contains(&admin) {
        warn!(%admin, "Admin account does not exist");
    }
    info!(accounts = names.len(), "No problems found");
    Ok(())
}
