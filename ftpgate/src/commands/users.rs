use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use ftpgate_common::helpers::fs::secure_file;
use ftpgate_common::Account;
use ftpgate_core::{CredentialStore, FileCredentialStore};
use tracing::*;

use super::common::read_password;
use crate::config::cli_config;

#[derive(clap::Subcommand)]
pub(crate) enum UsersCommand {
    /// List all accounts
    List,
    /// Create an account
    Add {
        name: String,
        #[clap(flatten)]
        options: AccountOptions,
    },
    /// Change account settings; only the given options change
    Edit {
        name: String,
        #[clap(flatten)]
        options: AccountOptions,
    },
    /// Delete an account
    Remove { name: String },
    Enable { name: String },
    Disable { name: String },
    /// Set a new password
    Password { name: String },
}

#[derive(clap::Args)]
pub(crate) struct AccountOptions {
    /// Home directory, must exist
    #[clap(long)]
    home: Option<PathBuf>,
    #[clap(long)]
    can_write: Option<bool>,
    /// Concurrent logins, 0 for no restriction
    #[clap(long)]
    max_logins: Option<u32>,
    /// Concurrent logins per IP address, 0 for no restriction
    #[clap(long)]
    max_logins_per_address: Option<u32>,
    /// Bytes per second, 0 for unlimited
    #[clap(long)]
    download_rate: Option<u64>,
    /// Bytes per second, 0 for unlimited
    #[clap(long)]
    upload_rate: Option<u64>,
    /// Seconds, 0 for unlimited
    #[clap(long)]
    max_idle: Option<u32>,
}

impl AccountOptions {
    fn apply(&self, account: &mut Account) -> Result<()> {
        if let Some(home) = &self.home {
            if !home.is_dir() {
                bail!("Home directory {home:?} doesn't exist");
            }
            account.home_directory = Some(home.to_string_lossy().into_owned());
        }
        if let Some(can_write) = self.can_write {
            account.can_write = can_write;
        }
        if let Some(max_logins) = self.max_logins {
            account.max_concurrent_logins = max_logins;
        }
        if let Some(max_logins_per_address) = self.max_logins_per_address {
            account.max_concurrent_logins_per_address = max_logins_per_address;
        }
        if let Some(download_rate) = self.download_rate {
            account.download_rate_limit = download_rate;
        }
        if let Some(upload_rate) = self.upload_rate {
            account.upload_rate_limit = upload_rate;
        }
        if let Some(max_idle) = self.max_idle {
            account.max_idle_seconds = max_idle;
        }
        Ok(())
    }
}

pub(crate) async fn command(cli: &crate::Cli, command: &UsersCommand) -> Result<()> {
    let config = cli_config(cli)?;
    let path = config.accounts_file();
    let store = FileCredentialStore::open_or_create(&path)
        .await
        .with_context(|| format!("Could not open account file {path:?}"))?;
    store.set_admin_name(&config.store.admin_name).await;

    match command {
        UsersCommand::List => return list(&store).await,
        UsersCommand::Add { name, options } => {
            if store.exists(name).await? {
                bail!("User {name} already exists");
            }
            if options.home.is_none() {
                bail!("Please specify the home directory with --home");
            }
            let mut account = Account {
                enabled: true,
                ..Account::new(name)
            };
            options.apply(&mut account)?;
            account.set_password(&read_password("Password", true)?);
            store.save(account).await?;
            info!(%name, "Added user");
        }
        UsersCommand::Edit { name, options } => {
            let mut account = existing(&store, name).await?;
            options.apply(&mut account)?;
            store.save(account).await?;
            info!(%name, "Changed user");
        }
        UsersCommand::Remove { name } => {
            existing(&store, name).await?;
            store.delete(name).await?;
            info!(%name, "Removed user");
        }
        UsersCommand::Enable { name } => {
            let account = existing(&store, name).await?;
            store
                .save(Account {
                    enabled: true,
                    ..account
                })
                .await?;
            info!(%name, "Enabled user");
        }
        UsersCommand::Disable { name } => {
            let account = existing(&store, name).await?;
            store
                .save(Account {
                    enabled: false,
                    ..account
                })
                .await?;
            info!(%name, "Disabled user");
        }
        UsersCommand::Password { name } => {
            let mut account = existing(&store, name).await?;
            account.set_password(&read_password("Password", true)?);
            store.save(account).await?;
            info!(%name, "Changed password");
        }
    }

    if config.store.secure_accounts_file {
        secure_file(&path).context("Could not secure account file")?;
    }
    info!(?path, "Saved user accounts");
    Ok(())
}

async fn existing(store: &FileCredentialStore, name: &str) -> Result<Account> {
    match store.lookup(name).await? {
        Some(account) => Ok(account),
        None => bail!("User {name} doesn't exist"),
    }
}

async fn list(store: &FileCredentialStore) -> Result<()> {
    println!("{}", console::style("Available FTP accounts").bold());
    for name in store.list_names().await? {
        let Some(account) = store.lookup(&name).await? else {
            continue;
        };
        let marker = if account.enabled {
            String::new()
        } else {
            format!("{} ", console::style("[disabled]").dim())
        };
        let admin = if store.is_admin(&name).await {
            format!(" {}", console::style("(admin)").cyan())
        } else {
            String::new()
        };
        println!(
            "   {marker}{name} ({}){admin}",
            account.home_directory.as_deref().unwrap_or("-")
        );
    }
    Ok(())
}
