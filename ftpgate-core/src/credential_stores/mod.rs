mod file;
mod memory;

use std::path::PathBuf;

use enum_dispatch::enum_dispatch;
pub use file::FileCredentialStore;
use ftpgate_common::auth::{CredentialPresentation, ANONYMOUS_USERNAME};
use ftpgate_common::eventhub::EventSubscription;
use ftpgate_common::helpers::hash::{is_password_hash, verify_password_hash};
use ftpgate_common::{Account, AccountMap, FtpgateConfig, FtpgateError};
pub use memory::InMemoryCredentialStore;
use tracing::*;

/// Lifecycle notifications of a credential store, separate from the
/// command events of the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    Reloaded { accounts: usize },
}

/// Where a store gets its accounts from.
#[derive(Debug, Clone)]
pub enum AccountSource {
    File(PathBuf),
    Accounts(AccountMap),
}

#[enum_dispatch]
pub enum CredentialStoreEnum {
    Memory(InMemoryCredentialStore),
    File(FileCredentialStore),
}

impl CredentialStoreEnum {
    pub async fn from_source(source: AccountSource) -> Result<Self, FtpgateError> {
        Ok(match source {
            AccountSource::File(path) => FileCredentialStore::open(path).await?.into(),
            AccountSource::Accounts(accounts) => InMemoryCredentialStore::new(accounts).into(),
        })
    }

    pub async fn from_config(config: &FtpgateConfig) -> Result<Self, FtpgateError> {
        let store = Self::from_source(AccountSource::File(config.accounts_file())).await?;
        store.set_admin_name(&config.store.admin_name).await;
        Ok(store)
    }
}

#[enum_dispatch(CredentialStoreEnum)]
#[allow(async_fn_in_trait)]
pub trait CredentialStore {
    async fn lookup(&self, name: &str) -> Result<Option<Account>, FtpgateError>;

    async fn exists(&self, name: &str) -> Result<bool, FtpgateError>;

    async fn list_names(&self) -> Result<Vec<String>, FtpgateError>;

    /// Inserts or fully replaces the account with the same name.
    async fn save(&self, account: Account) -> Result<(), FtpgateError>;

    async fn delete(&self, name: &str) -> Result<(), FtpgateError>;

    async fn admin_name(&self) -> String;

    async fn set_admin_name(&self, name: &str);

    async fn is_admin(&self, name: &str) -> bool {
        self.admin_name().await == name
    }

    async fn subscribe(&self) -> EventSubscription<StoreEvent>;

    /// Returns the account a client presented credentials for. Usernames
    /// are matched exactly. The `enabled` flag is left to the caller.
    async fn authenticate(
        &self,
        presentation: &CredentialPresentation,
    ) -> Result<Account, FtpgateError> {
        match presentation {
            CredentialPresentation::Password { username, password } => {
                let Some(account) = self.lookup(username).await? else {
                    warn!(%username, "Authentication failed: unknown account");
                    return Err(FtpgateError::AuthenticationFailed);
                };
                let Some(hash) = &account.password else {
                    warn!(%username, "Authentication failed: account has no password");
                    return Err(FtpgateError::AuthenticationFailed);
                };
                let matches = verify_password_hash(password.expose_secret(), hash.expose_secret())
                    .unwrap_or_else(|e| {
                        error!(%username, "Error verifying password hash: {}", e);
                        false
                    });
                if matches {
                    debug!(%username, "Authenticated");
                    Ok(account)
                } else {
                    warn!(%username, "Authentication failed: wrong password");
                    Err(FtpgateError::AuthenticationFailed)
                }
            }
            CredentialPresentation::Anonymous => match self.lookup(ANONYMOUS_USERNAME).await? {
                Some(account) => Ok(account),
                None => {
                    warn!("Anonymous login rejected: no anonymous account");
                    Err(FtpgateError::AuthenticationFailed)
                }
            },
            other => Err(FtpgateError::UnsupportedCredentialKind(other.kind())),
        }
    }
}

/// Checks an account before it goes into a store.
pub(crate) fn validate_account(account: &Account) -> Result<(), FtpgateError> {
    if account.name.is_empty() {
        return Err(FtpgateError::InvalidAccount(
            "account name is missing".to_owned(),
        ));
    }
    if let Some(password) = &account.password {
        if !is_password_hash(password.expose_secret()) {
            return Err(FtpgateError::InvalidAccount(format!(
                "password of {} is not a password hash",
                account.name
            )));
        }
    }
    Ok(())
}

/// Makes every account's name agree with the key it is stored under.
pub(crate) fn normalize_accounts(accounts: AccountMap) -> AccountMap {
    accounts
        .into_iter()
        .map(|(key, mut account)| {
            if account.name != key {
                if !account.name.is_empty() {
                    warn!(
                        key = %key,
                        name = %account.name,
                        "Account name differs from its key, using the key"
                    );
                }
                account.name = key.clone();
            }
            (key, account)
        })
        .collect()
}
