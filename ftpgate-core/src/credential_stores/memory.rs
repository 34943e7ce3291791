use ftpgate_common::eventhub::{EventHub, EventSubscription};
use ftpgate_common::{Account, AccountMap, FtpgateError};
use tokio::sync::RwLock;
use tracing::*;

use super::{normalize_accounts, validate_account, CredentialStore, StoreEvent};

const DEFAULT_ADMIN_NAME: &str = "admin";

/// Credential store over an in-process account map.
pub struct InMemoryCredentialStore {
    accounts: RwLock<AccountMap>,
    admin_name: RwLock<String>,
    events: EventHub<StoreEvent>,
}

impl Default for InMemoryCredentialStore {
    fn default() -> Self {
        Self::new(AccountMap::new())
    }
}

impl InMemoryCredentialStore {
    pub fn new(accounts: AccountMap) -> Self {
        Self {
            accounts: RwLock::new(normalize_accounts(accounts)),
            admin_name: RwLock::new(DEFAULT_ADMIN_NAME.to_owned()),
            events: EventHub::new(),
        }
    }

    pub fn from_accounts<I: IntoIterator<Item = Account>>(accounts: I) -> Self {
        Self::new(
            accounts
                .into_iter()
                .map(|account| (account.name.clone(), account))
                .collect(),
        )
    }

    /// Swaps in a whole new account map and notifies subscribers.
    pub async fn reload(&self, accounts: AccountMap) {
        let accounts = normalize_accounts(accounts);
        let count = accounts.len();
        *self.accounts.write().await = accounts;
        info!(accounts = count, "Reloaded accounts");
        if self
            .events
            .send(StoreEvent::Reloaded { accounts: count })
            .await
            .is_err()
        {
            debug!("No subscribers for store events");
        }
    }

    pub async fn snapshot(&self) -> AccountMap {
        self.accounts.read().await.clone()
    }

    /// Removes and returns the account, if present.
    pub async fn remove(&self, name: &str) -> Option<Account> {
        self.accounts.write().await.remove(name)
    }

    /// Swaps in an account map the caller has already persisted. Unlike
    /// [`Self::reload`], subscribers are not notified.
    pub(crate) async fn replace(&self, accounts: AccountMap) {
        *self.accounts.write().await = accounts;
    }
}

impl CredentialStore for InMemoryCredentialStore {
    async fn lookup(&self, name: &str) -> Result<Option<Account>, FtpgateError> {
        Ok(self.accounts.read().await.get(name).cloned())
    }

    async fn exists(&self, name: &str) -> Result<bool, FtpgateError> {
        Ok(self.accounts.read().await.contains_key(name))
    }

    async fn list_names(&self) -> Result<Vec<String>, FtpgateError> {
        Ok(self.accounts.read().await.keys().cloned().collect())
    }

    async fn save(&self, account: Account) -> Result<(), FtpgateError> {
        validate_account(&account)?;
        debug!(name = %account.name, "Saving account");
        self.accounts
            .write()
            .await
            .insert(account.name.clone(), account);
        Ok(())
    }

    async fn delete(&self, name: &str) -> Result<(), FtpgateError> {
        if self.remove(name).await.is_some() {
            debug!(%name, "Deleted account");
        }
        Ok(())
    }

    async fn admin_name(&self) -> String {
        self.admin_name.read().await.clone()
    }

    async fn set_admin_name(&self, name: &str) {
        *self.admin_name.write().await = name.to_owned();
    }

    async fn subscribe(&self) -> EventSubscription<StoreEvent> {
        self.events.subscribe(|_| true).await
    }
}
