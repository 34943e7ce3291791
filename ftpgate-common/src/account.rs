use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::helpers::hash::hash_password;
use crate::Secret;

pub(crate) const fn _default_true() -> bool {
    true
}

/// Accounts keyed by name.
pub type AccountMap = BTreeMap<String, Account>;

/// A named FTP identity. Missing fields in the account file fall back to
/// the defaults below; numeric limits use 0 for "unlimited".
///
/// Field names written by older tooling (`isEnabled`, `maxLogin`, ...) are
/// accepted on read.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    #[serde(default)]
    pub name: String,
    /// Salted hash, see [`crate::helpers::hash`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<Secret<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub home_directory: Option<String>,
    #[serde(default, alias = "isEnabled")]
    pub enabled: bool,
    #[serde(default = "_default_true")]
    pub can_write: bool,
    #[serde(default, alias = "maxLogin")]
    pub max_concurrent_logins: u32,
    #[serde(default, alias = "maxLoginPerIp")]
    pub max_concurrent_logins_per_address: u32,
    /// Bytes per second
    #[serde(default, alias = "downloadRate")]
    pub download_rate_limit: u64,
    /// Bytes per second
    #[serde(default, alias = "uploadRate")]
    pub upload_rate_limit: u64,
    #[serde(default, alias = "maxIdleTime")]
    pub max_idle_seconds: u32,
}

impl Default for Account {
    fn default() -> Self {
        Self {
            name: String::new(),
            password: None,
            home_directory: None,
            enabled: false,
            can_write: _default_true(),
            max_concurrent_logins: 0,
            max_concurrent_logins_per_address: 0,
            download_rate_limit: 0,
            upload_rate_limit: 0,
            max_idle_seconds: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Authority {
    Write,
    ConcurrentLogin {
        max_logins: u32,
        max_logins_per_address: u32,
    },
    TransferRate {
        max_download_rate: u64,
        max_upload_rate: u64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorizationRequest {
    Write,
    /// Counts include the login being attempted.
    ConcurrentLogin {
        current_logins: u32,
        current_logins_from_address: u32,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TransferRate {
    pub download: u64,
    pub upload: u64,
}

impl Account {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Hashes `password` and stores the hash.
    pub fn set_password(&mut self, password: &Secret<String>) {
        self.password = Some(Secret::new(hash_password(password.expose_secret())));
    }

    pub fn authorities(&self) -> Vec<Authority> {
        let mut authorities = Vec::with_capacity(3);
        if self.can_write {
            authorities.push(Authority::Write);
        }
        authorities.push(Authority::ConcurrentLogin {
            max_logins: self.max_concurrent_logins,
            max_logins_per_address: self.max_concurrent_logins_per_address,
        });
        authorities.push(Authority::TransferRate {
            max_download_rate: self.download_rate_limit,
            max_upload_rate: self.upload_rate_limit,
        });
        authorities
    }

    pub fn authorize(&self, request: &AuthorizationRequest) -> bool {
        match *request {
            AuthorizationRequest::Write => self.can_write,
            AuthorizationRequest::ConcurrentLogin {
                current_logins,
                current_logins_from_address,
            } => {
                within_limit(self.max_concurrent_logins, current_logins)
                    && within_limit(
                        self.max_concurrent_logins_per_address,
                        current_logins_from_address,
                    )
            }
        }
    }

    pub fn transfer_rate(&self) -> TransferRate {
        TransferRate {
            download: self.download_rate_limit,
            upload: self.upload_rate_limit,
        }
    }

    pub fn idle_timeout(&self) -> Option<Duration> {
        match self.max_idle_seconds {
            0 => None,
            secs => Some(Duration::from_secs(secs.into())),
        }
    }
}

fn within_limit(limit: u32, current: u32) -> bool {
    limit == 0 || current <= limit
}
