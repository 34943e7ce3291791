mod defaults;

use std::path::{Path, PathBuf};

use defaults::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct FtpgateConfigStore {
    /// JSON file holding the accounts
    pub accounts_file: PathBuf,

    #[serde(default = "_default_admin_name")]
    pub admin_name: String,

    /// Restrict the account file to its owner whenever the CLI writes it
    #[serde(default = "_default_true")]
    pub secure_accounts_file: bool,
}

impl FtpgateConfigStore {
    pub fn for_accounts_file<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            accounts_file: path.into(),
            admin_name: _default_admin_name(),
            secure_accounts_file: _default_true(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FtpgateConfig {
    pub store: FtpgateConfigStore,
    pub paths_relative_to: PathBuf,
}

impl FtpgateConfig {
    pub fn accounts_file(&self) -> PathBuf {
        self.resolve(&self.store.accounts_file)
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.paths_relative_to.join(path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let store: FtpgateConfigStore =
            serde_json::from_str(r#"{"accounts_file": "users.json"}"#).unwrap();
        assert_eq!(store.admin_name, "admin");
        assert!(store.secure_accounts_file);
    }

    #[test]
    fn test_relative_accounts_file() {
        let config = FtpgateConfig {
            store: FtpgateConfigStore::for_accounts_file("users.json"),
            paths_relative_to: PathBuf::from("/etc/ftpgate"),
        };
        assert_eq!(
            config.accounts_file(),
            PathBuf::from("/etc/ftpgate/users.json")
        );

        let config = FtpgateConfig {
            store: FtpgateConfigStore::for_accounts_file("/srv/users.json"),
            paths_relative_to: PathBuf::from("/etc/ftpgate"),
        };
        assert_eq!(config.accounts_file(), PathBuf::from("/srv/users.json"));
    }
}
