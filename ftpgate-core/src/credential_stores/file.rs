use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use delegate::delegate;
use ftpgate_common::eventhub::EventSubscription;
use ftpgate_common::{Account, AccountMap, FtpgateError};
use serde::Serialize;
use tempfile::NamedTempFile;
use tokio::sync::{Mutex, MutexGuard};
use tracing::*;

use super::{validate_account, CredentialStore, InMemoryCredentialStore, StoreEvent};

struct AccountFile {
    path: PathBuf,
    last_modified: SystemTime,
}

/// Credential store backed by a JSON file that other processes may edit.
///
/// Every operation first compares the file's modification time with the
/// one seen at the last load or write and reloads on mismatch. Writes
/// replace the whole file. There is no file locking: when another process
/// writes at the same time, the last write wins.
pub struct FileCredentialStore {
    inner: InMemoryCredentialStore,
    file: Mutex<AccountFile>,
}

impl FileCredentialStore {
    pub async fn open<P: Into<PathBuf>>(path: P) -> Result<Self, FtpgateError> {
        let path = path.into();
        let (accounts, last_modified) = read_accounts(&path).await?;
        info!(?path, accounts = accounts.len(), "Loaded accounts");
        Ok(Self {
            inner: InMemoryCredentialStore::new(accounts),
            file: Mutex::new(AccountFile {
                path,
                last_modified,
            }),
        })
    }

    /// Like [`Self::open`], but starts an empty account file first if
    /// there is none.
    pub async fn open_or_create<P: Into<PathBuf>>(path: P) -> Result<Self, FtpgateError> {
        let path = path.into();
        if !tokio::fs::try_exists(&path).await? {
            info!(?path, "Creating empty account file");
            write_accounts(&path, &AccountMap::new()).await?;
        }
        Self::open(path).await
    }

    pub async fn path(&self) -> PathBuf {
        self.file.lock().await.path.clone()
    }

    /// Re-reads the account file, switching to `path` first if given. The
    /// configured path only changes if the new file loads.
    pub async fn reload(&self, path: Option<PathBuf>) -> Result<(), FtpgateError> {
        let mut file = self.file.lock().await;
        let path = path.unwrap_or_else(|| file.path.clone());
        let (accounts, last_modified) = read_accounts(&path).await?;
        file.path = path;
        file.last_modified = last_modified;
        self.inner.reload(accounts).await;
        Ok(())
    }

    /// Locks the file state, reloading first if the file changed on disk.
    async fn refresh(&self) -> Result<MutexGuard<'_, AccountFile>, FtpgateError> {
        let mut file = self.file.lock().await;
        let modified = modified_time(&file.path).await?;
        if modified != file.last_modified {
            info!(path = ?file.path, "Account file changed on disk, reloading");
            let (accounts, last_modified) = read_accounts(&file.path).await?;
            file.last_modified = last_modified;
            self.inner.reload(accounts).await;
        }
        Ok(file)
    }

    /// Writes `accounts` to disk, then makes them visible. Memory is left
    /// untouched when the write fails.
    async fn commit(
        &self,
        file: &mut AccountFile,
        accounts: AccountMap,
    ) -> Result<(), FtpgateError> {
        write_accounts(&file.path, &accounts).await?;
        file.last_modified = modified_time(&file.path).await?;
        debug!(path = ?file.path, accounts = accounts.len(), "Wrote account file");
        self.inner.replace(accounts).await;
        Ok(())
    }
}

impl CredentialStore for FileCredentialStore {
    async fn lookup(&self, name: &str) -> Result<Option<Account>, FtpgateError> {
        drop(self.refresh().await?);
        self.inner.lookup(name).await
    }

    async fn exists(&self, name: &str) -> Result<bool, FtpgateError> {
        drop(self.refresh().await?);
        self.inner.exists(name).await
    }

    async fn list_names(&self) -> Result<Vec<String>, FtpgateError> {
        drop(self.refresh().await?);
        self.inner.list_names().await
    }

    async fn save(&self, account: Account) -> Result<(), FtpgateError> {
        validate_account(&account)?;
        let mut file = self.refresh().await?;
        let mut accounts = self.inner.snapshot().await;
        debug!(name = %account.name, "Saving account");
        accounts.insert(account.name.clone(), account);
        self.commit(&mut file, accounts).await
    }

    async fn delete(&self, name: &str) -> Result<(), FtpgateError> {
        let mut file = self.refresh().await?;
        let mut accounts = self.inner.snapshot().await;
        if accounts.remove(name).is_none() {
            return Ok(());
        }
        debug!(%name, "Deleting account");
        self.commit(&mut file, accounts).await
    }

    delegate! {
        to self.inner {
            async fn admin_name(&self) -> String;
            async fn set_admin_name(&self, name: &str);
            async fn is_admin(&self, name: &str) -> bool;
            async fn subscribe(&self) -> EventSubscription<StoreEvent>;
        }
    }
}

async fn modified_time(path: &Path) -> Result<SystemTime, FtpgateError> {
    match tokio::fs::metadata(path).await {
        Ok(metadata) if metadata.is_file() => Ok(metadata.modified()?),
        Ok(_) => Err(FtpgateError::FileNotFound(path.to_path_buf())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(FtpgateError::FileNotFound(path.to_path_buf()))
        }
        Err(e) => Err(e.into()),
    }
}

/// Reads the account file along with the modification time it had
/// before reading, so a write racing the read shows up as stale later.
async fn read_accounts(path: &Path) -> Result<(AccountMap, SystemTime), FtpgateError> {
    let modified = modified_time(path).await?;
    let content = tokio::fs::read_to_string(path).await?;
    let accounts =
        serde_json::from_str(&content).map_err(|source| FtpgateError::InvalidFormat {
            path: path.to_path_buf(),
            source,
        })?;
    Ok((accounts, modified))
}

/// Replaces the account file in one rename, so concurrent readers see
/// either the old or the new content.
async fn write_accounts(path: &Path, accounts: &AccountMap) -> Result<(), FtpgateError> {
    let mut buffer = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
    accounts
        .serialize(&mut serializer)
        .map_err(FtpgateError::other)?;
    buffer.push(b'\n');

    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || replace_file(&path, &buffer))
        .await
        .map_err(FtpgateError::other)?
}

fn replace_file(path: &Path, content: &[u8]) -> Result<(), FtpgateError> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let mut file = NamedTempFile::new_in(dir)?;
    file.write_all(content)?;
    if let Ok(metadata) = std::fs::metadata(path) {
        file.as_file().set_permissions(metadata.permissions())?;
    }
    file.as_file().sync_all()?;
    file.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use ftpgate_common::auth::CredentialPresentation;
    use ftpgate_common::helpers::hash::hash_password;
    use ftpgate_common::Secret;
    use tempfile::TempDir;

    use super::*;

    const LEGACY_ACCOUNTS: &str = r#"{
    "test": {
        "name": "test",
        "password": "4221747:D40D331DC793710D56B5ED167F5F3B1A",
        "homeDirectory": "/tmp",
        "isEnabled": true,
        "maxLogin": 2
    }
}"#;

    fn accounts_file(dir: &TempDir, content: &str) -> PathBuf {
        let path = dir.path().join("users.json");
        std::fs::write(&path, content).unwrap();
        path
    }

    /// Rewrites the file the way another process would, with a distinct mtime.
    fn edit_externally(path: &Path, content: &str, seconds_ahead: u64) {
        std::fs::write(path, content).unwrap();
        let file = std::fs::File::options().write(true).open(path).unwrap();
        file.set_modified(SystemTime::now() + Duration::from_secs(seconds_ahead))
            .unwrap();
    }

    fn read_json(path: &Path) -> serde_json::Value {
        serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
    }

    #[tokio::test]
    async fn test_open_errors() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            FileCredentialStore::open(dir.path().join("missing.json")).await,
            Err(FtpgateError::FileNotFound(_))
        ));
        assert!(matches!(
            FileCredentialStore::open(dir.path()).await,
            Err(FtpgateError::FileNotFound(_))
        ));

        let path = accounts_file(&dir, "[1, 2, 3]");
        assert!(matches!(
            FileCredentialStore::open(&path).await,
            Err(FtpgateError::InvalidFormat { .. })
        ));
    }

    #[tokio::test]
    async fn test_open_legacy_file() {
        let dir = TempDir::new().unwrap();
        let store = FileCredentialStore::open(accounts_file(&dir, LEGACY_ACCOUNTS))
            .await
            .unwrap();

        assert_eq!(store.list_names().await.unwrap(), vec!["test"]);
        let account = store
            .authenticate(&CredentialPresentation::password("test", "test"))
            .await
            .unwrap();
        assert!(account.enabled);
        assert_eq!(account.max_concurrent_logins, 2);
        assert!(store
            .authenticate(&CredentialPresentation::password("test", "wrong"))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_name_taken_from_key() {
        let dir = TempDir::new().unwrap();
        let path = accounts_file(&dir, r#"{"carol": {"homeDirectory": "/srv"}}"#);
        let store = FileCredentialStore::open(&path).await.unwrap();
        let carol = store.lookup("carol").await.unwrap().unwrap();
        assert_eq!(carol.name, "carol");
        assert!(!carol.enabled);
        assert!(carol.can_write);
    }

    #[tokio::test]
    async fn test_save_writes_file() {
        let dir = TempDir::new().unwrap();
        let path = accounts_file(&dir, LEGACY_ACCOUNTS);
        let store = FileCredentialStore::open(&path).await.unwrap();

        let dave = Account {
            password: Some(Secret::new(hash_password("pw"))),
            home_directory: Some("/home/dave".into()),
            enabled: true,
            ..Account::new("dave")
        };
        store.save(dave.clone()).await.unwrap();

        let json = read_json(&path);
        assert_eq!(json["dave"]["homeDirectory"], "/home/dave");
        assert_eq!(json["dave"]["enabled"], true);
        assert_eq!(json["test"]["maxConcurrentLogins"], 2);
        assert!(std::fs::read_to_string(&path)
            .unwrap()
            .contains("\n    \"dave\": {"));

        // Our own write does not count as an external change
        let mut events = store.subscribe().await;
        assert_eq!(store.lookup("dave").await.unwrap(), Some(dave));
        assert!(events.try_recv().is_err());
    }

    /// A directory nested so deep that a one-letter file name still fits
    /// under PATH_MAX (4096 with the NUL) but a temporary file does not.
    #[cfg(target_os = "linux")]
    fn directory_without_room_for_temp_files(base: &Path) -> PathBuf {
        let target = 4088;
        let mut dir = base.to_path_buf();
        while target - dir.as_os_str().len() >= 2 {
            let room = target - dir.as_os_str().len() - 1;
            dir.push("d".repeat(room.min(200)));
        }
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_failed_write_leaves_store_unchanged() {
        let base = TempDir::new().unwrap();
        let path = directory_without_room_for_temp_files(base.path()).join("a");
        std::fs::write(&path, LEGACY_ACCOUNTS).unwrap();
        let store = FileCredentialStore::open(&path).await.unwrap();

        let ghost = Account {
            password: Some(Secret::new(hash_password("boo"))),
            ..Account::new("ghost")
        };
        assert!(matches!(store.save(ghost).await, Err(FtpgateError::Io(_))));
        assert!(!store.exists("ghost").await.unwrap());

        let changed = Account {
            password: Some(Secret::new(hash_password("changed"))),
            ..store.lookup("test").await.unwrap().unwrap()
        };
        assert!(store.save(changed).await.is_err());
        assert!(store
            .authenticate(&CredentialPresentation::password("test", "test"))
            .await
            .is_ok());

        assert!(store.delete("test").await.is_err());
        assert!(store.exists("test").await.unwrap());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), LEGACY_ACCOUNTS);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_save_replaces_file_in_place() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let path = accounts_file(&dir, LEGACY_ACCOUNTS);
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o640)).unwrap();
        let store = FileCredentialStore::open(&path).await.unwrap();

        store.save(Account::new("ivan")).await.unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o640);
        let entries: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(entries, vec!["users.json"]);
        assert!(read_json(&path).get("ivan").is_some());
    }

    #[tokio::test]
    async fn test_delete_writes_file() {
        let dir = TempDir::new().unwrap();
        let path = accounts_file(&dir, LEGACY_ACCOUNTS);
        let store = FileCredentialStore::open(&path).await.unwrap();

        store.delete("nobody").await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), LEGACY_ACCOUNTS);

        store.delete("test").await.unwrap();
        assert!(!store.exists("test").await.unwrap());
        assert_eq!(read_json(&path), serde_json::json!({}));
    }

    #[tokio::test]
    async fn test_external_edit_is_picked_up() {
        let dir = TempDir::new().unwrap();
        let path = accounts_file(&dir, LEGACY_ACCOUNTS);
        let store = FileCredentialStore::open(&path).await.unwrap();
        let mut events = store.subscribe().await;

        let alice = Account {
            password: Some(Secret::new(hash_password("secret"))),
            ..Account::new("alice")
        };
        let content = serde_json::to_string(&serde_json::json!({ "alice": alice })).unwrap();
        edit_externally(&path, &content, 60);

        assert!(!store.exists("test").await.unwrap());
        assert_eq!(
            events.recv().await,
            Some(StoreEvent::Reloaded { accounts: 1 })
        );
        assert!(store
            .authenticate(&CredentialPresentation::password("alice", "secret"))
            .await
            .is_ok());

        edit_externally(&path, "{}", 120);
        assert_eq!(store.lookup("alice").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_save_keeps_external_edits() {
        let dir = TempDir::new().unwrap();
        let path = accounts_file(&dir, LEGACY_ACCOUNTS);
        let store = FileCredentialStore::open(&path).await.unwrap();

        edit_externally(&path, r#"{"erin": {"name": "erin"}}"#, 60);
        store.save(Account::new("frank")).await.unwrap();

        let json = read_json(&path);
        assert!(json.get("erin").is_some());
        assert!(json.get("frank").is_some());
        assert!(json.get("test").is_none());
    }

    #[tokio::test]
    async fn test_broken_external_edit_is_reported() {
        let dir = TempDir::new().unwrap();
        let path = accounts_file(&dir, LEGACY_ACCOUNTS);
        let store = FileCredentialStore::open(&path).await.unwrap();

        edit_externally(&path, "{ not json", 60);
        assert!(matches!(
            store.lookup("test").await,
            Err(FtpgateError::InvalidFormat { .. })
        ));

        std::fs::remove_file(&path).unwrap();
        assert!(matches!(
            store.exists("test").await,
            Err(FtpgateError::FileNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_reload_switches_path() {
        let dir = TempDir::new().unwrap();
        let path = accounts_file(&dir, LEGACY_ACCOUNTS);
        let other = dir.path().join("other.json");
        std::fs::write(&other, r#"{"grace": {}}"#).unwrap();
        let store = FileCredentialStore::open(&path).await.unwrap();
        let mut events = store.subscribe().await;

        assert!(store
            .reload(Some(dir.path().join("missing.json")))
            .await
            .is_err());
        assert_eq!(store.path().await, path);

        store.reload(Some(other.clone())).await.unwrap();
        assert_eq!(store.path().await, other);
        assert_eq!(store.list_names().await.unwrap(), vec!["grace"]);
        assert_eq!(
            events.recv().await,
            Some(StoreEvent::Reloaded { accounts: 1 })
        );

        store.reload(None).await.unwrap();
        assert_eq!(
            events.recv().await,
            Some(StoreEvent::Reloaded { accounts: 1 })
        );
    }

    #[tokio::test]
    async fn test_open_or_create() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("new.json");
        let store = FileCredentialStore::open_or_create(&path).await.unwrap();
        assert!(store.list_names().await.unwrap().is_empty());
        assert_eq!(read_json(&path), serde_json::json!({}));

        store.save(Account::new("heidi")).await.unwrap();
        let reopened = FileCredentialStore::open_or_create(&path).await.unwrap();
        assert!(reopened.exists("heidi").await.unwrap());
    }

    #[tokio::test]
    async fn test_admin_name_is_per_store() {
        let dir = TempDir::new().unwrap();
        let path = accounts_file(&dir, "{}");
        let first = FileCredentialStore::open(&path).await.unwrap();
        let second = FileCredentialStore::open(&path).await.unwrap();

        first.set_admin_name("root").await;
        assert!(first.is_admin("root").await);
        assert!(second.is_admin("admin").await);
        assert!(!second.is_admin("root").await);
    }
}
