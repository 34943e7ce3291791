use std::error::Error;
use std::path::PathBuf;

use crate::auth::CredentialKind;

#[derive(thiserror::Error, Debug)]
pub enum FtpgateError {
    #[error("authentication failed")]
    AuthenticationFailed,
    #[error("credential kind not supported by this store: {0}")]
    UnsupportedCredentialKind(CredentialKind),
    #[error("invalid account: {0}")]
    InvalidAccount(String),
    #[error("file does not exist or is not a file: {0:?}")]
    FileNotFound(PathBuf),
    #[error("failed to parse account file {path:?}: {source}")]
    InvalidFormat {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("listener for event '{event}' failed: {source}")]
    ListenerFailed {
        event: String,
        #[source]
        source: anyhow::Error,
    },
    #[error(transparent)]
    Other(Box<dyn Error + Send + Sync>),
}

impl FtpgateError {
    pub fn other<E: Error + Send + Sync + 'static>(err: E) -> Self {
        Self::Other(Box::new(err))
    }

    /// Whether the protocol layer should answer this with an authentication rejection.
    pub fn is_auth_rejection(&self) -> bool {
        matches!(
            self,
            Self::AuthenticationFailed | Self::UnsupportedCredentialKind(_)
        )
    }
}
