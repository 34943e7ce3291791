use std::fmt::Debug;

use serde::{Deserialize, Serialize};

use crate::Secret;

pub const ANONYMOUS_USERNAME: &str = "anonymous";

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CredentialKind {
    #[serde(rename = "password")]
    Password,
    #[serde(rename = "anonymous")]
    Anonymous,
    #[serde(rename = "certificate")]
    ClientCertificate,
}

impl std::fmt::Display for CredentialKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Password => write!(f, "password"),
            Self::Anonymous => write!(f, "anonymous"),
            Self::ClientCertificate => write!(f, "client certificate"),
        }
    }
}

/// What a client offered during a single login attempt.
#[derive(Clone, PartialEq, Eq)]
pub enum CredentialPresentation {
    Password {
        username: String,
        password: Secret<String>,
    },
    Anonymous,
    /// FTPS client certificate, identified by its fingerprint.
    ClientCertificate {
        username: String,
        fingerprint: String,
    },
}

impl CredentialPresentation {
    pub fn password<U: Into<String>, P: Into<Secret<String>>>(username: U, password: P) -> Self {
        Self::Password {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn kind(&self) -> CredentialKind {
        match self {
            Self::Password { .. } => CredentialKind::Password,
            Self::Anonymous => CredentialKind::Anonymous,
            Self::ClientCertificate { .. } => CredentialKind::ClientCertificate,
        }
    }

    pub fn username(&self) -> &str {
        match self {
            Self::Password { username, .. } | Self::ClientCertificate { username, .. } => username,
            Self::Anonymous => ANONYMOUS_USERNAME,
        }
    }
}

// Keep the password out of logs
impl Debug for CredentialPresentation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Password { username, .. } => write!(f, "<password for {username}>"),
            Self::Anonymous => write!(f, "<anonymous>"),
            Self::ClientCertificate {
                username,
                fingerprint,
            } => write!(f, "<certificate {fingerprint} for {username}>"),
        }
    }
}
