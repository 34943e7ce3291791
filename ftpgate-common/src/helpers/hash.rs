use anyhow::Result;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{Error, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;

/// Rounds of the salted MD5 scheme used by account files that predate argon2.
const LEGACY_MD5_ROUNDS: usize = 1000;

pub fn hash_password(password: &str) -> String {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    // Only panics for invalid hash parameters
    #[allow(clippy::unwrap_used)]
    argon2
        .hash_password(password.as_bytes(), &salt)
        .unwrap()
        .to_string()
}

pub fn parse_hash(hash: &str) -> Result<PasswordHash<'_>, Error> {
    PasswordHash::new(hash)
}

/// Checks `password` against either an argon2 PHC string or a legacy
/// `<salt>:<HEX>` salted MD5 hash.
pub fn verify_password_hash(password: &str, hash: &str) -> Result<bool> {
    if let Some((salt, digest)) = split_legacy_hash(hash) {
        return Ok(legacy_md5_digest(salt, password).eq_ignore_ascii_case(digest));
    }

    let parsed_hash = parse_hash(hash).map_err(|e| anyhow::anyhow!(e))?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
        Ok(()) => Ok(true),
        Err(Error::Password) => Ok(false),
        Err(e) => Err(anyhow::anyhow!(e)),
    }
}

/// Whether `value` is in one of the hash formats [`verify_password_hash`]
/// understands. Used to keep plaintext out of account files.
pub fn is_password_hash(value: &str) -> bool {
    split_legacy_hash(value).is_some()
        || parse_hash(value).is_ok_and(|hash| hash.algorithm.as_str().starts_with("argon2"))
}

fn split_legacy_hash(hash: &str) -> Option<(&str, &str)> {
    if hash.starts_with('$') {
        return None;
    }
    let (salt, digest) = hash.split_once(':')?;
    if digest.len() == 32 && digest.bytes().all(|b| b.is_ascii_hexdigit()) {
        Some((salt, digest))
    } else {
        None
    }
}

fn legacy_md5_digest(salt: &str, password: &str) -> String {
    let mut digest = format!("{salt}{password}");
    for _ in 0..LEGACY_MD5_ROUNDS {
        digest = format!("{:X}", md5::compute(digest.as_bytes()));
    }
    digest
}
