//! Password file loading and credential lookup.
//!
//! The file holds one `username:bcrypt-hash` entry per line. It is read once
//! at startup; `nat-passwd` edits it offline.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::utils::write_atomic;

/// Errors for password file handling.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("failed to read password file {}: {source}", .path.display())]
    PasswdRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write password file {}: {source}", .path.display())]
    PasswdWrite {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid username {0:?}")]
    InvalidUsername(String),

    #[error("password hashing failed: {0}")]
    Hash(#[from] bcrypt::BcryptError),
}

/// Username to password-hash table.
#[derive(Debug, Clone, Default)]
pub struct UserTable {
    users: BTreeMap<String, String>,
}

impl UserTable {
    /// Read and parse a password file.
    pub fn load(path: &Path) -> Result<Self, AuthError> {
        let content = std::fs::read_to_string(path).map_err(|source| AuthError::PasswdRead {
            path: path.to_path_buf(),
            source,
        })?;
        let table = Self::parse(&content);
        tracing::info!(path = %path.display(), users = table.len(), "Password file loaded");
        Ok(table)
    }

    /// Like [`UserTable::load`] but a missing file yields an empty table.
    pub fn load_or_default(path: &Path) -> Result<Self, AuthError> {
        match Self::load(path) {
            Err(AuthError::PasswdRead { source, .. }) if source.kind() == io::ErrorKind::NotFound => {
                Ok(Self::default())
            }
            other => other,
        }
    }

    /// Parse `username:hash` lines. Blank lines and `#` comments are skipped.
    pub fn parse(content: &str) -> Self {
        let mut users = BTreeMap::new();
        for (idx, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            match line.split_once(':') {
                Some((user, hash)) if !user.trim().is_empty() && !hash.trim().is_empty() => {
                    users.insert(user.trim().to_string(), hash.trim().to_string());
                }
                _ => {
                    tracing::warn!(line = idx + 1, "Skipping malformed password entry");
                }
            }
        }
        Self { users }
    }

    /// The stored hash for `username`.
    pub fn lookup(&self, username: &str) -> Option<&str> {
        self.users.get(username).map(String::as_str)
    }

    /// Check `password` against the stored bcrypt hash.
    ///
    /// Unknown users and unparsable hashes verify as false.
    pub fn verify(&self, username: &str, password: &str) -> bool {
        let Some(hash) = self.lookup(username) else {
            return false;
        };
        match bcrypt::verify(password, hash) {
            Ok(valid) => valid,
            Err(e) => {
                tracing::warn!(username, error = %e, "Stored password hash is unusable");
                false
            }
        }
    }

    /// Hash `password` and insert or replace the entry for `username`.
    pub fn set_password(&mut self, username: &str, password: &str, cost: u32) -> Result<(), AuthError> {
        if username.is_empty() || username.contains(':') || username.chars().any(char::is_whitespace) {
            return Err(AuthError::InvalidUsername(username.to_string()));
        }
        let hash = bcrypt::hash(password, cost)?;
        self.users.insert(username.to_string(), hash);
        Ok(())
    }

    /// Remove `username`. Returns whether an entry existed.
    pub fn remove(&mut self, username: &str) -> bool {
        self.users.remove(username).is_some()
    }

    pub fn usernames(&self) -> impl Iterator<Item = &str> {
        self.users.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    /// Serialize back to the `username:hash` format.
    pub fn to_file_contents(&self) -> String {
        let mut out = String::new();
        for (user, hash) in &self.users {
            out.push_str(user);
            out.push(':');
            out.push_str(hash);
            out.push('\n');
        }
        out
    }

    /// Atomically rewrite the password file.
    pub fn save(&self, path: &Path) -> Result<(), AuthError> {
        write_atomic(path, self.to_file_contents().as_bytes()).map_err(|source| AuthError::PasswdWrite {
            path: path.to_path_buf(),
            source,
        })
    }
}
