//! Authoritative in-memory rule set backed by the rule file.
//!
//! # Concurrency
//! - Mutations (`edit_at`, `delete_at`, `replace_all`, `replace_and_persist`,
//!   `persist`, `reload`)
//!   queue on one async mutex and run one at a time
//! - Readers take an `Arc` snapshot; a mutation builds a new vector and
//!   publishes it with a single atomic swap, so `list` never sees a
//!   half-applied change
//! - Disk I/O is the only suspension point

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arc_swap::ArcSwap;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::rules::codec::{self, ParseWarning};
use crate::rules::model::{RuleError, RulePatch, RuleRecord};
use crate::utils::write_atomic;

/// Errors surfaced by [`RuleStore`] operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read rule file {}: {source}", .path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write rule file {}: {source}", .path.display())]
    ConfigWrite {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("rule index {index} is out of range ({len} rules)")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("invalid rule: {0}")]
    InvalidRule(#[from] RuleError),
}

/// Holder of the current rule sequence.
pub struct RuleStore {
    path: PathBuf,
    rules: ArcSwap<Vec<RuleRecord>>,
    write_lock: Mutex<()>,
}

impl RuleStore {
    /// Create an empty store for `path` without touching the disk.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            rules: ArcSwap::from_pointee(Vec::new()),
            write_lock: Mutex::new(()),
        }
    }

    /// Create a store and load the rule file into it.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let store = Self::new(path);
        store.reload().await?;
        Ok(store)
    }

    /// Path of the backing rule file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Snapshot of the current rules.
    pub fn list(&self) -> Arc<Vec<RuleRecord>> {
        self.rules.load_full()
    }

    pub fn len(&self) -> usize {
        self.rules.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.load().is_empty()
    }

    /// Replace the in-memory rules with a fresh decode of the rule file.
    ///
    /// On read failure the current rules are kept.
    pub async fn reload(&self) -> Result<Vec<ParseWarning>, StoreError> {
        let _guard = self.write_lock.lock().await;
        self.reload_locked().await
    }

    /// Merge `patch` into the rule at `index`. Memory only.
    pub async fn edit_at(&self, index: usize, patch: &RulePatch) -> Result<RuleRecord, StoreError> {
        let _guard = self.write_lock.lock().await;
        let current = self.rules.load_full();

        let existing = current.get(index).ok_or(StoreError::IndexOutOfRange {
            index,
            len: current.len(),
        })?;
        let updated = existing.apply(patch)?;

        let mut next = current.as_ref().clone();
        next[index] = updated.clone();
        self.rules.store(Arc::new(next));

        tracing::debug!(index, rule = %codec::encode_line(&updated), "Rule edited");
        Ok(updated)
    }

    /// Remove the rule at `index`, shifting later rules down. Memory only.
    pub async fn delete_at(&self, index: usize) -> Result<RuleRecord, StoreError> {
        let _guard = self.write_lock.lock().await;
        let current = self.rules.load_full();

        if index >= current.len() {
            return Err(StoreError::IndexOutOfRange {
                index,
                len: current.len(),
            });
        }

        let mut next = current.as_ref().clone();
        let removed = next.remove(index);
        self.rules.store(Arc::new(next));

        tracing::debug!(index, remaining = current.len() - 1, "Rule deleted");
        Ok(removed)
    }

    /// Swap in a complete rule sequence. Memory only.
    ///
    /// Every rule is validated first; nothing changes if any is invalid.
    pub async fn replace_all(&self, rules: Vec<RuleRecord>) -> Result<(), StoreError> {
        for rule in &rules {
            rule.validate()?;
        }

        let _guard = self.write_lock.lock().await;
        tracing::debug!(rules = rules.len(), "Replacing rule set");
        self.rules.store(Arc::new(rules));
        Ok(())
    }

    /// Swap in `rules`, write them and reload, all under one lock hold.
    ///
    /// Queued edits cannot land between the swap and the write. If the write
    /// fails the previous rules are restored.
    pub async fn replace_and_persist(
        &self,
        rules: Vec<RuleRecord>,
    ) -> Result<Vec<ParseWarning>, StoreError> {
        for rule in &rules {
            rule.validate()?;
        }

        let _guard = self.write_lock.lock().await;
        let previous = self.rules.swap(Arc::new(rules));
        if let Err(e) = self.persist_locked().await {
            self.rules.store(previous);
            return Err(e);
        }
        self.reload_locked().await
    }

    /// Write the current rules to the rule file.
    pub async fn persist(&self) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        self.persist_locked().await
    }

    /// Persist, then reload so memory matches what the file decodes to.
    pub async fn persist_then_reload(&self) -> Result<Vec<ParseWarning>, StoreError> {
        let _guard = self.write_lock.lock().await;
        self.persist_locked().await?;
        self.reload_locked().await
    }

    async fn reload_locked(&self) -> Result<Vec<ParseWarning>, StoreError> {
        let text = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| StoreError::ConfigRead {
                path: self.path.clone(),
                source,
            })?;

        let decoded = codec::decode(&text);
        tracing::info!(
            path = %self.path.display(),
            rules = decoded.rules.len(),
            rejected = decoded.warnings.len(),
            "Rule file loaded"
        );

        self.rules.store(Arc::new(decoded.rules));
        Ok(decoded.warnings)
    }

    async fn persist_locked(&self) -> Result<(), StoreError> {
        let rules = self.rules.load_full();
        let text = codec::encode(&rules);
        let path = self.path.clone();

        let result = tokio::task::spawn_blocking(move || write_atomic(&path, text.as_bytes()))
            .await
            .unwrap_or_else(|e| Err(io::Error::other(e)));

        result.map_err(|source| StoreError::ConfigWrite {
            path: self.path.clone(),
            source,
        })?;

        tracing::info!(path = %self.path.display(), rules = rules.len(), "Rule file written");
        Ok(())
    }
}
