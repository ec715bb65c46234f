//! Rule file watcher for hot reload.
//!
//! The NAT engine's rule file can be edited by hand. When watching is
//! enabled, changes to it trigger `RuleStore::reload` so the console never
//! serves a stale view for long.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::{broadcast, mpsc};

use crate::rules::RuleStore;

/// A watcher that monitors the rule file for changes.
pub struct RuleFileWatcher {
    path: PathBuf,
    change_tx: mpsc::UnboundedSender<()>,
}

impl RuleFileWatcher {
    /// Create a new RuleFileWatcher.
    ///
    /// Returns the watcher and a receiver that fires once per change event.
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<()>) {
        let (change_tx, change_rx) = mpsc::unbounded_channel();

        (
            Self {
                path: path.to_path_buf(),
                change_tx,
            },
            change_rx,
        )
    }

    /// Start watching. The returned watcher must be kept alive.
    ///
    /// The parent directory is watched because saves replace the file by
    /// rename, which detaches a watch placed on the file itself.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let tx = self.change_tx.clone();
        let target = self.path.clone();
        let file_name = self.path.file_name().map(|n| n.to_os_string());

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    let relevant = event.kind.is_modify() || event.kind.is_create();
                    let ours = event
                        .paths
                        .iter()
                        .any(|p| p.file_name().map(|n| n.to_os_string()) == file_name);
                    if relevant && ours {
                        tracing::debug!(path = ?target, kind = ?event.kind, "Rule file change detected");
                        let _ = tx.send(());
                    }
                }
                Err(e) => tracing::error!("Watch error: {:?}", e),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        watcher.watch(&dir, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?self.path, "Rule file watcher started");
        Ok(watcher)
    }
}

/// Reload `store` for every change notification until shutdown.
///
/// Bursts of events (write + rename) collapse into one reload.
pub async fn reload_on_change(
    store: Arc<RuleStore>,
    mut changes: mpsc::UnboundedReceiver<()>,
    mut shutdown: broadcast::Receiver<()>,
) {
    loop {
        tokio::select! {
            changed = changes.recv() => {
                if changed.is_none() {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(200)).await;
                while changes.try_recv().is_ok() {}

                match store.reload().await {
                    Ok(warnings) if !warnings.is_empty() => {
                        tracing::warn!(rejected = warnings.len(), "Rule file reloaded with invalid lines");
                    }
                    Ok(_) => {}
                    Err(e) => {
                        tracing::error!("Failed to reload rule file: {}. Keeping current rules.", e);
                    }
                }
            }
            _ = shutdown.recv() => break,
        }
    }
    tracing::debug!("Rule file reload task stopped");
}
