//! OS signal handling.
//!
//! # Responsibilities
//! - SIGTERM/SIGINT → trigger graceful shutdown
//! - SIGHUP → reload the rule file, not shutdown

use std::sync::Arc;

use crate::lifecycle::Shutdown;
use crate::rules::RuleStore;

/// Run until a terminating signal arrives, then trigger `shutdown`.
pub async fn handle_signals(shutdown: Arc<Shutdown>, store: Arc<RuleStore>) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let hangup = signal(SignalKind::hangup());
        let terminate = signal(SignalKind::terminate());

        match (hangup, terminate) {
            (Ok(mut hangup), Ok(mut terminate)) => loop {
                tokio::select! {
                    _ = hangup.recv() => {
                        tracing::info!("SIGHUP received, reloading rule file");
                        if let Err(e) = store.reload().await {
                            tracing::error!("Failed to reload rule file: {}. Keeping current rules.", e);
                        }
                    }
                    _ = terminate.recv() => {
                        tracing::info!("SIGTERM received");
                        break;
                    }
                    _ = tokio::signal::ctrl_c() => {
                        tracing::info!("SIGINT received");
                        break;
                    }
                }
            },
            (Err(e), _) | (_, Err(e)) => {
                tracing::warn!(error = %e, "Unix signal handlers unavailable, only Ctrl+C is handled");
                wait_for_ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = &store;
        wait_for_ctrl_c().await;
    }

    tracing::info!("Shutdown signal received");
    shutdown.trigger();
}

async fn wait_for_ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
}
