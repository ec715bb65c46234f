//! Startup orchestration.
//!
//! # Responsibilities
//! - Load the password file and the rule file
//! - Start background tasks (file watcher, session sweeper, signals)
//! - Bind the listener and begin accepting traffic
//!
//! # Design Decisions
//! - Fail fast on an unreadable password file or bad certificates
//! - An unreadable rule file is logged and the console starts empty
//! - Listeners start last (traffic only when ready)

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::net::TcpListener;

use crate::auth::session::purge_periodically;
use crate::auth::{AuthError, UserTable};
use crate::config::watcher::{reload_on_change, RuleFileWatcher};
use crate::config::ConsoleConfig;
use crate::http::{AppState, HttpServer};
use crate::lifecycle::signals::handle_signals;
use crate::lifecycle::Shutdown;
use crate::net::tls::load_tls_config;
use crate::rules::RuleStore;

const SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(600);

/// Fatal startup failures.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("invalid bind address {0:?}")]
    BindAddress(String),

    #[error("rule file watcher: {0}")]
    Watch(#[from] notify::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Bring the console up and serve until a shutdown signal.
pub async fn run(config: ConsoleConfig) -> Result<(), StartupError> {
    let users = UserTable::load(&config.auth.passwd_path)?;
    if users.is_empty() {
        tracing::warn!(
            path = %config.auth.passwd_path.display(),
            "Password file has no users; nobody can log in"
        );
    }

    let store = Arc::new(RuleStore::new(&config.rules.path));
    if let Err(e) = store.reload().await {
        tracing::error!("{}. Starting with an empty rule set.", e);
    }

    let addr: SocketAddr = config
        .listener
        .bind_address
        .parse()
        .map_err(|_| StartupError::BindAddress(config.listener.bind_address.clone()))?;

    let shutdown = Arc::new(Shutdown::new());
    let state = AppState::new(&config, store.clone(), users);

    // Held for the lifetime of the server; dropping it stops the watch.
    let _watcher = if config.rules.watch {
        let (watcher, changes) = RuleFileWatcher::new(&config.rules.path);
        let watcher = watcher.run()?;
        tokio::spawn(reload_on_change(store.clone(), changes, shutdown.subscribe()));
        Some(watcher)
    } else {
        None
    };

    tokio::spawn(purge_periodically(
        state.sessions.clone(),
        SESSION_SWEEP_INTERVAL,
        shutdown.subscribe(),
    ));

    let server_shutdown = shutdown.subscribe();
    tokio::spawn(handle_signals(shutdown.clone(), store.clone()));

    let tls = config.listener.tls.clone();
    let server = HttpServer::new(config, state);

    match tls {
        Some(tls) => {
            let rustls = load_tls_config(&tls).await?;
            server.run_tls(addr, rustls, server_shutdown).await?;
        }
        None => {
            let listener = TcpListener::bind(addr).await?;
            tracing::info!(address = %listener.local_addr()?, "Listening for connections");
            server.run(listener, server_shutdown).await?;
        }
    }

    Ok(())
}
