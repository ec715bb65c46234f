//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (session gate, tracing, limits, request ID)
//! - Serve over plain TCP or TLS with graceful shutdown

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use axum_server::tls_rustls::RustlsConfig;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::auth::{handlers as auth_handlers, require_session, SessionStore, UserTable};
use crate::config::ConsoleConfig;
use crate::http::{handlers, pages};
use crate::rules::RuleStore;

/// How long in-flight requests get to finish after a shutdown signal.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Session cookie settings.
#[derive(Debug, Clone)]
pub struct CookieSettings {
    pub name: String,
    /// Set the `Secure` attribute (TLS listeners).
    pub secure: bool,
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub rules: Arc<RuleStore>,
    pub users: Arc<UserTable>,
    pub sessions: SessionStore,
    pub cookie: CookieSettings,
}

impl AppState {
    pub fn new(config: &ConsoleConfig, rules: Arc<RuleStore>, users: UserTable) -> Self {
        Self {
            rules,
            users: Arc::new(users),
            sessions: SessionStore::new(Duration::from_secs(config.auth.session_ttl_secs)),
            cookie: CookieSettings {
                name: config.auth.cookie_name.clone(),
                secure: config.listener.tls.is_some(),
            },
        }
    }
}

/// HTTP server for the NAT console.
pub struct HttpServer {
    router: Router,
    config: ConsoleConfig,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration and state.
    pub fn new(config: ConsoleConfig, state: AppState) -> Self {
        let router = Self::build_router(&config, state);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ConsoleConfig, state: AppState) -> Router {
        let protected = Router::new()
            .route("/", get(pages::index))
            .route("/api/me", get(auth_handlers::current_user))
            .route("/api/rules", get(handlers::list_rules))
            .route("/api/rules/preview", get(handlers::preview_rules))
            .route("/edit-rule", post(handlers::edit_rule))
            .route("/delete-rule", post(handlers::delete_rule))
            .route("/save-rules", post(handlers::save_rules))
            .route("/reload-rules", post(handlers::reload_rules))
            .route_layer(middleware::from_fn_with_state(state.clone(), require_session));

        let public = Router::new()
            .route("/login", get(pages::login_page).post(auth_handlers::login))
            .route("/logout", post(auth_handlers::logout))
            .route("/healthz", get(handlers::healthz));

        Router::new()
            .merge(public)
            .merge(protected)
            .with_state(state)
            .layer(RequestBodyLimitLayer::new(config.limits.max_body_bytes))
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(TraceLayer::new_for_http())
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// Serve plain HTTP on `listener` until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Serve HTTPS on `addr` until `shutdown` fires.
    pub async fn run_tls(
        self,
        addr: SocketAddr,
        tls: RustlsConfig,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        tracing::info!(address = %addr, "HTTPS server starting");

        let handle = axum_server::Handle::new();
        let drain = handle.clone();
        tokio::spawn(async move {
            let _ = shutdown.recv().await;
            drain.graceful_shutdown(Some(DRAIN_TIMEOUT));
        });

        axum_server::bind_rustls(addr, tls)
            .handle(handle)
            .serve(self.router.into_make_service())
            .await?;

        tracing::info!("HTTPS server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ConsoleConfig {
        &self.config
    }

    /// The fully layered router, for in-process testing.
    pub fn router(&self) -> Router {
        self.router.clone()
    }
}
