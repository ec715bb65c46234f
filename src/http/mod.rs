//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (Axum setup, request ID, trace, limits)
//!     → auth::middleware (session cookie gate)
//!     → handlers.rs (rule API) / pages.rs (embedded HTML)
//!     → error.rs (domain errors → status + JSON message)
//! ```

pub mod body;
pub mod error;
pub mod handlers;
pub mod pages;
pub mod server;

pub use error::{ApiError, MessageBody};
pub use server::{AppState, HttpServer};
