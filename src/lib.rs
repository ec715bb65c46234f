//! Web console for the NAT port-forwarding rule file.

pub mod auth;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod rules;
pub mod utils;

pub use config::schema::ConsoleConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use rules::{RuleRecord, RuleStore};
