//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! nat-webui.toml (optional)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ConsoleConfig (validated, immutable)
//!
//! Rule file (separate from this config):
//!     watcher.rs detects change
//!     → RuleStore::reload
//! ```
//!
//! # Design Decisions
//! - Service config is immutable once loaded
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, ConfigError};
pub use schema::AuthConfig;
pub use schema::ConsoleConfig;
pub use schema::ListenerConfig;
pub use schema::RulesConfig;
pub use schema::TlsConfig;
