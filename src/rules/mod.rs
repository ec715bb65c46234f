//! NAT rule configuration engine.
//!
//! # Data Flow
//! ```text
//! /etc/nat.conf
//!     → codec.rs (decode: tokenize, validate per kind, warn on bad lines)
//!     → store.rs (RuleStore: Arc snapshot served to handlers)
//!
//! On save:
//!     handler → store.replace_all → store.persist_then_reload
//!     → codec.rs (encode) → temp file + rename → decode again
//! ```
//!
//! # Design Decisions
//! - One injected `RuleStore` per process, shared via `Arc`
//! - Edits and deletes stay in memory until an explicit save
//! - The file is the contract with the packet-forwarding engine

pub mod codec;
pub mod model;
pub mod store;

pub use codec::{decode, encode, encode_line, Decoded, ParseIssue, ParseWarning};
pub use model::{RuleError, RuleKind, RulePatch, RuleRecord};
pub use store::{RuleStore, StoreError};
