//! Network layer subsystem.
//!
//! # Design Decisions
//! - TLS is optional and handled by axum-server's rustls acceptor
//! - Certificate problems are fatal at startup

pub mod tls;
