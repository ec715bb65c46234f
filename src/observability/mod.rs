//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → tracing events with structured fields
//!     → tower-http trace spans per request, tagged with x-request-id
//!
//! Consumers:
//!     → stdout (compact or JSON)
//! ```

pub mod logging;

pub use logging::init_logging;
