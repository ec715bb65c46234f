//! Cookie authentication gate.
//!
//! # Data Flow
//! ```text
//! POST /login (form)
//!     → users.rs (bcrypt check against passwd.md)
//!     → session.rs (issue random token)
//!     → Set-Cookie
//!
//! Later requests
//!     → middleware.rs (cookie → session → AuthUser extension)
//!     → handlers
//! ```

pub mod handlers;
pub mod middleware;
pub mod session;
pub mod users;

pub use middleware::{require_session, AuthUser};
pub use session::SessionStore;
pub use users::{AuthError, UserTable};
