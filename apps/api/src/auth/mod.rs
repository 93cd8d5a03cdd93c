//! Session resolution and the guards built on top of it.
//!
//! Every route that needs an identity goes through one primitive,
//! [`SessionResolver::resolve`]. API and file routes use
//! [`require_session_or_fail`] and answer with a status code; page routes use
//! [`require_session_or_redirect`] and bounce the browser to the login page.

pub mod guard;
pub mod session;

pub use guard::{require_session_or_fail, require_session_or_redirect, SessionError};
pub use session::{RedisSessionResolver, Session, SessionResolver, UserId};
