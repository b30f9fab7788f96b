//! Authentication session for the PixelForge client.
//!
//! This crate provides:
//! - The session store: sign-in, sign-up, identity fetch, sign-out and
//!   startup resume, all fail-closed
//! - Persistence of the session snapshot through the storage port
//! - A navigation gate derived from the session
//! - The shell watcher that logs out and redirects on any 401

mod error;
mod guard;
mod shell;
mod store;
mod types;

pub use error::{SessionError, SessionResult};
pub use guard::{guard, Navigation, Route, RouteAccess};
pub use shell::{Navigator, UnauthorizedWatcher};
pub use store::SessionStore;
pub use types::{AuthToken, Session, SessionPhase, User};
