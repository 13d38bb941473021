//! Authentication module: the client-side session state machine.
//!
//! This module provides:
//! - `Session`, `Identity`: the immutable snapshot every view reads
//! - `SessionStore`: the single writer that runs login, signup, logout and
//!   session checks and publishes snapshots
//! - `RouteGuard`: decides whether a route renders, waits or redirects
//! - `AuthBackend`: the network seam the store talks to
//!
//! Identity is never persisted; every run starts unresolved and asks the
//! backend who the session cookie belongs to.

pub mod backend;
pub mod guard;
pub mod session;
pub mod store;

pub use backend::AuthBackend;
pub use guard::{GuardDecision, RouteGuard};
pub use session::{Identity, Session};
pub use store::{SessionError, SessionStore};
