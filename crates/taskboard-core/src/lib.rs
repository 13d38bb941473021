//! Core library for taskboard.
//!
//! Everything a front end needs to talk to the taskboard backend:
//! - `api`: REST client and error taxonomy
//! - `auth`: session store, route guard and the backend seam
//! - `models`: wire types for users, projects, tasks and subtasks
//! - `routes`: the route table
//! - `config`: persisted settings
//!
//! Front ends hold one `Arc<SessionStore<ApiClient>>` and read session
//! snapshots from it; they never write identity state themselves.

pub mod api;
pub mod auth;
pub mod config;
pub mod models;
pub mod routes;
pub mod utils;

pub use api::{ApiClient, ApiError, ApiResult};
pub use auth::{GuardDecision, Identity, RouteGuard, Session, SessionError, SessionStore};
pub use config::Config;
pub use routes::Route;
