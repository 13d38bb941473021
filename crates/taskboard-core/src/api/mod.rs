//! REST API client module for the taskboard backend.
//!
//! This module provides the `ApiClient` for the auth, project, task and
//! subtask endpoints, and the `ApiError` taxonomy its calls fail with.
//!
//! The backend authenticates with a session cookie established by login or
//! signup; the client keeps it in a cookie jar shared by all clones.

pub mod client;
pub mod error;

pub use client::{ApiClient, ApiResult};
pub use error::ApiError;
