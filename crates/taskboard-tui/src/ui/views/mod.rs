//! Route-specific content rendering.

pub mod auth;
pub mod home;
pub mod project_detail;
pub mod projects;
