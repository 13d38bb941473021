//! Utility functions for string formatting and manipulation.

pub mod format;

// Re-export commonly used functions at module level
pub use format::{format_date, pluralize, truncate_string};
