//! Cache key builders.
//!
//! These keys are shared with the web application, so they carry no
//! worker-specific prefix.

/// Cache key for a user's recently uploaded files listing.
pub fn recent_files(user_id: &str) -> String {
    format!("recent_files:{user_id}")
}
