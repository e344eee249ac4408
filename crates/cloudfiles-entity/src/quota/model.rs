//! Storage quota entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use cloudfiles_core::{AppError, AppResult};

/// A user's upload quota.
///
/// Both counters are stored as decimal text so that byte counts are not
/// bounded by the database's native integer width.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct StorageQuota {
    /// Owning user.
    pub user_id: String,
    /// Maximum number of bytes the user may upload.
    pub upload_limit: String,
    /// Number of bytes already charged.
    pub upload_used: String,
    /// When the quota was last updated.
    pub updated_at: DateTime<Utc>,
}

impl StorageQuota {
    /// Parsed upload limit.
    pub fn limit_bytes(&self) -> AppResult<u128> {
        parse_counter(&self.user_id, "upload_limit", &self.upload_limit)
    }

    /// Parsed used bytes.
    pub fn used_bytes(&self) -> AppResult<u128> {
        parse_counter(&self.user_id, "upload_used", &self.upload_used)
    }

    /// Bytes still available, zero when the user is at or over the limit.
    pub fn headroom(&self) -> AppResult<u128> {
        Ok(self.limit_bytes()?.saturating_sub(self.used_bytes()?))
    }
}

fn parse_counter(user_id: &str, field: &str, raw: &str) -> AppResult<u128> {
    let trimmed = raw.trim();
    // NUMERIC::text may render a fractional part of zeros
    let integral = trimmed
        .split_once('.')
        .map(|(whole, _)| whole)
        .unwrap_or(trimmed);
    integral.parse::<u128>().map_err(|e| {
        AppError::with_source(
            cloudfiles_core::error::ErrorKind::Database,
            format!("Invalid {field} value '{raw}' for user {user_id}"),
            e,
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quota(limit: &str, used: &str) -> StorageQuota {
        StorageQuota {
            user_id: "u-1".to_string(),
            upload_limit: limit.to_string(),
            upload_used: used.to_string(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_headroom() {
        assert_eq!(quota("100", "40").headroom().unwrap(), 60);
        assert_eq!(quota("100", "100").headroom().unwrap(), 0);
        assert_eq!(quota("100", "140").headroom().unwrap(), 0);
    }

    #[test]
    fn test_wide_values() {
        let q = quota("36893488147419103232", "0");
        assert_eq!(q.limit_bytes().unwrap(), 36_893_488_147_419_103_232u128);
    }

    #[test]
    fn test_numeric_rendering_accepted() {
        assert_eq!(quota("10.00", "2").headroom().unwrap(), 8);
    }

    #[test]
    fn test_malformed_counter_is_database_error() {
        let err = quota("lots", "0").limit_bytes().unwrap_err();
        assert_eq!(err.kind, cloudfiles_core::error::ErrorKind::Database);
    }
}
