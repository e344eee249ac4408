//! User storage quota repository.

use sqlx::{PgConnection, PgPool};

use cloudfiles_core::error::{AppError, ErrorKind};
use cloudfiles_core::result::AppResult;
use cloudfiles_entity::quota::StorageQuota;

/// Repository for the `user_storage_quota` table.
#[derive(Debug, Clone)]
pub struct QuotaRepository {
    pool: PgPool,
}

impl QuotaRepository {
    /// Create a new quota repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Read a user's quota row.
    pub async fn find_by_user(&self, user_id: &str) -> AppResult<Option<StorageQuota>> {
        sqlx::query_as::<_, StorageQuota>(
            "SELECT user_id, upload_limit, upload_used, updated_at \
             FROM user_storage_quota WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to read quota", e))
    }

    /// Add `bytes` to the user's `upload_used` in a single statement.
    ///
    /// The arithmetic happens on `NUMERIC` inside the database so concurrent
    /// imports for the same user never lose an increment.
    pub async fn increment_upload_used(
        conn: &mut PgConnection,
        user_id: &str,
        bytes: u64,
    ) -> AppResult<()> {
        let bytes = i64::try_from(bytes)
            .map_err(|_| AppError::validation(format!("Byte count {bytes} out of range")))?;

        let result = sqlx::query(
            "UPDATE user_storage_quota \
             SET upload_used = (upload_used::numeric + $1::numeric)::text, updated_at = NOW() \
             WHERE user_id = $2",
        )
        .bind(bytes)
        .bind(user_id)
        .execute(conn)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to update quota", e))?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(format!(
                "Storage quota for user {user_id} not found"
            )));
        }
        Ok(())
    }
}
