//! Online-editable content repository.

use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use cloudfiles_core::error::{AppError, ErrorKind};
use cloudfiles_core::result::AppResult;
use cloudfiles_entity::entry::ContentBlob;

/// Repository for the `filecontent` table.
#[derive(Debug, Clone)]
pub struct ContentRepository {
    pool: PgPool,
}

impl ContentRepository {
    /// Create a new content repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Fetch the live content of an entry owned by `user_id`.
    pub async fn find_by_entry(
        &self,
        entry_id: Uuid,
        user_id: &str,
    ) -> AppResult<Option<ContentBlob>> {
        sqlx::query_as::<_, ContentBlob>(
            "SELECT * FROM filecontent WHERE id = $1 AND user_id = $2 AND deleted_at IS NULL",
        )
        .bind(entry_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to fetch content", e))
    }

    /// Insert the content row of an online-editable entry.
    pub async fn insert(
        conn: &mut PgConnection,
        entry_id: Uuid,
        user_id: &str,
        name: &str,
        suffix: Option<&str>,
        content: &str,
    ) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO filecontent (id, user_id, name, file_suffix, content, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, NOW(), NOW())",
        )
        .bind(entry_id)
        .bind(user_id)
        .bind(name)
        .bind(suffix)
        .bind(content)
        .execute(conn)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to insert content", e))?;
        Ok(())
    }
}
