//! Catalog entry repository.

use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use cloudfiles_core::error::{AppError, ErrorKind};
use cloudfiles_core::result::AppResult;
use cloudfiles_entity::entry::{CatalogEntry, NewEntry};

/// Repository for the `cloudfiles` table.
#[derive(Debug, Clone)]
pub struct EntryRepository {
    pool: PgPool,
}

impl EntryRepository {
    /// Create a new entry repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find a live entry by ID.
    pub async fn find_by_id(&self, id: Uuid) -> AppResult<Option<CatalogEntry>> {
        sqlx::query_as::<_, CatalogEntry>(
            "SELECT * FROM cloudfiles WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find entry", e))
    }

    /// List the live children of `parent_id` (`None` = the user's root),
    /// folders first, then by name.
    pub async fn find_children(
        &self,
        user_id: &str,
        parent_id: Option<Uuid>,
    ) -> AppResult<Vec<CatalogEntry>> {
        sqlx::query_as::<_, CatalogEntry>(
            "SELECT * FROM cloudfiles \
             WHERE user_id = $1 AND parent_id IS NOT DISTINCT FROM $2 AND deleted_at IS NULL \
             ORDER BY is_folder DESC, name ASC, id ASC",
        )
        .bind(user_id)
        .bind(parent_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list children", e))
    }

    /// Insert an entry and return its generated ID.
    pub async fn insert(conn: &mut PgConnection, data: &NewEntry) -> AppResult<Uuid> {
        sqlx::query_scalar::<_, Uuid>(
            "INSERT INTO cloudfiles (user_id, name, is_folder, parent_id, online_editable, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, NOW(), NOW()) RETURNING id",
        )
        .bind(&data.user_id)
        .bind(&data.name)
        .bind(data.is_folder)
        .bind(data.parent_id)
        .bind(data.online_editable)
        .fetch_one(conn)
        .await
        .map_err(|e| {
            AppError::with_source(
                ErrorKind::Database,
                format!("Failed to insert entry '{}'", data.name),
                e,
            )
        })
    }

    /// Record where a file's payload lives and how large it is.
    pub async fn set_object(
        conn: &mut PgConnection,
        id: Uuid,
        object_path: Option<&str>,
        size: i64,
        suffix: Option<&str>,
    ) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE cloudfiles SET oss_path = $2, size = $3, file_suffix = $4, updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(object_path)
        .bind(size)
        .bind(suffix)
        .execute(conn)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to update entry", e))?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(format!("Entry {id} not found")));
        }
        Ok(())
    }
}
