//! Share grant types and repository for sharebox.
//!
//! A grant lets `granted_to_id` download a file owned by `granted_by_id`.
//! The `(file_id, granted_by_id, granted_to_id)` triple is unique in the
//! database, so concurrent duplicate shares collapse into one row.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};

use super::metadata::FileRecord;
use crate::Result;

const GRANT_COLUMNS: &str = "id, file_id, shared_by_id AS granted_by_id, \
     shared_with_id AS granted_to_id, shared_at AS created_at";

/// A directed permission to download one file.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow, Serialize)]
pub struct ShareGrant {
    /// Unique grant ID.
    pub id: i64,
    /// Shared file.
    pub file_id: i64,
    /// User who shared the file.
    pub granted_by_id: i64,
    /// User the file was shared with.
    pub granted_to_id: i64,
    /// When the grant was created.
    pub created_at: DateTime<Utc>,
}

/// Repository for share grants.
pub struct ShareRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> ShareRepository<'a> {
    /// Create a new ShareRepository with the given database pool reference.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a grant.
    ///
    /// Returns `None` when an identical grant already exists.
    pub async fn create(
        &self,
        file_id: i64,
        granted_by_id: i64,
        granted_to_id: i64,
    ) -> Result<Option<ShareGrant>> {
        let grant = sqlx::query_as::<_, ShareGrant>(&format!(
            "INSERT INTO shared_files (file_id, shared_by_id, shared_with_id, shared_at)
             VALUES (?, ?, ?, ?)
             ON CONFLICT (file_id, shared_by_id, shared_with_id) DO NOTHING
             RETURNING {GRANT_COLUMNS}"
        ))
        .bind(file_id)
        .bind(granted_by_id)
        .bind(granted_to_id)
        .bind(Utc::now())
        .fetch_optional(self.pool)
        .await?;

        Ok(grant)
    }

    /// Check whether a specific grant exists.
    pub async fn exists(
        &self,
        file_id: i64,
        granted_by_id: i64,
        granted_to_id: i64,
    ) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM shared_files
                           WHERE file_id = ? AND shared_by_id = ? AND shared_with_id = ?)",
        )
        .bind(file_id)
        .bind(granted_by_id)
        .bind(granted_to_id)
        .fetch_one(self.pool)
        .await?;
        Ok(exists)
    }

    /// Check whether `grantee_id` holds any grant on a file.
    pub async fn has_access(&self, file_id: i64, grantee_id: i64) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM shared_files WHERE file_id = ? AND shared_with_id = ?)",
        )
        .bind(file_id)
        .bind(grantee_id)
        .fetch_one(self.pool)
        .await?;
        Ok(exists)
    }

    /// Get a grant by ID.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<ShareGrant>> {
        let grant = sqlx::query_as::<_, ShareGrant>(&format!(
            "SELECT {GRANT_COLUMNS} FROM shared_files WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(grant)
    }

    /// List grants on a file, oldest first.
    pub async fn list_by_file(&self, file_id: i64) -> Result<Vec<ShareGrant>> {
        let grants = sqlx::query_as::<_, ShareGrant>(&format!(
            "SELECT {GRANT_COLUMNS} FROM shared_files WHERE file_id = ? ORDER BY shared_at, id"
        ))
        .bind(file_id)
        .fetch_all(self.pool)
        .await?;

        Ok(grants)
    }

    /// List grants held by `grantee_id` together with their file, newest first.
    ///
    /// The inner join drops any grant whose file row is gone.
    pub async fn list_for_grantee(&self, grantee_id: i64) -> Result<Vec<(ShareGrant, FileRecord)>> {
        let rows = sqlx::query(
            "SELECT s.id AS grant_id, s.file_id, s.shared_by_id, s.shared_with_id, s.shared_at,
                    f.file_name, f.original_file_name, f.file_size, f.content_type,
                    f.storage_path, f.uploaded_by_id, f.uploaded_at
             FROM shared_files s
             INNER JOIN files f ON f.id = s.file_id
             WHERE s.shared_with_id = ?
             ORDER BY s.shared_at DESC, s.id DESC",
        )
        .bind(grantee_id)
        .fetch_all(self.pool)
        .await?;

        let pairs = rows
            .iter()
            .map(Self::map_joined_row)
            .collect::<sqlx::Result<Vec<_>>>()?;
        Ok(pairs)
    }

    /// Delete a grant by ID, only if `grantee_id` holds it.
    pub async fn delete_by_id_for_grantee(&self, id: i64, grantee_id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM shared_files WHERE id = ? AND shared_with_id = ?")
            .bind(id)
            .bind(grantee_id)
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete every grant `grantee_id` holds on a file.
    ///
    /// Returns the number of grants removed.
    pub async fn delete_by_file_for_grantee(&self, file_id: i64, grantee_id: i64) -> Result<u64> {
        let result =
            sqlx::query("DELETE FROM shared_files WHERE file_id = ? AND shared_with_id = ?")
                .bind(file_id)
                .bind(grantee_id)
                .execute(self.pool)
                .await?;
        Ok(result.rows_affected())
    }

    /// Delete every grant on a file, on an existing connection or transaction.
    pub async fn delete_by_file_in(conn: &mut SqliteConnection, file_id: i64) -> Result<u64> {
        let result = sqlx::query("DELETE FROM shared_files WHERE file_id = ?")
            .bind(file_id)
            .execute(conn)
            .await?;
        Ok(result.rows_affected())
    }

    fn map_joined_row(row: &SqliteRow) -> sqlx::Result<(ShareGrant, FileRecord)> {
        let file_id: i64 = row.try_get("file_id")?;

        let grant = ShareGrant {
            id: row.try_get("grant_id")?,
            file_id,
            granted_by_id: row.try_get("shared_by_id")?,
            granted_to_id: row.try_get("shared_with_id")?,
            created_at: row.try_get("shared_at")?,
        };
        let file = FileRecord {
            id: file_id,
            logical_name: row.try_get("file_name")?,
            original_name: row.try_get("original_file_name")?,
            size_bytes: row.try_get("file_size")?,
            content_type: row.try_get("content_type")?,
            storage_key: row.try_get("storage_path")?,
            owner_id: row.try_get("uploaded_by_id")?,
            created_at: row.try_get("uploaded_at")?,
        };

        Ok((grant, file))
    }
}
