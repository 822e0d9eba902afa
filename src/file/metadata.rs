//! File record types and repository for sharebox.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{SqliteConnection, SqlitePool};

use crate::{Result, ShareboxError};

/// Column list mapping the `files` table onto [`FileRecord`].
pub(crate) const FILE_COLUMNS: &str = "id, file_name AS logical_name, original_file_name AS original_name, \
     file_size AS size_bytes, content_type, storage_path AS storage_key, \
     uploaded_by_id AS owner_id, uploaded_at AS created_at";

/// Metadata for one uploaded file.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow, Serialize)]
pub struct FileRecord {
    /// Unique file ID.
    pub id: i64,
    /// Stored name (UUID.ext), unique.
    pub logical_name: String,
    /// Name supplied by the uploader, for display only.
    pub original_name: String,
    /// File size in bytes.
    pub size_bytes: i64,
    /// MIME content type.
    pub content_type: String,
    /// Blob location (`{owner_id}/{logical_name}`), unique.
    pub storage_key: String,
    /// User ID of the owner.
    pub owner_id: i64,
    /// When the file was uploaded.
    pub created_at: DateTime<Utc>,
}

/// Data for creating a new file record.
#[derive(Debug, Clone)]
pub struct NewFileRecord {
    /// Stored name (UUID.ext).
    pub logical_name: String,
    /// Name supplied by the uploader.
    pub original_name: String,
    /// File size in bytes.
    pub size_bytes: i64,
    /// MIME content type.
    pub content_type: String,
    /// Blob location.
    pub storage_key: String,
    /// User ID of the owner.
    pub owner_id: i64,
}

impl NewFileRecord {
    /// Create a new NewFileRecord.
    pub fn new(
        owner_id: i64,
        logical_name: impl Into<String>,
        original_name: impl Into<String>,
        size_bytes: i64,
        content_type: impl Into<String>,
    ) -> Self {
        let logical_name = logical_name.into();
        Self {
            storage_key: format!("{owner_id}/{logical_name}"),
            logical_name,
            original_name: original_name.into(),
            size_bytes,
            content_type: content_type.into(),
            owner_id,
        }
    }
}

/// Repository for file records.
pub struct FileRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> FileRepository<'a> {
    /// Create a new FileRepository with the given database pool reference.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a new file record.
    pub async fn create(&self, file: &NewFileRecord) -> Result<FileRecord> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO files (file_name, original_file_name, file_size, content_type,
                                storage_path, uploaded_by_id, uploaded_at)
             VALUES (?, ?, ?, ?, ?, ?, ?) RETURNING id",
        )
        .bind(&file.logical_name)
        .bind(&file.original_name)
        .bind(file.size_bytes)
        .bind(&file.content_type)
        .bind(&file.storage_key)
        .bind(file.owner_id)
        .bind(Utc::now())
        .fetch_one(self.pool)
        .await?;

        self.get_by_id(id)
            .await?
            .ok_or_else(|| ShareboxError::NotFound(format!("file {id}")))
    }

    /// Get a file record by ID.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<FileRecord>> {
        let file = sqlx::query_as::<_, FileRecord>(&format!(
            "SELECT {FILE_COLUMNS} FROM files WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(file)
    }

    /// Get a file record by storage key.
    pub async fn get_by_storage_key(&self, storage_key: &str) -> Result<Option<FileRecord>> {
        let file = sqlx::query_as::<_, FileRecord>(&format!(
            "SELECT {FILE_COLUMNS} FROM files WHERE storage_path = ?"
        ))
        .bind(storage_key)
        .fetch_optional(self.pool)
        .await?;

        Ok(file)
    }

    /// List files owned by a user, newest first.
    pub async fn list_by_owner(&self, owner_id: i64) -> Result<Vec<FileRecord>> {
        let files = sqlx::query_as::<_, FileRecord>(&format!(
            "SELECT {FILE_COLUMNS} FROM files WHERE uploaded_by_id = ?
             ORDER BY uploaded_at DESC, id DESC"
        ))
        .bind(owner_id)
        .fetch_all(self.pool)
        .await?;

        Ok(files)
    }

    /// Delete a file record by ID.
    ///
    /// Fails while share grants still reference the file.
    pub async fn delete(&self, id: i64) -> Result<bool> {
        let mut conn = self.pool.acquire().await?;
        Self::delete_in(&mut conn, id).await
    }

    /// Delete a file record on an existing connection or transaction.
    pub async fn delete_in(conn: &mut SqliteConnection, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM files WHERE id = ?")
            .bind(id)
            .execute(conn)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;

    async fn setup_db() -> Database {
        Database::open_in_memory().await.unwrap()
    }

    fn new_file(owner_id: i64, logical_name: &str, original_name: &str) -> NewFileRecord {
        NewFileRecord::new(owner_id, logical_name, original_name, 1024, "text/plain")
    }

    #[test]
    fn test_new_file_record_builder() {
        let file = NewFileRecord::new(5, "abc.pdf", "report.pdf", 2048, "application/pdf");

        assert_eq!(file.owner_id, 5);
        assert_eq!(file.logical_name, "abc.pdf");
        assert_eq!(file.original_name, "report.pdf");
        assert_eq!(file.storage_key, "5/abc.pdf");
        assert_eq!(file.size_bytes, 2048);
        assert_eq!(file.content_type, "application/pdf");
    }

    #[tokio::test]
    async fn test_create_file() {
        let db = setup_db().await;
        let repo = FileRepository::new(db.pool());

        let file = repo
            .create(&new_file(1, "abc12345.txt", "notes.txt"))
            .await
            .unwrap();

        assert_eq!(file.logical_name, "abc12345.txt");
        assert_eq!(file.original_name, "notes.txt");
        assert_eq!(file.storage_key, "1/abc12345.txt");
        assert_eq!(file.size_bytes, 1024);
        assert_eq!(file.content_type, "text/plain");
        assert_eq!(file.owner_id, 1);
    }

    #[tokio::test]
    async fn test_create_duplicate_storage_key() {
        let db = setup_db().await;
        let repo = FileRepository::new(db.pool());

        repo.create(&new_file(1, "same.txt", "a.txt")).await.unwrap();
        let result = repo.create(&new_file(1, "same.txt", "b.txt")).await;

        assert!(matches!(result, Err(ShareboxError::Database(_))));
    }

    #[tokio::test]
    async fn test_get_by_id_and_storage_key() {
        let db = setup_db().await;
        let repo = FileRepository::new(db.pool());

        let created = repo.create(&new_file(2, "k.txt", "k.txt")).await.unwrap();

        let by_id = repo.get_by_id(created.id).await.unwrap();
        assert_eq!(by_id.as_ref(), Some(&created));

        let by_key = repo.get_by_storage_key("2/k.txt").await.unwrap();
        assert_eq!(by_key.map(|f| f.id), Some(created.id));

        assert!(repo.get_by_id(9999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_by_owner_newest_first() {
        let db = setup_db().await;
        let repo = FileRepository::new(db.pool());

        repo.create(&new_file(1, "one.txt", "first.txt")).await.unwrap();
        repo.create(&new_file(2, "two.txt", "other.txt")).await.unwrap();
        repo.create(&new_file(1, "three.txt", "second.txt")).await.unwrap();

        let files = repo.list_by_owner(1).await.unwrap();
        let names: Vec<_> = files.iter().map(|f| f.original_name.as_str()).collect();
        assert_eq!(names, vec!["second.txt", "first.txt"]);

        assert!(repo.list_by_owner(3).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_file() {
        let db = setup_db().await;
        let repo = FileRepository::new(db.pool());

        let file = repo.create(&new_file(1, "d.txt", "d.txt")).await.unwrap();

        assert!(repo.delete(file.id).await.unwrap());
        assert!(repo.get_by_id(file.id).await.unwrap().is_none());
        assert!(!repo.delete(file.id).await.unwrap());
    }
}
