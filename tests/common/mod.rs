//! Test helpers for integration tests.
//!
//! Provides TestEnv, which wires a database, blob store, and user directory
//! into a FileService the same way the binary does.

#![allow(dead_code)]

use std::sync::Arc;

use tempfile::TempDir;
use tokio::io::AsyncReadExt;

use sharebox::config::StorageConfig;
use sharebox::db::{NewUser, SqlUserDirectory, UserRepository};
use sharebox::{BlobStore, Database, Download, FileRecord, FileService, UploadRequest};

/// Isolated environment backed by a temporary directory.
pub struct TestEnv {
    pub db: Arc<Database>,
    pub storage: Arc<BlobStore>,
    pub directory: Arc<SqlUserDirectory>,
    temp_dir: TempDir,
}

impl TestEnv {
    /// Environment with an in-memory database.
    pub async fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let db = Database::open_in_memory().await.unwrap();
        Self::assemble(db, temp_dir)
    }

    /// Environment with an on-disk database, for tests that need more than
    /// one pooled connection.
    pub async fn on_disk() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let db = Database::open(temp_dir.path().join("sharebox.db"))
            .await
            .unwrap();
        Self::assemble(db, temp_dir)
    }

    fn assemble(db: Database, temp_dir: TempDir) -> Self {
        let storage = BlobStore::new(temp_dir.path().join("uploads")).unwrap();
        Self {
            directory: Arc::new(SqlUserDirectory::new(db.clone())),
            db: Arc::new(db),
            storage: Arc::new(storage),
            temp_dir,
        }
    }

    /// File service for this environment.
    pub fn service(&self) -> FileService<'_> {
        FileService::new(&self.db, &self.storage, self.directory.as_ref())
    }

    /// File service limited by a storage configuration.
    pub fn service_with_config(&self, config: &StorageConfig) -> FileService<'_> {
        FileService::from_config(&self.db, &self.storage, self.directory.as_ref(), config)
    }

    /// Create a user and return the user ID.
    pub async fn create_user(&self, name: &str) -> i64 {
        UserRepository::new(self.db.pool())
            .create(&NewUser::new(name, format!("{name}@example.com")))
            .await
            .unwrap()
            .id
    }

    /// Upload `content` as `name` on behalf of `owner_id`.
    pub async fn upload(&self, owner_id: i64, name: &str, content: &[u8]) -> FileRecord {
        self.service()
            .upload(
                owner_id,
                UploadRequest::new(name, content.len() as u64, content),
            )
            .await
            .unwrap()
    }

    /// Number of blob entries stored for an owner, including `.part` files.
    pub fn blob_count(&self, owner_id: i64) -> usize {
        std::fs::read_dir(self.storage.base_path().join(owner_id.to_string()))
            .map(|entries| entries.count())
            .unwrap_or(0)
    }
}

/// Read a download to the end.
pub async fn read_all(download: Download) -> Vec<u8> {
    let mut reader = download.reader;
    let mut buf = Vec::new();
    reader.read_to_end(&mut buf).await.unwrap();
    buf
}
