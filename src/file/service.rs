//! File service for sharebox.
//!
//! Every caller-facing operation goes through [`FileService`], which
//! composes the blob store, file records, and share grants and enforces
//! who may do what:
//! - only the owner may share or delete a file
//! - the owner and grantees may download it
//! - only the grantee may drop an incoming grant
//!
//! Ordering rules keep metadata and blobs consistent. Upload writes the
//! blob before the record and removes the blob if anything after that
//! fails. Delete removes grants and record in one transaction before the
//! blob, and never restores the record if blob removal fails.

use std::collections::{HashMap, HashSet};

use futures::future::try_join_all;
use tokio::fs::File;
use tokio::io::AsyncRead;
use tracing::{error, info, warn};

use crate::config::StorageConfig;
use crate::db::{Database, User, UserDirectory};
use crate::{Result, ShareboxError};

use super::metadata::{FileRecord, FileRepository, NewFileRecord};
use super::share::{ShareGrant, ShareRepository};
use super::storage::BlobStore;
use super::{DEFAULT_CONTENT_TYPE, DEFAULT_MAX_FILE_SIZE, MAX_FILENAME_LENGTH};

/// Request data for an upload.
#[derive(Debug)]
pub struct UploadRequest<R> {
    /// Name supplied by the uploader.
    pub original_name: String,
    /// MIME type supplied by the uploader.
    pub content_type: Option<String>,
    /// Size the uploader announced, checked against what arrives.
    pub declared_size: u64,
    /// File content.
    pub reader: R,
}

impl<R> UploadRequest<R> {
    /// Create a new upload request.
    pub fn new(original_name: impl Into<String>, declared_size: u64, reader: R) -> Self {
        Self {
            original_name: original_name.into(),
            content_type: None,
            declared_size,
            reader,
        }
    }

    /// Set the content type.
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

/// A file shared with the caller.
#[derive(Debug, Clone)]
pub struct SharedFile {
    pub grant: ShareGrant,
    pub file: FileRecord,
    pub granter: User,
}

/// An authorized download.
#[derive(Debug)]
pub struct Download {
    /// Metadata of the downloaded file.
    pub file: FileRecord,
    /// Blob content.
    pub reader: File,
}

impl Download {
    /// Content type to serve the bytes with.
    pub fn content_type(&self) -> &str {
        &self.file.content_type
    }

    /// Name to offer the downloader.
    pub fn display_name(&self) -> &str {
        &self.file.original_name
    }
}

/// Access-controlled file operations.
pub struct FileService<'a> {
    db: &'a Database,
    storage: &'a BlobStore,
    directory: &'a dyn UserDirectory,
    max_file_size: u64,
}

impl<'a> FileService<'a> {
    /// Create a new FileService.
    pub fn new(db: &'a Database, storage: &'a BlobStore, directory: &'a dyn UserDirectory) -> Self {
        Self {
            db,
            storage,
            directory,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }

    /// Create a new FileService limited by the storage configuration.
    pub fn from_config(
        db: &'a Database,
        storage: &'a BlobStore,
        directory: &'a dyn UserDirectory,
        config: &StorageConfig,
    ) -> Self {
        Self::new(db, storage, directory).with_max_file_size(config.max_upload_size_bytes())
    }

    /// Create a new FileService with a custom max file size.
    pub fn with_max_file_size(mut self, max_size: u64) -> Self {
        self.max_file_size = max_size;
        self
    }

    /// Get the configured max file size.
    pub fn max_file_size(&self) -> u64 {
        self.max_file_size
    }

    /// Upload a file owned by `caller_id`.
    ///
    /// # Validation
    /// - Caller must exist in the directory
    /// - Original name: non-empty, max 255 characters
    /// - Declared size: non-zero and within the max file size
    ///
    /// The blob is verified against `declared_size` before any record is
    /// written; a mismatch removes the blob and fails with
    /// `StorageWriteIncomplete`.
    pub async fn upload<R>(&self, caller_id: i64, request: UploadRequest<R>) -> Result<FileRecord>
    where
        R: AsyncRead + Unpin + Send,
    {
        self.require_user(caller_id).await?;

        let original_name = request.original_name.trim();
        if original_name.is_empty() {
            return Err(ShareboxError::Validation("file name is empty".to_string()));
        }
        if original_name.chars().count() > MAX_FILENAME_LENGTH {
            return Err(ShareboxError::Validation(format!(
                "file name must be at most {MAX_FILENAME_LENGTH} characters"
            )));
        }
        if request.declared_size == 0 {
            return Err(ShareboxError::Validation("file is empty".to_string()));
        }
        if request.declared_size > self.max_file_size {
            return Err(ShareboxError::Validation(format!(
                "file exceeds the maximum size of {} bytes",
                self.max_file_size
            )));
        }
        let size_bytes = i64::try_from(request.declared_size).map_err(|_| {
            ShareboxError::Validation(format!(
                "file size {} is out of range",
                request.declared_size
            ))
        })?;

        let content_type = resolve_content_type(request.content_type.as_deref(), original_name);
        let logical_name = BlobStore::generate_logical_name(original_name);

        let written = self
            .storage
            .put(caller_id, &logical_name, request.reader, Some(self.max_file_size))
            .await?;

        let stored = match self.storage.size(caller_id, &logical_name).await {
            Ok(stored) => stored,
            Err(e) => {
                self.discard_blob(caller_id, &logical_name).await;
                return Err(e);
            }
        };

        if written != request.declared_size || stored != written {
            warn!(
                owner_id = caller_id,
                logical_name = %logical_name,
                declared = request.declared_size,
                written,
                stored,
                "upload size mismatch, discarding blob"
            );
            self.discard_blob(caller_id, &logical_name).await;
            return Err(ShareboxError::StorageWriteIncomplete {
                expected: request.declared_size,
                written,
            });
        }

        let new_file = NewFileRecord::new(
            caller_id,
            &logical_name,
            original_name,
            size_bytes,
            content_type,
        );

        match FileRepository::new(self.db.pool()).create(&new_file).await {
            Ok(record) => {
                info!(
                    file_id = record.id,
                    owner_id = caller_id,
                    size = record.size_bytes,
                    "file uploaded"
                );
                Ok(record)
            }
            Err(e) => {
                self.discard_blob(caller_id, &logical_name).await;
                Err(e)
            }
        }
    }

    /// List files owned by the caller, newest first.
    pub async fn list_owned(&self, caller_id: i64) -> Result<Vec<FileRecord>> {
        FileRepository::new(self.db.pool())
            .list_by_owner(caller_id)
            .await
    }

    /// List files shared with the caller, newest grant first.
    ///
    /// Grants whose file or granter can no longer be resolved are skipped.
    pub async fn list_shared_with_me(&self, caller_id: i64) -> Result<Vec<SharedFile>> {
        let pairs = ShareRepository::new(self.db.pool())
            .list_for_grantee(caller_id)
            .await?;

        let granter_ids: HashSet<i64> = pairs.iter().map(|(g, _)| g.granted_by_id).collect();
        let granters: HashMap<i64, User> = try_join_all(
            granter_ids
                .into_iter()
                .map(|id| self.directory.get_user(id)),
        )
        .await?
        .into_iter()
        .flatten()
        .map(|user| (user.id, user))
        .collect();

        let shared = pairs
            .into_iter()
            .filter_map(|(grant, file)| match granters.get(&grant.granted_by_id) {
                Some(granter) => Some(SharedFile {
                    grant,
                    file,
                    granter: granter.clone(),
                }),
                None => {
                    warn!(
                        grant_id = grant.id,
                        granted_by_id = grant.granted_by_id,
                        "skipping grant from unknown user"
                    );
                    None
                }
            })
            .collect();

        Ok(shared)
    }

    /// List users the caller could share with.
    pub async fn list_recipients(&self, caller_id: i64) -> Result<Vec<User>> {
        self.require_user(caller_id).await?;
        self.directory.list_users(caller_id).await
    }

    /// Get file metadata if the caller may see it.
    pub async fn get_file(&self, caller_id: i64, file_id: i64) -> Result<FileRecord> {
        let file = self.require_file(file_id).await?;
        self.require_read_access(&file, caller_id).await?;
        Ok(file)
    }

    /// Share a file with other users.
    ///
    /// Targets are deduplicated; the caller and users who already hold a
    /// grant are skipped. Every target must exist before anything is
    /// written.
    ///
    /// # Returns
    /// The number of grants created, which may be lower than the number
    /// of targets.
    pub async fn share(&self, caller_id: i64, file_id: i64, target_ids: &[i64]) -> Result<usize> {
        if target_ids.is_empty() {
            return Err(ShareboxError::Validation(
                "select at least one user to share with".to_string(),
            ));
        }

        let file = self.require_file(file_id).await?;
        if file.owner_id != caller_id {
            return Err(ShareboxError::Forbidden(
                "only the owner can share this file".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        let targets: Vec<i64> = target_ids
            .iter()
            .copied()
            .filter(|&id| id != caller_id && seen.insert(id))
            .collect();

        for &target_id in &targets {
            if self.directory.get_user(target_id).await?.is_none() {
                return Err(ShareboxError::UserNotFound(target_id));
            }
        }

        let repo = ShareRepository::new(self.db.pool());
        let mut created = 0;
        for target_id in targets {
            if repo.exists(file_id, caller_id, target_id).await? {
                continue;
            }
            match repo.create(file_id, caller_id, target_id).await {
                Ok(Some(_)) => created += 1,
                // Lost a race against an identical share
                Ok(None) => {}
                Err(e) => {
                    // The file may have been deleted since the ownership check.
                    if FileRepository::new(self.db.pool())
                        .get_by_id(file_id)
                        .await?
                        .is_none()
                    {
                        return Err(ShareboxError::NotFound(format!("file {file_id}")));
                    }
                    return Err(e);
                }
            }
        }

        info!(file_id, owner_id = caller_id, created, "file shared");
        Ok(created)
    }

    /// Remove a grant held by the caller.
    ///
    /// `grant_or_file_id` is tried as a grant ID first, then as the ID of a
    /// file shared with the caller.
    pub async fn unshare(&self, caller_id: i64, grant_or_file_id: i64) -> Result<()> {
        let repo = ShareRepository::new(self.db.pool());

        if repo
            .delete_by_id_for_grantee(grant_or_file_id, caller_id)
            .await?
        {
            info!(grant_id = grant_or_file_id, grantee_id = caller_id, "grant removed");
            return Ok(());
        }

        let removed = repo
            .delete_by_file_for_grantee(grant_or_file_id, caller_id)
            .await?;
        if removed == 0 {
            return Err(ShareboxError::NotFound("share".to_string()));
        }

        info!(file_id = grant_or_file_id, grantee_id = caller_id, "grant removed");
        Ok(())
    }

    /// Open a file for download.
    ///
    /// # Permission Check
    /// Caller must own the file or hold a grant on it.
    pub async fn download(&self, caller_id: i64, file_id: i64) -> Result<Download> {
        let file = self.require_file(file_id).await?;
        self.require_read_access(&file, caller_id).await?;

        match self.storage.open(file.owner_id, &file.logical_name).await {
            Ok(reader) => Ok(Download { file, reader }),
            Err(ShareboxError::NotFound(_)) => {
                // A concurrent delete removes the record before the blob.
                if FileRepository::new(self.db.pool())
                    .get_by_id(file_id)
                    .await?
                    .is_none()
                {
                    return Err(ShareboxError::NotFound(format!("file {file_id}")));
                }
                error!(
                    file_id,
                    storage_key = %file.storage_key,
                    "file record points at a missing blob"
                );
                Err(ShareboxError::StorageMissing(file.storage_key))
            }
            Err(e) => Err(e),
        }
    }

    /// Delete a file, its grants, and its blob.
    ///
    /// # Permission Check
    /// Only the owner can delete.
    pub async fn delete(&self, caller_id: i64, file_id: i64) -> Result<()> {
        let file = self.require_file(file_id).await?;
        if file.owner_id != caller_id {
            return Err(ShareboxError::Forbidden(
                "only the owner can delete this file".to_string(),
            ));
        }

        let mut tx = self.db.begin().await?;
        let grants = ShareRepository::delete_by_file_in(&mut tx, file_id).await?;
        if !FileRepository::delete_in(&mut tx, file_id).await? {
            // Deleted concurrently; dropping the transaction rolls back.
            return Err(ShareboxError::NotFound(format!("file {file_id}")));
        }
        tx.commit().await?;

        match self.storage.delete(file.owner_id, &file.logical_name).await {
            Ok(true) => {}
            Ok(false) => warn!(
                file_id,
                storage_key = %file.storage_key,
                "blob was already gone at delete"
            ),
            Err(e) => warn!(
                file_id,
                storage_key = %file.storage_key,
                error = %e,
                "failed to delete blob, storage leaked"
            ),
        }

        info!(file_id, owner_id = caller_id, grants, "file deleted");
        Ok(())
    }

    async fn require_user(&self, user_id: i64) -> Result<User> {
        self.directory
            .get_user(user_id)
            .await?
            .ok_or(ShareboxError::UserNotFound(user_id))
    }

    async fn require_file(&self, file_id: i64) -> Result<FileRecord> {
        FileRepository::new(self.db.pool())
            .get_by_id(file_id)
            .await?
            .ok_or_else(|| ShareboxError::NotFound(format!("file {file_id}")))
    }

    async fn require_read_access(&self, file: &FileRecord, caller_id: i64) -> Result<()> {
        if file.owner_id == caller_id {
            return Ok(());
        }
        if ShareRepository::new(self.db.pool())
            .has_access(file.id, caller_id)
            .await?
        {
            return Ok(());
        }
        // Grants vanish with the file; report a concurrent delete as such.
        if FileRepository::new(self.db.pool())
            .get_by_id(file.id)
            .await?
            .is_none()
        {
            return Err(ShareboxError::NotFound(format!("file {}", file.id)));
        }
        Err(ShareboxError::Forbidden(
            "you don't have access to this file".to_string(),
        ))
    }

    /// Best-effort blob removal; failures are logged, never returned.
    async fn discard_blob(&self, owner_id: i64, logical_name: &str) {
        if let Err(e) = self.storage.delete(owner_id, logical_name).await {
            warn!(
                owner_id,
                logical_name,
                error = %e,
                "failed to clean up blob"
            );
        }
    }
}

/// Caller-supplied type if non-empty, else a guess from the name.
fn resolve_content_type(supplied: Option<&str>, original_name: &str) -> String {
    match supplied.map(str::trim).filter(|s| !s.is_empty()) {
        Some(content_type) => content_type.to_string(),
        None => mime_guess::from_path(original_name)
            .first_raw()
            .unwrap_or(DEFAULT_CONTENT_TYPE)
            .to_string(),
    }
}
