//! Blob storage for sharebox.
//!
//! This module stores raw file bytes on the local filesystem:
//! - One directory per owning user
//! - UUID-based logical names, never reused
//! - Streamed writes that only become visible once complete

use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};

use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tracing::debug;
use uuid::Uuid;

use crate::{Result, ShareboxError};

/// Longest extension kept from an original filename.
const MAX_EXTENSION_LENGTH: usize = 16;

/// Local filesystem blob store.
///
/// Blobs are laid out per owner:
/// ```text
/// {base_path}/
/// ├── 1/
/// │   └── ab12cd34-5678-90ab-cdef-123456789012.pdf
/// ├── 2/
/// │   └── cd90ab12-3456-7890-abcd-ef1234567890.bin
/// └── ...
/// ```
#[derive(Debug, Clone)]
pub struct BlobStore {
    base_path: PathBuf,
}

impl BlobStore {
    /// Create a BlobStore rooted at `base_path`, creating the directory if needed.
    pub fn new(base_path: impl Into<PathBuf>) -> Result<Self> {
        let base_path = base_path.into();
        std::fs::create_dir_all(&base_path)?;

        Ok(Self { base_path })
    }

    /// Get the root directory of this store.
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Generate a fresh logical name: a UUIDv4 plus the sanitized extension
    /// of `original_name`.
    pub fn generate_logical_name(original_name: &str) -> String {
        let uuid = Uuid::new_v4();
        let ext = Self::sanitize_extension(original_name);
        format!("{uuid}.{ext}")
    }

    /// Storage key recorded in file metadata for a blob.
    pub fn storage_key(owner_id: i64, logical_name: &str) -> String {
        format!("{owner_id}/{logical_name}")
    }

    /// Stream `reader` into a new blob and return the number of bytes written.
    ///
    /// Bytes land in a `.part` file that is renamed into place only after
    /// the copy finished and was synced, so a failed or aborted write never
    /// shows up under `logical_name`. With `limit` set, a stream longer than
    /// `limit` bytes is rejected with a validation error.
    pub async fn put<R>(
        &self,
        owner_id: i64,
        logical_name: &str,
        reader: R,
        limit: Option<u64>,
    ) -> Result<u64>
    where
        R: AsyncRead + Unpin + Send,
    {
        let final_path = self.blob_path(owner_id, logical_name)?;
        if fs::try_exists(&final_path).await? {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("blob {} already exists", Self::storage_key(owner_id, logical_name)),
            )
            .into());
        }

        if let Some(parent) = final_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let part_path = Self::part_path(&final_path);
        let written = match Self::write_part(&part_path, reader, limit).await {
            Ok(written) => written,
            Err(e) => {
                let _ = fs::remove_file(&part_path).await;
                return Err(e);
            }
        };

        if let Some(max) = limit {
            if written > max {
                let _ = fs::remove_file(&part_path).await;
                return Err(ShareboxError::Validation(format!(
                    "file exceeds the maximum size of {max} bytes"
                )));
            }
        }

        if let Err(e) = fs::rename(&part_path, &final_path).await {
            let _ = fs::remove_file(&part_path).await;
            return Err(e.into());
        }

        debug!(owner_id, logical_name, written, "stored blob");
        Ok(written)
    }

    /// Open a blob for reading.
    pub async fn open(&self, owner_id: i64, logical_name: &str) -> Result<File> {
        let path = self.blob_path(owner_id, logical_name)?;

        match File::open(&path).await {
            Ok(file) => Ok(file),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(ShareboxError::NotFound(
                format!("blob {}", Self::storage_key(owner_id, logical_name)),
            )),
            Err(e) => Err(e.into()),
        }
    }

    /// Delete a blob.
    ///
    /// Returns `true` if the blob was deleted, `false` if it didn't exist.
    pub async fn delete(&self, owner_id: i64, logical_name: &str) -> Result<bool> {
        let path = self.blob_path(owner_id, logical_name)?;

        match fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Check if a blob exists.
    pub async fn exists(&self, owner_id: i64, logical_name: &str) -> bool {
        match self.blob_path(owner_id, logical_name) {
            Ok(path) => fs::try_exists(&path).await.unwrap_or(false),
            Err(_) => false,
        }
    }

    /// Size of a stored blob in bytes.
    pub async fn size(&self, owner_id: i64, logical_name: &str) -> Result<u64> {
        let path = self.blob_path(owner_id, logical_name)?;

        match fs::metadata(&path).await {
            Ok(m) => Ok(m.len()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(ShareboxError::NotFound(
                format!("blob {}", Self::storage_key(owner_id, logical_name)),
            )),
            Err(e) => Err(e.into()),
        }
    }

    /// Full path of a blob: `{base_path}/{owner_id}/{logical_name}`.
    ///
    /// Logical names are single path components; anything that could
    /// escape the owner directory is rejected.
    fn blob_path(&self, owner_id: i64, logical_name: &str) -> Result<PathBuf> {
        let valid = !logical_name.is_empty()
            && !logical_name.starts_with('.')
            && logical_name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.');
        if !valid {
            return Err(ShareboxError::Validation(format!(
                "invalid logical name: {logical_name:?}"
            )));
        }

        Ok(self
            .base_path
            .join(owner_id.to_string())
            .join(logical_name))
    }

    fn part_path(final_path: &Path) -> PathBuf {
        let mut name = OsString::from(final_path.as_os_str());
        name.push(".part");
        PathBuf::from(name)
    }

    async fn write_part<R>(part_path: &Path, reader: R, limit: Option<u64>) -> Result<u64>
    where
        R: AsyncRead + Unpin + Send,
    {
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(part_path)
            .await?;

        // One byte past the limit is enough to tell an oversized stream apart.
        let written = match limit {
            Some(max) => tokio::io::copy(&mut reader.take(max.saturating_add(1)), &mut file).await?,
            None => {
                let mut reader = reader;
                tokio::io::copy(&mut reader, &mut file).await?
            }
        };

        file.flush().await?;
        file.sync_all().await?;
        Ok(written)
    }

    /// Extension of `filename` restricted to short ASCII alphanumerics.
    ///
    /// Returns "bin" when there is none or it doesn't qualify.
    fn sanitize_extension(filename: &str) -> &str {
        Path::new(filename)
            .extension()
            .and_then(|s| s.to_str())
            .filter(|ext| {
                !ext.is_empty()
                    && ext.len() <= MAX_EXTENSION_LENGTH
                    && ext.chars().all(|c| c.is_ascii_alphanumeric())
            })
            .unwrap_or("bin")
    }
}
