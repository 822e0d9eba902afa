//! File storage and sharing for sharebox.
//!
//! This module provides:
//! - Blob storage namespaced per owner, with UUID naming
//! - File record and share grant persistence
//! - The access-controlled service used by every caller-facing operation
//! - Stable serializable projections of files and grants

mod metadata;
mod service;
mod share;
mod storage;
mod view;

pub use metadata::{FileRecord, FileRepository, NewFileRecord};
pub use service::{Download, FileService, SharedFile, UploadRequest};
pub use share::{ShareGrant, ShareRepository};
pub use storage::BlobStore;
pub use view::{FileView, SharedFileView, UserSummary};

/// Maximum length for an original filename (in characters).
pub const MAX_FILENAME_LENGTH: usize = 255;

/// Default maximum file size (100MB).
pub const DEFAULT_MAX_FILE_SIZE: u64 = 100 * 1024 * 1024;

/// Content type used when none is supplied and none can be guessed.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";
