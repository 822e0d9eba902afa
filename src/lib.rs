//! sharebox - multi-user file storage and sharing
//!
//! Users upload files into a blob store, share them with other users, and
//! download what they own or what was shared with them. All operations go
//! through [`FileService`], which checks ownership and grants before
//! touching metadata or blobs.

pub mod config;
pub mod db;
pub mod error;
pub mod file;
pub mod logging;

pub use config::Config;
pub use db::{Database, NewUser, SqlUserDirectory, User, UserDirectory, UserRepository};
pub use error::{Result, ShareboxError};
pub use file::{
    BlobStore, Download, FileRecord, FileService, FileView, ShareGrant, SharedFile,
    SharedFileView, UploadRequest, UserSummary,
};
