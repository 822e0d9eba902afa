//! Serializable projections of files and shares.
//!
//! Transports render these instead of assembling ad-hoc shapes per call site.
//! The owner summary is embedded only where the caller doesn't already know
//! the owner (shared listings); listings of a caller's own files omit it.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::metadata::FileRecord;
use super::service::SharedFile;
use crate::db::User;

/// Public subset of a user record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: i64,
    pub name: String,
    pub email: String,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
        }
    }
}

/// Public view of a file record. The storage key is never exposed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileView {
    pub id: i64,
    pub file_name: String,
    pub original_file_name: String,
    pub file_size: i64,
    pub content_type: String,
    pub uploaded_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uploaded_by: Option<UserSummary>,
}

impl FileView {
    /// Project a record without owner details.
    pub fn from_record(record: &FileRecord) -> Self {
        Self {
            id: record.id,
            file_name: record.logical_name.clone(),
            original_file_name: record.original_name.clone(),
            file_size: record.size_bytes,
            content_type: record.content_type.clone(),
            uploaded_at: record.created_at,
            uploaded_by: None,
        }
    }

    /// Embed the owner summary.
    pub fn with_owner(mut self, owner: &User) -> Self {
        self.uploaded_by = Some(UserSummary::from(owner));
        self
    }
}

/// Public view of a file shared with the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedFileView {
    /// Grant ID, usable for unsharing.
    pub id: i64,
    pub shared_at: DateTime<Utc>,
    pub shared_by: UserSummary,
    pub file: FileView,
}

impl From<&SharedFile> for SharedFileView {
    fn from(shared: &SharedFile) -> Self {
        Self {
            id: shared.grant.id,
            shared_at: shared.grant.created_at,
            shared_by: UserSummary::from(&shared.granter),
            file: FileView::from_record(&shared.file).with_owner(&shared.granter),
        }
    }
}
