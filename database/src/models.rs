use core_types::{ContentUri, DeletionStatus, UploadErrorKind, UploadItemState};
use serde::{Deserialize, Serialize};

/// A persisted deletion queue row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletionItem {
    pub media_id: i64,
    pub content_uri: String,
    pub display_name: Option<String>,
    pub size_bytes: Option<i64>,
    pub date_taken: Option<i64>,
    pub reason: String,
    pub status: DeletionStatus,
    pub is_uploading: bool,
    pub created_at: i64,
    pub last_error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletionRequest {
    pub media_id: i64,
    pub content_uri: String,
    pub display_name: Option<String>,
    pub size_bytes: Option<i64>,
    pub date_taken: Option<i64>,
    pub reason: String,
}

pub struct UploadEnqueueRequest<'a> {
    pub uri: &'a ContentUri,
    pub idempotency_key: &'a str,
    pub photo_id: Option<&'a str>,
    pub display_name: Option<&'a str>,
    pub size: Option<i64>,
}

/// An upload queue row that passed URI validation in `fetch_queued`.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadQueueItem {
    pub id: i64,
    pub photo_id: String,
    pub uri: ContentUri,
    pub idempotency_key: String,
    pub display_name: String,
    pub size: i64,
    pub state: UploadItemState,
    pub created_at: i64,
    pub updated_at: Option<i64>,
    pub last_error_kind: Option<UploadErrorKind>,
    pub last_error_http_code: Option<i64>,
    pub last_error_message: Option<String>,
}

/// Raw upload queue row, URI still unvalidated.
#[derive(Debug, Clone)]
pub(crate) struct UploadItemRow {
    pub id: i64,
    pub photo_id: String,
    pub idempotency_key: String,
    pub uri: String,
    pub display_name: String,
    pub size: i64,
    pub state: UploadItemState,
    pub created_at: i64,
    pub updated_at: Option<i64>,
    pub last_error_kind: Option<UploadErrorKind>,
    pub http_code: Option<i64>,
    pub last_error_message: Option<String>,
}

/// Original media record behind an upload item. `uri` is `None` when the stored value is
/// not a valid content URI.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadSourceInfo {
    pub photo_id: String,
    pub uri: Option<ContentUri>,
    pub size_bytes: Option<i64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UploadQueueStats {
    pub queued: i64,
    pub processing: i64,
    pub succeeded: i64,
    pub failed: i64,
}
