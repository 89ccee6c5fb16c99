use async_trait::async_trait;

use crate::error::Error;

/// Reason recorded with deletion requests created after a successful upload.
pub const UPLOADED_CLEANUP_REASON: &str = "uploaded_cleanup";

/// How the upload finished on the server side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuccessKind {
    /// The server stored the photo with this request
    Uploaded,
    /// The server already had the photo
    AlreadyPresent,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadSuccess {
    pub item_id: i64,
    pub upload_uri: Option<String>,
    pub display_name: Option<String>,
    pub reported_size_bytes: Option<i64>,
    pub http_code: Option<i64>,
    pub success_kind: SuccessKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    SettingsDisabled,
    AlreadyProcessed,
    SourceLookupFailed,
    MissingContentUri,
    MissingMediaId,
    EnqueueDuplicate,
    EnqueueError,
    SettingsError,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CleanupResult {
    Success { media_id: i64, enqueued_count: usize },
    Skipped(SkipReason),
    Failure { reason: SkipReason, error: Error },
}

/// Receives successful uploads from the upload workers.
#[async_trait]
pub trait UploadSuccessListener: Send + Sync {
    async fn on_upload_succeeded(&self, success: UploadSuccess);
}
