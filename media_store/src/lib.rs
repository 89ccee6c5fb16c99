// The platform media layer as seen by the deletion flow:
// - deleting a media item by URI (row count semantics: >0 deleted, 0 already gone)
// - querying size and existence for verification and freed bytes accounting
// - building a user consent request that deletes a set of items in one prompt
//
// Hosts without a real media store use `fs::FileSystemMediaStore`, which maps `file://`
// URIs onto the local file system.

pub mod fs;
pub mod mock;
pub mod ops;
pub mod permission;
pub mod platform;

use serde::{Deserialize, Serialize};

/// What the user is asked to approve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConsentKind {
    /// A batched delete request: approving it deletes the items.
    DeleteRequest,
    /// Access to items owned by another app: approving it allows a retried delete.
    RecoverableSecurity,
}

/// Opaque handle of a consent prompt. The host launches it and reports the result code back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsentAction {
    pub id: String,
    pub kind: ConsentKind,
    pub uris: Vec<String>,
}

impl ConsentAction {
    pub fn new(kind: ConsentKind, uris: Vec<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            kind,
            uris,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MediaStoreError {
    #[error("User consent required for {}", .0.uris.join(", "))]
    RecoverableSecurity(ConsentAction),

    #[error("Security error: {0}")]
    Security(String),

    #[error("Media item not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(String),
}
