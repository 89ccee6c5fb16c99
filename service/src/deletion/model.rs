use std::{
    collections::BTreeSet,
    ops::{Add, AddAssign},
};

use core_types::ContentUri;
use database::models::DeletionItem;
use media_store::ConsentAction;
use serde::{Deserialize, Serialize};

/// Result code the host reports when the user approved a consent prompt.
pub const RESULT_OK: i32 = -1;
/// Result code the host reports when the user dismissed a consent prompt.
pub const RESULT_CANCELED: i32 = 0;

pub const DEFAULT_CHUNK_SIZE: usize = 200;

/// Cause stored with items the media store could not delete.
pub const DELETE_FAILED_CAUSE: &str = "media_store_delete_failed";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchItem {
    pub item: DeletionItem,
    pub uri: ContentUri,
    pub resolved_size: Option<i64>,
}

/// A group of items behind one consent prompt.
///
/// Serializable so the host can keep it across the prompt, e.g. through process death.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteBatch {
    pub id: String,
    pub index: usize,
    pub items: Vec<BatchItem>,
    pub action: ConsentAction,
    /// Approval only grants access; the items still have to be deleted afterwards.
    pub requires_retry_after_approval: bool,
}

impl DeleteBatch {
    pub fn new(
        index: usize,
        items: Vec<BatchItem>,
        action: ConsentAction,
        requires_retry_after_approval: bool,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            index,
            items,
            action,
            requires_retry_after_approval,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Outcome {
    pub confirmed_count: usize,
    pub failed_count: usize,
    pub skipped_count: usize,
    pub freed_bytes: i64,
}

impl Outcome {
    pub fn has_changes(&self) -> bool {
        self.confirmed_count > 0 || self.failed_count > 0 || self.skipped_count > 0
    }
}

impl Add for Outcome {
    type Output = Outcome;

    fn add(self, other: Outcome) -> Outcome {
        Outcome {
            confirmed_count: self.confirmed_count + other.confirmed_count,
            failed_count: self.failed_count + other.failed_count,
            skipped_count: self.skipped_count + other.skipped_count,
            freed_bytes: self.freed_bytes + other.freed_bytes,
        }
    }
}

impl AddAssign for Outcome {
    fn add_assign(&mut self, other: Outcome) {
        *self = *self + other;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrepareResult {
    NoPending,
    /// The listed permissions must be granted before anything can be deleted
    PermissionRequired(BTreeSet<String>),
    /// Batches waiting for consent, plus what was already resolved without consent
    Ready {
        batches: Vec<DeleteBatch>,
        initial_outcome: Outcome,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchProcessingResult {
    Cancelled,
    Completed(Outcome),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_composition() {
        let mut total = Outcome::default();
        assert!(!total.has_changes());

        total += Outcome {
            confirmed_count: 2,
            freed_bytes: 3_000,
            ..Default::default()
        };
        total += Outcome {
            failed_count: 1,
            skipped_count: 1,
            ..Default::default()
        };
        assert!(total.has_changes());
        assert_eq!(
            total,
            Outcome {
                confirmed_count: 2,
                failed_count: 1,
                skipped_count: 1,
                freed_bytes: 3_000,
            }
        );
        assert!(
            Outcome {
                skipped_count: 1,
                ..Default::default()
            }
            .has_changes()
        );
    }

    #[test]
    fn test_delete_batch_survives_serialization() {
        let item = DeletionItem {
            media_id: 5,
            content_uri: "content://media/external/images/media/5".to_string(),
            display_name: None,
            size_bytes: Some(10),
            date_taken: None,
            reason: "uploaded_cleanup".to_string(),
            status: core_types::DeletionStatus::Pending,
            is_uploading: false,
            created_at: 1,
            last_error: None,
        };
        let uri = ContentUri::parse(&item.content_uri).unwrap();
        let batch = DeleteBatch::new(
            0,
            vec![BatchItem {
                item,
                uri: uri.clone(),
                resolved_size: Some(10),
            }],
            ConsentAction::new(
                media_store::ConsentKind::DeleteRequest,
                vec![uri.to_string()],
            ),
            false,
        );

        let json = serde_json::to_string(&batch).unwrap();
        let restored: DeleteBatch = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, batch);
    }
}
