use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter};

use crate::CoreTypeError;

/// Lifecycle of a deletion queue item. `Pending` is the only non-terminal state.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, Display, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum DeletionStatus {
    #[strum(serialize = "pending")]
    Pending,
    #[strum(serialize = "confirmed")]
    Confirmed,
    #[strum(serialize = "failed")]
    Failed,
    #[strum(serialize = "skipped")]
    Skipped,
}

impl DeletionStatus {
    pub fn as_db_str(&self) -> &'static str {
        match self {
            DeletionStatus::Pending => "pending",
            DeletionStatus::Confirmed => "confirmed",
            DeletionStatus::Failed => "failed",
            DeletionStatus::Skipped => "skipped",
        }
    }

    pub fn from_db_str(value: &str) -> Result<Self, CoreTypeError> {
        match value {
            "pending" => Ok(DeletionStatus::Pending),
            "confirmed" => Ok(DeletionStatus::Confirmed),
            "failed" => Ok(DeletionStatus::Failed),
            "skipped" => Ok(DeletionStatus::Skipped),
            other => Err(CoreTypeError::ConversionError(format!(
                "Failed to convert '{}' to DeletionStatus",
                other
            ))),
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, DeletionStatus::Pending)
    }

    /// Terminal statuses that may be purged after the retention window.
    /// `Failed` is kept for diagnosis.
    pub fn purgeable() -> [DeletionStatus; 2] {
        [DeletionStatus::Confirmed, DeletionStatus::Skipped]
    }
}

#[cfg(test)]
mod tests {
    use super::DeletionStatus;
    use strum::IntoEnumIterator;

    #[test]
    fn test_deletion_status_db_conversion() {
        for status in DeletionStatus::iter() {
            let db_value = status.as_db_str();
            let converted = DeletionStatus::from_db_str(db_value).unwrap();
            assert_eq!(status, converted);
            assert_eq!(status.to_string(), db_value);
        }
    }

    #[test]
    fn test_unknown_status_is_rejected() {
        assert!(DeletionStatus::from_db_str("deleted").is_err());
    }

    #[test]
    fn test_failed_is_not_purgeable() {
        assert!(!DeletionStatus::purgeable().contains(&DeletionStatus::Failed));
        assert!(!DeletionStatus::Pending.is_terminal());
        assert!(DeletionStatus::Failed.is_terminal());
    }
}
