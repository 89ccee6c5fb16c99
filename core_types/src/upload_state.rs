use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter};

use crate::CoreTypeError;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, Display, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum UploadItemState {
    #[strum(serialize = "queued")]
    Queued,
    #[strum(serialize = "processing")]
    Processing,
    #[strum(serialize = "succeeded")]
    Succeeded,
    #[strum(serialize = "failed")]
    Failed,
    #[strum(serialize = "cancelled")]
    Cancelled,
}

impl UploadItemState {
    pub fn as_db_str(&self) -> &'static str {
        match self {
            UploadItemState::Queued => "queued",
            UploadItemState::Processing => "processing",
            UploadItemState::Succeeded => "succeeded",
            UploadItemState::Failed => "failed",
            UploadItemState::Cancelled => "cancelled",
        }
    }

    pub fn from_db_str(value: &str) -> Result<Self, CoreTypeError> {
        match value {
            "queued" => Ok(UploadItemState::Queued),
            "processing" => Ok(UploadItemState::Processing),
            "succeeded" => Ok(UploadItemState::Succeeded),
            "failed" => Ok(UploadItemState::Failed),
            "cancelled" => Ok(UploadItemState::Cancelled),
            other => Err(CoreTypeError::ConversionError(format!(
                "Failed to convert '{}' to UploadItemState",
                other
            ))),
        }
    }
}

/// Classification of an upload failure. `Network` and `Io` are retryable.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, Display, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum UploadErrorKind {
    #[strum(serialize = "network")]
    Network,
    #[strum(serialize = "io")]
    Io,
    #[strum(serialize = "http")]
    Http,
    #[strum(serialize = "remote_failure")]
    RemoteFailure,
    #[strum(serialize = "unexpected")]
    Unexpected,
}

impl UploadErrorKind {
    pub fn as_db_str(&self) -> &'static str {
        match self {
            UploadErrorKind::Network => "network",
            UploadErrorKind::Io => "io",
            UploadErrorKind::Http => "http",
            UploadErrorKind::RemoteFailure => "remote_failure",
            UploadErrorKind::Unexpected => "unexpected",
        }
    }

    pub fn from_db_str(value: &str) -> Result<Self, CoreTypeError> {
        match value {
            "network" => Ok(UploadErrorKind::Network),
            "io" => Ok(UploadErrorKind::Io),
            "http" => Ok(UploadErrorKind::Http),
            "remote_failure" => Ok(UploadErrorKind::RemoteFailure),
            "unexpected" => Ok(UploadErrorKind::Unexpected),
            other => Err(CoreTypeError::ConversionError(format!(
                "Failed to convert '{}' to UploadErrorKind",
                other
            ))),
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, UploadErrorKind::Network | UploadErrorKind::Io)
    }
}
