pub mod content_uri;
pub mod deletion_status;
pub mod upload_state;

pub use content_uri::ContentUri;
pub use deletion_status::DeletionStatus;
pub use upload_state::{UploadErrorKind, UploadItemState};

use strum_macros::{Display, EnumIter};

#[derive(Debug, Clone)]
pub enum CoreTypeError {
    ConversionError(String),
    InvalidArgumentType(String),
}

impl std::fmt::Display for CoreTypeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CoreTypeError::ConversionError(msg) => write!(f, "Conversion Error: {}", msg),
            CoreTypeError::InvalidArgumentType(msg) => write!(f, "Invalid Argument Type: {}", msg),
        }
    }
}

impl std::error::Error for CoreTypeError {}

/// Keys of the persisted application settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, Display)]
pub enum SettingName {
    #[strum(serialize = "auto_delete_after_upload")]
    AutoDeleteAfterUpload,
    #[strum(serialize = "wifi_only_uploads")]
    WifiOnlyUploads,
}

impl SettingName {
    pub fn as_str(&self) -> &'static str {
        match self {
            SettingName::AutoDeleteAfterUpload => "auto_delete_after_upload",
            SettingName::WifiOnlyUploads => "wifi_only_uploads",
        }
    }
}
