use std::fmt::{Display, Formatter, Result};

#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    DbError(String),
    SettingsError(String),
    MediaStoreError(String),
    SchedulerError(String),
    UploadError(String),
    IoError(String),
    PermissionDenied(String),
    OperationCancelled,
    InvalidInput(String),
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        match self {
            Error::DbError(message) => write!(f, "Database error: {}", message),
            Error::SettingsError(message) => write!(f, "Settings error: {}", message),
            Error::MediaStoreError(message) => write!(f, "Media store error: {}", message),
            Error::SchedulerError(message) => write!(f, "Scheduler error: {}", message),
            Error::UploadError(message) => write!(f, "Upload error: {}", message),
            Error::IoError(message) => write!(f, "IO error: {}", message),
            Error::PermissionDenied(permission) => write!(f, "Permission denied: {}", permission),
            Error::OperationCancelled => write!(f, "Operation was cancelled"),
            Error::InvalidInput(message) => write!(f, "Invalid input: {}", message),
        }
    }
}

impl std::error::Error for Error {}

impl From<database::database_error::DatabaseError> for Error {
    fn from(err: database::database_error::DatabaseError) -> Self {
        Error::DbError(err.to_string())
    }
}

impl From<media_store::MediaStoreError> for Error {
    fn from(err: media_store::MediaStoreError) -> Self {
        Error::MediaStoreError(err.to_string())
    }
}

impl From<work_scheduler::WorkSchedulerError> for Error {
    fn from(err: work_scheduler::WorkSchedulerError) -> Self {
        Error::SchedulerError(err.to_string())
    }
}

impl From<crate::upload::task_runner::UploadError> for Error {
    fn from(err: crate::upload::task_runner::UploadError) -> Self {
        Error::UploadError(err.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::IoError(err.to_string())
    }
}
