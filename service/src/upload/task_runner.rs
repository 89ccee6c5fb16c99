use async_trait::async_trait;
use core_types::{ContentUri, UploadErrorKind};
use thiserror::Error;

use crate::upload_cleanup::model::SuccessKind;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadTaskParams {
    pub uri: ContentUri,
    pub idempotency_key: String,
    pub display_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadTaskResult {
    Success {
        http_code: Option<i64>,
        bytes_sent: Option<i64>,
        success_kind: SuccessKind,
    },
    Failure {
        error_kind: UploadErrorKind,
        http_code: Option<i64>,
        retryable: bool,
        message: Option<String>,
    },
}

impl UploadTaskResult {
    /// Failure for a final HTTP status that was not a success.
    pub fn http_failure(code: u16) -> Self {
        UploadTaskResult::Failure {
            error_kind: UploadErrorKind::Http,
            http_code: Some(i64::from(code)),
            retryable: classify_http_status(code) == HttpDisposition::Retryable,
            message: None,
        }
    }
}

/// Errors a task runner raises instead of returning a structured failure.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Could not resolve host: {0}")]
    HostResolution(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: status {0}")]
    Http(u16),

    #[error("Remote processing failed: {0}")]
    RemoteFailure(String),

    #[error("Upload failed: {0}")]
    Other(String),
}

/// How the upload endpoint's status code is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpDisposition {
    /// The photo is stored
    Completed,
    /// Accepted for processing or already known, poll for the final state
    Poll,
    Fatal,
    Retryable,
}

pub fn classify_http_status(code: u16) -> HttpDisposition {
    match code {
        202 | 409 => HttpDisposition::Poll,
        200..=299 => HttpDisposition::Completed,
        413 | 415 => HttpDisposition::Fatal,
        429 | 500..=599 => HttpDisposition::Retryable,
        _ => HttpDisposition::Fatal,
    }
}

pub fn classify_error(error: &UploadError) -> UploadErrorKind {
    match error {
        UploadError::HostResolution(_) => UploadErrorKind::Network,
        UploadError::Io(_) => UploadErrorKind::Io,
        _ => UploadErrorKind::Unexpected,
    }
}

/// Converts an error raised by a runner into a structured failure.
pub fn failure_from_error(error: &UploadError) -> UploadTaskResult {
    let error_kind = classify_error(error);
    let http_code = match error {
        UploadError::Http(code) => Some(i64::from(*code)),
        _ => None,
    };
    UploadTaskResult::Failure {
        error_kind,
        http_code,
        retryable: error_kind.is_retryable(),
        message: Some(error.to_string()),
    }
}

/// Uploads one photo, including waiting for the server to finish processing it.
#[async_trait]
pub trait UploadTaskRunner: Send + Sync {
    async fn run(&self, params: UploadTaskParams) -> Result<UploadTaskResult, UploadError>;
}

#[cfg(test)]
pub mod mock {
    use std::{
        collections::HashMap,
        sync::{Arc, Mutex},
    };

    use super::*;

    #[derive(Debug)]
    pub enum MockResponse {
        Status(u16),
        Error(fn() -> UploadError),
    }

    #[derive(Default)]
    struct MockState {
        responses: HashMap<String, MockResponse>,
        runs: Vec<UploadTaskParams>,
    }

    /// Answers every URI with 200 unless told otherwise.
    #[derive(Clone, Default)]
    pub struct MockUploadTaskRunner {
        state: Arc<Mutex<MockState>>,
    }

    impl MockUploadTaskRunner {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn respond_with(&self, uri: &str, response: MockResponse) {
            let mut state = self.state.lock().unwrap();
            state.responses.insert(uri.to_string(), response);
        }

        pub fn runs(&self) -> Vec<UploadTaskParams> {
            self.state.lock().unwrap().runs.clone()
        }
    }

    #[async_trait]
    impl UploadTaskRunner for MockUploadTaskRunner {
        async fn run(&self, params: UploadTaskParams) -> Result<UploadTaskResult, UploadError> {
            let mut state = self.state.lock().unwrap();
            let response = match state.responses.get(params.uri.as_str()) {
                Some(MockResponse::Error(make)) => Err(make()),
                Some(MockResponse::Status(code)) => Ok(*code),
                None => Ok(200),
            };
            state.runs.push(params);
            let code = response?;
            Ok(match classify_http_status(code) {
                HttpDisposition::Completed => UploadTaskResult::Success {
                    http_code: Some(i64::from(code)),
                    bytes_sent: None,
                    success_kind: SuccessKind::Uploaded,
                },
                HttpDisposition::Poll => UploadTaskResult::Success {
                    http_code: Some(i64::from(code)),
                    bytes_sent: None,
                    success_kind: if code == 409 {
                        SuccessKind::AlreadyPresent
                    } else {
                        SuccessKind::Uploaded
                    },
                },
                HttpDisposition::Fatal | HttpDisposition::Retryable => {
                    UploadTaskResult::http_failure(code)
                }
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_http_status() {
        assert_eq!(classify_http_status(200), HttpDisposition::Completed);
        assert_eq!(classify_http_status(201), HttpDisposition::Completed);
        assert_eq!(classify_http_status(202), HttpDisposition::Poll);
        assert_eq!(classify_http_status(409), HttpDisposition::Poll);
        assert_eq!(classify_http_status(413), HttpDisposition::Fatal);
        assert_eq!(classify_http_status(415), HttpDisposition::Fatal);
        assert_eq!(classify_http_status(429), HttpDisposition::Retryable);
        assert_eq!(classify_http_status(503), HttpDisposition::Retryable);
        assert_eq!(classify_http_status(404), HttpDisposition::Fatal);
    }

    #[test]
    fn test_http_failure_retryability() {
        assert!(matches!(
            UploadTaskResult::http_failure(500),
            UploadTaskResult::Failure {
                error_kind: UploadErrorKind::Http,
                http_code: Some(500),
                retryable: true,
                ..
            }
        ));
        assert!(matches!(
            UploadTaskResult::http_failure(413),
            UploadTaskResult::Failure {
                retryable: false,
                ..
            }
        ));
    }

    #[test]
    fn test_error_classification() {
        let host = UploadError::HostResolution("api.example.org".to_string());
        assert_eq!(classify_error(&host), UploadErrorKind::Network);

        let io = UploadError::from(std::io::Error::other("broken pipe"));
        assert_eq!(classify_error(&io), UploadErrorKind::Io);

        let other = UploadError::Other("boom".to_string());
        assert_eq!(classify_error(&other), UploadErrorKind::Unexpected);

        match failure_from_error(&io) {
            UploadTaskResult::Failure {
                retryable, message, ..
            } => {
                assert!(retryable);
                assert!(message.unwrap().contains("broken pipe"));
            }
            other => panic!("unexpected result {:?}", other),
        }
        assert!(matches!(
            failure_from_error(&other),
            UploadTaskResult::Failure {
                retryable: false,
                ..
            }
        ));
    }
}
