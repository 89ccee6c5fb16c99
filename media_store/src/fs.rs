use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;
use core_types::{ContentUri, content_uri::percent_decode};

use crate::{ConsentAction, ConsentKind, MediaStoreError, ops::MediaStoreOps};

/// Media store backed by the local file system.
///
/// Only `file://` URIs are supported. Read-only files behave like items owned by another
/// app: deleting them needs consent, and [`FileSystemMediaStore::apply_consent`] makes them
/// writable again.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileSystemMediaStore;

impl FileSystemMediaStore {
    pub fn new() -> Self {
        Self
    }

    /// Carry out an approved consent action the way the platform does.
    pub async fn apply_consent(&self, action: &ConsentAction) -> Result<(), MediaStoreError> {
        for raw in &action.uris {
            let uri = ContentUri::parse(raw).map_err(|e| MediaStoreError::Other(e.to_string()))?;
            let path = to_path(&uri)?;
            match action.kind {
                ConsentKind::DeleteRequest => match async_std::fs::remove_file(&path).await {
                    Ok(()) => {}
                    Err(e) if e.kind() == ErrorKind::NotFound => {}
                    Err(e) => return Err(MediaStoreError::Io(e)),
                },
                ConsentKind::RecoverableSecurity => {
                    let metadata = async_std::fs::metadata(&path).await?;
                    let mut permissions = metadata.permissions();
                    #[allow(clippy::permissions_set_readonly_false)]
                    permissions.set_readonly(false);
                    async_std::fs::set_permissions(&path, permissions).await?;
                }
            }
        }
        tracing::debug!(action_id = action.id, items = action.uris.len(), "Consent applied");
        Ok(())
    }
}

fn to_path(uri: &ContentUri) -> Result<PathBuf, MediaStoreError> {
    if uri.scheme() != "file" {
        return Err(MediaStoreError::Other(format!(
            "Unsupported URI scheme: {}",
            uri.scheme()
        )));
    }
    Ok(PathBuf::from(percent_decode(uri.path())))
}

#[async_trait]
impl MediaStoreOps for FileSystemMediaStore {
    async fn delete(&self, uri: &ContentUri) -> Result<i64, MediaStoreError> {
        let path = to_path(uri)?;
        let metadata = match async_std::fs::metadata(&path).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(MediaStoreError::Io(e)),
        };
        if metadata.permissions().readonly() {
            return Err(MediaStoreError::RecoverableSecurity(ConsentAction::new(
                ConsentKind::RecoverableSecurity,
                vec![uri.as_str().to_string()],
            )));
        }
        match async_std::fs::remove_file(&path).await {
            Ok(()) => Ok(1),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(0),
            Err(e) if e.kind() == ErrorKind::PermissionDenied => {
                Err(MediaStoreError::Security(e.to_string()))
            }
            Err(e) => Err(MediaStoreError::Io(e)),
        }
    }

    async fn query_size(&self, uri: &ContentUri) -> Result<Option<i64>, MediaStoreError> {
        let path = to_path(uri)?;
        match async_std::fs::metadata(&path).await {
            Ok(metadata) => Ok(i64::try_from(metadata.len()).ok()),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(MediaStoreError::NotFound(uri.to_string()))
            }
            Err(e) => Err(MediaStoreError::Io(e)),
        }
    }

    async fn exists(&self, uri: &ContentUri) -> Result<bool, MediaStoreError> {
        let path = to_path(uri)?;
        match async_std::fs::metadata(&path).await {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(MediaStoreError::Io(e)),
        }
    }

    async fn create_delete_request(
        &self,
        uris: &[ContentUri],
    ) -> Result<ConsentAction, MediaStoreError> {
        for uri in uris {
            to_path(uri)?;
        }
        Ok(ConsentAction::new(
            ConsentKind::DeleteRequest,
            uris.iter().map(|uri| uri.as_str().to_string()).collect(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use tempfile::tempdir;

    use super::*;

    fn file_uri(path: &Path) -> ContentUri {
        ContentUri::parse(&format!("file://{}", path.display())).unwrap()
    }

    #[async_std::test]
    async fn test_delete_existing_and_missing_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("IMG_0001.jpg");
        std::fs::write(&path, b"12345").unwrap();
        let uri = file_uri(&path);
        let store = FileSystemMediaStore::new();

        assert_eq!(store.query_size(&uri).await.unwrap(), Some(5));
        assert!(store.exists(&uri).await.unwrap());
        assert_eq!(store.delete(&uri).await.unwrap(), 1);
        assert!(!store.exists(&uri).await.unwrap());
        assert_eq!(store.delete(&uri).await.unwrap(), 0);
        assert!(matches!(
            store.query_size(&uri).await,
            Err(MediaStoreError::NotFound(_))
        ));
    }

    #[async_std::test]
    async fn test_read_only_file_requires_consent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("IMG_0002.jpg");
        std::fs::write(&path, b"abc").unwrap();
        let mut permissions = std::fs::metadata(&path).unwrap().permissions();
        permissions.set_readonly(true);
        std::fs::set_permissions(&path, permissions).unwrap();
        let uri = file_uri(&path);
        let store = FileSystemMediaStore::new();

        let action = match store.delete(&uri).await {
            Err(MediaStoreError::RecoverableSecurity(action)) => action,
            other => panic!("expected consent, got {:?}", other),
        };
        assert!(path.exists());

        store.apply_consent(&action).await.unwrap();
        assert_eq!(store.delete(&uri).await.unwrap(), 1);
    }

    #[async_std::test]
    async fn test_approved_delete_request_removes_files() {
        let dir = tempdir().unwrap();
        let first = dir.path().join("a.jpg");
        let second = dir.path().join("b.jpg");
        std::fs::write(&first, b"a").unwrap();
        std::fs::write(&second, b"b").unwrap();
        let store = FileSystemMediaStore::new();

        let action = store
            .create_delete_request(&[file_uri(&first), file_uri(&second)])
            .await
            .unwrap();
        assert_eq!(action.kind, ConsentKind::DeleteRequest);
        assert!(first.exists());

        store.apply_consent(&action).await.unwrap();
        assert!(!first.exists());
        assert!(!second.exists());
    }

    #[async_std::test]
    async fn test_rejects_non_file_uris() {
        let store = FileSystemMediaStore::new();
        let uri = ContentUri::parse("content://media/external/images/media/1").unwrap();
        assert!(matches!(
            store.exists(&uri).await,
            Err(MediaStoreError::Other(_))
        ));
    }
}
