use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use core_types::ContentUri;

use crate::{ConsentAction, ConsentKind, MediaStoreError, ops::MediaStoreOps};

/// Internal state for MockMediaStore.
///
/// Groups all mutable state into a single struct for simplified locking.
#[derive(Default)]
struct MockState {
    /// Items present in the store (uri -> size in bytes)
    items: HashMap<String, Option<i64>>,
    /// Uris passed to delete, in call order
    delete_calls: Vec<String>,
    /// Uris that were actually removed
    deleted: HashSet<String>,
    /// Uris that need user consent before they can be deleted
    needs_consent: HashSet<String>,
    /// Uris whose delete fails with a non recoverable security error
    security_denied: HashSet<String>,
    /// Fixed row counts returned by delete
    delete_results: HashMap<String, i64>,
    /// Uris whose size query fails
    fail_size: HashSet<String>,
    /// Uris whose existence check fails
    fail_exists: HashSet<String>,
    /// Uri lists of every created delete request
    delete_requests: Vec<Vec<String>>,
    fail_delete_request: bool,
}

/// Mock implementation of MediaStoreOps for testing
///
/// This mock allows you to:
/// - Seed media items with sizes
/// - Simulate consent, security and IO failures per item
/// - Approve consent actions the way the platform would
/// - Verify what operations were performed
#[derive(Clone, Default)]
pub struct MockMediaStore {
    state: Arc<Mutex<MockState>>,
}

impl MockMediaStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an item that exists in the store
    pub fn add_item(&self, uri: &str, size: Option<i64>) {
        let mut state = self.state.lock().unwrap();
        state.items.insert(uri.to_string(), size);
    }

    /// Make delete of `uri` require consent until approved
    pub fn require_consent_for(&self, uri: &str) {
        let mut state = self.state.lock().unwrap();
        state.needs_consent.insert(uri.to_string());
    }

    /// Make delete of `uri` fail with a security error
    pub fn deny_delete_for(&self, uri: &str) {
        let mut state = self.state.lock().unwrap();
        state.security_denied.insert(uri.to_string());
    }

    /// Make delete of `uri` return `rows` without touching the item
    pub fn set_delete_result(&self, uri: &str, rows: i64) {
        let mut state = self.state.lock().unwrap();
        state.delete_results.insert(uri.to_string(), rows);
    }

    pub fn fail_size_for(&self, uri: &str) {
        let mut state = self.state.lock().unwrap();
        state.fail_size.insert(uri.to_string());
    }

    pub fn fail_exists_for(&self, uri: &str) {
        let mut state = self.state.lock().unwrap();
        state.fail_exists.insert(uri.to_string());
    }

    pub fn fail_delete_requests(&self) {
        let mut state = self.state.lock().unwrap();
        state.fail_delete_request = true;
    }

    /// Simulate the user approving `action`.
    ///
    /// A delete request removes its items. A recoverable security prompt only grants access.
    pub fn approve(&self, action: &ConsentAction) {
        let mut state = self.state.lock().unwrap();
        for uri in &action.uris {
            match action.kind {
                ConsentKind::DeleteRequest => {
                    if state.items.remove(uri).is_some() {
                        state.deleted.insert(uri.clone());
                    }
                }
                ConsentKind::RecoverableSecurity => {
                    state.needs_consent.remove(uri);
                }
            }
        }
    }

    /// Remove an item behind the caller's back
    pub fn remove_item(&self, uri: &str) {
        let mut state = self.state.lock().unwrap();
        state.items.remove(uri);
    }

    pub fn contains(&self, uri: &str) -> bool {
        let state = self.state.lock().unwrap();
        state.items.contains_key(uri)
    }

    pub fn was_deleted(&self, uri: &str) -> bool {
        let state = self.state.lock().unwrap();
        state.deleted.contains(uri)
    }

    pub fn delete_calls(&self) -> Vec<String> {
        let state = self.state.lock().unwrap();
        state.delete_calls.clone()
    }

    pub fn delete_call_count(&self) -> usize {
        let state = self.state.lock().unwrap();
        state.delete_calls.len()
    }

    pub fn delete_requests(&self) -> Vec<Vec<String>> {
        let state = self.state.lock().unwrap();
        state.delete_requests.clone()
    }
}

#[async_trait]
impl MediaStoreOps for MockMediaStore {
    async fn delete(&self, uri: &ContentUri) -> Result<i64, MediaStoreError> {
        let mut state = self.state.lock().unwrap();
        let key = uri.as_str().to_string();
        state.delete_calls.push(key.clone());

        if state.security_denied.contains(&key) {
            return Err(MediaStoreError::Security(format!(
                "Mock security failure for uri: {}",
                key
            )));
        }
        if state.needs_consent.contains(&key) {
            return Err(MediaStoreError::RecoverableSecurity(ConsentAction::new(
                ConsentKind::RecoverableSecurity,
                vec![key],
            )));
        }
        if let Some(rows) = state.delete_results.get(&key) {
            return Ok(*rows);
        }
        match state.items.remove(&key) {
            Some(_) => {
                state.deleted.insert(key);
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn query_size(&self, uri: &ContentUri) -> Result<Option<i64>, MediaStoreError> {
        let state = self.state.lock().unwrap();
        if state.fail_size.contains(uri.as_str()) {
            return Err(MediaStoreError::Other(format!(
                "Mock size query failure for uri: {}",
                uri
            )));
        }
        match state.items.get(uri.as_str()) {
            Some(size) => Ok(*size),
            None => Err(MediaStoreError::NotFound(uri.to_string())),
        }
    }

    async fn exists(&self, uri: &ContentUri) -> Result<bool, MediaStoreError> {
        let state = self.state.lock().unwrap();
        if state.fail_exists.contains(uri.as_str()) {
            return Err(MediaStoreError::Other(format!(
                "Mock exists failure for uri: {}",
                uri
            )));
        }
        Ok(state.items.contains_key(uri.as_str()))
    }

    async fn create_delete_request(
        &self,
        uris: &[ContentUri],
    ) -> Result<ConsentAction, MediaStoreError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_delete_request {
            return Err(MediaStoreError::Other(
                "Mock delete request failure".to_string(),
            ));
        }
        let uris: Vec<String> = uris.iter().map(|uri| uri.as_str().to_string()).collect();
        state.delete_requests.push(uris.clone());
        Ok(ConsentAction::new(ConsentKind::DeleteRequest, uris))
    }
}
