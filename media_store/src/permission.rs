use std::{
    collections::HashSet,
    sync::{Arc, Mutex},
};

pub trait PermissionChecker: Send + Sync {
    fn is_granted(&self, permission: &str) -> bool;
}

/// For hosts without a runtime permission model.
#[derive(Debug, Default, Clone, Copy)]
pub struct AlwaysGranted;

impl PermissionChecker for AlwaysGranted {
    fn is_granted(&self, _permission: &str) -> bool {
        true
    }
}

/// Permission checker with a mutable set of granted permissions.
#[derive(Debug, Clone, Default)]
pub struct MockPermissionChecker {
    granted: Arc<Mutex<HashSet<String>>>,
}

impl MockPermissionChecker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn granting(permissions: &[&str]) -> Self {
        let checker = Self::new();
        for permission in permissions {
            checker.grant(permission);
        }
        checker
    }

    pub fn grant(&self, permission: &str) {
        let mut granted = self.granted.lock().unwrap();
        granted.insert(permission.to_string());
    }

    pub fn revoke(&self, permission: &str) {
        let mut granted = self.granted.lock().unwrap();
        granted.remove(permission);
    }
}

impl PermissionChecker for MockPermissionChecker {
    fn is_granted(&self, permission: &str) -> bool {
        let granted = self.granted.lock().unwrap();
        granted.contains(permission)
    }
}
