use work_scheduler::{NetworkType, WorkConstraints};

use crate::view_models::Settings;

/// Scheduling constraints of upload work, derived from the wifi-only preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UploadConstraints {
    pub wifi_only: bool,
}

impl UploadConstraints {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            wifi_only: settings.wifi_only_uploads,
        }
    }

    pub fn work_constraints(&self) -> WorkConstraints {
        WorkConstraints {
            network_type: if self.wifi_only {
                NetworkType::Unmetered
            } else {
                NetworkType::Connected
            },
        }
    }

    /// Whether requests ask for expedited execution.
    pub fn prefer_expedited(&self) -> bool {
        !self.wifi_only
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wifi_only_requires_unmetered_network() {
        let constraints = UploadConstraints::from_settings(&Settings {
            auto_delete_after_upload: false,
            wifi_only_uploads: true,
        });
        assert_eq!(
            constraints.work_constraints().network_type,
            NetworkType::Unmetered
        );
        assert!(!constraints.prefer_expedited());
    }

    #[test]
    fn test_any_network_prefers_expedited() {
        let constraints = UploadConstraints::from_settings(&Settings::default());
        assert_eq!(
            constraints.work_constraints().network_type,
            NetworkType::Connected
        );
        assert!(constraints.prefer_expedited());
    }
}
