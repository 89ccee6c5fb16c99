use std::sync::Arc;

use core_types::SettingName;
use database::repository_manager::RepositoryManager;

use crate::{deletion::analytics::DeletionAnalytics, error::Error, view_models::Settings};

/// Service for loading and saving the persisted upload and cleanup preferences.
pub struct SettingsService {
    repository_manager: Arc<RepositoryManager>,
    analytics: Arc<dyn DeletionAnalytics>,
}

impl std::fmt::Debug for SettingsService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SettingsService").finish_non_exhaustive()
    }
}

impl SettingsService {
    pub fn new(
        repository_manager: Arc<RepositoryManager>,
        analytics: Arc<dyn DeletionAnalytics>,
    ) -> Self {
        Self {
            repository_manager,
            analytics,
        }
    }

    /// Load settings from database. Missing settings fall back to their defaults.
    pub async fn load_settings(&self) -> Result<Settings, Error> {
        let settings_map = self
            .repository_manager
            .get_settings_repository()
            .get_settings()
            .await
            .map_err(|e| Error::SettingsError(format!("Failed to load settings: {}", e)))?;

        Ok(Settings::from(settings_map))
    }

    /// Enables or disables deleting originals after upload.
    ///
    /// A change of the value is reported to analytics.
    pub async fn set_auto_delete_after_upload(&self, enabled: bool) -> Result<(), Error> {
        let previous = self.load_settings().await?.auto_delete_after_upload;
        self.save_flag(SettingName::AutoDeleteAfterUpload, enabled)
            .await?;
        if previous != enabled {
            self.analytics.auto_delete_setting_changed(enabled);
        }
        Ok(())
    }

    pub async fn set_wifi_only_uploads(&self, enabled: bool) -> Result<(), Error> {
        self.save_flag(SettingName::WifiOnlyUploads, enabled).await
    }

    async fn save_flag(&self, name: SettingName, enabled: bool) -> Result<(), Error> {
        self.repository_manager
            .get_settings_repository()
            .add_or_update_setting(&name, if enabled { "true" } else { "false" })
            .await
            .map_err(|e| Error::SettingsError(format!("Failed to save settings: {}", e)))?;
        tracing::info!(setting = name.as_str(), enabled, "Setting saved");
        Ok(())
    }
}
