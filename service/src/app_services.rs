use std::sync::{Arc, OnceLock};

use async_std::channel::Receiver;
use database::{get_db_pool, repository_manager::RepositoryManager};
use media_store::{ops::MediaStoreOps, permission::PermissionChecker, platform::PlatformVersion};

use crate::{
    deletion::{
        analytics::{DeletionAnalytics, TracingDeletionAnalytics},
        confirm_deletion::ConfirmDeletionUseCase,
        view_model::{DeletionConfirmationEvent, DeletionConfirmationViewModel},
    },
    error::Error,
    settings_service::SettingsService,
    upload_cleanup::service::UploadCleanupCoordinator,
};

/// Host platform collaborators the services are built on.
pub struct Platform {
    pub media_store: Arc<dyn MediaStoreOps>,
    pub permissions: Arc<dyn PermissionChecker>,
    pub platform_version: PlatformVersion,
}

pub async fn create_app_services(platform: Platform) -> Result<Arc<AppServices>, Error> {
    let pool = get_db_pool()
        .await
        .map_err(|e| Error::DbError(format!("DB pool initialization failed: {}", e)))?;
    let repository_manager = Arc::new(RepositoryManager::new(pool));

    Ok(Arc::new(AppServices::new(
        repository_manager,
        platform,
        Arc::new(TracingDeletionAnalytics),
    )))
}

/// Lazily built, shared services of the application.
pub struct AppServices {
    settings: OnceLock<Arc<SettingsService>>,
    confirm_deletion: OnceLock<Arc<ConfirmDeletionUseCase>>,
    cleanup_coordinator: OnceLock<Arc<UploadCleanupCoordinator>>,
    repository_manager: Arc<RepositoryManager>,
    platform: Platform,
    analytics: Arc<dyn DeletionAnalytics>,
}

impl std::fmt::Debug for AppServices {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppServices")
            .field("platform_version", &self.platform.platform_version)
            .finish_non_exhaustive()
    }
}

impl AppServices {
    pub fn new(
        repository_manager: Arc<RepositoryManager>,
        platform: Platform,
        analytics: Arc<dyn DeletionAnalytics>,
    ) -> Self {
        Self {
            settings: OnceLock::new(),
            confirm_deletion: OnceLock::new(),
            cleanup_coordinator: OnceLock::new(),
            repository_manager,
            platform,
            analytics,
        }
    }

    pub fn repository_manager(&self) -> Arc<RepositoryManager> {
        Arc::clone(&self.repository_manager)
    }

    pub fn analytics(&self) -> Arc<dyn DeletionAnalytics> {
        Arc::clone(&self.analytics)
    }

    pub fn settings(&self) -> Arc<SettingsService> {
        self.settings
            .get_or_init(|| {
                Arc::new(SettingsService::new(
                    Arc::clone(&self.repository_manager),
                    Arc::clone(&self.analytics),
                ))
            })
            .clone()
    }

    pub fn confirm_deletion(&self) -> Arc<ConfirmDeletionUseCase> {
        self.confirm_deletion
            .get_or_init(|| {
                Arc::new(ConfirmDeletionUseCase::new(
                    self.repository_manager.get_deletion_queue_repository(),
                    Arc::clone(&self.platform.media_store),
                    Arc::clone(&self.platform.permissions),
                    self.platform.platform_version,
                    Arc::clone(&self.analytics),
                ))
            })
            .clone()
    }

    pub fn cleanup_coordinator(&self) -> Arc<UploadCleanupCoordinator> {
        self.cleanup_coordinator
            .get_or_init(|| {
                Arc::new(UploadCleanupCoordinator::new(
                    Arc::clone(&self.repository_manager),
                    self.settings(),
                    Arc::clone(&self.analytics),
                ))
            })
            .clone()
    }

    /// A fresh view model for one confirmation screen.
    pub async fn deletion_view_model(
        &self,
        chunk_size: usize,
    ) -> (DeletionConfirmationViewModel, Receiver<DeletionConfirmationEvent>) {
        DeletionConfirmationViewModel::new(
            self.confirm_deletion(),
            self.repository_manager.get_deletion_queue_repository(),
            chunk_size,
        )
        .await
    }
}
