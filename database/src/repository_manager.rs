use std::sync::Arc;

use sqlx::{Pool, Sqlite};

use crate::{
    clock::{Clock, SystemClock},
    repository::{
        deletion_queue_repository::DeletionQueueRepository, setting_repository::SettingRepository,
        upload_queue_repository::UploadQueueRepository,
    },
};

#[derive(Debug)]
pub struct RepositoryManager {
    deletion_queue_repository: Arc<DeletionQueueRepository>,
    upload_queue_repository: Arc<UploadQueueRepository>,
    setting_repository: Arc<SettingRepository>,
}

impl RepositoryManager {
    pub fn new(pool: Arc<Pool<Sqlite>>) -> Self {
        Self::new_with_clock(pool, Arc::new(SystemClock))
    }

    pub fn new_with_clock(pool: Arc<Pool<Sqlite>>, clock: Arc<dyn Clock>) -> Self {
        let deletion_queue_repository =
            Arc::new(DeletionQueueRepository::new(pool.clone(), clock.clone()));
        let upload_queue_repository = Arc::new(UploadQueueRepository::new(pool.clone(), clock));
        let setting_repository = Arc::new(SettingRepository::new(pool));

        Self {
            deletion_queue_repository,
            upload_queue_repository,
            setting_repository,
        }
    }

    pub fn get_deletion_queue_repository(&self) -> Arc<DeletionQueueRepository> {
        self.deletion_queue_repository.clone()
    }

    pub fn get_upload_queue_repository(&self) -> Arc<UploadQueueRepository> {
        self.upload_queue_repository.clone()
    }

    pub fn get_settings_repository(&self) -> Arc<SettingRepository> {
        self.setting_repository.clone()
    }
}
