pub mod deletion_queue_repository;
pub mod setting_repository;
pub mod upload_queue_repository;
