pub mod app_services;
pub mod deletion;
pub mod error;
pub mod pipeline;
pub mod settings_service;
pub mod upload;
pub mod upload_cleanup;
pub mod view_models;
