pub mod analytics;
pub mod confirm_deletion;
pub mod model;
pub mod view_model;
