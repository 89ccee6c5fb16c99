pub mod context;
pub mod handled_items;
pub mod media_id;
pub mod model;
pub mod service;
pub mod steps;
