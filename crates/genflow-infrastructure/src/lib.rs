//! Infrastructure layer: file-backed storage, configuration and local
//! image loading.

pub mod config_service;
pub mod image_loader;
pub mod json_session_store;
pub mod memory_session_store;
pub mod paths;
pub mod storage;

pub use config_service::ConfigService;
pub use image_loader::load_image_as_data_uri;
pub use json_session_store::JsonFileSessionStore;
pub use memory_session_store::InMemorySessionStore;
pub use paths::GenflowPaths;
