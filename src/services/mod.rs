pub mod classifier;
pub mod export_service;
pub mod generation_service;
pub mod key_manager;
pub mod retry;

pub use export_service::ExportService;
pub use generation_service::GenerationService;
pub use key_manager::ApiKeyManager;
