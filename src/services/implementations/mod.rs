pub mod cloud_sync_service;
pub mod collector_service;
pub mod http_service;

pub use cloud_sync_service::CloudSyncService;
pub use collector_service::CollectorService;
pub use http_service::HttpService;
