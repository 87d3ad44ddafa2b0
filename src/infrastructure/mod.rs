//! Infrastructure layer wiring concrete adapters (HTTP, previews, storage).

pub mod http_client;
pub mod previews;
pub mod storage;

pub use http_client::{check_api_availability, RestPortalApi};
pub use previews::FsPreviewCache;
pub use storage::SledSettingsStore;
