use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::domain::PortalError;

/// Base URL of the local development API server.
pub const LOCAL_BASE_URL: &str = "http://localhost:5000";

/// Base URL of the hosted deployment.
pub const REMOTE_BASE_URL: &str = "https://api.tenderlink.app";

/// The two API endpoints the portal can talk to. Exactly one is active; the
/// selection survives restarts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ApiEndpoint {
    Local,
    Remote,
}

impl ApiEndpoint {
    pub fn id(&self) -> &'static str {
        match self {
            ApiEndpoint::Local => "local",
            ApiEndpoint::Remote => "remote",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ApiEndpoint::Local => "Local development server",
            ApiEndpoint::Remote => "Hosted deployment",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            ApiEndpoint::Local => "Talks to an API instance running on this machine.",
            ApiEndpoint::Remote => "Talks to the production TenderLink deployment.",
        }
    }

    pub fn base_url(&self) -> &'static str {
        match self {
            ApiEndpoint::Local => LOCAL_BASE_URL,
            ApiEndpoint::Remote => REMOTE_BASE_URL,
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        match id {
            "local" => Some(ApiEndpoint::Local),
            "remote" => Some(ApiEndpoint::Remote),
            _ => None,
        }
    }
}

impl Default for ApiEndpoint {
    fn default() -> Self {
        ApiEndpoint::Remote
    }
}

pub fn available_endpoints() -> Vec<ApiEndpoint> {
    vec![ApiEndpoint::Local, ApiEndpoint::Remote]
}

/// Complete in-memory snapshot of the persisted client state.
#[derive(Debug, Clone, Default)]
pub struct AppSettings {
    pub endpoint: ApiEndpoint,
    pub token: Option<String>,
}

/// Durable key-value persistence for the endpoint selection and the bearer
/// token. Implemented by the sled adapter; mocked in tests.
pub trait SettingsStore: Send + Sync {
    fn read_endpoint(&self) -> Result<Option<ApiEndpoint>, PortalError>;

    fn write_endpoint(&self, endpoint: ApiEndpoint) -> Result<(), PortalError>;

    fn read_token(&self) -> Result<Option<String>, PortalError>;

    fn write_token(&self, token: &str) -> Result<(), PortalError>;

    fn clear_token(&self) -> Result<(), PortalError>;
}

/// Thread-safe manager caching the store contents, write-through on change.
pub struct SettingsManager {
    store: Arc<dyn SettingsStore>,
    state: RwLock<AppSettings>,
}

impl SettingsManager {
    /// Loads the persisted state; unreadable or absent values fall back to
    /// defaults rather than failing startup.
    pub fn load(store: Arc<dyn SettingsStore>) -> Result<Self, PortalError> {
        let endpoint = store.read_endpoint()?.unwrap_or_default();
        let token = store.read_token()?;

        Ok(Self {
            store,
            state: RwLock::new(AppSettings { endpoint, token }),
        })
    }

    /// Snapshot of the current settings.
    pub fn current(&self) -> AppSettings {
        self.state.read().clone()
    }

    pub fn endpoint(&self) -> ApiEndpoint {
        self.state.read().endpoint
    }

    pub fn token(&self) -> Option<String> {
        self.state.read().token.clone()
    }

    /// Switches the active endpoint and persists the selection.
    pub fn set_endpoint(&self, endpoint: ApiEndpoint) -> Result<AppSettings, PortalError> {
        self.store.write_endpoint(endpoint)?;
        let mut state = self.state.write();
        state.endpoint = endpoint;
        Ok(state.clone())
    }

    pub fn set_token(&self, token: &str) -> Result<(), PortalError> {
        self.store.write_token(token)?;
        self.state.write().token = Some(token.to_string());
        Ok(())
    }

    pub fn clear_token(&self) -> Result<(), PortalError> {
        self.store.clear_token()?;
        self.state.write().token = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct MemoryStore {
        endpoint: Mutex<Option<ApiEndpoint>>,
        token: Mutex<Option<String>>,
    }

    impl SettingsStore for MemoryStore {
        fn read_endpoint(&self) -> Result<Option<ApiEndpoint>, PortalError> {
            Ok(*self.endpoint.lock())
        }

        fn write_endpoint(&self, endpoint: ApiEndpoint) -> Result<(), PortalError> {
            *self.endpoint.lock() = Some(endpoint);
            Ok(())
        }

        fn read_token(&self) -> Result<Option<String>, PortalError> {
            Ok(self.token.lock().clone())
        }

        fn write_token(&self, token: &str) -> Result<(), PortalError> {
            *self.token.lock() = Some(token.to_string());
            Ok(())
        }

        fn clear_token(&self) -> Result<(), PortalError> {
            *self.token.lock() = None;
            Ok(())
        }
    }

    #[test]
    fn empty_store_yields_defaults() {
        let manager = SettingsManager::load(Arc::new(MemoryStore::default())).unwrap();
        let settings = manager.current();
        assert_eq!(settings.endpoint, ApiEndpoint::Remote);
        assert!(settings.token.is_none());
    }

    #[test]
    fn endpoint_switch_is_written_through() {
        let store = Arc::new(MemoryStore::default());
        let manager = SettingsManager::load(Arc::clone(&store) as Arc<dyn SettingsStore>).unwrap();

        let updated = manager.set_endpoint(ApiEndpoint::Local).unwrap();

        assert_eq!(updated.endpoint, ApiEndpoint::Local);
        assert_eq!(*store.endpoint.lock(), Some(ApiEndpoint::Local));
        assert_eq!(manager.endpoint().base_url(), LOCAL_BASE_URL);
    }

    #[test]
    fn token_set_and_clear_round_trip() {
        let store = Arc::new(MemoryStore::default());
        let manager = SettingsManager::load(Arc::clone(&store) as Arc<dyn SettingsStore>).unwrap();

        manager.set_token("bearer-123").unwrap();
        assert_eq!(manager.token().as_deref(), Some("bearer-123"));
        assert_eq!(store.token.lock().as_deref(), Some("bearer-123"));

        manager.clear_token().unwrap();
        assert!(manager.token().is_none());
        assert!(store.token.lock().is_none());
    }

    #[test]
    fn endpoint_ids_resolve_both_ways() {
        for endpoint in available_endpoints() {
            assert_eq!(ApiEndpoint::from_id(endpoint.id()), Some(endpoint));
        }
        assert_eq!(ApiEndpoint::from_id("staging"), None);
    }
}
