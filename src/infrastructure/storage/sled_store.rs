use std::path::Path;

use bincode::Options;
use serde::de::DeserializeOwned;
use sled::{Config, Db, Tree};

use crate::domain::PortalError;
use crate::settings::{ApiEndpoint, SettingsStore};

const SETTINGS_TREE: &str = "settings";
const ENDPOINT_KEY: &[u8] = b"api-endpoint";
const TOKEN_KEY: &[u8] = b"session-token";

/// Durable client state backed by `sled`.
///
/// Holds exactly two values: the active API endpoint selection and the
/// bearer token of the last signed-in agency. Both survive restarts.
pub struct SledSettingsStore {
    db: Db,
    settings: Tree,
}

impl SledSettingsStore {
    /// Opens (or creates) a sled database rooted at `data_dir`.
    pub fn open(data_dir: impl AsRef<Path>) -> Result<Self, PortalError> {
        let dir = data_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir).map_err(|err| {
            PortalError::storage(format!("failed to create data directory {dir:?}: {err}"))
        })?;

        let db = Config::default()
            .path(&dir)
            .open()
            .map_err(|err| PortalError::storage(format!("failed to open sled db: {err}")))?;

        let settings = db
            .open_tree(SETTINGS_TREE)
            .map_err(|err| PortalError::storage(format!("failed to open settings tree: {err}")))?;

        Ok(Self { db, settings })
    }

    fn serialize<T: serde::Serialize>(value: &T) -> Result<Vec<u8>, PortalError> {
        bincode::options()
            .with_fixint_encoding()
            .allow_trailing_bytes()
            .serialize(value)
            .map_err(|err| PortalError::storage(format!("serialization error: {err}")))
    }

    fn deserialize<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, PortalError> {
        bincode::options()
            .with_fixint_encoding()
            .allow_trailing_bytes()
            .deserialize(bytes)
            .map_err(|err| PortalError::storage(format!("deserialization error: {err}")))
    }

    fn read<T: DeserializeOwned>(&self, key: &[u8]) -> Result<Option<T>, PortalError> {
        self.settings
            .get(key)
            .map_err(|err| PortalError::storage(format!("failed to read settings: {err}")))?
            .map(|bytes| Self::deserialize(bytes.as_ref()))
            .transpose()
    }

    fn write<T: serde::Serialize>(&self, key: &[u8], value: &T) -> Result<(), PortalError> {
        let bytes = Self::serialize(value)?;
        self.settings
            .insert(key, bytes)
            .map_err(|err| PortalError::storage(format!("failed to persist settings: {err}")))?;
        self.flush()
    }

    fn remove(&self, key: &[u8]) -> Result<(), PortalError> {
        self.settings
            .remove(key)
            .map_err(|err| PortalError::storage(format!("failed to remove settings key: {err}")))?;
        self.flush()
    }

    fn flush(&self) -> Result<(), PortalError> {
        self.db
            .flush()
            .map_err(|err| PortalError::storage(format!("failed to flush settings: {err}")))?;
        Ok(())
    }
}

impl SettingsStore for SledSettingsStore {
    fn read_endpoint(&self) -> Result<Option<ApiEndpoint>, PortalError> {
        self.read(ENDPOINT_KEY)
    }

    fn write_endpoint(&self, endpoint: ApiEndpoint) -> Result<(), PortalError> {
        self.write(ENDPOINT_KEY, &endpoint)
    }

    fn read_token(&self) -> Result<Option<String>, PortalError> {
        self.read(TOKEN_KEY)
    }

    fn write_token(&self, token: &str) -> Result<(), PortalError> {
        self.write(TOKEN_KEY, &token.to_string())
    }

    fn clear_token(&self) -> Result<(), PortalError> {
        self.remove(TOKEN_KEY)
    }
}
