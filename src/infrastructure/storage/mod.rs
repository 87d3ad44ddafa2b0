//! Storage adapters for TenderDesk.
//!
//! Currently a single sled-backed store for the two durable client values:
//! the API endpoint selection and the bearer token.

pub mod sled_store;

pub use sled_store::SledSettingsStore;
