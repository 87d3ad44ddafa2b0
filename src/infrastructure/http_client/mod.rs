//! HTTP adapters for the remote TenderLink API.
//!
//! `RestPortalApi` implements the catalog and agency traits over reqwest;
//! `check_api_availability` is a cheap blocking probe used at startup and by
//! the settings screen to report whether an endpoint answers at all.

mod rest_api;

pub use rest_api::RestPortalApi;

use std::time::Duration;

use tracing::debug;

/// Probe timeout; reachability checks must never stall startup.
const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// Whether `base_url` answers `GET /home` with any HTTP response.
///
/// A non-2xx status still counts as reachable: the server is there, it just
/// dislikes the request. Only transport failures count as unreachable.
pub fn check_api_availability(base_url: &str) -> bool {
    let url = format!("{base_url}/home");

    match ureq::get(&url).timeout(PROBE_TIMEOUT).call() {
        Ok(response) => {
            debug!(url = %url, status = response.status(), "endpoint probe answered");
            true
        }
        Err(ureq::Error::Status(code, _)) => {
            debug!(url = %url, status = code, "endpoint probe answered with an error status");
            true
        }
        Err(err) => {
            debug!(url = %url, error = %err, "endpoint probe failed");
            false
        }
    }
}
