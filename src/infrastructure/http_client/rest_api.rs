use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use uuid::Uuid;

use crate::application::dtos::{NewTenderRequest, TenderDocument};
use crate::application::services::{AgencyApi, CatalogApi};
use crate::domain::{
    AgencyProfile, Category, DashboardSummary, HomePayload, IconUpload, PortalError, Session,
    Tender, TenderStatus, PNG_CONTENT_TYPE,
};
use crate::settings::SettingsManager;

/// reqwest-backed implementation of both API traits.
///
/// The base URL is resolved from the settings at every request, so flipping
/// the endpoint toggle takes effect without rebuilding the client. Responses
/// from the previously selected endpoint are handled by the caller's
/// generation guard, not here.
pub struct RestPortalApi {
    client: reqwest::Client,
    settings: Arc<SettingsManager>,
}

impl RestPortalApi {
    pub fn new(settings: Arc<SettingsManager>) -> Result<Self, PortalError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|err| PortalError::other(format!("failed to build http client: {err}")))?;

        Ok(Self { client, settings })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.settings.endpoint().base_url(), path)
    }

    async fn upload_icons(&self, path: &str, uploads: &[IconUpload]) -> Result<(), PortalError> {
        let mut form = Form::new();
        for upload in uploads {
            let part = Part::bytes(upload.bytes.clone())
                .file_name(upload.file_name.clone())
                .mime_str(PNG_CONTENT_TYPE)
                .map_err(|err| PortalError::other(format!("invalid icon part: {err}")))?;
            // field name carries the entity id, as the API expects
            form = form.part(upload.entity_id.to_string(), part);
        }

        let response = self
            .client
            .post(self.url(path))
            .multipart(form)
            .send()
            .await
            .map_err(transport_error)?;
        ensure_success(response).await?;
        Ok(())
    }
}

fn transport_error(err: reqwest::Error) -> PortalError {
    if err.is_timeout() || err.is_connect() || err.is_request() {
        PortalError::network(err.to_string())
    } else {
        PortalError::other(err.to_string())
    }
}

fn decode_error(what: &str, err: reqwest::Error) -> PortalError {
    PortalError::other(format!("malformed {what} payload: {err}"))
}

/// Maps non-success statuses onto the error taxonomy, keeping the response
/// body as the user-facing message when the server sent one.
async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, PortalError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let mut message = response.text().await.unwrap_or_default();
    if message.is_empty() {
        message = status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string();
    }

    match status.as_u16() {
        401 | 403 => Err(PortalError::auth(message)),
        code => Err(PortalError::http(code, message)),
    }
}

#[async_trait]
impl CatalogApi for RestPortalApi {
    async fn fetch_home(&self) -> Result<HomePayload, PortalError> {
        let response = self
            .client
            .get(self.url("/home"))
            .send()
            .await
            .map_err(transport_error)?;
        let response = ensure_success(response).await?;
        response
            .json()
            .await
            .map_err(|err| decode_error("home", err))
    }

    async fn fetch_admin_catalog(&self) -> Result<Vec<Category>, PortalError> {
        let response = self
            .client
            .get(self.url("/admin/services"))
            .send()
            .await
            .map_err(transport_error)?;
        let response = ensure_success(response).await?;
        response
            .json()
            .await
            .map_err(|err| decode_error("admin catalog", err))
    }

    async fn upload_service_icons(&self, uploads: &[IconUpload]) -> Result<(), PortalError> {
        self.upload_icons("/admin/service-icons", uploads).await
    }

    async fn upload_category_icons(&self, uploads: &[IconUpload]) -> Result<(), PortalError> {
        self.upload_icons("/admin/category-icons", uploads).await
    }
}

#[async_trait]
impl AgencyApi for RestPortalApi {
    async fn login(&self, email: &str, password: &str) -> Result<String, PortalError> {
        let response = self
            .client
            .post(self.url("/api/auth/agency/login"))
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await
            .map_err(transport_error)?;
        let response = ensure_success(response).await?;

        // the body is the opaque token itself, possibly JSON-quoted
        let body = response
            .text()
            .await
            .map_err(|err| decode_error("login", err))?;
        let token = body.trim().trim_matches('"').to_string();
        if token.is_empty() {
            return Err(PortalError::auth("login returned an empty token"));
        }
        Ok(token)
    }

    async fn profile(&self, token: &str) -> Result<AgencyProfile, PortalError> {
        let response = self
            .client
            .get(self.url("/api/agency/profile"))
            .bearer_auth(token)
            .send()
            .await
            .map_err(transport_error)?;
        let response = ensure_success(response).await?;
        response
            .json()
            .await
            .map_err(|err| decode_error("profile", err))
    }

    async fn dashboard(&self, session: &Session) -> Result<DashboardSummary, PortalError> {
        let response = self
            .client
            .get(self.url("/api/agency/dashboard"))
            .query(&[("agencyId", session.agency_id.to_string())])
            .bearer_auth(&session.token)
            .send()
            .await
            .map_err(transport_error)?;
        let response = ensure_success(response).await?;
        response
            .json()
            .await
            .map_err(|err| decode_error("dashboard", err))
    }

    async fn update_tender_status(
        &self,
        session: &Session,
        tender_id: Uuid,
        status: TenderStatus,
    ) -> Result<Tender, PortalError> {
        let response = self
            .client
            .put(self.url(&format!("/api/agency/tenders/{tender_id}/status")))
            .query(&[
                ("status", status.as_str().to_string()),
                ("agencyId", session.agency_id.to_string()),
            ])
            .bearer_auth(&session.token)
            .send()
            .await
            .map_err(transport_error)?;
        let response = ensure_success(response).await?;
        response
            .json()
            .await
            .map_err(|err| decode_error("tender", err))
    }

    async fn create_tender(
        &self,
        session: &Session,
        request: &NewTenderRequest,
        document: Option<TenderDocument>,
    ) -> Result<(), PortalError> {
        let mut form = Form::new()
            .text("title", request.title.clone())
            .text("description", request.description.clone())
            .text("location", request.location.clone())
            .text("closingDate", request.closing_date.to_rfc3339())
            .text("contactInfo", request.contact_info.clone())
            .text("categoryId", request.category_id.to_string());

        if let Some(document) = document {
            let part = Part::bytes(document.bytes)
                .file_name(document.file_name)
                .mime_str(&document.content_type)
                .map_err(|err| PortalError::other(format!("invalid attachment part: {err}")))?;
            form = form.part("file", part);
        }

        let response = self
            .client
            .post(self.url("/api/agency/add"))
            .query(&[("agencyId", session.agency_id.to_string())])
            .bearer_auth(&session.token)
            .multipart(form)
            .send()
            .await
            .map_err(transport_error)?;
        ensure_success(response).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::storage::SledSettingsStore;
    use crate::settings::{ApiEndpoint, SettingsStore, LOCAL_BASE_URL};

    #[test]
    fn urls_follow_the_active_endpoint() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(SledSettingsStore::open(dir.path().join("store")).unwrap());
        let settings =
            Arc::new(SettingsManager::load(store as Arc<dyn SettingsStore>).unwrap());
        let api = RestPortalApi::new(Arc::clone(&settings)).unwrap();

        settings.set_endpoint(ApiEndpoint::Local).unwrap();
        assert_eq!(api.url("/home"), format!("{LOCAL_BASE_URL}/home"));

        settings.set_endpoint(ApiEndpoint::Remote).unwrap();
        assert!(api.url("/admin/services").starts_with("https://"));
    }
}
