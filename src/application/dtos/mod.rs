use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

use crate::domain::{EntityKind, EntityRef, PortalError};

/// Credentials posted by the login form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// What the UI needs to know about the signed-in agency. The bearer token
/// itself never crosses the command boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub agency_id: Uuid,
    pub company_name: String,
}

/// Which catalog endpoint a load targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CatalogSource {
    /// `GET /home`: flat services with parent-category pointers.
    Home,
    /// `GET /admin/services`: categories carrying nested service trees.
    Admin,
}

/// A staged-but-unsaved icon, as rendered next to its entity.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IconDraftView {
    pub entity: EntityRef,
    pub file_name: String,
    pub preview_path: PathBuf,
    pub preview_url: String,
}

/// One service row of the rendered forest, joined with expansion and draft
/// state.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceRow {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub icon: Option<String>,
    pub depth: usize,
    pub expanded: bool,
    pub pending: Option<IconDraftView>,
    pub children: Vec<ServiceRow>,
}

/// One category panel of the rendered forest.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryPanel {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub expanded: bool,
    pub pending: Option<IconDraftView>,
    pub services: Vec<ServiceRow>,
}

/// Presentation-ready catalog payload for the webview.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogView {
    pub source: CatalogSource,
    pub categories: Vec<CategoryPanel>,
    pub uncategorized: Vec<ServiceRow>,
    pub pending_count: usize,
}

/// File selection forwarded from the webview for one entity's icon.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageIconRequest {
    pub kind: EntityKind,
    pub id: i64,
    pub file_name: String,
    /// Declared media type as reported by the browser file input.
    pub content_type: String,
    pub data_base64: String,
}

impl StageIconRequest {
    pub fn entity(&self) -> EntityRef {
        EntityRef {
            kind: self.kind,
            id: self.id,
        }
    }

    pub fn decode_bytes(&self) -> Result<Vec<u8>, PortalError> {
        BASE64
            .decode(self.data_base64.as_bytes())
            .map_err(|_| PortalError::validation("icon payload is not valid base64"))
    }
}

/// Counts reported back after a successful batched icon upload.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadOutcome {
    pub service_icons: usize,
    pub category_icons: usize,
}

/// Tender-creation form fields. Optional entries absent from the submission
/// are omitted from the multipart form entirely.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTenderRequest {
    pub title: String,
    pub description: String,
    pub location: String,
    pub closing_date: DateTime<Utc>,
    pub contact_info: String,
    pub category_id: i64,
    #[serde(default)]
    pub document: Option<TenderDocumentPayload>,
}

/// Attachment accompanying a new tender, base64-encoded by the webview.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenderDocumentPayload {
    pub file_name: String,
    pub content_type: String,
    pub data_base64: String,
}

impl TenderDocumentPayload {
    pub fn decode(&self) -> Result<TenderDocument, PortalError> {
        let bytes = BASE64
            .decode(self.data_base64.as_bytes())
            .map_err(|_| PortalError::validation("tender document is not valid base64"))?;
        Ok(TenderDocument {
            file_name: self.file_name.clone(),
            content_type: self.content_type.clone(),
            bytes,
        })
    }
}

/// Decoded attachment handed to the API adapter.
#[derive(Debug, Clone)]
pub struct TenderDocument {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// One selectable API endpoint, for the settings screen.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointOption {
    pub id: String,
    pub label: String,
    pub description: String,
    pub base_url: String,
}

/// Active endpoint plus the full list of options.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointListResponse {
    pub active: String,
    pub options: Vec<EndpointOption>,
}
