use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

/// The only media type accepted for staged icons.
pub const PNG_CONTENT_TYPE: &str = "image/png";

/// A named grouping that owns zero or more services and carries its own icon.
///
/// The admin catalog endpoint nests each category's service tree directly in
/// the `services` field; the home endpoint leaves it empty and ships services
/// as a flat list instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub services: Vec<Service>,
}

/// A listable offering belonging to at most one category, optionally owning
/// nested sub-services.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub parent_category_id: Option<i64>,
    #[serde(default)]
    pub services: Vec<Service>,
}

/// Payload of `GET /home`: the flat catalog shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HomePayload {
    #[serde(default)]
    pub services: Vec<Service>,
    #[serde(default)]
    pub service_categories: Vec<Category>,
}

/// Which kind of catalog entity an edit or expansion flag refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Category,
    Service,
}

/// Composite key addressing one catalog node across both entity namespaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityRef {
    pub kind: EntityKind,
    pub id: i64,
}

impl EntityRef {
    pub fn category(id: i64) -> Self {
        Self {
            kind: EntityKind::Category,
            id,
        }
    }

    pub fn service(id: i64) -> Self {
        Self {
            kind: EntityKind::Service,
            id,
        }
    }
}

/// Locally allocated preview resource backing one pending icon edit.
///
/// Handles are plain data; the `PreviewStore` that allocated one is also
/// responsible for releasing it. A handle must be released exactly once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewHandle {
    pub token: Uuid,
    pub path: PathBuf,
}

/// One entry of a batched icon submission: the multipart field name is the
/// entity id, the value the PNG payload.
#[derive(Debug, Clone)]
pub struct IconUpload {
    pub entity_id: i64,
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Authenticated agency identity. Created at login or resume, destroyed at
/// logout, and passed explicitly to every authenticated request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub token: String,
    pub agency_id: Uuid,
    pub company_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgencyProfile {
    pub id: Uuid,
    pub company_name: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub agency_profile: AgencyProfile,
    pub total_tenders: u64,
    pub active_tenders: u64,
    pub closed_tenders: u64,
    #[serde(default)]
    pub tender_stats: Vec<TenderStat>,
}

/// One per-date row of the dashboard breakdown. `tender_id` is the genuine
/// identity key used for status updates; the `date` column is display data.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenderStat {
    pub tender_id: Uuid,
    pub date: DateTime<Utc>,
    pub status: TenderStatus,
    pub tender_count: u64,
}

/// Record returned by the status-update endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tender {
    pub id: Uuid,
    pub title: String,
    pub status: TenderStatus,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub closing_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TenderStatus {
    Open,
    Closed,
    Pending,
}

impl TenderStatus {
    /// Wire spelling used in query parameters.
    pub fn as_str(&self) -> &'static str {
        match self {
            TenderStatus::Open => "OPEN",
            TenderStatus::Closed => "CLOSED",
            TenderStatus::Pending => "PENDING",
        }
    }
}
