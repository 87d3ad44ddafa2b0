//! Domain layer: catalog entities, the tree builder, and the error taxonomy.

pub mod catalog;
pub mod errors;
pub mod models;

pub use catalog::{organize, Catalog, CategoryGroup, ExpansionState, ServiceNode, MAX_SERVICE_DEPTH};
pub use errors::PortalError;
pub use models::{
    AgencyProfile, Category, DashboardSummary, EntityKind, EntityRef, HomePayload, IconUpload,
    PreviewHandle, Service, Session, Tender, TenderStat, TenderStatus, PNG_CONTENT_TYPE,
};
