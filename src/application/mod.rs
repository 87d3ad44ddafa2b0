//! Application layer wiring DTOs and services for TenderDesk.

pub mod dtos;
pub mod services;

pub use dtos::{
    CatalogSource, CatalogView, CategoryPanel, EndpointListResponse, EndpointOption, IconDraftView,
    LoginRequest, NewTenderRequest, ServiceRow, SessionView, StageIconRequest, UploadOutcome,
};
pub use services::{AgencyService, CatalogService};
