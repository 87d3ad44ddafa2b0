use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use tracing::warn;

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod settings;

use application::dtos::{EndpointListResponse, EndpointOption};
use application::services::{AgencyApi, CatalogApi, PreviewStore};
use application::{AgencyService, CatalogService};
use infrastructure::{check_api_availability, FsPreviewCache, RestPortalApi, SledSettingsStore};
use settings::{available_endpoints, ApiEndpoint, SettingsManager, SettingsStore};

#[cfg(feature = "desktop")]
use application::{
    CatalogSource, CatalogView, IconDraftView, LoginRequest, NewTenderRequest, SessionView,
    StageIconRequest, UploadOutcome,
};
#[cfg(feature = "desktop")]
use domain::{DashboardSummary, EntityRef, PortalError, Tender, TenderStatus};
#[cfg(feature = "desktop")]
use tauri::State;
#[cfg(feature = "desktop")]
use uuid::Uuid;

/// Global state shared with Tauri commands.
pub struct AppState {
    catalog: Arc<CatalogService>,
    agency: Arc<AgencyService>,
    settings: Arc<SettingsManager>,
}

impl AppState {
    pub fn new(handles: AppHandles) -> Self {
        Self {
            catalog: handles.catalog,
            agency: handles.agency,
            settings: handles.settings,
        }
    }

    pub fn catalog(&self) -> Arc<CatalogService> {
        Arc::clone(&self.catalog)
    }

    pub fn agency(&self) -> Arc<AgencyService> {
        Arc::clone(&self.agency)
    }

    pub fn settings(&self) -> Arc<SettingsManager> {
        Arc::clone(&self.settings)
    }
}

pub struct AppHandles {
    pub catalog: Arc<CatalogService>,
    pub agency: Arc<AgencyService>,
    pub settings: Arc<SettingsManager>,
    pub data_dir: std::path::PathBuf,
}

/// Wires the sled store, preview cache, REST adapter and services together.
pub fn build_environment() -> Result<AppHandles> {
    let data_dir = resolve_data_dir()?;

    let store = SledSettingsStore::open(data_dir.join("store"))
        .context("failed to open settings store")?;
    let settings = Arc::new(
        SettingsManager::load(Arc::new(store) as Arc<dyn SettingsStore>)
            .context("failed to load settings")?,
    );

    let endpoint = settings.endpoint();
    if !check_api_availability(endpoint.base_url()) {
        warn!(
            endpoint = endpoint.id(),
            url = endpoint.base_url(),
            "selected API endpoint is not answering"
        );
    }

    let previews = Arc::new(
        FsPreviewCache::open(data_dir.join("previews"))
            .context("failed to open preview cache")?,
    );
    let api = Arc::new(
        RestPortalApi::new(Arc::clone(&settings)).context("failed to build API client")?,
    );

    let catalog = Arc::new(CatalogService::new(
        Arc::clone(&api) as Arc<dyn CatalogApi>,
        previews as Arc<dyn PreviewStore>,
    ));
    let agency = Arc::new(AgencyService::new(
        api as Arc<dyn AgencyApi>,
        Arc::clone(&settings),
    ));

    Ok(AppHandles {
        catalog,
        agency,
        settings,
        data_dir,
    })
}

/// Endpoint options plus the active selection, for the settings screen.
pub fn build_endpoint_response(active: ApiEndpoint) -> EndpointListResponse {
    EndpointListResponse {
        active: active.id().to_string(),
        options: available_endpoints()
            .into_iter()
            .map(|endpoint| EndpointOption {
                id: endpoint.id().to_string(),
                label: endpoint.label().to_string(),
                description: endpoint.description().to_string(),
                base_url: endpoint.base_url().to_string(),
            })
            .collect(),
    }
}

pub fn init_tracing() {
    static INIT: std::sync::OnceLock<()> = std::sync::OnceLock::new();

    let _ = INIT.get_or_init(|| {
        let filter = std::env::var("TENDERDESK_LOG").unwrap_or_else(|_| "info".into());
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .compact()
            .try_init();
    });
}

fn resolve_data_dir() -> Result<std::path::PathBuf> {
    let dirs = directories::ProjectDirs::from("app", "tenderlink", "TenderDesk")
        .ok_or_else(|| anyhow!("unable to determine OS data dir"))?;
    let dir = dirs.data_dir().to_path_buf();
    std::fs::create_dir_all(&dir).context("failed to create data directory")?;
    Ok(dir)
}

/// Entry point invoked from `main.rs`.
#[cfg(feature = "desktop")]
pub fn run() {
    init_tracing();

    if let Err(err) = try_run() {
        eprintln!("[tenderdesk] startup failed: {err:?}");
    }
}

#[cfg(feature = "desktop")]
fn try_run() -> Result<()> {
    let handles = build_environment().context("failed to bootstrap TenderDesk environment")?;
    let app_state = AppState::new(handles);

    tauri::Builder::default()
        .plugin(tauri_plugin_fs::init())
        .plugin(tauri_plugin_opener::init())
        .manage(app_state)
        .invoke_handler(tauri::generate_handler![
            login,
            logout,
            resume_session,
            current_session,
            load_dashboard,
            update_tender_status,
            create_tender,
            load_catalog,
            catalog_view,
            toggle_node,
            stage_icon,
            discard_icon,
            upload_icons,
            list_endpoints,
            set_endpoint,
            probe_endpoint
        ])
        .run(tauri::generate_context!())
        .map_err(|err| anyhow!(err))?;

    Ok(())
}

#[cfg(feature = "desktop")]
fn map_portal_error(err: PortalError) -> String {
    err.to_string()
}

#[cfg(feature = "desktop")]
#[tauri::command]
async fn login(state: State<'_, AppState>, payload: LoginRequest) -> Result<SessionView, String> {
    state.agency().login(payload).await.map_err(map_portal_error)
}

#[cfg(feature = "desktop")]
#[tauri::command]
async fn logout(state: State<'_, AppState>) -> Result<(), String> {
    let agency = state.agency();
    tauri::async_runtime::spawn_blocking(move || agency.logout())
        .await
        .map_err(|err| err.to_string())?
        .map_err(map_portal_error)
}

#[cfg(feature = "desktop")]
#[tauri::command]
async fn resume_session(state: State<'_, AppState>) -> Result<Option<SessionView>, String> {
    state.agency().resume().await.map_err(map_portal_error)
}

#[cfg(feature = "desktop")]
#[tauri::command]
async fn current_session(state: State<'_, AppState>) -> Result<Option<SessionView>, String> {
    Ok(state.agency().current())
}

#[cfg(feature = "desktop")]
#[tauri::command]
async fn load_dashboard(state: State<'_, AppState>) -> Result<DashboardSummary, String> {
    state.agency().dashboard().await.map_err(map_portal_error)
}

#[cfg(feature = "desktop")]
#[tauri::command]
async fn update_tender_status(
    state: State<'_, AppState>,
    tender_id: Uuid,
    status: TenderStatus,
) -> Result<Tender, String> {
    state
        .agency()
        .update_tender_status(tender_id, status)
        .await
        .map_err(map_portal_error)
}

#[cfg(feature = "desktop")]
#[tauri::command]
async fn create_tender(
    state: State<'_, AppState>,
    payload: NewTenderRequest,
) -> Result<(), String> {
    state.agency().create_tender(payload).await.map_err(map_portal_error)
}

#[cfg(feature = "desktop")]
#[tauri::command]
async fn load_catalog(
    state: State<'_, AppState>,
    source: CatalogSource,
) -> Result<CatalogView, String> {
    state.catalog().load(source).await.map_err(map_portal_error)
}

#[cfg(feature = "desktop")]
#[tauri::command]
async fn catalog_view(state: State<'_, AppState>) -> Result<CatalogView, String> {
    state.catalog().view().map_err(map_portal_error)
}

#[cfg(feature = "desktop")]
#[tauri::command]
async fn toggle_node(state: State<'_, AppState>, node: EntityRef) -> Result<bool, String> {
    Ok(state.catalog().toggle_node(node))
}

#[cfg(feature = "desktop")]
#[tauri::command]
async fn stage_icon(
    state: State<'_, AppState>,
    payload: StageIconRequest,
) -> Result<IconDraftView, String> {
    let catalog = state.catalog();
    tauri::async_runtime::spawn_blocking(move || catalog.stage_icon(payload))
        .await
        .map_err(|err| err.to_string())?
        .map_err(map_portal_error)
}

#[cfg(feature = "desktop")]
#[tauri::command]
async fn discard_icon(state: State<'_, AppState>, entity: EntityRef) -> Result<(), String> {
    let catalog = state.catalog();
    tauri::async_runtime::spawn_blocking(move || catalog.discard_icon(entity))
        .await
        .map_err(|err| err.to_string())
}

#[cfg(feature = "desktop")]
#[tauri::command]
async fn upload_icons(state: State<'_, AppState>) -> Result<UploadOutcome, String> {
    state.catalog().upload_pending().await.map_err(map_portal_error)
}

#[cfg(feature = "desktop")]
#[tauri::command]
async fn list_endpoints(state: State<'_, AppState>) -> Result<EndpointListResponse, String> {
    Ok(build_endpoint_response(state.settings().endpoint()))
}

#[cfg(feature = "desktop")]
#[tauri::command]
async fn set_endpoint(
    state: State<'_, AppState>,
    endpoint_id: String,
) -> Result<EndpointListResponse, String> {
    let endpoint = ApiEndpoint::from_id(&endpoint_id)
        .ok_or_else(|| format!("unknown endpoint '{endpoint_id}'"))?;

    let settings = state.settings();
    let updated = tauri::async_runtime::spawn_blocking(move || settings.set_endpoint(endpoint))
        .await
        .map_err(|err| err.to_string())?
        .map_err(map_portal_error)?;

    // responses still in flight belong to the old endpoint; drop them
    state.catalog().invalidate();

    Ok(build_endpoint_response(updated.endpoint))
}

#[cfg(feature = "desktop")]
#[tauri::command]
async fn probe_endpoint(endpoint_id: String) -> Result<bool, String> {
    let endpoint = ApiEndpoint::from_id(&endpoint_id)
        .ok_or_else(|| format!("unknown endpoint '{endpoint_id}'"))?;

    tauri::async_runtime::spawn_blocking(move || check_api_availability(endpoint.base_url()))
        .await
        .map_err(|err| err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_response_lists_every_option() {
        let response = build_endpoint_response(ApiEndpoint::Local);
        assert_eq!(response.active, "local");
        let ids: Vec<_> = response.options.iter().map(|option| option.id.as_str()).collect();
        assert_eq!(ids, vec!["local", "remote"]);
    }
}
