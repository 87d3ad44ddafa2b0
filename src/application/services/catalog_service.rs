use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::application::dtos::{
    CatalogSource, CatalogView, CategoryPanel, IconDraftView, ServiceRow, StageIconRequest,
    UploadOutcome,
};
use crate::application::services::icon_drafts::{IconDraft, IconDrafts, PreviewStore};
use crate::domain::{
    organize, Catalog, Category, CategoryGroup, EntityRef, ExpansionState, HomePayload, IconUpload,
    PortalError, ServiceNode,
};

/// Contract for the catalog side of the remote API.
#[async_trait]
pub trait CatalogApi: Send + Sync {
    async fn fetch_home(&self) -> Result<HomePayload, PortalError>;

    async fn fetch_admin_catalog(&self) -> Result<Vec<Category>, PortalError>;

    async fn upload_service_icons(&self, uploads: &[IconUpload]) -> Result<(), PortalError>;

    async fn upload_category_icons(&self, uploads: &[IconUpload]) -> Result<(), PortalError>;
}

struct LoadedCatalog {
    source: CatalogSource,
    catalog: Catalog,
}

/// Orchestrator for the admin icon screens: fetches and organizes the
/// catalog, owns expansion state and the draft ledger, and drives the batched
/// icon upload.
pub struct CatalogService {
    api: Arc<dyn CatalogApi>,
    state: RwLock<Option<LoadedCatalog>>,
    expansion: Mutex<ExpansionState>,
    drafts: Mutex<IconDrafts>,
    generation: AtomicU64,
}

impl CatalogService {
    pub fn new(api: Arc<dyn CatalogApi>, previews: Arc<dyn PreviewStore>) -> Self {
        Self {
            api,
            state: RwLock::new(None),
            expansion: Mutex::new(ExpansionState::default()),
            drafts: Mutex::new(IconDrafts::new(previews)),
            generation: AtomicU64::new(0),
        }
    }

    /// Fetches and organizes one catalog source, committing the result only
    /// if no endpoint change happened while the request was in flight.
    pub async fn load(&self, source: CatalogSource) -> Result<CatalogView, PortalError> {
        let generation = self.generation.load(Ordering::Acquire);

        let catalog = match source {
            CatalogSource::Home => {
                let payload = self.api.fetch_home().await?;
                organize(payload.service_categories, payload.services)?
            }
            CatalogSource::Admin => {
                let categories = self.api.fetch_admin_catalog().await?;
                organize(categories, Vec::new())?
            }
        };

        {
            let mut state = self.state.write();
            if self.generation.load(Ordering::Acquire) != generation {
                debug!(?source, "discarding catalog response from a superseded endpoint");
                return Err(PortalError::Superseded);
            }
            debug!(?source, services = catalog.service_count(), "catalog loaded");
            *state = Some(LoadedCatalog { source, catalog });
        }

        self.view()
    }

    /// Drops the current snapshot and bumps the request generation so that
    /// responses still in flight are discarded on arrival. Called when the
    /// endpoint toggle flips.
    pub fn invalidate(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        *self.state.write() = None;
    }

    /// Joins the organized forest with expansion and draft state into the
    /// payload the webview renders.
    pub fn view(&self) -> Result<CatalogView, PortalError> {
        let state = self.state.read();
        let loaded = state
            .as_ref()
            .ok_or_else(|| PortalError::validation("catalog has not been loaded yet"))?;

        let expansion = self.expansion.lock();
        let drafts = self.drafts.lock();

        let categories = loaded
            .catalog
            .categories
            .iter()
            .map(|group| panel_of(group, &expansion, &drafts))
            .collect();
        let uncategorized = loaded
            .catalog
            .uncategorized
            .iter()
            .map(|node| row_of(node, &expansion, &drafts))
            .collect();

        Ok(CatalogView {
            source: loaded.source,
            categories,
            uncategorized,
            pending_count: drafts.len(),
        })
    }

    /// Flips one node's expanded flag; returns the new state.
    pub fn toggle_node(&self, node: EntityRef) -> bool {
        self.expansion.lock().toggle(node)
    }

    /// Stages a selected file as the pending icon for one entity.
    pub fn stage_icon(&self, request: StageIconRequest) -> Result<IconDraftView, PortalError> {
        let entity = request.entity();
        let bytes = request.decode_bytes()?;

        let mut drafts = self.drafts.lock();
        let draft = drafts.stage(entity, request.file_name, request.content_type, bytes)?;
        Ok(draft_view(entity, draft))
    }

    /// Discards one pending edit; absent keys are a no-op.
    pub fn discard_icon(&self, entity: EntityRef) {
        self.drafts.lock().discard(entity);
    }

    pub fn pending_count(&self) -> usize {
        self.drafts.lock().len()
    }

    /// Uploads every pending edit in two batched submissions, one per entity
    /// kind, issued concurrently. The step succeeds as a unit: on any failure
    /// the ledger is left fully intact for retry, even the side whose own
    /// submission went through. On success the ledger is cleared and a
    /// refetch of the current source is spawned without being awaited.
    pub async fn upload_pending(self: Arc<Self>) -> Result<UploadOutcome, PortalError> {
        let (services, categories) = self.drafts.lock().partition_for_upload();
        if services.is_empty() && categories.is_empty() {
            return Err(PortalError::validation("no pending icon edits to upload"));
        }

        let service_submission = async {
            if services.is_empty() {
                Ok(())
            } else {
                self.api.upload_service_icons(&services).await
            }
        };
        let category_submission = async {
            if categories.is_empty() {
                Ok(())
            } else {
                self.api.upload_category_icons(&categories).await
            }
        };

        // both submissions run to completion; a failure on one side must not
        // cancel the other
        let (service_result, category_result) = tokio::join!(service_submission, category_submission);
        if let Err(err) = service_result.and(category_result) {
            warn!(error = %err, "icon upload failed; pending edits retained");
            return Err(err);
        }

        self.drafts.lock().clear_all();
        info!(
            services = services.len(),
            categories = categories.len(),
            "icon upload complete"
        );

        let refresh = self.state.read().as_ref().map(|loaded| loaded.source);
        if let Some(source) = refresh {
            let service = Arc::clone(&self);
            tokio::spawn(async move {
                if let Err(err) = service.load(source).await {
                    debug!(error = %err, "post-upload refetch failed");
                }
            });
        }

        Ok(UploadOutcome {
            service_icons: services.len(),
            category_icons: categories.len(),
        })
    }
}

fn draft_view(entity: EntityRef, draft: &IconDraft) -> IconDraftView {
    IconDraftView {
        entity,
        file_name: draft.file_name.clone(),
        preview_path: draft.preview.path.clone(),
        preview_url: format!("data:image/png;base64,{}", BASE64.encode(&draft.bytes)),
    }
}

fn panel_of(group: &CategoryGroup, expansion: &ExpansionState, drafts: &IconDrafts) -> CategoryPanel {
    let entity = group.entity();
    CategoryPanel {
        id: group.id,
        name: group.name.clone(),
        description: group.description.clone(),
        icon: group.icon.clone(),
        expanded: expansion.is_expanded(entity),
        pending: drafts.get(&entity).map(|draft| draft_view(entity, draft)),
        services: group
            .services
            .iter()
            .map(|node| row_of(node, expansion, drafts))
            .collect(),
    }
}

fn row_of(node: &ServiceNode, expansion: &ExpansionState, drafts: &IconDrafts) -> ServiceRow {
    let entity = node.entity();
    ServiceRow {
        id: node.id,
        name: node.name.clone(),
        description: node.description.clone(),
        icon: node.icon.clone(),
        depth: node.depth,
        expanded: expansion.is_expanded(entity),
        pending: drafts.get(&entity).map(|draft| draft_view(entity, draft)),
        children: node
            .children
            .iter()
            .map(|child| row_of(child, expansion, drafts))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{EntityKind, PreviewHandle, Service, PNG_CONTENT_TYPE};
    use std::path::PathBuf;
    use std::time::Duration;
    use tokio::sync::Notify;
    use uuid::Uuid;

    struct NullPreviews;

    impl PreviewStore for NullPreviews {
        fn allocate(&self, _entity: EntityRef, _bytes: &[u8]) -> Result<PreviewHandle, PortalError> {
            let token = Uuid::new_v4();
            Ok(PreviewHandle {
                token,
                path: PathBuf::from(format!("{token}.png")),
            })
        }

        fn release(&self, _handle: &PreviewHandle) {}
    }

    #[derive(Default)]
    struct MockApi {
        fail_service_uploads: bool,
        fail_category_uploads: bool,
        home_fetches: Mutex<usize>,
        service_calls: Mutex<Vec<Vec<i64>>>,
        category_calls: Mutex<Vec<Vec<i64>>>,
        fetch_started: Option<Arc<Notify>>,
        fetch_release: Option<Arc<Notify>>,
    }

    #[async_trait]
    impl CatalogApi for MockApi {
        async fn fetch_home(&self) -> Result<HomePayload, PortalError> {
            if let (Some(started), Some(release)) = (&self.fetch_started, &self.fetch_release) {
                started.notify_one();
                release.notified().await;
            }
            *self.home_fetches.lock() += 1;
            Ok(HomePayload {
                services: vec![Service {
                    id: 10,
                    name: "X".into(),
                    description: String::new(),
                    icon: None,
                    parent_category_id: Some(1),
                    services: Vec::new(),
                }],
                service_categories: vec![Category {
                    id: 1,
                    name: "A".into(),
                    description: None,
                    icon: None,
                    services: Vec::new(),
                }],
            })
        }

        async fn fetch_admin_catalog(&self) -> Result<Vec<Category>, PortalError> {
            Ok(Vec::new())
        }

        async fn upload_service_icons(&self, uploads: &[IconUpload]) -> Result<(), PortalError> {
            self.service_calls
                .lock()
                .push(uploads.iter().map(|upload| upload.entity_id).collect());
            if self.fail_service_uploads {
                Err(PortalError::http(500, "service icon upload failed"))
            } else {
                Ok(())
            }
        }

        async fn upload_category_icons(&self, uploads: &[IconUpload]) -> Result<(), PortalError> {
            self.category_calls
                .lock()
                .push(uploads.iter().map(|upload| upload.entity_id).collect());
            if self.fail_category_uploads {
                Err(PortalError::http(500, "category icon upload failed"))
            } else {
                Ok(())
            }
        }
    }

    fn service_with(api: MockApi) -> (Arc<MockApi>, Arc<CatalogService>) {
        let api = Arc::new(api);
        let catalog = Arc::new(CatalogService::new(
            Arc::clone(&api) as Arc<dyn CatalogApi>,
            Arc::new(NullPreviews),
        ));
        (api, catalog)
    }

    fn stage_request(kind: EntityKind, id: i64) -> StageIconRequest {
        StageIconRequest {
            kind,
            id,
            file_name: format!("{id}.png"),
            content_type: PNG_CONTENT_TYPE.into(),
            data_base64: BASE64.encode([1u8, 2, 3]),
        }
    }

    #[tokio::test]
    async fn load_joins_catalog_with_draft_and_expansion_state() {
        let (_, catalog) = service_with(MockApi::default());

        catalog.stage_icon(stage_request(EntityKind::Service, 10)).unwrap();
        catalog.toggle_node(EntityRef::category(1));

        let view = catalog.load(CatalogSource::Home).await.unwrap();
        assert_eq!(view.categories.len(), 1);
        assert!(view.categories[0].expanded);
        assert!(view.categories[0].services[0].pending.is_some());
        assert_eq!(view.pending_count, 1);
    }

    #[tokio::test]
    async fn successful_upload_clears_ledger_and_issues_both_submissions() {
        let (api, catalog) = service_with(MockApi::default());
        catalog.load(CatalogSource::Home).await.unwrap();

        catalog.stage_icon(stage_request(EntityKind::Service, 10)).unwrap();
        catalog.stage_icon(stage_request(EntityKind::Category, 1)).unwrap();

        let outcome = Arc::clone(&catalog).upload_pending().await.unwrap();

        assert_eq!(outcome.service_icons, 1);
        assert_eq!(outcome.category_icons, 1);
        assert_eq!(catalog.pending_count(), 0);
        assert_eq!(api.service_calls.lock().as_slice(), &[vec![10]]);
        assert_eq!(api.category_calls.lock().as_slice(), &[vec![1]]);

        // the refetch is spawned fire-and-forget; give it a moment to land
        for _ in 0..50 {
            if *api.home_fetches.lock() >= 2 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(*api.home_fetches.lock() >= 2);
    }

    #[tokio::test]
    async fn failed_side_retains_every_pending_edit() {
        let (api, catalog) = service_with(MockApi {
            fail_service_uploads: true,
            ..MockApi::default()
        });

        catalog.stage_icon(stage_request(EntityKind::Service, 10)).unwrap();
        catalog.stage_icon(stage_request(EntityKind::Category, 1)).unwrap();

        let err = Arc::clone(&catalog).upload_pending().await.unwrap_err();

        assert!(matches!(err, PortalError::Http { status: 500, .. }));
        // the category submission went through, but nothing is cleared
        assert_eq!(api.category_calls.lock().len(), 1);
        assert_eq!(catalog.pending_count(), 2);
    }

    #[tokio::test]
    async fn empty_partition_is_never_issued() {
        let (api, catalog) = service_with(MockApi::default());

        catalog.stage_icon(stage_request(EntityKind::Category, 1)).unwrap();
        catalog.stage_icon(stage_request(EntityKind::Category, 2)).unwrap();

        Arc::clone(&catalog).upload_pending().await.unwrap();

        assert!(api.service_calls.lock().is_empty());
        assert_eq!(api.category_calls.lock().as_slice(), &[vec![1, 2]]);
    }

    #[tokio::test]
    async fn upload_without_pending_edits_is_rejected_locally() {
        let (api, catalog) = service_with(MockApi::default());

        let err = Arc::clone(&catalog).upload_pending().await.unwrap_err();

        assert!(matches!(err, PortalError::Validation(_)));
        assert!(api.service_calls.lock().is_empty());
        assert!(api.category_calls.lock().is_empty());
    }

    #[tokio::test]
    async fn endpoint_change_mid_flight_discards_the_stale_response() {
        let started = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        let (_, catalog) = service_with(MockApi {
            fetch_started: Some(Arc::clone(&started)),
            fetch_release: Some(Arc::clone(&release)),
            ..MockApi::default()
        });

        let in_flight = tokio::spawn({
            let catalog = Arc::clone(&catalog);
            async move { catalog.load(CatalogSource::Home).await }
        });

        tokio::time::timeout(Duration::from_secs(1), started.notified())
            .await
            .expect("load never reached the API");
        catalog.invalidate();
        release.notify_one();

        let result = in_flight.await.unwrap();
        assert!(matches!(result, Err(PortalError::Superseded)));
        assert!(catalog.view().is_err());
    }

    #[tokio::test]
    async fn rejected_stage_requests_do_not_reach_the_ledger() {
        let (_, catalog) = service_with(MockApi::default());

        let mut bad_payload = stage_request(EntityKind::Service, 10);
        bad_payload.data_base64 = "not base64!".into();
        assert!(matches!(
            catalog.stage_icon(bad_payload),
            Err(PortalError::Validation(_))
        ));

        let mut bad_type = stage_request(EntityKind::Service, 10);
        bad_type.content_type = "image/svg+xml".into();
        assert!(matches!(
            catalog.stage_icon(bad_type),
            Err(PortalError::InvalidFileType(_))
        ));

        assert_eq!(catalog.pending_count(), 0);
    }
}
