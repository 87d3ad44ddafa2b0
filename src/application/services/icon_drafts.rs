use std::collections::hash_map::Entry;
use std::sync::Arc;

use ahash::AHashMap;
use tracing::debug;

use crate::domain::{EntityKind, EntityRef, IconUpload, PortalError, PreviewHandle, PNG_CONTENT_TYPE};

/// Allocator for the local preview resources attached to pending icon edits.
///
/// Whatever allocates a handle also releases it; the ledger guarantees every
/// allocated handle is released exactly once, including on teardown.
pub trait PreviewStore: Send + Sync {
    fn allocate(&self, entity: EntityRef, bytes: &[u8]) -> Result<PreviewHandle, PortalError>;

    fn release(&self, handle: &PreviewHandle);
}

/// One staged, unsaved icon selection.
#[derive(Debug)]
pub struct IconDraft {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
    pub preview: PreviewHandle,
}

/// The transient map of pending icon edits, at most one per entity.
///
/// Entries live between "user selects a file" and "user confirms upload" or
/// discards. They are only cleared in full after a successful upload
/// round-trip; a failed upload leaves the whole ledger intact for retry.
pub struct IconDrafts {
    previews: Arc<dyn PreviewStore>,
    entries: AHashMap<EntityRef, IconDraft>,
}

impl IconDrafts {
    pub fn new(previews: Arc<dyn PreviewStore>) -> Self {
        Self {
            previews,
            entries: AHashMap::new(),
        }
    }

    /// Stages `bytes` as the pending icon for `entity`, replacing any prior
    /// selection and releasing its preview handle.
    ///
    /// Anything but a declared `image/png` media type is rejected without
    /// touching the ledger, as is a preview allocation failure.
    pub fn stage(
        &mut self,
        entity: EntityRef,
        file_name: String,
        content_type: String,
        bytes: Vec<u8>,
    ) -> Result<&IconDraft, PortalError> {
        if content_type != PNG_CONTENT_TYPE {
            return Err(PortalError::InvalidFileType(content_type));
        }

        let preview = self.previews.allocate(entity, &bytes)?;
        let draft = IconDraft {
            file_name,
            content_type,
            bytes,
            preview,
        };

        match self.entries.entry(entity) {
            Entry::Occupied(mut slot) => {
                let previous = slot.insert(draft);
                self.previews.release(&previous.preview);
                Ok(&*slot.into_mut())
            }
            Entry::Vacant(slot) => Ok(&*slot.insert(draft)),
        }
    }

    /// Drops the pending edit for one entity. Absent keys are a no-op.
    pub fn discard(&mut self, entity: EntityRef) {
        if let Some(draft) = self.entries.remove(&entity) {
            self.previews.release(&draft.preview);
        }
    }

    /// Drops every pending edit, releasing every preview handle. Invoked
    /// after a confirmed successful upload and on teardown.
    pub fn clear_all(&mut self) {
        if self.entries.is_empty() {
            return;
        }
        debug!(count = self.entries.len(), "clearing pending icon edits");
        for (_, draft) in self.entries.drain() {
            self.previews.release(&draft.preview);
        }
    }

    pub fn get(&self, entity: &EntityRef) -> Option<&IconDraft> {
        self.entries.get(entity)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Splits the ledger into the two batched submissions, keyed by entity
    /// kind. An empty partition means that submission is not issued at all.
    pub fn partition_for_upload(&self) -> (Vec<IconUpload>, Vec<IconUpload>) {
        let mut services = Vec::new();
        let mut categories = Vec::new();

        for (entity, draft) in &self.entries {
            let upload = IconUpload {
                entity_id: entity.id,
                file_name: draft.file_name.clone(),
                bytes: draft.bytes.clone(),
            };
            match entity.kind {
                EntityKind::Service => services.push(upload),
                EntityKind::Category => categories.push(upload),
            }
        }

        // hash order is arbitrary; keep the multipart field order stable
        services.sort_by_key(|upload| upload.entity_id);
        categories.sort_by_key(|upload| upload.entity_id);

        (services, categories)
    }
}

impl Drop for IconDrafts {
    fn drop(&mut self) {
        self.clear_all();
    }
}
