//! Filesystem-backed preview handles for staged icons.
//!
//! Staged PNGs are rendered into a cache directory so the webview can show
//! them before upload; releasing a handle removes the file again. A handle
//! whose file is already gone counts as released.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::warn;
use uuid::Uuid;

use crate::application::services::PreviewStore;
use crate::domain::{EntityRef, PortalError, PreviewHandle};

pub struct FsPreviewCache {
    dir: PathBuf,
}

impl FsPreviewCache {
    /// Opens (or creates) the preview directory under the data dir.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, PortalError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(|err| {
            PortalError::storage(format!("failed to create preview directory {dir:?}: {err}"))
        })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl PreviewStore for FsPreviewCache {
    fn allocate(&self, _entity: EntityRef, bytes: &[u8]) -> Result<PreviewHandle, PortalError> {
        let token = Uuid::new_v4();
        let path = self.dir.join(format!("{token}.png"));
        fs::write(&path, bytes)
            .map_err(|err| PortalError::storage(format!("failed to write preview: {err}")))?;
        Ok(PreviewHandle { token, path })
    }

    fn release(&self, handle: &PreviewHandle) {
        if let Err(err) = fs::remove_file(&handle.path) {
            if err.kind() != ErrorKind::NotFound {
                warn!(path = ?handle.path, error = %err, "failed to remove preview file");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocate_writes_and_release_removes() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FsPreviewCache::open(dir.path().join("previews")).unwrap();

        let handle = cache.allocate(EntityRef::service(10), &[0x89, 0x50, 0x4e, 0x47]).unwrap();
        assert!(handle.path.exists());
        assert_eq!(fs::read(&handle.path).unwrap(), vec![0x89, 0x50, 0x4e, 0x47]);

        cache.release(&handle);
        assert!(!handle.path.exists());

        // a second release of the same handle is harmless
        cache.release(&handle);
    }
}
