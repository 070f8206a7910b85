//! Application state shared across handlers.

use std::sync::Arc;
use warren_db::Database;

use crate::config::ServerConfig;
use crate::uploads::UploadStore;

/// Shared handler state. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ServerConfig,
    db: Database,
    uploads: UploadStore,
}

impl AppState {
    pub fn new(config: ServerConfig, db: Database) -> Self {
        let uploads = UploadStore::new(
            config.storage.uploads_dir.clone(),
            config.storage.max_upload_bytes,
        );

        AppState {
            inner: Arc::new(AppStateInner {
                config,
                db,
                uploads,
            }),
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.inner.config
    }

    pub fn db(&self) -> &Database {
        &self.inner.db
    }

    pub fn uploads(&self) -> &UploadStore {
        &self.inner.uploads
    }

    /// The configured admin token, if the admin routes are guarded.
    pub fn admin_token(&self) -> Option<&str> {
        self.inner.config.admin.token.as_deref()
    }
}
