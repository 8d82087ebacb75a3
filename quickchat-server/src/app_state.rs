use std::sync::Arc;

use crate::services::{blob_store::BlobStore, presence::PresenceRegistry};

/// Application state shared across all routes.
///
/// The pool is optional so route plumbing stays testable without a live
/// database; handlers surface its absence as `store_unavailable`.
#[derive(Clone)]
pub struct AppState {
    pub(crate) pool: Option<sqlx::PgPool>,
    pub(crate) presence: Arc<PresenceRegistry>,
    pub(crate) blob_store: Arc<dyn BlobStore>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("pool", &self.pool.is_some())
            .finish_non_exhaustive()
    }
}
