//! Server-push channel.
//!
//! One SSE stream per connected user. Opening the stream registers the user
//! in the presence registry (superseding any prior connection); the stream
//! dropping — client disconnect, network loss — unregisters it, guarded
//! against races with a newer registration by the handle id.

use std::{convert::Infallible, sync::Arc, time::Duration};

use axum::{
    extract::Extension,
    response::sse::{Event, KeepAlive, Sse},
};
use futures_util::Stream;
use shared::config::server::Config;
use tokio_stream::{StreamExt, wrappers::ReceiverStream};
use tracing::info;
use uuid::Uuid;

use crate::{
    app_state::AppState,
    http::error::{ApiError, AppResult},
    middleware::request_context::RequestContext,
    services::presence::PresenceRegistry,
};

/// Unregisters the connection when the SSE stream is dropped. A stale
/// handle (superseded by a reconnect) makes the unregister a no-op inside
/// the registry.
struct PresenceGuard {
    registry: Arc<PresenceRegistry>,
    handle_id: Uuid,
}

impl Drop for PresenceGuard {
    fn drop(&mut self) {
        self.registry.unregister(self.handle_id);
    }
}

/// Server-sent events endpoint carrying `new_message` and `presence` events.
pub async fn sse_handler(
    Extension(config): Extension<Arc<Config>>,
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(context): Extension<RequestContext>,
) -> AppResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    let user_id = context
        .user_id
        .ok_or_else(|| ApiError::unauthorized("push channel requires an identity"))?;

    info!(%user_id, "establishing push channel");

    let registry = Arc::clone(&app_state.presence);
    let (handle_id, receiver) = registry.register(user_id);
    let guard = PresenceGuard {
        registry,
        handle_id,
    };

    let stream = ReceiverStream::new(receiver).map(move |event| {
        // The guard lives inside the stream; dropping the stream
        // unregisters the connection.
        let _ = &guard;
        let data = serde_json::to_string(&event)
            .unwrap_or_else(|_| "{\"event\":\"error\"}".to_string());
        Ok::<_, Infallible>(Event::default().event(event.name()).data(data))
    });

    let keepalive = KeepAlive::new()
        .interval(Duration::from_secs(config.sse.heartbeat_seconds.max(5)))
        .text("keep-alive");

    Ok(Sse::new(stream).keep_alive(keepalive))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::blob_store::HttpBlobStore;
    use shared::config::server::BlobStoreConfig;

    fn test_state() -> Arc<AppState> {
        Arc::new(AppState {
            pool: None,
            presence: Arc::new(PresenceRegistry::new(8)),
            blob_store: Arc::new(HttpBlobStore::from_config(&BlobStoreConfig::default())),
        })
    }

    #[tokio::test]
    async fn rejects_anonymous_connections() {
        let result = sse_handler(
            Extension(Arc::new(Config::default())),
            Extension(test_state()),
            Extension(RequestContext::default()),
        )
        .await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn registers_presence_on_connect_and_clears_on_drop() {
        let state = test_state();
        let user_id = Uuid::new_v4();
        let context = RequestContext {
            request_id: "req-1".into(),
            user_id: Some(user_id),
        };

        let sse = sse_handler(
            Extension(Arc::new(Config::default())),
            Extension(Arc::clone(&state)),
            Extension(context),
        )
        .await
        .expect("stream established");

        assert_eq!(state.presence.online_users(), vec![user_id]);

        drop(sse);
        assert!(state.presence.online_users().is_empty());
    }
}
