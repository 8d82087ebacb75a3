use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
};
use sqlx::PgPool;
use tracing::instrument;
use uuid::Uuid;

use crate::{
    app_state::AppState,
    http::error::{ApiError, AppResult},
    middleware::request_context::RequestContext,
    services::{
        delivery::DeliveryCoordinator,
        message_service::{MessageService, MessageStore},
        user_service::UserService,
    },
};
use shared::{
    ContactsResponse, ConversationResponse, SendMessageRequest, SendMessageResponse,
    UpdateProfileRequest, User,
};

pub fn routes() -> Router {
    Router::new()
        .route("/api/messages/users", get(contacts))
        .route("/api/messages/send/{receiver_id}", post(send_message))
        .route("/api/messages/mark/{message_id}", put(mark_seen))
        .route("/api/messages/{other_id}", get(fetch_conversation))
        .route("/api/users/me", put(update_profile))
}

fn require_user(context: &RequestContext) -> AppResult<Uuid> {
    context
        .user_id
        .ok_or_else(|| ApiError::unauthorized("request has no authenticated identity"))
}

fn require_pool(app_state: &AppState) -> AppResult<PgPool> {
    app_state
        .pool
        .clone()
        .ok_or_else(|| ApiError::store_unavailable("no database pool configured"))
}

fn delivery(app_state: &AppState, pool: PgPool) -> DeliveryCoordinator {
    DeliveryCoordinator::new(
        Arc::new(MessageService::new(pool)),
        Arc::clone(&app_state.presence),
        Arc::clone(&app_state.blob_store),
    )
}

/// Contact list plus unseen counts, with the current online set available to
/// the client over the push channel.
#[instrument(skip(app_state, context))]
async fn contacts(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(context): Extension<RequestContext>,
) -> AppResult<Json<ContactsResponse>> {
    let viewer_id = require_user(&context)?;
    let pool = require_pool(&app_state)?;

    let users = UserService::new(pool.clone()).list_contacts(viewer_id).await?;
    let unseen_messages = MessageService::new(pool).unseen_counts_for(viewer_id).await?;

    Ok(Json(ContactsResponse {
        users,
        unseen_messages,
    }))
}

#[instrument(skip(app_state, context, payload))]
async fn send_message(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(context): Extension<RequestContext>,
    Path(receiver_id): Path<Uuid>,
    Json(payload): Json<SendMessageRequest>,
) -> AppResult<impl IntoResponse> {
    let sender_id = require_user(&context)?;
    let pool = require_pool(&app_state)?;

    let message = delivery(&app_state, pool)
        .send(sender_id, receiver_id, payload)
        .await?;

    Ok((StatusCode::CREATED, Json(SendMessageResponse { message })))
}

#[instrument(skip(app_state, context))]
async fn fetch_conversation(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(context): Extension<RequestContext>,
    Path(other_id): Path<Uuid>,
) -> AppResult<Json<ConversationResponse>> {
    let viewer_id = require_user(&context)?;
    let pool = require_pool(&app_state)?;

    let messages = delivery(&app_state, pool)
        .fetch_conversation(viewer_id, other_id)
        .await?;

    Ok(Json(ConversationResponse { messages }))
}

#[instrument(skip(app_state, context))]
async fn mark_seen(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(context): Extension<RequestContext>,
    Path(message_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    require_user(&context)?;
    let pool = require_pool(&app_state)?;

    delivery(&app_state, pool).mark_seen(message_id).await?;

    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(app_state, context, payload))]
async fn update_profile(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(context): Extension<RequestContext>,
    Json(payload): Json<UpdateProfileRequest>,
) -> AppResult<Json<User>> {
    let user_id = require_user(&context)?;
    let pool = require_pool(&app_state)?;

    let user = UserService::new(pool)
        .upsert_user(&User {
            id: user_id,
            display_name: payload.display_name,
            avatar_url: payload.avatar_url,
            bio: payload.bio,
        })
        .await?;

    Ok(Json(user))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn require_user_rejects_anonymous_context() {
        let err = require_user(&RequestContext::default()).unwrap_err();
        assert!(err.to_string().contains("unauthorized"));
    }

    #[test]
    fn require_user_returns_identity() {
        let user_id = Uuid::new_v4();
        let context = RequestContext {
            request_id: "req-1".into(),
            user_id: Some(user_id),
        };
        assert_eq!(require_user(&context).unwrap(), user_id);
    }
}
