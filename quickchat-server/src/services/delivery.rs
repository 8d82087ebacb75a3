//! Delivery coordinator.
//!
//! Orchestrates a send end to end: validate, exchange a raw image payload
//! for a URL, persist, then push to the receiver's live channel when one is
//! registered. Push is fire-and-forget — the message is already durable and
//! recoverable on the receiver's next pull, so a failed push never fails the
//! send and is never retried here.

use std::sync::Arc;

use shared::{Message, PushEvent, SendMessageRequest};
use thiserror::Error;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::services::blob_store::{BlobStore, BlobStoreError};
use crate::services::message_service::MessageStore;
use crate::services::presence::PresenceRegistry;

/// Failures a send or fetch reports to its caller. The caller keeps the
/// typed input intact on any of these so the user may retry.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// Neither text nor image was supplied.
    #[error("message must carry text or an image")]
    InvalidMessage,
    /// The blob-storage collaborator failed; nothing was persisted.
    #[error(transparent)]
    Upload(#[from] BlobStoreError),
    /// The persistence layer failed.
    #[error(transparent)]
    Store(#[from] sqlx::Error),
}

/// Coordinates persistence, presence lookup, and best-effort push.
#[derive(Clone)]
pub struct DeliveryCoordinator {
    messages: Arc<dyn MessageStore>,
    presence: Arc<PresenceRegistry>,
    blobs: Arc<dyn BlobStore>,
}

impl std::fmt::Debug for DeliveryCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeliveryCoordinator").finish_non_exhaustive()
    }
}

fn is_hosted_url(payload: &str) -> bool {
    payload.starts_with("http://") || payload.starts_with("https://")
}

impl DeliveryCoordinator {
    /// Assembles a coordinator over the message store, presence registry,
    /// and blob-storage collaborator.
    pub fn new(
        messages: Arc<dyn MessageStore>,
        presence: Arc<PresenceRegistry>,
        blobs: Arc<dyn BlobStore>,
    ) -> Self {
        Self {
            messages,
            presence,
            blobs,
        }
    }

    /// Sends a message: validates, resolves the image payload to a URL,
    /// persists with `seen = false`, then pushes `new_message` to the
    /// receiver's channel if one is registered. Returns the persisted
    /// message for the sender's optimistic append.
    ///
    /// # Errors
    /// [`DeliveryError::InvalidMessage`] when the payload is empty,
    /// [`DeliveryError::Upload`] when the blob store fails (nothing is
    /// persisted), [`DeliveryError::Store`] when persistence fails.
    #[instrument(name = "delivery.send", skip(self, request), err)]
    pub async fn send(
        &self,
        sender_id: Uuid,
        receiver_id: Uuid,
        request: SendMessageRequest,
    ) -> Result<Message, DeliveryError> {
        if request.is_empty() {
            return Err(DeliveryError::InvalidMessage);
        }

        let image_url = match request.image.as_deref().filter(|s| !s.is_empty()) {
            Some(payload) if is_hosted_url(payload) => Some(payload.to_string()),
            Some(payload) => Some(self.blobs.upload_image(payload).await?),
            None => None,
        };

        let text = request.text.filter(|t| !t.is_empty());
        let message = self
            .messages
            .create_message(sender_id, receiver_id, text, image_url)
            .await?;

        metrics::counter!("messages_sent_total").increment(1);

        // Best-effort: a receiver without a registered channel pulls the
        // message on their next fetch.
        if self
            .presence
            .push(receiver_id, PushEvent::NewMessage(message.clone()))
        {
            metrics::counter!("messages_pushed_total").increment(1);
        } else {
            debug!(%receiver_id, "receiver offline, message left for pull");
        }

        Ok(message)
    }

    /// Returns the full conversation between viewer and other, ordered by
    /// creation time, with the seen flags as they stood before this call;
    /// then bulk-transitions the other party's unseen messages to seen
    /// ("opening a conversation clears unseen").
    ///
    /// # Errors
    /// Returns [`DeliveryError::Store`] if a query fails.
    #[instrument(name = "delivery.fetch_conversation", skip(self), err)]
    pub async fn fetch_conversation(
        &self,
        viewer_id: Uuid,
        other_id: Uuid,
    ) -> Result<Vec<Message>, DeliveryError> {
        let history = self.messages.conversation_between(viewer_id, other_id).await?;
        let cleared = self
            .messages
            .mark_conversation_seen(viewer_id, other_id)
            .await?;
        if cleared > 0 {
            debug!(%viewer_id, %other_id, cleared, "cleared unseen messages");
        }
        Ok(history)
    }

    /// Idempotently acknowledges a single message. Silent success on an
    /// already-seen or unknown id.
    ///
    /// # Errors
    /// Returns [`DeliveryError::Store`] if the update fails.
    #[instrument(name = "delivery.mark_seen", skip(self), err)]
    pub async fn mark_seen(&self, message_id: Uuid) -> Result<(), DeliveryError> {
        self.messages.mark_seen(message_id).await?;
        Ok(())
    }
}
