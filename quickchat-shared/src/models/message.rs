use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::timestamp::Timestamp;

/// A single direct message between two users.
///
/// Immutable once created except for `seen`, which transitions
/// false → true exactly once; re-marking a seen message is a no-op.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    /// Unique, server-assigned identifier.
    pub id: Uuid,

    /// ID of the user who sent the message.
    pub sender_id: Uuid,

    /// ID of the user the message is addressed to.
    pub receiver_id: Uuid,

    /// Text body, when present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    /// URL of an uploaded image, when present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,

    /// Whether the receiver has seen this message.
    pub seen: bool,

    /// Timestamp assigned at persistence time; conversation order.
    pub created_at: Timestamp,
}

/// Payload for sending a message to another user.
///
/// `image` carries either a raw upload payload (e.g. a data URL captured by
/// the client) or an already-hosted URL; raw payloads are handed to the
/// blob-storage collaborator before the message is persisted.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SendMessageRequest {
    /// Text body, when present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    /// Image payload or URL, when present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl SendMessageRequest {
    /// True when the request carries neither text nor an image; such a
    /// request is rejected before anything is persisted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.text.as_deref().is_none_or(str::is_empty)
            && self.image.as_deref().is_none_or(str::is_empty)
    }
}

/// Response to a successful send: the persisted message, used by the sender
/// for its optimistic history append.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SendMessageResponse {
    /// The message as persisted, including its server-assigned id.
    pub message: Message,
}

/// Conversation history returned by a pull, ordered by creation time. The
/// seen flags reflect server state as it stood before the fetch's bulk-seen
/// side effect.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConversationResponse {
    /// Messages in both directions, oldest first.
    pub messages: Vec<Message>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn sample() -> Message {
        Message {
            id: Uuid::new_v4(),
            sender_id: Uuid::new_v4(),
            receiver_id: Uuid::new_v4(),
            text: Some("hi".into()),
            image_url: None,
            seen: false,
            created_at: Timestamp(Utc.with_ymd_and_hms(2025, 3, 8, 14, 30, 0).unwrap()),
        }
    }

    #[test]
    fn serialization_round_trip() {
        let message = sample();
        let json = serde_json::to_string(&message).unwrap();
        let back: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(back, message);
    }

    #[test]
    fn absent_image_is_omitted() {
        let json = serde_json::to_value(sample()).unwrap();
        assert!(json.get("image_url").is_none());
        assert_eq!(json["seen"], false);
    }

    #[test]
    fn empty_request_detection() {
        assert!(SendMessageRequest::default().is_empty());
        assert!(
            SendMessageRequest {
                text: Some(String::new()),
                image: None,
            }
            .is_empty()
        );
        assert!(
            !SendMessageRequest {
                text: None,
                image: Some("data:image/png;base64,AAAA".into()),
            }
            .is_empty()
        );
    }
}
