use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::message::Message;

/// Server-to-client events carried over the push channel.
///
/// `NewMessage` targets the message's receiver only; `Presence` is broadcast
/// to every connected channel whenever the online set changes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum PushEvent {
    /// A message addressed to the receiving client was just persisted.
    NewMessage(Message),

    /// The set of currently online user ids.
    Presence {
        /// Users with an open push channel right now.
        online: Vec<Uuid>,
    },
}

impl PushEvent {
    /// Event name used on the wire (SSE event field).
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            PushEvent::NewMessage(_) => "new_message",
            PushEvent::Presence { .. } => "presence",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presence_event_tags_by_name() {
        let event = PushEvent::Presence {
            online: vec![Uuid::new_v4()],
        };

        assert_eq!(event.name(), "presence");
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "presence");
        assert!(json["data"]["online"].is_array());
    }

    #[test]
    fn new_message_round_trip() {
        let event = PushEvent::NewMessage(Message {
            id: Uuid::new_v4(),
            sender_id: Uuid::new_v4(),
            receiver_id: Uuid::new_v4(),
            text: Some("ping".into()),
            image_url: None,
            seen: false,
            created_at: crate::Timestamp::now(),
        });

        let json = serde_json::to_string(&event).unwrap();
        let back: PushEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
        assert_eq!(back.name(), "new_message");
    }
}
