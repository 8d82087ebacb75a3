use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A user as seen by other users: the contact-list projection of an
/// externally authenticated identity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    /// Unique identifier minted by the authentication collaborator.
    pub id: Uuid,

    /// Display name shown in the contact list.
    pub display_name: String,

    /// Optional avatar URL. Avatar changes never affect message semantics.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,

    /// Optional short bio.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
}

/// Contact list annotated with unseen-message counts, keyed by sender.
///
/// The count map is the server-side aggregate and is authoritative; clients
/// treat their incrementally maintained counters as a transient cache of it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContactsResponse {
    /// Every user other than the viewer.
    pub users: Vec<User>,

    /// Unseen message count per sender; absent senders have zero unseen.
    pub unseen_messages: HashMap<Uuid, i64>,
}

/// Profile fields an authenticated identity may refresh in the contact
/// directory. Avatar changes never affect message semantics.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UpdateProfileRequest {
    /// Display name shown in the contact list.
    pub display_name: String,

    /// Optional avatar URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,

    /// Optional short bio.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn optional_fields_are_omitted_when_absent() {
        let user = User {
            id: Uuid::new_v4(),
            display_name: "Alice".into(),
            avatar_url: None,
            bio: None,
        };

        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("avatar_url").is_none());
        assert!(json.get("bio").is_none());
    }

    #[test]
    fn contacts_response_round_trip() {
        let sender = Uuid::new_v4();
        let response = ContactsResponse {
            users: vec![User {
                id: sender,
                display_name: "Bob".into(),
                avatar_url: Some("https://cdn.example/bob.png".into()),
                bio: Some("hey there".into()),
            }],
            unseen_messages: HashMap::from([(sender, 3)]),
        };

        let serialized = serde_json::to_string(&response).unwrap();
        let deserialized: ContactsResponse = serde_json::from_str(&serialized).unwrap();
        assert_eq!(deserialized, response);
        assert_eq!(deserialized.unseen_messages[&sender], 3);
    }
}
