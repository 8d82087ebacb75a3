//! Wire models shared between the server and its clients.

pub mod events;
pub mod message;
pub mod timestamp;
pub mod user;

pub use events::PushEvent;
pub use message::{ConversationResponse, Message, SendMessageRequest, SendMessageResponse};
pub use timestamp::Timestamp;
pub use user::{ContactsResponse, UpdateProfileRequest, User};
