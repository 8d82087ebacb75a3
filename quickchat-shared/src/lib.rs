#![cfg_attr(not(test), forbid(unsafe_code))]
#![deny(warnings, clippy::pedantic)]
#![allow(clippy::multiple_crate_versions)]

pub mod config;
pub mod models;
pub mod reconcile;

pub use models::events::PushEvent;
pub use models::message::{ConversationResponse, Message, SendMessageRequest, SendMessageResponse};
pub use models::timestamp::Timestamp;
pub use models::user::{ContactsResponse, UpdateProfileRequest, User};
pub use reconcile::{ChatView, PushOutcome};
