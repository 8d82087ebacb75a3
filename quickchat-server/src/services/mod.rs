pub mod blob_store;
pub mod delivery;
pub mod message_service;
pub mod presence;
pub mod user_service;
