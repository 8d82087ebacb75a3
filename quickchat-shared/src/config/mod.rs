//! Application configuration.

pub mod server;

pub use server::{Config, ConfigError, LogFormat};
