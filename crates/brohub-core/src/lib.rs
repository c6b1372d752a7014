//! Core domain types for the BRO delivery hub: task and organisation models,
//! the typed source-document payloads, configuration, and credential encryption.

pub mod config;
pub mod encryption;
pub mod error;
pub mod models;
pub mod payloads;

pub use config::Config;
pub use encryption::EncryptionService;
pub use error::{AppError, ValidationIssue};
