//! Error types for LEADLINE operations

use crate::{EntityId, EntityKind, StreamChannel};
use thiserror::Error;

/// Validation errors, raised before any mutation reaches the store.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required field missing: {field}")]
    RequiredFieldMissing { field: String },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Malformed email address: {value}")]
    MalformedEmail { value: String },
}

/// Persistence boundary errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("Entity not found: {kind} with id {id}")]
    NotFound { kind: EntityKind, id: EntityId },

    #[error("Insert failed for {kind}: {reason}")]
    InsertFailed { kind: EntityKind, reason: String },

    #[error("Update failed for {kind} with id {id}: {reason}")]
    UpdateFailed {
        kind: EntityKind,
        id: EntityId,
        reason: String,
    },

    #[error("Delete failed for {kind} with id {id}: {reason}")]
    DeleteFailed {
        kind: EntityKind,
        id: EntityId,
        reason: String,
    },

    #[error("Fetch failed: {reason}")]
    FetchFailed { reason: String },

    #[error("Store unavailable: {reason}")]
    Unavailable { reason: String },
}

/// Change-stream transport errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StreamError {
    #[error("Subscribe failed on {channel} channel: {reason}")]
    SubscribeFailed {
        channel: StreamChannel,
        reason: String,
    },

    #[error("Disconnected from {channel} channel: {reason}")]
    Disconnected {
        channel: StreamChannel,
        reason: String,
    },

    #[error("Failed to decode notification: {reason}")]
    Decode { reason: String },
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required configuration field: {field}")]
    MissingRequired { field: &'static str },

    #[error("Invalid config value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

/// Master error type for all LEADLINE errors.
#[derive(Debug, Clone, Error)]
pub enum LeadlineError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Stream error: {0}")]
    Stream(#[from] StreamError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

/// Result type alias for LEADLINE operations.
pub type LeadlineResult<T> = Result<T, LeadlineError>;
