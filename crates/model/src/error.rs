//! Error types for the profile model.

use thiserror::Error;

/// Errors produced by the profile model, serializer and store.
#[derive(Error, Debug)]
pub enum ModelError {
    /// The profile or one of its payloads failed validation.
    #[error("profile validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    /// The profile could not be rendered to the property-list format.
    #[error("failed to serialize profile: {0}")]
    Serialization(String),

    /// The byte buffer could not be decoded back into a profile.
    #[error("failed to decode profile: {0}")]
    Decode(String),

    /// A payload carried a discriminator no variant is registered for.
    #[error("unknown payload type: {0}")]
    UnknownPayloadType(String),

    /// Filesystem error from the profile store.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
