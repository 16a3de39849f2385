//! Error types for protocol operations.

use thiserror::Error;

/// Errors that can occur while encoding or decoding protocol payloads.
#[derive(Debug, Error)]
pub enum ProtoError {
    /// Failed to serialize a payload.
    #[error("encoding error: {0}")]
    Encoding(String),

    /// Failed to deserialize a payload.
    #[error("decoding error: {0}")]
    Decoding(String),

    /// A frame was missing a field its opcode requires.
    #[error("missing required field: {0}")]
    MissingField(&'static str),
}
