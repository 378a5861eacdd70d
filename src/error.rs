//! Error types for protocomm.

use thiserror::Error;

/// Main error type for all protocomm operations.
///
/// The core only ever originates `InvalidArg`, `NotFound`, `AlreadyExists`,
/// `InvalidState` and `NoMemory`. Everything else comes from a handler, a
/// security module or a transport, and is returned to the caller untouched.
#[derive(Debug, Error)]
pub enum ProtocommError {
    /// A parameter was rejected.
    #[error("Invalid argument: {0}")]
    InvalidArg(String),

    /// No endpoint is registered under this name.
    #[error("Endpoint not found: {0}")]
    NotFound(String),

    /// An endpoint with this name is already registered.
    #[error("Endpoint already exists: {0}")]
    AlreadyExists(String),

    /// Operation not allowed in the current lifecycle state.
    #[error("Invalid state: {0}")]
    InvalidState(&'static str),

    /// Allocation for bookkeeping failed.
    #[error("Out of memory")]
    NoMemory,

    /// Generic failure reported by a handler or security module.
    #[error("Failed: {0}")]
    Fail(String),

    /// Typed endpoint payload could not be decoded or encoded.
    #[error("Codec error: {0}")]
    Codec(String),

    /// I/O error on a transport channel.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<rmp_serde::encode::Error> for ProtocommError {
    fn from(e: rmp_serde::encode::Error) -> Self {
        ProtocommError::Codec(e.to_string())
    }
}

impl From<rmp_serde::decode::Error> for ProtocommError {
    fn from(e: rmp_serde::decode::Error) -> Self {
        ProtocommError::Codec(e.to_string())
    }
}

/// Result type alias using ProtocommError.
pub type Result<T> = std::result::Result<T, ProtocommError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_names_endpoint() {
        let err = ProtocommError::NotFound("prov-config".to_string());
        assert_eq!(err.to_string(), "Endpoint not found: prov-config");
    }

    #[test]
    fn test_codec_error_from_decode() {
        let err: ProtocommError = rmp_serde::from_slice::<String>(&[0xc1])
            .unwrap_err()
            .into();
        assert!(matches!(err, ProtocommError::Codec(_)));
    }
}
