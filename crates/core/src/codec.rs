//! Byte encoding of stored values.
//!
//! Every value placed in a [`GridStore`](crate::GridStore) is SBOR-encoded.
//! Enum variants are part of the encoding, so a decoded `Range` or
//! `SubmissionOutcome` comes back as the variant it was stored as.

use sbor::{BasicDecode, BasicEncode};
use thiserror::Error;

/// Errors that can occur while encoding or decoding a stored value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("SBOR encode error: {0}")]
    Encode(String),

    #[error("SBOR decode error: {0}")]
    Decode(String),
}

/// Encode a value for storage.
pub fn encode<T: BasicEncode + ?Sized>(value: &T) -> Result<Vec<u8>, CodecError> {
    sbor::basic_encode(value).map_err(|e| CodecError::Encode(format!("{:?}", e)))
}

/// Decode a stored value.
pub fn decode<T: BasicDecode>(bytes: &[u8]) -> Result<T, CodecError> {
    sbor::basic_decode(bytes).map_err(|e| CodecError::Decode(format!("{:?}", e)))
}
