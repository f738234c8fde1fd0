//! Payment header codec.
//!
//! A payment header is the standard (padded) base64 encoding of the JSON form
//! of a [`PaymentPayload`]. [`decode`] is strict: anything that is not valid
//! base64 over UTF-8 JSON describing a known scheme is a [`DecodeError`].

use base64::Engine;
use base64::engine::general_purpose::STANDARD as b64;
use std::fmt::Display;

use crate::proto::PaymentPayload;

/// Reasons a payment header cannot be turned into a [`PaymentPayload`].
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// The header is not valid standard base64.
    #[error("invalid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    /// The decoded bytes are not UTF-8 text.
    #[error("payload is not UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),
    /// The JSON is malformed, lacks a field, or names an unknown scheme.
    #[error("invalid payment payload: {0}")]
    Json(#[from] serde_json::Error),
}

/// Base64 text as it travels in a header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Base64Bytes(pub Vec<u8>);

impl Base64Bytes {
    /// Decodes the base64 text to raw bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the data is not valid base64.
    pub fn decode(&self) -> Result<Vec<u8>, base64::DecodeError> {
        b64.decode(&self.0)
    }

    /// Encodes raw bytes as base64 text.
    pub fn encode<T: AsRef<[u8]>>(input: T) -> Self {
        Self(b64.encode(input.as_ref()).into_bytes())
    }
}

impl AsRef<[u8]> for Base64Bytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<&str> for Base64Bytes {
    fn from(header: &str) -> Self {
        Self(header.trim().as_bytes().to_vec())
    }
}

impl Display for Base64Bytes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.0))
    }
}

/// Decodes a payment header into a [`PaymentPayload`].
///
/// Surrounding whitespace is ignored. The protocol version is carried through
/// unchecked; rejecting other versions is the matcher's job.
///
/// # Errors
///
/// Returns [`DecodeError`] for bad base64, non-UTF-8 bytes, malformed JSON,
/// missing or malformed fields, and unknown scheme tags.
pub fn decode(header: &str) -> Result<PaymentPayload, DecodeError> {
    let raw = Base64Bytes::from(header).decode()?;
    let json = std::str::from_utf8(&raw)?;
    Ok(serde_json::from_str(json)?)
}

/// Encodes a [`PaymentPayload`] as a payment header.
///
/// # Panics
///
/// Never in practice: every field serializes to JSON without error.
#[must_use]
pub fn encode(payload: &PaymentPayload) -> String {
    let json = serde_json::to_vec(payload).expect("payment payload serializes to JSON");
    Base64Bytes::encode(json).to_string()
}
