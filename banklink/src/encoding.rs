//! Signature encodings.
//!
//! Signatures travel as text form fields. The bank-signature family uses
//! standard base64 ([`Base64Bytes`]); card payments use lowercase hex
//! ([`HexBytes`]).

use std::fmt::Display;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as b64;

use crate::error::CryptoError;

/// A wrapper for base64-encoded signature text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Base64Bytes(pub String);

impl Base64Bytes {
    /// Decodes the text to raw signature bytes.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::MalformedBase64`] if the text is not valid base64.
    pub fn decode(&self) -> Result<Vec<u8>, CryptoError> {
        b64.decode(self.0.trim())
            .map_err(CryptoError::MalformedBase64)
    }

    /// Encodes raw signature bytes.
    pub fn encode<T: AsRef<[u8]>>(input: T) -> Self {
        Self(b64.encode(input.as_ref()))
    }

    /// Returns the encoded text.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl From<&str> for Base64Bytes {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl Display for Base64Bytes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A wrapper for lowercase hex-encoded signature text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HexBytes(pub String);

impl HexBytes {
    /// Decodes the text to raw signature bytes. Upper case digits are accepted.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::MalformedHex`] if the text is not valid hex.
    pub fn decode(&self) -> Result<Vec<u8>, CryptoError> {
        hex::decode(self.0.trim()).map_err(CryptoError::MalformedHex)
    }

    /// Encodes raw signature bytes.
    pub fn encode<T: AsRef<[u8]>>(input: T) -> Self {
        Self(hex::encode(input))
    }

    /// Returns the encoded text.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl From<&str> for HexBytes {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl Display for HexBytes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
