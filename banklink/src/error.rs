//! Error types for banklink operations.
//!
//! Every failure is surfaced to the caller; nothing is retried or recovered
//! internally. A response is either fully verified and classified or the call
//! fails.

use std::path::PathBuf;

/// Convenience alias used throughout the banklink crates.
pub type Result<T, E = BanklinkError> = std::result::Result<T, E>;

/// Base error type for banklink operations.
#[derive(Debug, thiserror::Error)]
pub enum BanklinkError {
    /// Adapter configuration is unusable.
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// Key material could not be used, or a signature did not verify.
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// The message does not follow a known protocol shape.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A transaction value is invalid.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A required field is absent from a parameter set.
    #[error(transparent)]
    MissingParameter(#[from] MissingParameterError),
}

impl BanklinkError {
    /// Returns `true` if this error means an inbound message failed
    /// authentication.
    #[must_use]
    pub const fn is_signature_failure(&self) -> bool {
        matches!(
            self,
            Self::Crypto(CryptoError::SignatureMismatch | CryptoError::MacMismatch { .. })
        )
    }
}

/// Errors raised while building adapters from configuration.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ConfigurationError {
    /// A required bank parameter is missing or has the wrong JSON type.
    #[error("Parameter '{name}' missing or not of type '{expected}' (adapter '{adapter}')")]
    InvalidParameter {
        /// Parameter name.
        name: String,
        /// Expected type name.
        expected: &'static str,
        /// Adapter display name.
        adapter: String,
    },
    /// An optional parameter was read but is not set and has no default.
    #[error("Configuration parameter '{name}' not set for adapter '{adapter}'")]
    ParameterNotSet {
        /// Parameter name.
        name: String,
        /// Adapter display name.
        adapter: String,
    },
    /// A `*_path` parameter or key path points at a missing file.
    #[error("File not found: {}", path.display())]
    FileNotFound {
        /// Resolved path.
        path: PathBuf,
    },
    /// The configured hash function is not on the allow-list.
    #[error("Unknown hash function: '{name}'. Please use one of: {allowed}")]
    UnknownHashFunction {
        /// Configured name.
        name: String,
        /// Comma separated allow-list.
        allowed: String,
    },
    /// No blueprint is registered for the adapter kind.
    #[error("Unknown adapter kind '{kind}' for adapter '{tag}'")]
    UnknownAdapterKind {
        /// Requested kind.
        kind: String,
        /// Configuration key of the adapter.
        tag: String,
    },
    /// The configured charset label is not recognised.
    #[error("Unknown charset '{0}'")]
    UnknownCharset(String),
    /// A key or certificate path was required but not configured.
    #[error("Adapter '{adapter}' requires '{field}' to be configured")]
    MissingKeyMaterial {
        /// Adapter display name.
        adapter: String,
        /// Missing field (`keyPath` or `certPath`).
        field: &'static str,
    },
    /// The configuration document could not be parsed.
    #[error("Invalid configuration: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Errors from signing and verification.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum CryptoError {
    /// The private key file could not be read.
    #[error("Could not open private key file {}", path.display())]
    PrivateKeyUnreadable {
        /// Key path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The certificate file could not be read.
    #[error("Could not open certificate file {}", path.display())]
    CertificateUnreadable {
        /// Certificate path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The PEM material could not be parsed.
    #[error("Invalid key material in {}", path.display())]
    InvalidKey {
        /// Path of the offending file.
        path: PathBuf,
        /// OpenSSL error stack.
        #[source]
        source: openssl::error::ErrorStack,
    },
    /// OpenSSL failed while signing.
    #[error("Could not sign with private key")]
    Signing(#[source] openssl::error::ErrorStack),
    /// OpenSSL failed while verifying (as opposed to a plain mismatch).
    #[error("Could not verify signature")]
    Verification(#[source] openssl::error::ErrorStack),
    /// The signature does not match the message.
    #[error("Incorrect signature")]
    SignatureMismatch,
    /// The keyed-hash MAC does not match the message.
    #[error("Incorrect signature. (received {received}, generated {generated}, fields: {fields})")]
    MacMismatch {
        /// MAC carried by the message.
        received: String,
        /// MAC recomputed locally.
        generated: String,
        /// The disputed inbound fields, `name=value` comma separated.
        fields: String,
    },
    /// The signature field is not valid base64.
    #[error("Malformed base64 signature")]
    MalformedBase64(#[source] base64::DecodeError),
    /// The signature field is not valid hex.
    #[error("Malformed hex signature")]
    MalformedHex(#[source] hex::FromHexError),
}

/// Errors caused by messages that do not match a known protocol shape.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ProtocolError {
    /// The service code has no field order table.
    #[error("Cannot normalize MAC params, unknown service: {0}")]
    UnknownService(String),
    /// The service code is known but cannot be classified.
    #[error("Transaction returned unknown service code '{0}'")]
    UnclassifiedService(String),
    /// No enabled adapter recognised the inbound fields.
    #[error("No adapters found that could handle the payment response")]
    UnroutableResponse,
    /// A field table carries a format pattern that cannot be applied.
    #[error("Invalid format pattern '{pattern}' for field '{field}'")]
    InvalidPattern {
        /// Field name.
        field: String,
        /// Offending pattern.
        pattern: String,
    },
}

/// Errors in transaction values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum ValidationError {
    /// Transaction ids must be numeric.
    #[error("Please use a numeric value for transaction ID (got '{0}')")]
    NonNumericTransactionId(String),
    /// The amount could not be parsed as a decimal number.
    #[error("Invalid amount '{0}'")]
    InvalidAmount(String),
}

/// A field was read from a parameter set that does not contain it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Missing parameter '{name}'")]
pub struct MissingParameterError {
    /// Name of the missing field.
    pub name: String,
}

impl MissingParameterError {
    /// Creates a new missing-parameter error.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}
