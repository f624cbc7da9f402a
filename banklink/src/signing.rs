//! Signatures and keyed-hash MACs over field concatenations.
//!
//! Every banklink message is authenticated over an explicit, per-message
//! field order ([`FieldOrders`]), never over the container's insertion order.
//! Three source layouts are in use:
//!
//! - [`length_prefixed`]: each value preceded by its 3-digit length (iPizza)
//! - [`concatenated`]: values joined without separators (Estcard)
//! - [`delimited_with_secret`]: values joined by `&` followed by a shared secret (Solo)
//!
//! Sources are encoded into the adapter's charset before they are signed or
//! hashed. Key material is read from disk on every call.

use std::borrow::Cow;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use indexmap::IndexMap;
use openssl::hash::MessageDigest;
use openssl::pkey::{PKey, Private, Public};
use openssl::sign::{Signer, Verifier};
use openssl::x509::X509;
use sha1::{Digest, Sha1};
use subtle::ConstantTimeEq;

use crate::charset::Charset;
use crate::error::{ConfigurationError, CryptoError, ProtocolError};
use crate::format::LengthMeasure;

/// Field order per message type, keyed by service code or message name.
#[derive(Debug, Clone, Default)]
pub struct FieldOrders(IndexMap<&'static str, &'static [&'static str]>);

impl FieldOrders {
    /// Builds the table from `(message, fields)` entries.
    #[must_use]
    pub fn new(entries: &[(&'static str, &'static [&'static str])]) -> Self {
        Self(entries.iter().copied().collect())
    }

    /// Returns a copy with `extra` replacing or extending entries.
    #[must_use]
    pub fn merged(&self, extra: &[(&'static str, &'static [&'static str])]) -> Self {
        let mut orders = self.0.clone();
        orders.extend(extra.iter().copied());
        Self(orders)
    }

    /// Returns the field order of a message type.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::UnknownService`] if the message type is not
    /// in the table.
    pub fn get(&self, message: &str) -> Result<&'static [&'static str], ProtocolError> {
        self.0
            .get(message)
            .copied()
            .ok_or_else(|| ProtocolError::UnknownService(message.to_owned()))
    }

    /// Returns `true` if the table knows the message type.
    #[must_use]
    pub fn contains(&self, message: &str) -> bool {
        self.0.contains_key(message)
    }
}

/// Joins values, each preceded by its length as three zero-padded digits.
#[must_use]
pub fn length_prefixed(values: &[Cow<'_, str>], measure: LengthMeasure, charset: &Charset) -> String {
    values.iter().fold(String::new(), |mut acc, value| {
        let len = measure.len(value, charset);
        acc.push_str(&format!("{len:03}"));
        acc.push_str(value);
        acc
    })
}

/// Joins values without separators.
#[must_use]
pub fn concatenated(values: &[Cow<'_, str>]) -> String {
    values.concat()
}

/// Joins values with a trailing `&` each, then appends `secret&`.
#[must_use]
pub fn delimited_with_secret(values: &[Cow<'_, str>], secret: &str) -> String {
    let mut source = values.iter().fold(String::new(), |mut acc, value| {
        acc.push_str(value);
        acc.push('&');
        acc
    });
    source.push_str(secret);
    source.push('&');
    source
}

/// An RSA private key loaded from a PEM file.
pub struct PrivateKey(PKey<Private>);

impl PrivateKey {
    /// Reads and parses a PEM private key.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::PrivateKeyUnreadable`] if the file cannot be
    /// read and [`CryptoError::InvalidKey`] if it holds no usable key.
    pub fn load(path: &Path) -> Result<Self, CryptoError> {
        let pem = fs::read(path).map_err(|source| CryptoError::PrivateKeyUnreadable {
            path: path.to_owned(),
            source,
        })?;
        PKey::private_key_from_pem(&pem)
            .map(Self)
            .map_err(|source| CryptoError::InvalidKey {
                path: path.to_owned(),
                source,
            })
    }

    /// Signs `data` with RSA-SHA1 (PKCS#1 v1.5).
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::Signing`] if OpenSSL fails.
    pub fn sign_sha1(&self, data: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let mut signer = Signer::new(MessageDigest::sha1(), &self.0).map_err(CryptoError::Signing)?;
        signer.update(data).map_err(CryptoError::Signing)?;
        signer.sign_to_vec().map_err(CryptoError::Signing)
    }
}

impl std::fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("PrivateKey(<redacted>)")
    }
}

/// A public key taken from a PEM certificate or a PEM public key file.
pub struct PublicKey(PKey<Public>);

impl PublicKey {
    /// Reads a PEM certificate, falling back to a bare PEM public key.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::CertificateUnreadable`] if the file cannot be
    /// read and [`CryptoError::InvalidKey`] if neither form parses.
    pub fn load(path: &Path) -> Result<Self, CryptoError> {
        let pem = fs::read(path).map_err(|source| CryptoError::CertificateUnreadable {
            path: path.to_owned(),
            source,
        })?;
        X509::from_pem(&pem)
            .and_then(|cert| cert.public_key())
            .or_else(|_| PKey::public_key_from_pem(&pem))
            .map(Self)
            .map_err(|source| CryptoError::InvalidKey {
                path: path.to_owned(),
                source,
            })
    }

    /// Verifies an RSA-SHA1 signature over `data`.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::SignatureMismatch`] if the signature does not
    /// match, and [`CryptoError::Verification`] if OpenSSL fails outright.
    pub fn verify_sha1(&self, data: &[u8], signature: &[u8]) -> Result<(), CryptoError> {
        let mut verifier =
            Verifier::new(MessageDigest::sha1(), &self.0).map_err(CryptoError::Verification)?;
        verifier.update(data).map_err(CryptoError::Verification)?;
        match verifier.verify(signature) {
            Ok(true) => Ok(()),
            Ok(false) => Err(CryptoError::SignatureMismatch),
            Err(e) => Err(CryptoError::Verification(e)),
        }
    }
}

impl std::fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("PublicKey")
    }
}

/// Signs `source` in `charset` with the key at `key_path`.
///
/// # Errors
///
/// Propagates key loading and signing failures.
pub fn sign_source(key_path: &Path, source: &str, charset: &Charset) -> Result<Vec<u8>, CryptoError> {
    PrivateKey::load(key_path)?.sign_sha1(&charset.encode(source))
}

/// Verifies `signature` over `source` in `charset` with the certificate at
/// `cert_path`.
///
/// # Errors
///
/// Propagates certificate loading and verification failures.
pub fn verify_source(
    cert_path: &Path,
    source: &str,
    signature: &[u8],
    charset: &Charset,
) -> Result<(), CryptoError> {
    let result = PublicKey::load(cert_path)?.verify_sha1(&charset.encode(source), signature);
    #[cfg(feature = "telemetry")]
    if let Err(e) = &result {
        tracing::warn!(cert = %cert_path.display(), error = %e, "Signature verification failed");
    }
    result
}

/// Hash function of a keyed-hash MAC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HashFunction {
    /// MD5.
    #[default]
    Md5,
    /// SHA-1.
    Sha1,
}

impl HashFunction {
    /// Names accepted in configuration.
    pub const ALLOWED: [&'static str; 2] = ["sha1", "md5"];

    /// Returns the configuration name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Md5 => "md5",
            Self::Sha1 => "sha1",
        }
    }

    /// Hashes `data` and returns the upper case hex digest.
    #[must_use]
    pub fn digest_upper_hex(self, data: &[u8]) -> String {
        match self {
            Self::Md5 => hex::encode_upper(md5::compute(data).0),
            Self::Sha1 => hex::encode_upper(Sha1::digest(data)),
        }
    }

    /// Computes the MAC of `source` encoded in `charset`.
    #[must_use]
    pub fn mac(self, source: &str, charset: &Charset) -> String {
        self.digest_upper_hex(&charset.encode(source))
    }
}

impl FromStr for HashFunction {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "md5" => Ok(Self::Md5),
            "sha1" => Ok(Self::Sha1),
            other => Err(ConfigurationError::UnknownHashFunction {
                name: other.to_owned(),
                allowed: Self::ALLOWED.join(", "),
            }),
        }
    }
}

/// Compares two MACs in constant time.
#[must_use]
pub fn mac_eq(received: &str, generated: &str) -> bool {
    received.as_bytes().ct_eq(generated.as_bytes()).into()
}
