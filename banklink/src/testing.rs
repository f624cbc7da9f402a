//! Runtime key material for tests.
//!
//! Banks hand out real keys and certificates out of band, so tests generate
//! a throwaway RSA key pair and a self-signed certificate instead. The files
//! live in a temporary directory that is removed when the [`KeyMaterial`] is
//! dropped.

use std::fs;
use std::path::{Path, PathBuf};

use openssl::asn1::Asn1Time;
use openssl::bn::BigNum;
use openssl::error::ErrorStack;
use openssl::hash::MessageDigest;
use openssl::pkey::{PKey, Private};
use openssl::rsa::Rsa;
use openssl::x509::{X509, X509NameBuilder};
use tempfile::TempDir;

/// A generated private key, its self-signed certificate and public key, on disk.
#[derive(Debug)]
pub struct KeyMaterial {
    dir: TempDir,
    key_path: PathBuf,
    cert_path: PathBuf,
    public_key_path: PathBuf,
}

impl KeyMaterial {
    /// Generates a 2048-bit RSA key pair.
    ///
    /// # Panics
    ///
    /// Panics if OpenSSL or the file system fails.
    #[must_use]
    pub fn generate() -> Self {
        Self::try_generate().expect("failed to generate test key material")
    }

    /// Generates a 2048-bit RSA key pair.
    ///
    /// # Errors
    ///
    /// Returns an error if OpenSSL or the file system fails.
    pub fn try_generate() -> Result<Self, Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let key = PKey::from_rsa(Rsa::generate(2048)?)?;
        let cert = self_signed(&key)?;

        let key_path = dir.path().join("private_key.pem");
        let cert_path = dir.path().join("cert.pem");
        let public_key_path = dir.path().join("public_key.pem");
        fs::write(&key_path, key.private_key_to_pem_pkcs8()?)?;
        fs::write(&cert_path, cert.to_pem()?)?;
        fs::write(&public_key_path, key.public_key_to_pem()?)?;

        Ok(Self {
            dir,
            key_path,
            cert_path,
            public_key_path,
        })
    }

    /// Directory holding the files.
    #[must_use]
    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    /// PEM private key.
    #[must_use]
    pub fn key_path(&self) -> &Path {
        &self.key_path
    }

    /// PEM certificate.
    #[must_use]
    pub fn cert_path(&self) -> &Path {
        &self.cert_path
    }

    /// PEM public key.
    #[must_use]
    pub fn public_key_path(&self) -> &Path {
        &self.public_key_path
    }

    /// Key path as a configuration string.
    #[must_use]
    pub fn key_path_str(&self) -> String {
        self.key_path.display().to_string()
    }

    /// Certificate path as a configuration string.
    #[must_use]
    pub fn cert_path_str(&self) -> String {
        self.cert_path.display().to_string()
    }
}

fn self_signed(key: &PKey<Private>) -> Result<X509, ErrorStack> {
    let mut name = X509NameBuilder::new()?;
    name.append_entry_by_text("C", "EE")?;
    name.append_entry_by_text("CN", "banklink test")?;
    let name = name.build();

    let mut builder = X509::builder()?;
    builder.set_version(2)?;
    let serial = BigNum::from_u32(1)?.to_asn1_integer()?;
    builder.set_serial_number(&serial)?;
    builder.set_subject_name(&name)?;
    builder.set_issuer_name(&name)?;
    builder.set_pubkey(key)?;
    let not_before = Asn1Time::days_from_now(0)?;
    builder.set_not_before(&not_before)?;
    let not_after = Asn1Time::days_from_now(365)?;
    builder.set_not_after(&not_after)?;
    builder.sign(key, MessageDigest::sha256())?;
    Ok(builder.build())
}
