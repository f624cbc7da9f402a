#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! Core types for Estonian banklink payment protocols.
//!
//! A banklink is a browser-redirect payment flow: the merchant signs a set of
//! form fields, the customer's browser posts them to the bank, and the bank
//! redirects back with a signed response. Every bank speaks a slightly
//! different dialect, so this crate provides the shared machinery and the
//! bank-family crates (`banklink-ipizza`, `banklink-solo`, `banklink-estcard`)
//! provide the dialects.
//!
//! # Modules
//!
//! - [`params`] - Ordered field container used for requests and responses
//! - [`format`] - Field tables and the field formatter (truncation, padding, patterns)
//! - [`charset`] - Target charsets and transliteration
//! - [`signing`] - RSA signatures and keyed-hash MACs over field concatenations
//! - [`encoding`] - Base64 and hex signature encodings
//! - [`transaction`] - Canonical payment record and reference-number checksum
//! - [`response`] - Inbound response with classification flags
//! - [`form`] - Outgoing, signed payment form
//! - [`adapter`] - Adapter contract and blueprint registry
//! - [`config`] - Serde configuration and resolved adapter settings
//! - [`hooks`] - Host collaborators (URL building, file paths, form finalization)
//! - [`payment`] - Payment service: form generation and response dispatch
//! - [`error`] - Error taxonomy
//!
//! # Feature Flags
//!
//! - `telemetry` - Enables tracing instrumentation
//! - `test-utils` - Runtime RSA key and certificate generation for tests

pub mod adapter;
pub mod charset;
pub mod config;
pub mod encoding;
pub mod error;
pub mod form;
pub mod format;
pub mod hooks;
pub mod params;
pub mod payment;
pub mod response;
pub mod signing;
pub mod transaction;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use adapter::{AdapterBlueprint, AdapterBlueprints, PaymentAdapter};
pub use config::{AdapterConfig, AdapterSettings, PaymentConfig};
pub use error::{BanklinkError, Result};
pub use form::PaymentForm;
pub use hooks::{Collaborators, PathResolver, PaymentHooks, UrlBuilder};
pub use params::{ParamValue, Params};
pub use payment::PaymentService;
pub use response::Response;
pub use transaction::Transaction;

pub use rust_decimal::Decimal;
