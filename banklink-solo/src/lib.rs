#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! Solo banklink adapter for Nordea.
//!
//! Solo messages use `SOLOPMT_*` fields and are authenticated with a keyed
//! hash instead of a bank signature: the merchant and the bank share a
//! `MAC_SECRET`, and the MAC is the upper case hex digest (MD5 or SHA-1, per
//! contract) of the signed field values joined by `&`, followed by the
//! secret.
//!
//! # Configuration
//!
//! | Parameter        | Required | Default   |
//! |------------------|----------|-----------|
//! | `SOLOPMT_RCV_ID` | yes      |           |
//! | `MAC_SECRET`     | yes      |           |
//! | `hash_function`  | no       | `md5`     |
//! | `SOLOPMT_KEYVERS`| no       | `0001`    |
//! | `SOLOPMT_DATE`   | no       | `EXPRESS` |
//! | `SOLOPMT_CONFIRM`| no       | `YES`     |
//! | `SOLOPMT_REF`    | no       |           |
//! | `SOLOPMT_MSG`    | no       |           |
//!
//! Forms are sent in ISO-8859-1; characters outside it are substituted.
//!
//! # Feature Flags
//!
//! - `telemetry` - Enables tracing instrumentation

mod adapter;

pub use adapter::{KIND, Nordea, NordeaAdapter, VERSION, language_code, language_from_code};
