#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! Estcard e-commerce card payment adapter.
//!
//! Estcard forms use short lower case field names (`ecuno`, `eamount`,
//! `feedBackUrl`, ...). Most fields are padded to a fixed width before the
//! request is signed: the MAC is the lower case hex RSA-SHA1 signature over
//! the bare concatenation of the padded values, while the merchant `id` and
//! `feedBackUrl` are sent back to the browser unpadded.
//!
//! Transaction ids below 100 000 are offset by 100 000 000 to form `ecuno`;
//! the offset is removed again when a response is read.
//!
//! Requests carry the local time of a [`Clock`], the system clock unless the
//! blueprint is built with [`Estcard::with_clock`].
//!
//! # Feature Flags
//!
//! - `telemetry` - Enables tracing instrumentation

mod adapter;
pub mod clock;

pub use adapter::{
    APPROVED, ECUNO_MIN, ECUNO_OFFSET, Estcard, EstcardAdapter, KIND, VERSION, ecuno, id_from_ecuno,
    language_code,
};
pub use clock::{Clock, FixedClock, LocalClock};
