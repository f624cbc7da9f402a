#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! iPizza banklink adapters.
//!
//! iPizza is the `VK_*` field protocol shared by most Estonian banks. Requests
//! and responses are signed with RSA-SHA1 over a length-prefixed
//! concatenation of the fields listed for the message's `VK_SERVICE` code,
//! and the signature travels base64 encoded in `VK_MAC`.
//!
//! One [`IPizzaAdapter`] implementation serves every bank. The differences
//! between banks (sender id, charset, field lengths, extra message types) are
//! data, kept in a [`BankProfile`](profile::BankProfile).
//!
//! # Supported banks
//!
//! | Kind           | Bank         | Sender id   | Charset      |
//! |----------------|--------------|-------------|--------------|
//! | `swedbank`     | Swedbank     | `HP`        | UTF-8        |
//! | `seb`          | SEB          | `EYP`       | ISO-8859-1   |
//! | `danske`       | Danske Bank  | `SAMPOPANK` | ISO-8859-1   |
//! | `lhv`          | LHV Pank     | `LHV`       | ISO-8859-1   |
//! | `krediidipank` | Krediidipank | `KREP`      | UTF-8        |
//!
//! # Example
//!
//! ```no_run
//! use banklink::{AdapterBlueprints, Collaborators, PaymentConfig, PaymentService};
//! use banklink_ipizza::IPizza;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = PaymentConfig::from_json_str(&std::fs::read_to_string("payment.json")?)?;
//! let blueprints = IPizza::all()
//!     .into_iter()
//!     .fold(AdapterBlueprints::new(), AdapterBlueprints::and_register);
//! let service = PaymentService::from_config(&config, &blueprints, &Collaborators::default())?;
//!
//! let transaction = service.create_transaction("13", "35.50")?;
//! for (tag, form) in service.generate_forms(&transaction)? {
//!     println!("{tag}: POST {}", form.action);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Feature Flags
//!
//! - `telemetry` - Enables tracing instrumentation

mod adapter;
pub mod profile;

pub use adapter::{DEFAULT_SERVICE, IPizza, IPizzaAdapter, VERSION};
