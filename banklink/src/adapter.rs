//! Adapter contract and blueprint registry.
//!
//! - [`PaymentAdapter`] - One configured bank: builds signed requests, recognises,
//!   verifies and classifies responses
//! - [`AdapterBlueprint`] / [`AdapterBlueprints`] - Factories that build adapters
//!   from configuration, registered by kind

use std::collections::HashMap;
use std::fmt::{self, Debug, Formatter};

use crate::charset::Charset;
use crate::config::AdapterConfig;
use crate::error::{ConfigurationError, Result};
use crate::form::PaymentForm;
use crate::hooks::Collaborators;
use crate::params::Params;
use crate::response::Response;
use crate::transaction::Transaction;

/// A configured bank adapter.
///
/// Adapters are immutable after construction. Key material is read from
/// disk on every signing or verification call.
pub trait PaymentAdapter: Send + Sync {
    /// Configuration key of this adapter.
    fn tag(&self) -> &str;

    /// Display name of the bank.
    fn name(&self) -> &str;

    /// Charset the bank expects.
    fn charset(&self) -> &Charset;

    /// Gateway URL the form posts to.
    fn service_url(&self) -> &str;

    /// Builds and signs the payment request for `transaction`.
    ///
    /// # Errors
    ///
    /// Fails on missing configuration, unusable key material or an invalid
    /// field table.
    fn build_request(&self, transaction: &Transaction) -> Result<PaymentForm>;

    /// Returns `true` if the inbound fields look like this bank's response.
    fn can_handle(&self, params: &Params) -> bool;

    /// Verifies the response and sets its classification flags.
    ///
    /// # Errors
    ///
    /// Fails with a crypto error on a bad signature and a protocol error on
    /// an unknown message type.
    fn handle_response(&self, response: &mut Response) -> Result<()>;

    /// Reads the transaction the response refers to.
    ///
    /// # Errors
    ///
    /// Fails if a transaction field holds an invalid value.
    fn extract_transaction(&self, response: &Response) -> Result<Transaction>;
}

impl Debug for dyn PaymentAdapter {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("PaymentAdapter")
            .field("tag", &self.tag())
            .field("name", &self.name())
            .finish_non_exhaustive()
    }
}

/// A factory that builds adapters of one bank kind.
pub trait AdapterBlueprint: Send + Sync {
    /// Kind name used in configuration (e.g. `"swedbank"`).
    fn kind(&self) -> &str;

    /// Builds an adapter stored under `tag` from its merged configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError`] if the configuration is unusable.
    fn build(
        &self,
        tag: &str,
        config: &AdapterConfig,
        collaborators: &Collaborators,
    ) -> Result<Box<dyn PaymentAdapter>, ConfigurationError>;
}

/// Registry of adapter blueprints, keyed by kind.
#[derive(Default)]
pub struct AdapterBlueprints(HashMap<String, Box<dyn AdapterBlueprint>>);

impl Debug for AdapterBlueprints {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<&String> = self.0.keys().collect();
        kinds.sort();
        f.debug_tuple("AdapterBlueprints").field(&kinds).finish()
    }
}

impl AdapterBlueprints {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self(HashMap::new())
    }

    /// Registers a blueprint and returns self for chaining.
    #[must_use]
    pub fn and_register<B: AdapterBlueprint + 'static>(mut self, blueprint: B) -> Self {
        self.register(blueprint);
        self
    }

    /// Registers a blueprint, replacing any previous one of the same kind.
    pub fn register<B: AdapterBlueprint + 'static>(&mut self, blueprint: B) {
        #[cfg(feature = "telemetry")]
        tracing::debug!(kind = blueprint.kind(), "Registered adapter blueprint");
        self.0.insert(blueprint.kind().to_owned(), Box::new(blueprint));
    }

    /// Gets a blueprint by kind.
    #[must_use]
    pub fn get(&self, kind: &str) -> Option<&dyn AdapterBlueprint> {
        self.0.get(kind).map(|v| &**v)
    }

    /// Builds the adapter stored under `tag`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::UnknownAdapterKind`] if no blueprint is
    /// registered for the entry's kind, or the blueprint's own error.
    pub fn build(
        &self,
        tag: &str,
        config: &AdapterConfig,
        collaborators: &Collaborators,
    ) -> Result<Box<dyn PaymentAdapter>, ConfigurationError> {
        let kind = config.kind_for(tag);
        let blueprint = self
            .get(&kind)
            .ok_or_else(|| ConfigurationError::UnknownAdapterKind {
                kind: kind.clone(),
                tag: tag.to_owned(),
            })?;
        blueprint.build(tag, config, collaborators)
    }
}
