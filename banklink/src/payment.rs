//! Payment service: form generation and response dispatch.
//!
//! [`PaymentService`] owns the enabled adapters in configuration order.
//! Responses are routed to the first adapter whose
//! [`can_handle`](PaymentAdapter::can_handle) matches, so when two adapters
//! recognise the same fields the one configured first wins.

use std::fmt::{self, Debug};
use std::sync::Arc;

use indexmap::IndexMap;

use crate::adapter::{AdapterBlueprints, PaymentAdapter};
use crate::config::PaymentConfig;
use crate::error::{ConfigurationError, ProtocolError, Result, ValidationError};
use crate::form::PaymentForm;
use crate::hooks::{Collaborators, PaymentHooks};
use crate::params::Params;
use crate::response::Response;
use crate::transaction::Transaction;

/// Generates payment forms and handles bank responses.
pub struct PaymentService {
    adapters: Vec<Box<dyn PaymentAdapter>>,
    hooks: Arc<dyn PaymentHooks>,
}

impl PaymentService {
    /// Wraps already built adapters. Their order is the dispatch order.
    #[must_use]
    pub fn new(adapters: Vec<Box<dyn PaymentAdapter>>, collaborators: &Collaborators) -> Self {
        Self {
            adapters,
            hooks: Arc::clone(&collaborators.hooks),
        }
    }

    /// Builds every enabled adapter of `config` with the registered
    /// blueprints. Disabled entries are skipped without validation.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigurationError`] raised by a blueprint, or
    /// [`ConfigurationError::UnknownAdapterKind`].
    pub fn from_config(
        config: &PaymentConfig,
        blueprints: &AdapterBlueprints,
        collaborators: &Collaborators,
    ) -> Result<Self, ConfigurationError> {
        let mut adapters = Vec::new();
        for (tag, adapter_config) in config.adapter_configs() {
            if !adapter_config.enabled {
                #[cfg(feature = "telemetry")]
                tracing::debug!(tag = %tag, "Skipping disabled adapter");
                continue;
            }
            let adapter = blueprints.build(&tag, &adapter_config, collaborators)?;
            #[cfg(feature = "telemetry")]
            tracing::info!(tag = %tag, adapter = adapter.name(), "Initialized payment adapter");
            adapters.push(adapter);
        }
        Ok(Self::new(adapters, collaborators))
    }

    /// Enabled adapters in configuration order.
    pub fn adapters(&self) -> impl Iterator<Item = &dyn PaymentAdapter> {
        self.adapters.iter().map(|a| &**a)
    }

    /// Looks up an adapter by tag.
    #[must_use]
    pub fn adapter(&self, tag: &str) -> Option<&dyn PaymentAdapter> {
        self.adapters().find(|a| a.tag() == tag)
    }

    /// Creates a transaction with the default currency and language.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] if the id is not numeric or the amount
    /// does not parse.
    pub fn create_transaction(&self, id: &str, sum: &str) -> Result<Transaction, ValidationError> {
        Transaction::create(id, sum)
    }

    /// Builds a signed form for every enabled adapter, keyed by tag.
    ///
    /// Each form is passed through [`PaymentHooks::finalize_form`] before it
    /// is collected.
    ///
    /// # Errors
    ///
    /// Fails on the first adapter that cannot build its request.
    pub fn generate_forms(&self, transaction: &Transaction) -> Result<IndexMap<String, PaymentForm>> {
        let mut forms = IndexMap::with_capacity(self.adapters.len());
        for adapter in self.adapters() {
            let mut form = adapter.build_request(transaction)?;
            self.hooks.finalize_form(&mut form, adapter);
            #[cfg(feature = "telemetry")]
            tracing::debug!(tag = adapter.tag(), fields = form.params.len(), "Generated payment form");
            forms.insert(adapter.tag().to_owned(), form);
        }
        Ok(forms)
    }

    /// Routes an inbound response to the first adapter that recognises it,
    /// verifies it and attaches the extracted transaction.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::UnroutableResponse`] if no adapter matches,
    /// or the matching adapter's verification or extraction error.
    pub fn handle_response<I, K, V>(&self, pairs: I) -> Result<Response>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut response = Response::from_pairs(pairs);
        let adapter = self
            .find_handler(response.params())
            .ok_or(ProtocolError::UnroutableResponse)?;

        #[cfg(feature = "telemetry")]
        tracing::debug!(tag = adapter.tag(), "Dispatching payment response");

        adapter.handle_response(&mut response)?;
        let transaction = adapter.extract_transaction(&response)?;
        response.set_transaction(transaction);

        #[cfg(feature = "telemetry")]
        tracing::info!(
            tag = adapter.tag(),
            successful = response.is_successful(),
            automatic = ?response.automatic(),
            "Handled payment response"
        );

        Ok(response)
    }

    fn find_handler(&self, params: &Params) -> Option<&dyn PaymentAdapter> {
        let found = self.adapters().find(|a| a.can_handle(params));
        #[cfg(feature = "telemetry")]
        if found.is_none() {
            tracing::warn!(fields = params.len(), "No adapter could handle the payment response");
        }
        found
    }
}

impl Debug for PaymentService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tags: Vec<&str> = self.adapters().map(|a| a.tag()).collect();
        f.debug_struct("PaymentService")
            .field("adapters", &tags)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::AdapterBlueprint;
    use crate::charset::Charset;
    use crate::config::AdapterConfig;
    use crate::error::BanklinkError;
    use std::sync::Mutex;

    struct MockAdapter {
        tag: String,
        discriminator: &'static str,
        charset: Charset,
    }

    impl MockAdapter {
        fn boxed(tag: &str, discriminator: &'static str) -> Box<dyn PaymentAdapter> {
            Box::new(Self {
                tag: tag.to_owned(),
                discriminator,
                charset: Charset::utf8(),
            })
        }
    }

    impl PaymentAdapter for MockAdapter {
        fn tag(&self) -> &str {
            &self.tag
        }

        fn name(&self) -> &str {
            "Mock"
        }

        fn charset(&self) -> &Charset {
            &self.charset
        }

        fn service_url(&self) -> &str {
            "https://bank.example/pay"
        }

        fn build_request(&self, transaction: &Transaction) -> Result<PaymentForm> {
            let mut params = Params::new();
            params.set("STAMP", transaction.id().map(ToString::to_string).unwrap_or_default());
            Ok(PaymentForm {
                tag: self.tag.clone(),
                provider_name: self.name().to_owned(),
                action: self.service_url().to_owned(),
                charset: self.charset.label().to_owned(),
                params,
            })
        }

        fn can_handle(&self, params: &Params) -> bool {
            params.get_or("BANK", "") == self.discriminator
        }

        fn handle_response(&self, response: &mut Response) -> Result<()> {
            response.set_successful(response.params().has("PAID"));
            Ok(())
        }

        fn extract_transaction(&self, response: &Response) -> Result<Transaction> {
            let mut transaction = Transaction::new();
            transaction.set_id(&response.params().get("STAMP")?)?;
            Ok(transaction)
        }
    }

    fn service() -> PaymentService {
        PaymentService::new(
            vec![
                MockAdapter::boxed("A", "alpha"),
                MockAdapter::boxed("B", "beta"),
                MockAdapter::boxed("C", "gamma"),
            ],
            &Collaborators::default(),
        )
    }

    #[test]
    fn test_dispatch_picks_the_matching_adapter() {
        let response = service()
            .handle_response([("BANK", "beta"), ("STAMP", "13"), ("PAID", "1")])
            .unwrap();
        assert!(response.is_successful());
        assert_eq!(response.transaction().unwrap().id().unwrap().as_str(), "13");
    }

    #[test]
    fn test_no_match_is_unroutable() {
        let err = service().handle_response([("BANK", "delta")]).unwrap_err();
        assert!(matches!(
            err,
            BanklinkError::Protocol(ProtocolError::UnroutableResponse)
        ));
        assert_eq!(
            err.to_string(),
            "No adapters found that could handle the payment response"
        );
    }

    #[test]
    fn test_first_configured_adapter_wins() {
        let service = PaymentService::new(
            vec![MockAdapter::boxed("FIRST", "same"), MockAdapter::boxed("SECOND", "same")],
            &Collaborators::default(),
        );
        let params: Params = [("BANK", "same")].into_iter().collect();
        assert_eq!(service.find_handler(&params).unwrap().tag(), "FIRST");
    }

    #[test]
    fn test_extraction_errors_propagate() {
        let err = service()
            .handle_response([("BANK", "alpha"), ("STAMP", "abc")])
            .unwrap_err();
        assert!(matches!(err, BanklinkError::Validation(_)));
    }

    #[test]
    fn test_generate_forms_keyed_by_tag_and_finalized() {
        struct Marker;
        impl PaymentHooks for Marker {
            fn finalize_form(&self, form: &mut PaymentForm, adapter: &dyn PaymentAdapter) {
                form.params.set("FINALIZED", adapter.tag());
            }
        }

        let collaborators = Collaborators::default().with_hooks(Marker);
        let service = PaymentService::new(
            vec![MockAdapter::boxed("A", "alpha"), MockAdapter::boxed("B", "beta")],
            &collaborators,
        );
        let transaction = service.create_transaction("42", "10.00").unwrap();
        let forms = service.generate_forms(&transaction).unwrap();

        let tags: Vec<&str> = forms.keys().map(String::as_str).collect();
        assert_eq!(tags, ["A", "B"]);
        assert_eq!(forms["B"].params.get("STAMP").unwrap(), "42");
        assert_eq!(forms["B"].params.get("FINALIZED").unwrap(), "B");
    }

    struct MockBlueprint {
        built: Mutex<Vec<String>>,
    }

    impl AdapterBlueprint for &'static MockBlueprint {
        fn kind(&self) -> &str {
            "mock"
        }

        fn build(
            &self,
            tag: &str,
            config: &AdapterConfig,
            _collaborators: &Collaborators,
        ) -> Result<Box<dyn PaymentAdapter>, ConfigurationError> {
            if !config.params.contains_key("REQUIRED") {
                return Err(ConfigurationError::ParameterNotSet {
                    name: "REQUIRED".into(),
                    adapter: tag.into(),
                });
            }
            if let Ok(mut built) = self.built.lock() {
                built.push(tag.to_owned());
            }
            Ok(MockAdapter::boxed(tag, "alpha"))
        }
    }

    #[test]
    fn test_from_config_skips_disabled_and_keeps_order() {
        static BLUEPRINT: MockBlueprint = MockBlueprint {
            built: Mutex::new(Vec::new()),
        };
        let blueprints = AdapterBlueprints::new().and_register(&BLUEPRINT);

        let mut config = PaymentConfig::default();
        config
            .adapters
            .insert("Z".into(), AdapterConfig::new("mock").param("REQUIRED", "1"));
        config.adapters.insert("OFF".into(), AdapterConfig::new("mock").enabled(false));
        config
            .adapters
            .insert("A".into(), AdapterConfig::new("mock").param("REQUIRED", "1"));

        let service = PaymentService::from_config(&config, &blueprints, &Collaborators::default()).unwrap();
        let tags: Vec<&str> = service.adapters().map(|a| a.tag()).collect();
        assert_eq!(tags, ["Z", "A"]);
        assert!(service.adapter("OFF").is_none());
        assert_eq!(*BLUEPRINT.built.lock().unwrap(), ["Z", "A"]);
    }

    #[test]
    fn test_from_config_unknown_kind() {
        let mut config = PaymentConfig::default();
        config.adapters.insert("X".into(), AdapterConfig::new("nope"));
        let err = PaymentService::from_config(&config, &AdapterBlueprints::new(), &Collaborators::default())
            .unwrap_err();
        assert!(matches!(err, ConfigurationError::UnknownAdapterKind { .. }));
    }
}
