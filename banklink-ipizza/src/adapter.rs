//! The iPizza adapter and its blueprint.

use banklink::adapter::{AdapterBlueprint, PaymentAdapter};
use banklink::charset::Charset;
use banklink::config::{AdapterConfig, AdapterDefaults, AdapterSettings};
use banklink::encoding::Base64Bytes;
use banklink::error::{ConfigurationError, ProtocolError, Result};
use banklink::form::PaymentForm;
use banklink::format::{FieldFormatter, FieldTable};
use banklink::hooks::Collaborators;
use banklink::params::Params;
use banklink::response::Response;
use banklink::signing::{FieldOrders, length_prefixed, sign_source, verify_source};
use banklink::transaction::Transaction;

use crate::profile::{self, BankProfile};

/// Service code requested when none is configured.
pub const DEFAULT_SERVICE: &str = "1001";

/// Protocol version sent with every request.
pub const VERSION: &str = "008";

/// A configured iPizza bank.
#[derive(Debug)]
pub struct IPizzaAdapter {
    profile: BankProfile,
    settings: AdapterSettings,
    fields: FieldTable,
    orders: FieldOrders,
}

impl IPizzaAdapter {
    /// Builds the adapter stored under `tag` for one bank.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError`] if a merchant parameter is missing.
    pub fn new(
        profile: BankProfile,
        tag: &str,
        config: &AdapterConfig,
        collaborators: &Collaborators,
    ) -> Result<Self, ConfigurationError> {
        let defaults = AdapterDefaults {
            name: profile.name,
            charset: profile.charset,
            required: profile::REQUIRED_PARAMS,
        };
        let settings = AdapterSettings::resolve(tag, config, &defaults, collaborators)?;
        Ok(Self {
            profile,
            settings,
            fields: FieldTable::new(profile::FIELDS).merged(profile.fields),
            orders: FieldOrders::new(profile::MAC_ORDERS).merged(profile.mac_orders),
        })
    }

    /// The bank profile.
    #[must_use]
    pub const fn profile(&self) -> &BankProfile {
        &self.profile
    }

    /// Resolved settings.
    #[must_use]
    pub const fn settings(&self) -> &AdapterSettings {
        &self.settings
    }

    fn formatter(&self) -> FieldFormatter<'_> {
        FieldFormatter::new(&self.fields, self.settings.charset(), self.profile.measure)
    }

    /// Builds the signature source of a message from its `VK_SERVICE`.
    fn mac_source(&self, params: &Params) -> Result<String> {
        let service = params.get("VK_SERVICE")?;
        let order = self.orders.get(&service)?;
        Ok(length_prefixed(
            &params.ordered_values(order),
            self.profile.measure,
            self.settings.charset(),
        ))
    }

    fn request_params(&self, transaction: &Transaction) -> Result<Params> {
        let settings = &self.settings;
        let service = self.profile.forced_service.map_or_else(
            || settings.conf_str_or("VK_SERVICE", DEFAULT_SERVICE),
            str::to_owned,
        );

        let mut params = Params::new();
        params
            .set("VK_SERVICE", service)
            .set("VK_VERSION", VERSION)
            .set("VK_SND_ID", settings.conf_str("VK_SND_ID")?)
            .set("VK_ACC", settings.conf_str("VK_ACC")?)
            .set("VK_NAME", settings.conf_str("VK_NAME")?)
            .set("VK_RETURN", settings.return_url())
            .set("VK_CANCEL", settings.cancel_url());
        if let Some(field) = self.profile.charset_field {
            params.set(field, settings.charset().label());
        }

        params
            .set_optional("VK_STAMP", transaction.id().map(ToString::to_string))
            .set_optional("VK_AMOUNT", transaction.sum())
            .set("VK_CURR", transaction.currency())
            .set("VK_LANG", profile::language_code(transaction.language()));

        let reference = transaction
            .reference()
            .filter(|reference| !reference.is_empty())
            .map(str::to_owned)
            .or_else(|| settings.conf_str_opt("VK_REF"))
            .unwrap_or_default();
        params.set("VK_REF", reference);

        let message = transaction
            .comment()
            .filter(|comment| !comment.is_empty())
            .map(str::to_owned)
            .or_else(|| settings.conf_str_opt("VK_MSG"));
        params.set_optional("VK_MSG", message);

        Ok(params)
    }
}

impl PaymentAdapter for IPizzaAdapter {
    fn tag(&self) -> &str {
        self.settings.tag()
    }

    fn name(&self) -> &str {
        self.settings.name()
    }

    fn charset(&self) -> &Charset {
        self.settings.charset()
    }

    fn service_url(&self) -> &str {
        self.settings.service_url()
    }

    fn build_request(&self, transaction: &Transaction) -> Result<PaymentForm> {
        let mut params = self.request_params(transaction)?;
        self.formatter().format(&mut params)?;

        let source = self.mac_source(&params)?;
        let signature = sign_source(self.settings.key_path()?, &source, self.settings.charset())?;
        params.set("VK_MAC", Base64Bytes::encode(signature).into_inner());

        Ok(PaymentForm {
            tag: self.tag().to_owned(),
            provider_name: self.name().to_owned(),
            action: self.service_url().to_owned(),
            charset: self.settings.charset().label().to_owned(),
            params,
        })
    }

    fn can_handle(&self, params: &Params) -> bool {
        params.get_or("VK_SND_ID", "") == self.profile.sender_id && params.has("VK_SERVICE")
    }

    fn handle_response(&self, response: &mut Response) -> Result<()> {
        let params = response.params();
        let source = self.mac_source(params)?;
        let signature = Base64Bytes::from(&*params.get("VK_MAC")?).decode()?;
        verify_source(
            self.settings.cert_path()?,
            &source,
            &signature,
            self.settings.charset(),
        )?;

        let service = params.get("VK_SERVICE")?.into_owned();
        let automatic = match params.value("VK_AUTO").map(|v| v.as_text()).as_deref() {
            Some("Y") => Some(true),
            Some("N") => Some(false),
            _ => None,
        };

        match service.as_str() {
            "1101" => response.set_successful(true),
            "1901" | "1902" => {
                #[cfg(feature = "telemetry")]
                tracing::debug!(tag = self.tag(), service = %service, "Payment not completed");
            }
            _ => return Err(ProtocolError::UnclassifiedService(service).into()),
        }
        response.set_automatic(automatic);
        Ok(())
    }

    fn extract_transaction(&self, response: &Response) -> Result<Transaction> {
        let params = response.params();
        let mut transaction = Transaction::new();
        if let Some(stamp) = params.value("VK_STAMP") {
            transaction.set_id(&stamp.as_text())?;
        }
        if params.has("VK_REF") {
            transaction.set_reference(params.get("VK_REF")?);
        }
        if params.has("VK_AMOUNT") {
            transaction.set_sum(&params.get("VK_AMOUNT")?)?;
        }
        if params.has("VK_MSG") {
            transaction.set_comment(params.get("VK_MSG")?);
        }
        if params.has("VK_CURR") {
            transaction.set_currency(params.get("VK_CURR")?);
        }
        if params.has("VK_LANG") {
            transaction.set_language(profile::language_from_code(&params.get("VK_LANG")?));
        }
        Ok(transaction)
    }
}

/// Blueprint building [`IPizzaAdapter`]s for one bank.
#[derive(Debug, Clone, Copy)]
pub struct IPizza(pub BankProfile);

impl IPizza {
    /// Swedbank blueprint, kind `swedbank`.
    #[must_use]
    pub const fn swedbank() -> Self {
        Self(profile::SWEDBANK)
    }

    /// SEB blueprint, kind `seb`.
    #[must_use]
    pub const fn seb() -> Self {
        Self(profile::SEB)
    }

    /// Danske Bank blueprint, kind `danske`.
    #[must_use]
    pub const fn danske() -> Self {
        Self(profile::DANSKE)
    }

    /// LHV blueprint, kind `lhv`.
    #[must_use]
    pub const fn lhv() -> Self {
        Self(profile::LHV)
    }

    /// Krediidipank blueprint, kind `krediidipank`.
    #[must_use]
    pub const fn krediidipank() -> Self {
        Self(profile::KREDIIDIPANK)
    }

    /// Blueprints of all supported banks.
    #[must_use]
    pub const fn all() -> [Self; 5] {
        [
            Self::swedbank(),
            Self::seb(),
            Self::danske(),
            Self::lhv(),
            Self::krediidipank(),
        ]
    }
}

impl AdapterBlueprint for IPizza {
    fn kind(&self) -> &str {
        self.0.kind
    }

    fn build(
        &self,
        tag: &str,
        config: &AdapterConfig,
        collaborators: &Collaborators,
    ) -> Result<Box<dyn PaymentAdapter>, ConfigurationError> {
        Ok(Box::new(IPizzaAdapter::new(self.0, tag, config, collaborators)?))
    }
}
