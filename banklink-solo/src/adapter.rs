//! The Nordea adapter and its blueprint.

use std::borrow::Cow;

use banklink::adapter::{AdapterBlueprint, PaymentAdapter};
use banklink::charset::Charset;
use banklink::config::{AdapterConfig, AdapterDefaults, AdapterSettings, ParamType, RequiredParam};
use banklink::error::{ConfigurationError, CryptoError, Result};
use banklink::form::PaymentForm;
use banklink::format::{FieldFormatter, FieldSpec, FieldTable, LengthMeasure};
use banklink::hooks::Collaborators;
use banklink::params::Params;
use banklink::response::Response;
use banklink::signing::{FieldOrders, HashFunction, delimited_with_secret, mac_eq};
use banklink::transaction::Transaction;

/// Protocol version sent with every request.
pub const VERSION: &str = "0003";

/// Blueprint kind.
pub const KIND: &str = "nordea";

const FIELDS: &[(&str, FieldSpec)] = &[
    ("SOLOPMT_VERSION", FieldSpec::max(4)),
    ("SOLOPMT_STAMP", FieldSpec::max(20)),
    ("SOLOPMT_RCV_ID", FieldSpec::max(15)),
    ("SOLOPMT_RCV_ACCOUNT", FieldSpec::max(21)),
    ("SOLOPMT_RCV_NAME", FieldSpec::max(30)),
    ("SOLOPMT_LANGUAGE", FieldSpec::max(1)),
    ("SOLOPMT_AMOUNT", FieldSpec::max(19)),
    ("SOLOPMT_REF", FieldSpec::max(16)),
    ("SOLOPMT_TAX_CODE", FieldSpec::max(28)),
    ("SOLOPMT_DATE", FieldSpec::max(10)),
    ("SOLOPMT_MSG", FieldSpec::max(210)),
    ("SOLOPMT_RETURN", FieldSpec::max(256)),
    ("SOLOPMT_CANCEL", FieldSpec::max(256)),
    ("SOLOPMT_REJECT", FieldSpec::max(256)),
    ("SOLOPMT_MAC", FieldSpec::max(32)),
    ("SOLOPMT_CONFIRM", FieldSpec::max(3)),
    ("SOLOPMT_KEYVERS", FieldSpec::max(4)),
    ("SOLOPMT_CUR", FieldSpec::max(3)),
    ("SOLOPMT_RETURN_VERSION", FieldSpec::max(4)),
    ("SOLOPMT_RETURN_STAMP", FieldSpec::max(20)),
    ("SOLOPMT_RETURN_REF", FieldSpec::max(16)),
    ("SOLOPMT_RETURN_PAID", FieldSpec::max(24)),
];

const MAC_ORDERS: &[(&str, &[&str])] = &[
    (
        PAYMENT,
        &[
            "SOLOPMT_VERSION",
            "SOLOPMT_STAMP",
            "SOLOPMT_RCV_ID",
            "SOLOPMT_AMOUNT",
            "SOLOPMT_REF",
            "SOLOPMT_DATE",
            "SOLOPMT_CUR",
        ],
    ),
    (
        PAYMENT_RESPONSE,
        &[
            "SOLOPMT_RETURN_VERSION",
            "SOLOPMT_RETURN_STAMP",
            "SOLOPMT_RETURN_REF",
            "SOLOPMT_RETURN_PAID",
        ],
    ),
];

const PAYMENT: &str = "payment";
const PAYMENT_RESPONSE: &str = "payment_response";

const REQUIRED_PARAMS: &[RequiredParam] = &[
    ("SOLOPMT_RCV_ID", ParamType::String),
    ("MAC_SECRET", ParamType::String),
];

const DEFAULTS: AdapterDefaults = AdapterDefaults {
    name: "Nordea",
    charset: "iso-8859-1",
    required: REQUIRED_PARAMS,
};

/// Maps a transaction language to `SOLOPMT_LANGUAGE`.
#[must_use]
pub fn language_code(language: &str) -> &'static str {
    match language {
        "et" => "4",
        _ => "3",
    }
}

/// Maps `SOLOPMT_RETURN_LANGUAGE` back to a transaction language, keeping
/// unknown codes.
#[must_use]
pub fn language_from_code(code: &str) -> String {
    match code {
        "4" => "et".to_owned(),
        "3" => "en".to_owned(),
        other => other.to_owned(),
    }
}

/// A configured Nordea (Solo) adapter.
///
/// Messages are authenticated with a keyed hash: the signed field values,
/// each followed by `&`, then the shared `MAC_SECRET` and a final `&`, hashed
/// with the contract's hash function.
#[derive(Debug)]
pub struct NordeaAdapter {
    settings: AdapterSettings,
    hash: HashFunction,
    fields: FieldTable,
    orders: FieldOrders,
}

impl NordeaAdapter {
    /// Builds the adapter stored under `tag`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError`] if `SOLOPMT_RCV_ID` or `MAC_SECRET` is
    /// missing, or `hash_function` is not on the allow-list.
    pub fn new(
        tag: &str,
        config: &AdapterConfig,
        collaborators: &Collaborators,
    ) -> Result<Self, ConfigurationError> {
        let settings = AdapterSettings::resolve(tag, config, &DEFAULTS, collaborators)?;
        let hash = settings
            .conf_str_opt("hash_function")
            .map(|name| name.parse::<HashFunction>())
            .transpose()?
            .unwrap_or_default();
        Ok(Self {
            settings,
            hash,
            fields: FieldTable::new(FIELDS),
            orders: FieldOrders::new(MAC_ORDERS),
        })
    }

    /// Resolved settings.
    #[must_use]
    pub const fn settings(&self) -> &AdapterSettings {
        &self.settings
    }

    /// Hash function of the MAC.
    #[must_use]
    pub const fn hash_function(&self) -> HashFunction {
        self.hash
    }

    /// Builds the MAC source of `message`. Absent fields, and fields whose
    /// value is empty or `"0"`, contribute an empty value.
    fn mac_source(&self, params: &Params, message: &str) -> Result<String> {
        let order = self.orders.get(message)?;
        let values: Vec<Cow<'_, str>> = order
            .iter()
            .map(|name| {
                if params.has(name) {
                    params.get_or(name, "")
                } else {
                    Cow::Borrowed("")
                }
            })
            .collect();
        Ok(delimited_with_secret(&values, &self.settings.conf_str("MAC_SECRET")?))
    }

    fn mac(&self, params: &Params, message: &str) -> Result<String> {
        let source = self.mac_source(params, message)?;
        Ok(self.hash.mac(&source, self.settings.charset()))
    }

    fn request_params(&self, transaction: &Transaction) -> Result<Params> {
        let settings = &self.settings;
        let return_url = settings.return_url();

        let mut params = Params::new();
        params
            .set("SOLOPMT_VERSION", VERSION)
            .set_optional("SOLOPMT_STAMP", transaction.id().map(ToString::to_string))
            .set("SOLOPMT_RCV_ID", settings.conf_str("SOLOPMT_RCV_ID")?)
            .set("SOLOPMT_LANGUAGE", language_code(transaction.language()))
            .set_optional("SOLOPMT_AMOUNT", transaction.sum())
            .set("SOLOPMT_DATE", settings.conf_str_or("SOLOPMT_DATE", "EXPRESS"))
            .set("SOLOPMT_RETURN", return_url)
            .set("SOLOPMT_CANCEL", settings.cancel_url())
            .set("SOLOPMT_REJECT", return_url)
            .set("SOLOPMT_CONFIRM", settings.conf_str_or("SOLOPMT_CONFIRM", "YES"))
            .set("SOLOPMT_KEYVERS", settings.conf_str_or("SOLOPMT_KEYVERS", "0001"))
            .set("SOLOPMT_CUR", transaction.currency());

        let reference = transaction
            .reference()
            .filter(|reference| !reference.is_empty())
            .map(str::to_owned)
            .or_else(|| settings.conf_str_opt("SOLOPMT_REF"));
        params.set_optional("SOLOPMT_REF", reference);

        let message = transaction
            .comment()
            .filter(|comment| !comment.is_empty())
            .map(str::to_owned)
            .or_else(|| settings.conf_str_opt("SOLOPMT_MSG"));
        params.set_optional("SOLOPMT_MSG", message);

        Ok(params)
    }
}

impl PaymentAdapter for NordeaAdapter {
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
        FieldFormatter::new(&self.fields, self.settings.charset(), LengthMeasure::Bytes)
            .format(&mut params)?;

        let mac = self.mac(&params, PAYMENT)?;
        params.set("SOLOPMT_MAC", mac);

        Ok(PaymentForm {
            tag: self.tag().to_owned(),
            provider_name: self.name().to_owned(),
            action: self.service_url().to_owned(),
            charset: self.settings.charset().label().to_owned(),
            params,
        })
    }

    fn can_handle(&self, params: &Params) -> bool {
        params.has("SOLOPMT_RETURN_MAC")
    }

    fn handle_response(&self, response: &mut Response) -> Result<()> {
        let params = response.params();
        let generated = self.mac(params, PAYMENT_RESPONSE)?;
        let received = params.get_or("SOLOPMT_RETURN_MAC", "");

        if !mac_eq(&received, &generated) {
            let fields = self
                .orders
                .get(PAYMENT_RESPONSE)?
                .iter()
                .map(|name| format!("{name}={}", params.get_or(name, "")))
                .collect::<Vec<_>>()
                .join(",");
            #[cfg(feature = "telemetry")]
            tracing::warn!(tag = self.tag(), fields = %fields, "Nordea MAC mismatch");
            return Err(CryptoError::MacMismatch {
                received: received.into_owned(),
                generated,
                fields,
            }
            .into());
        }

        let paid = params.has("SOLOPMT_RETURN_PAID");
        response.set_successful(paid);
        Ok(())
    }

    fn extract_transaction(&self, response: &Response) -> Result<Transaction> {
        let params = response.params();
        let mut transaction = Transaction::new();
        if params.has("SOLOPMT_RETURN_STAMP") {
            transaction.set_id(&params.get("SOLOPMT_RETURN_STAMP")?)?;
        }
        if params.has("SOLOPMT_RETURN_REF") {
            transaction.set_reference(params.get("SOLOPMT_RETURN_REF")?);
        }
        if params.has("SOLOPMT_RETURN_AMOUNT") {
            transaction.set_sum(&params.get("SOLOPMT_RETURN_AMOUNT")?)?;
        }
        if params.has("SOLOPMT_RETURN_MSG") {
            transaction.set_comment(params.get("SOLOPMT_RETURN_MSG")?);
        }
        if params.has("SOLOPMT_RETURN_CUR") {
            transaction.set_currency(params.get("SOLOPMT_RETURN_CUR")?);
        }
        if params.has("SOLOPMT_RETURN_LANGUAGE") {
            transaction.set_language(language_from_code(&params.get("SOLOPMT_RETURN_LANGUAGE")?));
        }
        Ok(transaction)
    }
}

/// Blueprint building [`NordeaAdapter`]s, kind `nordea`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Nordea;

impl AdapterBlueprint for Nordea {
    fn kind(&self) -> &str {
        KIND
    }

    fn build(
        &self,
        tag: &str,
        config: &AdapterConfig,
        collaborators: &Collaborators,
    ) -> Result<Box<dyn PaymentAdapter>, ConfigurationError> {
        Ok(Box::new(NordeaAdapter::new(tag, config, collaborators)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use banklink::error::BanklinkError;
    use banklink::{AdapterBlueprints, Decimal, PaymentConfig, PaymentService};

    const RETURN_URL: &str = "https://shop.example/payment/return";

    fn nordea_config() -> AdapterConfig {
        AdapterConfig::new(KIND)
            .param("SOLOPMT_RCV_ID", "10507901")
            .param("MAC_SECRET", "secret")
            .service_url("https://netbank.nordea.com/pnbepay/epayn.jsp")
            .return_route(RETURN_URL)
    }

    fn adapter_with(config: &AdapterConfig) -> NordeaAdapter {
        NordeaAdapter::new("NORDEA", config, &Collaborators::default()).unwrap()
    }

    fn adapter() -> NordeaAdapter {
        adapter_with(&nordea_config())
    }

    /// Builds a response carrying the MAC the bank would send.
    fn bank_response(adapter: &NordeaAdapter, fields: &[(&str, &str)]) -> Response {
        let mut params: Params = fields.iter().copied().collect();
        let mac = adapter.mac(&params, PAYMENT_RESPONSE).unwrap();
        params.set("SOLOPMT_RETURN_MAC", mac);
        Response::new(params)
    }

    const PAID: &[(&str, &str)] = &[
        ("SOLOPMT_RETURN_VERSION", "0003"),
        ("SOLOPMT_RETURN_STAMP", "13"),
        ("SOLOPMT_RETURN_REF", "136"),
        ("SOLOPMT_RETURN_PAID", "PAID1234567"),
        ("SOLOPMT_RETURN_AMOUNT", "35.50"),
        ("SOLOPMT_RETURN_CUR", "EUR"),
        ("SOLOPMT_RETURN_MSG", "Tellimus 13"),
        ("SOLOPMT_RETURN_LANGUAGE", "4"),
    ];

    #[test]
    fn test_request_fields() {
        let transaction = Transaction::create("13", "35").unwrap();
        let form = adapter().build_request(&transaction).unwrap();

        let names: Vec<&str> = form.params.iter().map(|(name, _)| name).collect();
        assert_eq!(
            names,
            [
                "SOLOPMT_VERSION",
                "SOLOPMT_STAMP",
                "SOLOPMT_RCV_ID",
                "SOLOPMT_LANGUAGE",
                "SOLOPMT_AMOUNT",
                "SOLOPMT_DATE",
                "SOLOPMT_RETURN",
                "SOLOPMT_CANCEL",
                "SOLOPMT_REJECT",
                "SOLOPMT_CONFIRM",
                "SOLOPMT_KEYVERS",
                "SOLOPMT_CUR",
                "SOLOPMT_MAC",
            ]
        );
        assert_eq!(form.params.get("SOLOPMT_LANGUAGE").unwrap(), "4");
        assert_eq!(form.params.get("SOLOPMT_DATE").unwrap(), "EXPRESS");
        assert_eq!(form.params.get("SOLOPMT_CONFIRM").unwrap(), "YES");
        assert_eq!(form.params.get("SOLOPMT_KEYVERS").unwrap(), "0001");
        assert_eq!(form.params.get("SOLOPMT_REJECT").unwrap(), RETURN_URL);
        assert_eq!(form.provider_name, "Nordea");
        assert_eq!(form.charset, "iso-8859-1");
    }

    #[test]
    fn test_request_mac_matches_published_example() {
        let adapter = adapter();
        let transaction = Transaction::create("13", "35").unwrap();
        let form = adapter.build_request(&transaction).unwrap();

        let source = adapter.mac_source(&form.params, PAYMENT).unwrap();
        assert_eq!(source, "0003&13&10507901&35&&EXPRESS&EUR&secret&");
        assert_eq!(
            form.params.get("SOLOPMT_MAC").unwrap(),
            HashFunction::Md5.digest_upper_hex(source.as_bytes())
        );
    }

    #[test]
    fn test_sha1_mac() {
        let adapter = adapter_with(&nordea_config().param("hash_function", "sha1"));
        assert_eq!(adapter.hash_function(), HashFunction::Sha1);
        let form = adapter
            .build_request(&Transaction::create("13", "35").unwrap())
            .unwrap();
        assert_eq!(form.params.get("SOLOPMT_MAC").unwrap().len(), 40);
    }

    #[test]
    fn test_unknown_hash_function() {
        let config = nordea_config().param("hash_function", "sha256");
        let err = NordeaAdapter::new("NORDEA", &config, &Collaborators::default()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Unknown hash function: 'sha256'. Please use one of: sha1, md5"
        );
    }

    #[test]
    fn test_missing_secret() {
        let mut config = nordea_config();
        config.params.remove("MAC_SECRET");
        let err = NordeaAdapter::new("NORDEA", &config, &Collaborators::default()).unwrap_err();
        assert!(matches!(
            err,
            ConfigurationError::InvalidParameter { ref name, .. } if name == "MAC_SECRET"
        ));
    }

    #[test]
    fn test_reference_message_and_language() {
        let adapter = adapter_with(&nordea_config().param("SOLOPMT_MSG", "Tellimus"));
        let mut transaction = Transaction::create("13", "35.50").unwrap();
        transaction.set_language("en");

        let form = adapter.build_request(&transaction).unwrap();
        assert_eq!(form.params.get("SOLOPMT_LANGUAGE").unwrap(), "3");
        assert_eq!(form.params.get("SOLOPMT_MSG").unwrap(), "Tellimus");
        assert!(!form.params.contains("SOLOPMT_REF"));

        transaction.generate_reference().set_comment("Arve nr 13 жук");
        let form = adapter.build_request(&transaction).unwrap();
        assert_eq!(form.params.get("SOLOPMT_REF").unwrap(), "136");
        assert_eq!(form.params.get("SOLOPMT_MSG").unwrap(), "Arve nr 13 ???");
        let source = adapter.mac_source(&form.params, PAYMENT).unwrap();
        assert_eq!(source, "0003&13&10507901&35.5&136&EXPRESS&EUR&secret&");
    }

    #[test]
    fn test_falsy_values_sign_as_empty() {
        let adapter = adapter();
        let mut transaction = Transaction::create("13", "35").unwrap();
        transaction.set_reference("0");
        let form = adapter.build_request(&transaction).unwrap();
        assert_eq!(form.params.get("SOLOPMT_REF").unwrap(), "0");

        let source = adapter.mac_source(&form.params, PAYMENT).unwrap();
        assert_eq!(source, "0003&13&10507901&35&&EXPRESS&EUR&secret&");
    }

    #[test]
    fn test_empty_reference_and_message_fall_back_to_config() {
        let config = nordea_config()
            .param("SOLOPMT_REF", "136")
            .param("SOLOPMT_MSG", "Tellimus");
        let mut transaction = Transaction::create("13", "35").unwrap();
        transaction.set_reference("").set_comment("");
        let form = adapter_with(&config).build_request(&transaction).unwrap();
        assert_eq!(form.params.get("SOLOPMT_REF").unwrap(), "136");
        assert_eq!(form.params.get("SOLOPMT_MSG").unwrap(), "Tellimus");
    }

    #[test]
    fn test_date_and_confirm_overrides() {
        let config = nordea_config()
            .param("SOLOPMT_DATE", "18.10.2026")
            .param("SOLOPMT_CONFIRM", "NO")
            .param("SOLOPMT_KEYVERS", "0002");
        let form = adapter_with(&config)
            .build_request(&Transaction::create("13", "35").unwrap())
            .unwrap();
        assert_eq!(form.params.get("SOLOPMT_DATE").unwrap(), "18.10.2026");
        assert_eq!(form.params.get("SOLOPMT_CONFIRM").unwrap(), "NO");
        assert_eq!(form.params.get("SOLOPMT_KEYVERS").unwrap(), "0002");
    }

    #[test]
    fn test_paid_response() {
        let adapter = adapter();
        let mut response = bank_response(&adapter, PAID);
        assert!(adapter.can_handle(response.params()));

        adapter.handle_response(&mut response).unwrap();
        assert!(response.is_successful());
        assert_eq!(response.automatic(), None);

        let transaction = adapter.extract_transaction(&response).unwrap();
        assert_eq!(transaction.id().unwrap().as_str(), "13");
        assert_eq!(transaction.reference(), Some("136"));
        assert_eq!(transaction.sum(), Some(Decimal::new(355, 1)));
        assert_eq!(transaction.currency(), "EUR");
        assert_eq!(transaction.comment(), Some("Tellimus 13"));
        assert_eq!(transaction.language(), "et");
    }

    #[test]
    fn test_unpaid_response() {
        let adapter = adapter();
        let mut response = bank_response(
            &adapter,
            &[
                ("SOLOPMT_RETURN_VERSION", "0003"),
                ("SOLOPMT_RETURN_STAMP", "13"),
                ("SOLOPMT_RETURN_REF", "136"),
            ],
        );
        adapter.handle_response(&mut response).unwrap();
        assert!(!response.is_successful());
    }

    #[test]
    fn test_mac_mismatch_reports_fields() {
        let adapter = adapter();
        let response = bank_response(&adapter, PAID);
        let mut params = response.params().clone();
        params.set("SOLOPMT_RETURN_STAMP", "14");
        let mut tampered = Response::new(params);

        let err = adapter.handle_response(&mut tampered).unwrap_err();
        assert!(err.is_signature_failure());
        match err {
            BanklinkError::Crypto(CryptoError::MacMismatch {
                received,
                generated,
                fields,
            }) => {
                assert_ne!(received, generated);
                assert_eq!(
                    fields,
                    "SOLOPMT_RETURN_VERSION=0003,SOLOPMT_RETURN_STAMP=14,SOLOPMT_RETURN_REF=136,SOLOPMT_RETURN_PAID=PAID1234567"
                );
            }
            other => panic!("expected a MAC mismatch, got {other}"),
        }
        assert!(!tampered.is_successful());
    }

    #[test]
    fn test_wrong_secret_fails() {
        let bank = adapter_with(&nordea_config().param("MAC_SECRET", "other"));
        let mut response = bank_response(&bank, PAID);
        let err = adapter().handle_response(&mut response).unwrap_err();
        assert!(err.is_signature_failure());
    }

    #[test]
    fn test_can_handle() {
        let adapter = adapter();
        let params = |pairs: &[(&str, &str)]| -> Params { pairs.iter().copied().collect() };
        assert!(adapter.can_handle(&params(&[("SOLOPMT_RETURN_MAC", "ABC")])));
        assert!(!adapter.can_handle(&params(&[("SOLOPMT_RETURN_MAC", "")])));
        assert!(!adapter.can_handle(&params(&[("VK_SND_ID", "HP"), ("VK_SERVICE", "1101")])));
    }

    #[test]
    fn test_built_from_config() {
        let config = PaymentConfig::from_json_str(
            r#"{
                "common": { "returnRoute": "/return" },
                "adapters": {
                    "NORDEA": {
                        "serviceUrl": "https://netbank.nordea.com/pnbepay/epayn.jsp",
                        "params": { "SOLOPMT_RCV_ID": "10507901", "MAC_SECRET": "secret", "hash_function": "md5" }
                    }
                }
            }"#,
        )
        .unwrap();
        let blueprints = AdapterBlueprints::new().and_register(Nordea);
        let service = PaymentService::from_config(&config, &blueprints, &Collaborators::default()).unwrap();

        let adapter = adapter();
        let signed = bank_response(&adapter, PAID);
        let response = service.handle_response(signed.params().to_ordered_list()).unwrap();
        assert!(response.is_successful());
        assert_eq!(service.adapter("NORDEA").unwrap().name(), "Nordea");
    }
}
