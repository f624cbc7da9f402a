//! The Estcard adapter and its blueprint.

use std::sync::Arc;

use banklink::Decimal;
use banklink::adapter::{AdapterBlueprint, PaymentAdapter};
use banklink::charset::Charset;
use banklink::config::{AdapterConfig, AdapterDefaults, AdapterSettings, ParamType, RequiredParam};
use banklink::encoding::HexBytes;
use banklink::error::{ConfigurationError, Result};
use banklink::form::PaymentForm;
use banklink::format::{FieldFormatter, FieldSpec, FieldTable, LengthMeasure, PadSide};
use banklink::hooks::Collaborators;
use banklink::params::Params;
use banklink::response::Response;
use banklink::signing::{FieldOrders, concatenated, sign_source, verify_source};
use banklink::transaction::{Transaction, TransactionId, parse_amount};

use crate::clock::{Clock, LocalClock};

/// Blueprint kind.
pub const KIND: &str = "estcard";

/// Protocol version sent with every request.
pub const VERSION: u32 = 4;

/// Added to transaction ids below [`ECUNO_MIN`] to form `ecuno`.
pub const ECUNO_OFFSET: u64 = 100_000_000;

/// Smallest transaction id sent without [`ECUNO_OFFSET`].
pub const ECUNO_MIN: u64 = 100_000;

/// `respcode` of an approved payment.
pub const APPROVED: &str = "000";

const FIELDS: &[(&str, FieldSpec)] = &[
    ("action", FieldSpec::max(3)),
    ("ver", FieldSpec::max(3).pattern("%03s")),
    ("id", FieldSpec::max(10).pattern("%-10s")),
    ("ecuno", FieldSpec::max(12).pattern("%012s")),
    ("eamount", FieldSpec::max(12).pattern("%012s")),
    ("cur", FieldSpec::max(3).pattern("%3s")),
    ("datetime", FieldSpec::max(14)),
    ("feedBackUrl", FieldSpec::max(128).pattern("%-128s")),
    ("delivery", FieldSpec::max(1).pattern("%1s")),
    ("charEncoding", FieldSpec::max(10)),
    // response only
    ("respcode", FieldSpec::max(3).pad(PadSide::Right)),
    ("receipt_no", FieldSpec::max(6).pad_with(PadSide::Left, '0')),
    ("actiontext", FieldSpec::max(40).pad(PadSide::Right)),
    ("msgdata", FieldSpec::max(40).pad(PadSide::Right)),
    ("mac", FieldSpec::max(512)),
];

const PAYMENT: &str = "payment";
const PAYMENT_RESPONSE: &str = "payment_response";

const MAC_ORDERS: &[(&str, &[&str])] = &[
    (
        PAYMENT,
        &[
            "ver",
            "id",
            "ecuno",
            "eamount",
            "cur",
            "datetime",
            "feedBackUrl",
            "delivery",
        ],
    ),
    (
        PAYMENT_RESPONSE,
        &[
            "ver",
            "id",
            "ecuno",
            "receipt_no",
            "eamount",
            "cur",
            "respcode",
            "datetime",
            "msgdata",
            "actiontext",
        ],
    ),
];

const REQUIRED_PARAMS: &[RequiredParam] = &[("id", ParamType::String)];

const DEFAULTS: AdapterDefaults = AdapterDefaults {
    name: "Credit Card",
    charset: "utf-8",
    required: REQUIRED_PARAMS,
};

/// Maps a transaction language to `lang`. Only Estonian and English are
/// passed through.
#[must_use]
pub fn language_code(language: &str) -> &str {
    match language {
        "et" | "en" => language,
        _ => "en",
    }
}

/// Derives `ecuno` from a transaction id.
#[must_use]
pub fn ecuno(id: &TransactionId) -> String {
    match id.as_u64() {
        Some(n) if n < ECUNO_MIN => (n + ECUNO_OFFSET).to_string(),
        _ => id.to_string(),
    }
}

/// Recovers the transaction id from `ecuno`.
#[must_use]
pub fn id_from_ecuno(ecuno: &TransactionId) -> TransactionId {
    match ecuno.as_u64() {
        Some(n) if n > ECUNO_OFFSET => TransactionId::from(n % ECUNO_OFFSET),
        Some(n) => TransactionId::from(n),
        None => ecuno.clone(),
    }
}

/// A configured Estcard adapter.
#[derive(Debug)]
pub struct EstcardAdapter {
    settings: AdapterSettings,
    clock: Arc<dyn Clock>,
    fields: FieldTable,
    orders: FieldOrders,
}

impl EstcardAdapter {
    /// Builds the adapter stored under `tag`, stamping requests with `clock`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError`] if the merchant `id` is missing.
    pub fn new(
        tag: &str,
        config: &AdapterConfig,
        collaborators: &Collaborators,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ConfigurationError> {
        Ok(Self {
            settings: AdapterSettings::resolve(tag, config, &DEFAULTS, collaborators)?,
            clock,
            fields: FieldTable::new(FIELDS),
            orders: FieldOrders::new(MAC_ORDERS),
        })
    }

    /// Resolved settings.
    #[must_use]
    pub const fn settings(&self) -> &AdapterSettings {
        &self.settings
    }

    fn formatter(&self) -> FieldFormatter<'_> {
        FieldFormatter::new(&self.fields, self.settings.charset(), LengthMeasure::Chars)
    }

    /// Concatenates already formatted fields in the order of `message`.
    fn mac_source(&self, formatted: &Params, message: &str) -> Result<String> {
        let order = self.orders.get(message)?;
        Ok(concatenated(&formatted.ordered_values(order)))
    }

    fn request_params(&self, transaction: &Transaction) -> Result<Params> {
        let settings = &self.settings;
        let amount = transaction
            .sum()
            .map(|sum| (sum * Decimal::ONE_HUNDRED).trunc());

        let mut params = Params::new();
        params
            .set("action", "gaf")
            .set("ver", VERSION)
            .set("datetime", self.clock.timestamp())
            .set("id", settings.conf_str("id")?)
            .set_optional("ecuno", transaction.id().map(ecuno))
            .set_optional("eamount", amount)
            .set("cur", transaction.currency())
            .set("lang", language_code(transaction.language()))
            .set("charEncoding", settings.conf_str_or("charEncoding", "UTF-8"))
            .set("feedBackUrl", settings.return_url())
            .set("delivery", settings.conf_str_or("delivery", "S"));
        Ok(params)
    }
}

impl PaymentAdapter for EstcardAdapter {
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

        let source = self.mac_source(&params, PAYMENT)?;
        let signature = sign_source(self.settings.key_path()?, &source, self.settings.charset())?;
        params.set("mac", HexBytes::encode(signature).into_inner());

        // the form carries unpadded values, the MAC covers the padded ones
        let id = params.get("id")?.trim().to_owned();
        params
            .set("id", id)
            .set("feedBackUrl", self.settings.return_url().trim());

        Ok(PaymentForm {
            tag: self.tag().to_owned(),
            provider_name: self.name().to_owned(),
            action: self.service_url().to_owned(),
            charset: self.settings.charset().label().to_owned(),
            params,
        })
    }

    fn can_handle(&self, params: &Params) -> bool {
        params.get_or("action", "") == "afb"
    }

    fn handle_response(&self, response: &mut Response) -> Result<()> {
        let mut formatted = response.params().clone();
        self.formatter().format(&mut formatted)?;

        let source = self.mac_source(&formatted, PAYMENT_RESPONSE)?;
        let signature = HexBytes::from(&*response.params().get("mac")?).decode()?;
        verify_source(
            self.settings.cert_path()?,
            &source,
            &signature,
            self.settings.charset(),
        )?;

        let approved = response.params().get_or("respcode", "") == APPROVED;
        #[cfg(feature = "telemetry")]
        if !approved {
            tracing::debug!(
                tag = self.tag(),
                respcode = %response.params().get_or("respcode", ""),
                "Card payment not approved"
            );
        }
        response.set_successful(approved);
        Ok(())
    }

    fn extract_transaction(&self, response: &Response) -> Result<Transaction> {
        let params = response.params();
        let mut transaction = Transaction::new();
        if params.has("ecuno") {
            let ecuno: TransactionId = params.get("ecuno")?.parse()?;
            transaction.set_id(id_from_ecuno(&ecuno).as_str())?;
        }
        if params.has("eamount") {
            let cents = parse_amount(&params.get("eamount")?)?;
            transaction.set_sum_decimal(cents / Decimal::ONE_HUNDRED);
        }
        if params.has("cur") {
            transaction.set_currency(params.get("cur")?);
        }
        if params.has("lang") {
            transaction.set_language(params.get("lang")?);
        }
        Ok(transaction)
    }
}

/// Blueprint building [`EstcardAdapter`]s, kind `estcard`.
#[derive(Debug, Clone)]
pub struct Estcard {
    clock: Arc<dyn Clock>,
}

impl Estcard {
    /// Blueprint stamping requests with the local system time.
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(LocalClock)
    }

    /// Blueprint stamping requests with `clock`.
    #[must_use]
    pub fn with_clock(clock: impl Clock + 'static) -> Self {
        Self {
            clock: Arc::new(clock),
        }
    }
}

impl Default for Estcard {
    fn default() -> Self {
        Self::new()
    }
}

impl AdapterBlueprint for Estcard {
    fn kind(&self) -> &str {
        KIND
    }

    fn build(
        &self,
        tag: &str,
        config: &AdapterConfig,
        collaborators: &Collaborators,
    ) -> Result<Box<dyn PaymentAdapter>, ConfigurationError> {
        Ok(Box::new(EstcardAdapter::new(
            tag,
            config,
            collaborators,
            Arc::clone(&self.clock),
        )?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use banklink::error::BanklinkError;
    use banklink::testing::KeyMaterial;
    use banklink::{AdapterBlueprints, PaymentService};
    use chrono::NaiveDate;

    const RETURN_URL: &str = "https://shop.example/payment/return";

    fn clock() -> Arc<dyn Clock> {
        let instant = NaiveDate::from_ymd_opt(2026, 10, 18)
            .unwrap()
            .and_hms_opt(12, 30, 45)
            .unwrap();
        Arc::new(FixedClock(instant))
    }

    fn estcard_config(keys: &KeyMaterial) -> AdapterConfig {
        AdapterConfig::new(KIND)
            .param("id", "uid100010")
            .keys(keys.key_path_str(), keys.cert_path_str())
            .service_url("https://pos.estcard.ee/ecom/iPayServlet")
            .return_route(RETURN_URL)
    }

    fn adapter(keys: &KeyMaterial) -> EstcardAdapter {
        EstcardAdapter::new("ESTCARD", &estcard_config(keys), &Collaborators::default(), clock()).unwrap()
    }

    /// Signs `fields` the way the card centre would.
    fn card_response(adapter: &EstcardAdapter, keys: &KeyMaterial, fields: &[(&str, &str)]) -> Response {
        let mut params: Params = fields.iter().copied().collect();
        let mut formatted = params.clone();
        adapter.formatter().format(&mut formatted).unwrap();
        let source = adapter.mac_source(&formatted, PAYMENT_RESPONSE).unwrap();
        let signature = sign_source(keys.key_path(), &source, adapter.charset()).unwrap();
        params.set("mac", HexBytes::encode(signature).into_inner());
        Response::new(params)
    }

    fn approved_fields() -> Vec<(&'static str, &'static str)> {
        vec![
            ("action", "afb"),
            ("ver", "4"),
            ("id", "uid100010"),
            ("ecuno", "100000013"),
            ("receipt_no", "42"),
            ("eamount", "3550"),
            ("cur", "EUR"),
            ("respcode", "000"),
            ("datetime", "20261018123512"),
            ("msgdata", "Tellimus 13"),
            ("actiontext", "OK, tehing autoriseeritud"),
            ("lang", "et"),
        ]
    }

    #[test]
    fn test_request_fields() {
        let keys = KeyMaterial::generate();
        let transaction = Transaction::create("13", "35.50").unwrap();
        let form = adapter(&keys).build_request(&transaction).unwrap();

        let names: Vec<&str> = form.params.iter().map(|(name, _)| name).collect();
        assert_eq!(
            names,
            [
                "action",
                "ver",
                "datetime",
                "id",
                "ecuno",
                "eamount",
                "cur",
                "lang",
                "charEncoding",
                "feedBackUrl",
                "delivery",
                "mac",
            ]
        );
        let p = &form.params;
        assert_eq!(p.get("action").unwrap(), "gaf");
        assert_eq!(p.get("ver").unwrap(), "004");
        assert_eq!(p.get("datetime").unwrap(), "20261018123045");
        assert_eq!(p.get("id").unwrap(), "uid100010");
        assert_eq!(p.get("ecuno").unwrap(), "000100000013");
        assert_eq!(p.get("eamount").unwrap(), "000000003550");
        assert_eq!(p.get("cur").unwrap(), "EUR");
        assert_eq!(p.get("lang").unwrap(), "et");
        assert_eq!(p.get("charEncoding").unwrap(), "UTF-8");
        assert_eq!(p.get("feedBackUrl").unwrap(), RETURN_URL);
        assert_eq!(p.get("delivery").unwrap(), "S");
        assert_eq!(p.get("mac").unwrap().len(), 512);
        assert_eq!(form.provider_name, "Credit Card");
    }

    #[test]
    fn test_request_mac_covers_padded_values() {
        let keys = KeyMaterial::generate();
        let adapter = adapter(&keys);
        let form = adapter
            .build_request(&Transaction::create("13", "35.50").unwrap())
            .unwrap();

        let expected = format!(
            "004uid100010 000100000013000000003550EUR20261018123045{RETURN_URL:<128}S"
        );
        let signature = HexBytes::from(&*form.params.get("mac").unwrap())
            .decode()
            .unwrap();
        verify_source(keys.cert_path(), &expected, &signature, adapter.charset()).unwrap();

        // the form itself carries the trimmed values
        let err = verify_source(
            keys.cert_path(),
            &concatenated(&form.params.ordered_values(MAC_ORDERS[0].1)),
            &signature,
            adapter.charset(),
        )
        .unwrap_err();
        assert!(matches!(err, banklink::error::CryptoError::SignatureMismatch));
    }

    #[test]
    fn test_amount_is_truncated_to_cents() {
        let keys = KeyMaterial::generate();
        let form = adapter(&keys)
            .build_request(&Transaction::create("13", "10.999").unwrap())
            .unwrap();
        assert_eq!(form.params.get("eamount").unwrap(), "000000001099");
    }

    #[test]
    fn test_large_ids_are_not_offset() {
        let keys = KeyMaterial::generate();
        let form = adapter(&keys)
            .build_request(&Transaction::create("123456", "1").unwrap())
            .unwrap();
        assert_eq!(form.params.get("ecuno").unwrap(), "000000123456");
    }

    #[test]
    fn test_ecuno_round_trip() {
        for id in ["1", "13", "99999", "100000", "99999999"] {
            let id: TransactionId = id.parse().unwrap();
            let ecuno: TransactionId = ecuno(&id).parse().unwrap();
            assert_eq!(id_from_ecuno(&ecuno), id);
        }
        assert_eq!(ecuno(&"99999".parse().unwrap()), "100099999");
        assert_eq!(ecuno(&"100000".parse().unwrap()), "100000");
    }

    #[test]
    fn test_language_and_config_overrides() {
        let keys = KeyMaterial::generate();
        let config = estcard_config(&keys)
            .param("charEncoding", "ISO-8859-1")
            .param("delivery", "T");
        let adapter = EstcardAdapter::new("ESTCARD", &config, &Collaborators::default(), clock()).unwrap();
        let mut transaction = Transaction::create("13", "1").unwrap();
        transaction.set_language("ru");

        let form = adapter.build_request(&transaction).unwrap();
        assert_eq!(form.params.get("lang").unwrap(), "en");
        assert_eq!(form.params.get("charEncoding").unwrap(), "ISO-8859-1");
        assert_eq!(form.params.get("delivery").unwrap(), "T");
    }

    #[test]
    fn test_approved_response() {
        let keys = KeyMaterial::generate();
        let adapter = adapter(&keys);
        let mut response = card_response(&adapter, &keys, &approved_fields());

        assert!(adapter.can_handle(response.params()));
        adapter.handle_response(&mut response).unwrap();
        assert!(response.is_successful());
        assert_eq!(response.automatic(), None);

        let transaction = adapter.extract_transaction(&response).unwrap();
        assert_eq!(transaction.id().unwrap().as_str(), "13");
        assert_eq!(transaction.sum(), Some(Decimal::new(355, 1)));
        assert_eq!(transaction.currency(), "EUR");
        assert_eq!(transaction.language(), "et");
        assert_eq!(transaction.comment(), None);
        assert_eq!(transaction.reference(), None);
    }

    #[test]
    fn test_verification_uses_padded_response_fields() {
        let keys = KeyMaterial::generate();
        let adapter = adapter(&keys);
        let mut fields = approved_fields();
        let response = card_response(&adapter, &keys, &fields);
        let mac = response.params().get("mac").unwrap().into_owned();

        // the card centre sends padding the formatter restores
        for (name, value) in &mut fields {
            match *name {
                "receipt_no" => *value = "000042",
                "actiontext" => *value = "OK, tehing autoriseeritud      ",
                _ => {}
            }
        }
        let mut params: Params = fields.iter().copied().collect();
        params.set("mac", mac);
        let mut response = Response::new(params);
        adapter.handle_response(&mut response).unwrap();
        assert!(response.is_successful());
    }

    #[test]
    fn test_declined_response() {
        let keys = KeyMaterial::generate();
        let adapter = adapter(&keys);
        let mut fields = approved_fields();
        fields[7] = ("respcode", "111");
        let mut response = card_response(&adapter, &keys, &fields);
        adapter.handle_response(&mut response).unwrap();
        assert!(!response.is_successful());
    }

    #[test]
    fn test_tampered_response_fails() {
        let keys = KeyMaterial::generate();
        let adapter = adapter(&keys);
        let response = card_response(&adapter, &keys, &approved_fields());
        let mut params = response.params().clone();
        params.set("eamount", "1");
        let err = adapter.handle_response(&mut Response::new(params)).unwrap_err();
        assert!(err.is_signature_failure());
    }

    #[test]
    fn test_malformed_mac() {
        let keys = KeyMaterial::generate();
        let adapter = adapter(&keys);
        let mut params: Params = approved_fields().into_iter().collect();
        params.set("mac", "not hex");
        let err = adapter.handle_response(&mut Response::new(params)).unwrap_err();
        assert!(matches!(
            err,
            BanklinkError::Crypto(banklink::error::CryptoError::MalformedHex(_))
        ));
    }

    #[test]
    fn test_can_handle() {
        let keys = KeyMaterial::generate();
        let adapter = adapter(&keys);
        let params = |pairs: &[(&str, &str)]| -> Params { pairs.iter().copied().collect() };
        assert!(adapter.can_handle(&params(&[("action", "afb")])));
        assert!(!adapter.can_handle(&params(&[("action", "gaf")])));
        assert!(!adapter.can_handle(&params(&[("VK_SND_ID", "HP")])));
    }

    #[test]
    fn test_missing_merchant_id() {
        let keys = KeyMaterial::generate();
        let mut config = estcard_config(&keys);
        config.params.remove("id");
        let err = EstcardAdapter::new("ESTCARD", &config, &Collaborators::default(), clock()).unwrap_err();
        assert!(matches!(err, ConfigurationError::InvalidParameter { .. }));
    }

    #[test]
    fn test_blueprint_uses_its_clock() {
        let keys = KeyMaterial::generate();
        let instant = NaiveDate::from_ymd_opt(2026, 1, 2)
            .unwrap()
            .and_hms_opt(3, 4, 5)
            .unwrap();
        let blueprints = AdapterBlueprints::new().and_register(Estcard::with_clock(FixedClock(instant)));
        let adapter = blueprints
            .build("ESTCARD", &estcard_config(&keys), &Collaborators::default())
            .unwrap();
        let service = PaymentService::new(vec![adapter], &Collaborators::default());

        let forms = service
            .generate_forms(&Transaction::create("13", "1").unwrap())
            .unwrap();
        assert_eq!(forms["ESTCARD"].params.get("datetime").unwrap(), "20260102030405");
    }
}
