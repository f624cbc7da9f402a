//! Bank profiles and protocol tables.
//!
//! All iPizza banks share the field table and message orders below. A
//! [`BankProfile`] only records where a bank deviates from them.

use banklink::config::{ParamType, RequiredParam};
use banklink::format::{FieldSpec, LengthMeasure};

/// Field lengths shared by all iPizza banks.
pub const FIELDS: &[(&str, FieldSpec)] = &[
    ("VK_SERVICE", FieldSpec::max(4)),
    ("VK_VERSION", FieldSpec::max(3)),
    ("VK_SND_ID", FieldSpec::max(15)),
    ("VK_REC_ID", FieldSpec::max(15)),
    ("VK_STAMP", FieldSpec::max(20)),
    ("VK_T_NO", FieldSpec::max(5)),
    ("VK_AMOUNT", FieldSpec::max(17)),
    ("VK_CURR", FieldSpec::max(3)),
    ("VK_ACC", FieldSpec::max(16)),
    ("VK_REC_ACC", FieldSpec::max(16)),
    ("VK_NAME", FieldSpec::max(40)),
    ("VK_REC_NAME", FieldSpec::max(40)),
    ("VK_SND_ACC", FieldSpec::max(16)),
    ("VK_SND_NAME", FieldSpec::max(40)),
    ("VK_REF", FieldSpec::max(20)),
    ("VK_MSG", FieldSpec::max(70)),
    ("VK_T_DATE", FieldSpec::max(10)),
    ("VK_MAC", FieldSpec::max(344)),
    ("VK_RETURN", FieldSpec::max(60)),
    ("VK_CANCEL", FieldSpec::max(60)),
    ("VK_LANG", FieldSpec::max(3)),
    ("VK_CHARSET", FieldSpec::max(10)),
];

/// Signed fields per service code.
pub const MAC_ORDERS: &[(&str, &[&str])] = &[
    // payment request
    (
        "1001",
        &[
            "VK_SERVICE",
            "VK_VERSION",
            "VK_SND_ID",
            "VK_STAMP",
            "VK_AMOUNT",
            "VK_CURR",
            "VK_ACC",
            "VK_NAME",
            "VK_REF",
            "VK_MSG",
        ],
    ),
    // payment request, receiver account from contract
    (
        "1002",
        &[
            "VK_SERVICE",
            "VK_VERSION",
            "VK_SND_ID",
            "VK_STAMP",
            "VK_AMOUNT",
            "VK_CURR",
            "VK_REF",
            "VK_MSG",
        ],
    ),
    // payment completed
    (
        "1101",
        &[
            "VK_SERVICE",
            "VK_VERSION",
            "VK_SND_ID",
            "VK_REC_ID",
            "VK_STAMP",
            "VK_T_NO",
            "VK_AMOUNT",
            "VK_CURR",
            "VK_REC_ACC",
            "VK_REC_NAME",
            "VK_SND_ACC",
            "VK_SND_NAME",
            "VK_REF",
            "VK_MSG",
            "VK_T_DATE",
        ],
    ),
    // payment not completed
    (
        "1901",
        &[
            "VK_SERVICE",
            "VK_VERSION",
            "VK_SND_ID",
            "VK_REC_ID",
            "VK_STAMP",
            "VK_REF",
            "VK_MSG",
        ],
    ),
];

/// Merchant parameters every iPizza bank requires.
pub const REQUIRED_PARAMS: &[RequiredParam] = &[
    ("VK_SND_ID", ParamType::String),
    ("VK_ACC", ParamType::String),
    ("VK_NAME", ParamType::String),
];

/// Where one bank deviates from the shared iPizza protocol.
#[derive(Debug, Clone, Copy)]
pub struct BankProfile {
    /// Blueprint kind.
    pub kind: &'static str,
    /// Display name.
    pub name: &'static str,
    /// `VK_SND_ID` the bank puts in its responses.
    pub sender_id: &'static str,
    /// Default charset label.
    pub charset: &'static str,
    /// How field lengths are measured.
    pub measure: LengthMeasure,
    /// Request field announcing the charset, if any.
    pub charset_field: Option<&'static str>,
    /// Service code used regardless of configuration.
    pub forced_service: Option<&'static str>,
    /// Field table entries replacing or extending [`FIELDS`].
    pub fields: &'static [(&'static str, FieldSpec)],
    /// Message orders replacing or extending [`MAC_ORDERS`].
    pub mac_orders: &'static [(&'static str, &'static [&'static str])],
}

/// Swedbank (Hansapank).
pub const SWEDBANK: BankProfile = BankProfile {
    kind: "swedbank",
    name: "Swedbank",
    sender_id: "HP",
    charset: "utf-8",
    measure: LengthMeasure::Chars,
    charset_field: Some("VK_ENCODING"),
    forced_service: None,
    fields: &[("VK_NAME", FieldSpec::max(30)), ("VK_ENCODING", FieldSpec::max(10))],
    mac_orders: &[],
};

/// SEB (Eesti Ühispank).
pub const SEB: BankProfile = BankProfile {
    kind: "seb",
    name: "SEB",
    sender_id: "EYP",
    charset: "ISO-8859-1",
    measure: LengthMeasure::Bytes,
    charset_field: Some("VK_CHARSET"),
    forced_service: None,
    fields: &[],
    mac_orders: &[
        // technical difficulties
        (
            "1902",
            &[
                "VK_SERVICE",
                "VK_VERSION",
                "VK_SND_ID",
                "VK_REC_ID",
                "VK_STAMP",
                "VK_REF",
                "VK_MSG",
                "VK_ERROR_CODE",
            ],
        ),
    ],
};

/// Danske Bank (Sampo Pank).
pub const DANSKE: BankProfile = BankProfile {
    kind: "danske",
    name: "Danske Bank",
    sender_id: "SAMPOPANK",
    charset: "iso-8859-1",
    measure: LengthMeasure::Bytes,
    charset_field: None,
    forced_service: None,
    fields: &[],
    mac_orders: &[],
};

/// LHV Pank.
pub const LHV: BankProfile = BankProfile {
    kind: "lhv",
    name: "LHV Pank",
    sender_id: "LHV",
    charset: "ISO-8859-1",
    measure: LengthMeasure::Bytes,
    charset_field: Some("VK_CHARSET"),
    forced_service: None,
    fields: &[],
    mac_orders: &[],
};

/// Krediidipank.
pub const KREDIIDIPANK: BankProfile = BankProfile {
    kind: "krediidipank",
    name: "Krediidipank",
    sender_id: "KREP",
    charset: "utf-8",
    measure: LengthMeasure::Bytes,
    charset_field: Some("VK_CHARSET"),
    forced_service: Some("1002"),
    fields: &[("VK_CHARSET", FieldSpec::max(11))],
    mac_orders: &[],
};

/// Maps a transaction language to `VK_LANG`.
#[must_use]
pub fn language_code(language: &str) -> &'static str {
    match language {
        "et" => "EST",
        "ru" => "RUS",
        _ => "ENG",
    }
}

/// Maps `VK_LANG` back to a transaction language, keeping unknown codes.
#[must_use]
pub fn language_from_code(code: &str) -> String {
    match code {
        "EST" => "et".to_owned(),
        "RUS" => "ru".to_owned(),
        "ENG" => "en".to_owned(),
        other => other.to_owned(),
    }
}
