//! Configuration types.
//!
//! A [`PaymentConfig`] document has a `common` block that is merged under
//! every entry of the ordered `adapters` map:
//!
//! ```json
//! {
//!   "common": { "returnRoute": "/payment/return" },
//!   "adapters": {
//!     "SEB": {
//!       "kind": "seb",
//!       "serviceUrl": "https://www.seb.ee/cgi-bin/unet3.sh/un3min.r",
//!       "keyPath": "keys/seb/private_key.pem",
//!       "certPath": "keys/seb/cert.pem",
//!       "params": { "VK_SND_ID": "testvpos", "VK_ACC": "EE411010002050618003", "VK_NAME": "Shop" }
//!     }
//!   }
//! }
//! ```
//!
//! Adapters resolve their entry into [`AdapterSettings`] at construction,
//! validating bank-specific parameters against their [`RequiredParam`] table.

use std::fmt::{self, Debug};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::charset::Charset;
use crate::error::ConfigurationError;
use crate::hooks::{Collaborators, PaymentHooks};

/// Top-level configuration document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentConfig {
    /// Values shared by all adapters.
    #[serde(default)]
    pub common: CommonConfig,

    /// Adapter entries keyed by tag, in dispatch order.
    #[serde(default)]
    pub adapters: IndexMap<String, AdapterConfig>,
}

/// Values merged under every adapter entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommonConfig {
    /// Route the bank redirects back to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_route: Option<String>,

    /// Route used when the customer cancels.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancel_route: Option<String>,

    /// Bank-specific parameters shared by all adapters.
    #[serde(default)]
    pub params: Map<String, Value>,
}

/// One adapter entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdapterConfig {
    /// Blueprint kind (e.g. `"swedbank"`). Defaults to the lowercased tag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    /// Disabled adapters are neither built nor used (default: `true`).
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Bank-specific named parameters.
    #[serde(default)]
    pub params: Map<String, Value>,

    /// PEM private key path, resolved by the [`PathResolver`](crate::hooks::PathResolver).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_path: Option<String>,

    /// PEM certificate path, resolved by the [`PathResolver`](crate::hooks::PathResolver).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cert_path: Option<String>,

    /// Bank gateway URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_url: Option<String>,

    /// Charset override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub charset: Option<String>,

    /// Return route override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_route: Option<String>,

    /// Cancel route, defaults to the return route.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancel_route: Option<String>,

    /// Display name override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

fn default_enabled() -> bool {
    true
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            kind: None,
            enabled: default_enabled(),
            params: Map::new(),
            key_path: None,
            cert_path: None,
            service_url: None,
            charset: None,
            return_route: None,
            cancel_route: None,
            name: None,
        }
    }
}

impl AdapterConfig {
    /// Creates an enabled entry of the given kind.
    #[must_use]
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: Some(kind.into()),
            ..Self::default()
        }
    }

    /// Sets a bank-specific parameter.
    #[must_use]
    pub fn param(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    /// Sets the key and certificate paths.
    #[must_use]
    pub fn keys(mut self, key_path: impl Into<String>, cert_path: impl Into<String>) -> Self {
        self.key_path = Some(key_path.into());
        self.cert_path = Some(cert_path.into());
        self
    }

    /// Sets the gateway URL.
    #[must_use]
    pub fn service_url(mut self, url: impl Into<String>) -> Self {
        self.service_url = Some(url.into());
        self
    }

    /// Sets the return route.
    #[must_use]
    pub fn return_route(mut self, route: impl Into<String>) -> Self {
        self.return_route = Some(route.into());
        self
    }

    /// Sets the enabled flag.
    #[must_use]
    pub const fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Returns the blueprint kind of an entry stored under `tag`.
    #[must_use]
    pub fn kind_for(&self, tag: &str) -> String {
        self.kind
            .clone()
            .unwrap_or_else(|| tag.to_ascii_lowercase())
    }
}

impl PaymentConfig {
    /// Parses a JSON configuration document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::Malformed`] if the document does not
    /// match the schema.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigurationError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Returns every adapter entry with the common block merged under it,
    /// in configuration order.
    ///
    /// Adapter values win; parameters are merged key by key.
    #[must_use]
    pub fn adapter_configs(&self) -> Vec<(String, AdapterConfig)> {
        self.adapters
            .iter()
            .map(|(tag, adapter)| {
                let mut merged = adapter.clone();
                merged.kind = Some(adapter.kind_for(tag));
                merged.return_route = adapter
                    .return_route
                    .clone()
                    .or_else(|| self.common.return_route.clone());
                merged.cancel_route = adapter
                    .cancel_route
                    .clone()
                    .or_else(|| self.common.cancel_route.clone());
                let mut params = self.common.params.clone();
                params.extend(adapter.params.clone());
                merged.params = params;
                (tag.clone(), merged)
            })
            .collect()
    }
}

/// JSON type a required parameter must have.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    /// A JSON string.
    String,
    /// A JSON integer.
    Integer,
    /// A JSON boolean.
    Boolean,
}

impl ParamType {
    /// Returns the type name used in error messages.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
        }
    }

    /// Returns `true` if `value` has this type.
    #[must_use]
    pub fn matches(self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Boolean => value.is_boolean(),
        }
    }
}

/// A parameter an adapter cannot work without.
pub type RequiredParam = (&'static str, ParamType);

/// Built-in settings of one bank, overridable by configuration.
#[derive(Debug, Clone, Copy)]
pub struct AdapterDefaults {
    /// Display name.
    pub name: &'static str,
    /// Charset label.
    pub charset: &'static str,
    /// Parameters validated at construction.
    pub required: &'static [RequiredParam],
}

/// Fully resolved settings of one adapter.
#[derive(Clone)]
pub struct AdapterSettings {
    tag: String,
    name: String,
    charset: Charset,
    key_path: Option<PathBuf>,
    cert_path: Option<PathBuf>,
    service_url: String,
    return_url: String,
    cancel_url: String,
    params: Map<String, Value>,
    hooks: Arc<dyn PaymentHooks>,
}

impl AdapterSettings {
    /// Resolves an adapter entry and validates its required parameters.
    ///
    /// Required parameters must be present with the declared JSON type. A
    /// required parameter whose name ends in `_path` must point at an
    /// existing file once resolved.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError`] on an unknown charset, a missing or
    /// mistyped required parameter, or a missing required file.
    pub fn resolve(
        tag: &str,
        config: &AdapterConfig,
        defaults: &AdapterDefaults,
        collaborators: &Collaborators,
    ) -> Result<Self, ConfigurationError> {
        let name = config
            .name
            .clone()
            .unwrap_or_else(|| defaults.name.to_owned());
        let charset = Charset::from_label(config.charset.as_deref().unwrap_or(defaults.charset))?;
        let return_route = config.return_route.as_deref().unwrap_or_default();
        let cancel_route = config.cancel_route.as_deref().unwrap_or(return_route);

        let settings = Self {
            tag: tag.to_owned(),
            name,
            charset,
            key_path: config.key_path.as_deref().map(|p| collaborators.paths.resolve(p)),
            cert_path: config.cert_path.as_deref().map(|p| collaborators.paths.resolve(p)),
            service_url: config.service_url.clone().unwrap_or_default(),
            return_url: collaborators.urls.absolute_url(return_route),
            cancel_url: collaborators.urls.absolute_url(cancel_route),
            params: config.params.clone(),
            hooks: Arc::clone(&collaborators.hooks),
        };

        for (param, expected) in defaults.required {
            let valid = settings
                .params
                .get(*param)
                .is_some_and(|value| expected.matches(value));
            if !valid {
                return Err(ConfigurationError::InvalidParameter {
                    name: (*param).to_owned(),
                    expected: expected.name(),
                    adapter: settings.name.clone(),
                });
            }
            if param.ends_with("_path") {
                let path = collaborators.paths.resolve(&settings.conf_str(param)?);
                if !path.is_file() {
                    return Err(ConfigurationError::FileNotFound { path });
                }
            }
        }

        #[cfg(feature = "telemetry")]
        tracing::debug!(tag, adapter = %settings.name, charset = %settings.charset, "Resolved adapter settings");

        Ok(settings)
    }

    /// Configuration key of the adapter.
    #[must_use]
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Target charset.
    #[must_use]
    pub const fn charset(&self) -> &Charset {
        &self.charset
    }

    /// Gateway URL, empty if not configured.
    #[must_use]
    pub fn service_url(&self) -> &str {
        &self.service_url
    }

    /// Absolute return URL.
    #[must_use]
    pub fn return_url(&self) -> &str {
        &self.return_url
    }

    /// Absolute cancel URL.
    #[must_use]
    pub fn cancel_url(&self) -> &str {
        &self.cancel_url
    }

    /// Resolved private key path.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::MissingKeyMaterial`] if no key path is
    /// configured.
    pub fn key_path(&self) -> Result<&Path, ConfigurationError> {
        self.key_path
            .as_deref()
            .ok_or_else(|| ConfigurationError::MissingKeyMaterial {
                adapter: self.name.clone(),
                field: "keyPath",
            })
    }

    /// Resolved certificate path.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::MissingKeyMaterial`] if no certificate
    /// path is configured.
    pub fn cert_path(&self) -> Result<&Path, ConfigurationError> {
        self.cert_path
            .as_deref()
            .ok_or_else(|| ConfigurationError::MissingKeyMaterial {
                adapter: self.name.clone(),
                field: "certPath",
            })
    }

    /// Returns a bank-specific parameter, passed through
    /// [`PaymentHooks::format_config_param`]. JSON `null` counts as unset.
    #[must_use]
    pub fn conf_param(&self, name: &str) -> Option<Value> {
        self.params
            .get(name)
            .filter(|v| !v.is_null())
            .map(|v| self.hooks.format_config_param(name, v.clone()))
    }

    /// Returns a bank-specific parameter as text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::ParameterNotSet`] if it is not set.
    pub fn conf_str(&self, name: &str) -> Result<String, ConfigurationError> {
        self.conf_str_opt(name)
            .ok_or_else(|| ConfigurationError::ParameterNotSet {
                name: name.to_owned(),
                adapter: self.name.clone(),
            })
    }

    /// Returns a bank-specific parameter as text, or `default`.
    #[must_use]
    pub fn conf_str_or(&self, name: &str, default: &str) -> String {
        self.conf_str_opt(name)
            .unwrap_or_else(|| default.to_owned())
    }

    /// Returns a bank-specific parameter as text, if set.
    #[must_use]
    pub fn conf_str_opt(&self, name: &str) -> Option<String> {
        self.conf_param(name).map(|value| match value {
            Value::String(s) => s,
            Value::Bool(true) => "1".to_owned(),
            Value::Bool(false) => String::new(),
            other => other.to_string(),
        })
    }
}

impl Debug for AdapterSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdapterSettings")
            .field("tag", &self.tag)
            .field("name", &self.name)
            .field("charset", &self.charset)
            .field("key_path", &self.key_path)
            .field("cert_path", &self.cert_path)
            .field("service_url", &self.service_url)
            .field("return_url", &self.return_url)
            .field("cancel_url", &self.cancel_url)
            .field("params", &self.params.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}
