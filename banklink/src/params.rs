//! Ordered field container.
//!
//! [`Params`] is used for both directions: adapters fill it when building a
//! payment form, and the dispatcher wraps the inbound request fields in it.
//! Insertion order is kept for serialization only; signatures are always
//! computed over an explicit per-message field order.

use std::borrow::Cow;
use std::fmt;

use indexmap::IndexMap;
use rust_decimal::Decimal;
use serde::{Serialize, Serializer};

use crate::error::MissingParameterError;

/// A single field value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    /// Free text.
    Text(String),
    /// Integer value, stringified in decimal.
    Int(i64),
    /// Decimal value, stringified without trailing zeros.
    Decimal(Decimal),
    /// Explicitly unset. Removed by the formatter, invisible to lookups.
    Unset,
}

impl ParamValue {
    /// Returns the canonical string form of the value.
    #[must_use]
    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            Self::Text(s) => Cow::Borrowed(s),
            Self::Int(i) => Cow::Owned(i.to_string()),
            Self::Decimal(d) => Cow::Owned(d.normalize().to_string()),
            Self::Unset => Cow::Borrowed(""),
        }
    }

    /// Truthiness as the banklink protocols understand it: empty text, `"0"`,
    /// zero and unset values carry no meaning.
    #[must_use]
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Text(s) => !s.is_empty() && s != "0",
            Self::Int(i) => *i != 0,
            Self::Decimal(d) => !d.is_zero(),
            Self::Unset => false,
        }
    }

    /// Returns `true` for [`ParamValue::Unset`].
    #[must_use]
    pub const fn is_unset(&self) -> bool {
        matches!(self, Self::Unset)
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_text())
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&String> for ParamValue {
    fn from(value: &String) -> Self {
        Self::Text(value.clone())
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<u32> for ParamValue {
    fn from(value: u32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<Decimal> for ParamValue {
    fn from(value: Decimal) -> Self {
        Self::Decimal(value)
    }
}

impl Serialize for ParamValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.as_text())
    }
}

/// Ordered mapping from field name to [`ParamValue`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params(pub(crate) IndexMap<String, ParamValue>);

impl Params {
    /// Creates an empty container.
    #[must_use]
    pub fn new() -> Self {
        Self(IndexMap::new())
    }

    /// Sets a field, keeping the position of an existing key.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> &mut Self {
        self.0.insert(name.into(), value.into());
        self
    }

    /// Sets a field, or marks it unset for `None`.
    pub fn set_optional<V: Into<ParamValue>>(
        &mut self,
        name: impl Into<String>,
        value: Option<V>,
    ) -> &mut Self {
        self.0
            .insert(name.into(), value.map_or(ParamValue::Unset, Into::into));
        self
    }

    /// Returns the string form of a field.
    ///
    /// # Errors
    ///
    /// Returns [`MissingParameterError`] if the field is absent or unset.
    pub fn get(&self, name: &str) -> Result<Cow<'_, str>, MissingParameterError> {
        self.value(name)
            .map(ParamValue::as_text)
            .ok_or_else(|| MissingParameterError::new(name))
    }

    /// Returns the string form of a field, or `default` if it is absent.
    #[must_use]
    pub fn get_or<'a>(&'a self, name: &str, default: &'a str) -> Cow<'a, str> {
        self.value(name)
            .map_or(Cow::Borrowed(default), ParamValue::as_text)
    }

    /// Returns the raw value of a field, ignoring unset markers.
    #[must_use]
    pub fn value(&self, name: &str) -> Option<&ParamValue> {
        self.0.get(name).filter(|v| !v.is_unset())
    }

    /// Returns `true` if the field exists and is not unset.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.value(name).is_some()
    }

    /// Returns `true` if the field exists and its value is truthy.
    ///
    /// This is stricter than [`Params::contains`]: an empty string or `"0"`
    /// exists but does not count as present.
    #[must_use]
    pub fn has(&self, name: &str) -> bool {
        self.value(name).is_some_and(ParamValue::is_truthy)
    }

    /// Removes a field, preserving the order of the remaining ones.
    pub fn remove(&mut self, name: &str) -> Option<ParamValue> {
        self.0.shift_remove(name)
    }

    /// Iterates over all fields in insertion order, unset markers included.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Returns the number of fields, unset markers included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the container holds no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the set fields as `(name, value)` string pairs in insertion
    /// order.
    #[must_use]
    pub fn to_ordered_list(&self) -> Vec<(String, String)> {
        self.0
            .iter()
            .filter(|(_, v)| !v.is_unset())
            .map(|(k, v)| (k.clone(), v.as_text().into_owned()))
            .collect()
    }

    /// Collects the values of `order` that exist in the container, in that
    /// order.
    #[must_use]
    pub fn ordered_values(&self, order: &[&str]) -> Vec<Cow<'_, str>> {
        order
            .iter()
            .filter_map(|name| self.value(name).map(ParamValue::as_text))
            .collect()
    }
}

impl<K, V> FromIterator<(K, V)> for Params
where
    K: Into<String>,
    V: Into<ParamValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl Serialize for Params {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.0.iter().filter(|(_, v)| !v.is_unset()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_set_preserves_position() {
        let mut params = Params::new();
        params.set("A", "1").set("B", "2").set("A", "3");
        let list = params.to_ordered_list();
        assert_eq!(
            list,
            vec![("A".into(), "3".into()), ("B".into(), "2".into())]
        );
    }

    #[test]
    fn test_get_missing_fails() {
        let params = Params::new();
        let err = params.get("VK_MAC").unwrap_err();
        assert_eq!(err.name, "VK_MAC");
        assert_eq!(params.get_or("VK_MAC", "x"), "x");
    }

    #[test]
    fn test_has_is_stricter_than_contains() {
        let mut params = Params::new();
        params.set("EMPTY", "").set("ZERO", "0").set("SET", "Y");
        params.set_optional::<String>("NONE", None);

        assert!(params.contains("EMPTY"));
        assert!(!params.has("EMPTY"));
        assert!(params.contains("ZERO"));
        assert!(!params.has("ZERO"));
        assert!(params.has("SET"));
        assert!(!params.contains("NONE"));
        assert!(!params.has("NONE"));
    }

    #[test]
    fn test_numbers_stringify_canonically() {
        let mut params = Params::new();
        params
            .set("INT", 4_i64)
            .set("DEC", Decimal::from_str("35.50").unwrap());
        assert_eq!(params.get("INT").unwrap(), "4");
        assert_eq!(params.get("DEC").unwrap(), "35.5");
    }

    #[test]
    fn test_ordered_values_skips_absent() {
        let params: Params = [("A", "1"), ("C", "3")].into_iter().collect();
        let values = params.ordered_values(&["C", "B", "A"]);
        assert_eq!(values, vec!["3", "1"]);
    }

    #[test]
    fn test_remove_keeps_order() {
        let mut params: Params = [("A", "1"), ("B", "2"), ("C", "3")].into_iter().collect();
        params.remove("B");
        let names: Vec<_> = params.iter().map(|(k, _)| k).collect();
        assert_eq!(names, vec!["A", "C"]);
    }
}
