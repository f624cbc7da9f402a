//! Field tables and the field formatter.
//!
//! Every bank publishes a table of maximum field lengths, and some require
//! fixed-width fields. The formatter applies one adapter's table to a
//! [`Params`] container before it is signed or sent:
//!
//! 1. unset fields are dropped, numbers are stringified, values are trimmed
//! 2. values longer than the table's maximum are truncated
//! 3. fixed-width padding is applied, or else the `sprintf`-style pattern
//! 4. values are transliterated into the adapter's charset

use std::borrow::Cow;
use std::sync::LazyLock;

use indexmap::IndexMap;
use regex::Regex;

use crate::charset::Charset;
use crate::error::ProtocolError;
use crate::params::{ParamValue, Params};

/// How field lengths are measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LengthMeasure {
    /// Bytes in the adapter's charset.
    #[default]
    Bytes,
    /// Characters, regardless of their encoded width.
    Chars,
}

impl LengthMeasure {
    /// Length of `value` under this measure.
    #[must_use]
    pub fn len(self, value: &str, charset: &Charset) -> usize {
        match self {
            Self::Bytes => charset.byte_len(value),
            Self::Chars => value.chars().count(),
        }
    }

    fn char_len(self, ch: char, charset: &Charset) -> usize {
        match self {
            Self::Bytes => {
                let mut buf = [0_u8; 4];
                charset.byte_len(ch.encode_utf8(&mut buf))
            }
            Self::Chars => 1,
        }
    }

    /// Truncates `value` to at most `max` units, never splitting a character.
    #[must_use]
    pub fn truncate<'a>(self, value: &'a str, max: usize, charset: &Charset) -> Cow<'a, str> {
        if self.len(value, charset) <= max {
            return Cow::Borrowed(value);
        }
        let mut used = 0;
        let mut end = 0;
        for (idx, ch) in value.char_indices() {
            let width = self.char_len(ch, charset);
            if used + width > max {
                break;
            }
            used += width;
            end = idx + ch.len_utf8();
        }
        Cow::Owned(value[..end].to_owned())
    }
}

/// Which side padding is added on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PadSide {
    /// Pad before the value (right-aligned).
    Left,
    /// Pad after the value (left-aligned).
    Right,
}

/// Fixed-width padding of a field to its maximum length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Padding {
    /// Side to pad on.
    pub side: PadSide,
    /// Pad character.
    pub fill: char,
}

/// Formatting rule for one field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    /// Maximum length, measured by the adapter's [`LengthMeasure`].
    pub length: usize,
    /// Fixed-width padding (character-aware), takes precedence over `pattern`.
    pub padding: Option<Padding>,
    /// `sprintf`-style pattern of the form `%[-][0|'c][width]s`.
    pub pattern: Option<&'static str>,
}

impl FieldSpec {
    /// A field with only a maximum length.
    #[must_use]
    pub const fn max(length: usize) -> Self {
        Self {
            length,
            padding: None,
            pattern: None,
        }
    }

    /// Adds a format pattern.
    #[must_use]
    pub const fn pattern(mut self, pattern: &'static str) -> Self {
        self.pattern = Some(pattern);
        self
    }

    /// Pads the field to its maximum length with spaces.
    #[must_use]
    pub const fn pad(self, side: PadSide) -> Self {
        self.pad_with(side, ' ')
    }

    /// Pads the field to its maximum length with `fill`.
    #[must_use]
    pub const fn pad_with(mut self, side: PadSide, fill: char) -> Self {
        self.padding = Some(Padding { side, fill });
        self
    }
}

/// Per-field formatting rules of one protocol, keyed by field name.
#[derive(Debug, Clone, Default)]
pub struct FieldTable(IndexMap<&'static str, FieldSpec>);

impl FieldTable {
    /// Builds a table from `(field, spec)` entries.
    #[must_use]
    pub fn new(entries: &[(&'static str, FieldSpec)]) -> Self {
        Self(entries.iter().copied().collect())
    }

    /// Returns a copy with `overrides` replacing or extending entries.
    #[must_use]
    pub fn merged(&self, overrides: &[(&'static str, FieldSpec)]) -> Self {
        let mut table = self.0.clone();
        table.extend(overrides.iter().copied());
        Self(table)
    }

    /// Looks up the rule for a field.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&FieldSpec> {
        self.0.get(field)
    }
}

static PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^%(-)?(0|'.)?(\d+)?s$").expect("valid pattern regex"));

/// Parsed form of a `%[-][0|'c][width]s` pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Pattern {
    left_align: bool,
    fill: char,
    width: usize,
}

impl Pattern {
    fn parse(pattern: &str) -> Option<Self> {
        let caps = PATTERN.captures(pattern)?;
        let fill = caps
            .get(2)
            .and_then(|m| m.as_str().chars().last())
            .unwrap_or(' ');
        let width = caps.get(3).map_or(Some(0), |m| m.as_str().parse().ok())?;
        Some(Self {
            left_align: caps.get(1).is_some(),
            fill,
            width,
        })
    }
}

/// Pads `value` to `width` units with `fill` on `side`.
#[must_use]
pub fn pad(
    value: &str,
    width: usize,
    fill: char,
    side: PadSide,
    measure: LengthMeasure,
    charset: &Charset,
) -> String {
    let missing = width.saturating_sub(measure.len(value, charset));
    let padding: String = std::iter::repeat_n(fill, missing).collect();
    match side {
        PadSide::Left => padding + value,
        PadSide::Right => format!("{value}{padding}"),
    }
}

/// Applies a [`FieldTable`] to a [`Params`] container.
#[derive(Debug, Clone, Copy)]
pub struct FieldFormatter<'a> {
    table: &'a FieldTable,
    charset: &'a Charset,
    measure: LengthMeasure,
}

impl<'a> FieldFormatter<'a> {
    /// Creates a formatter for one adapter's table, charset and measure.
    #[must_use]
    pub const fn new(table: &'a FieldTable, charset: &'a Charset, measure: LengthMeasure) -> Self {
        Self {
            table,
            charset,
            measure,
        }
    }

    /// Formats a single value of `field`.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::InvalidPattern`] if the table carries a
    /// pattern that cannot be parsed.
    pub fn format_value(&self, field: &str, value: &str) -> Result<String, ProtocolError> {
        let trimmed = value.trim();
        let mut value = Cow::Borrowed(trimmed);

        if let Some(spec) = self.table.get(field) {
            value = self.measure.truncate(trimmed, spec.length, self.charset);

            if let Some(padding) = spec.padding {
                value = Cow::Owned(pad(
                    &value,
                    spec.length,
                    padding.fill,
                    padding.side,
                    LengthMeasure::Chars,
                    self.charset,
                ));
            } else if let Some(raw) = spec.pattern {
                let pattern = Pattern::parse(raw).ok_or_else(|| ProtocolError::InvalidPattern {
                    field: field.to_owned(),
                    pattern: raw.to_owned(),
                })?;
                let side = if pattern.left_align {
                    PadSide::Right
                } else {
                    PadSide::Left
                };
                value = Cow::Owned(pad(
                    &value,
                    pattern.width,
                    pattern.fill,
                    side,
                    self.measure,
                    self.charset,
                ));
            }
        }

        Ok(self.charset.transliterate(&value).into_owned())
    }

    /// Formats every field of `params` in place and drops unset fields.
    ///
    /// Fields without a table entry are only stringified, trimmed and
    /// transliterated.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::InvalidPattern`] on an unparsable pattern.
    pub fn format(&self, params: &mut Params) -> Result<(), ProtocolError> {
        params.0.retain(|_, v| !v.is_unset());
        for (name, value) in &mut params.0 {
            let formatted = self.format_value(name, &value.as_text())?;
            *value = ParamValue::Text(formatted);
        }
        Ok(())
    }
}
