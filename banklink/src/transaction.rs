//! Canonical payment record.
//!
//! A [`Transaction`] created by the application always carries an id and a
//! sum. One extracted from a bank response may be partial: every field is
//! optional and the accessors fall back to protocol defaults where one
//! exists.

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;

use crate::error::ValidationError;

/// Currency used when none is set.
pub const DEFAULT_CURRENCY: &str = "EUR";

/// Language used when none is set.
pub const DEFAULT_LANGUAGE: &str = "et";

/// A numeric transaction identifier, kept as its digit string.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TransactionId(String);

impl TransactionId {
    /// Returns the digits.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the id as an integer, if it fits.
    #[must_use]
    pub fn as_u64(&self) -> Option<u64> {
        self.0.parse().ok()
    }

    /// Derives the reference number of this id.
    #[must_use]
    pub fn reference(&self) -> String {
        generate_reference(&self.0)
    }
}

impl FromStr for TransactionId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.trim();
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ValidationError::NonNumericTransactionId(s.to_owned()));
        }
        Ok(Self(digits.to_owned()))
    }
}

impl From<u64> for TransactionId {
    fn from(value: u64) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Parses an amount, accepting a comma as the decimal separator.
///
/// # Errors
///
/// Returns [`ValidationError::InvalidAmount`] if the value is not a number.
pub fn parse_amount(value: &str) -> Result<Decimal, ValidationError> {
    Decimal::from_str(&value.trim().replace(',', "."))
        .map_err(|_| ValidationError::InvalidAmount(value.to_owned()))
}

/// Generates a reference number from an id using the 7-3-1 checksum.
///
/// Digits are weighted 7, 3, 1, 7, ... from the right; non-digit characters
/// are skipped. The check digit brings the weighted sum up to the next
/// multiple of ten and is appended to the id.
///
/// ```
/// assert_eq!(banklink::transaction::generate_reference("13"), "136");
/// ```
#[must_use]
pub fn generate_reference(id: &str) -> String {
    const WEIGHTS: [u32; 3] = [7, 3, 1];
    let sum: u32 = id
        .chars()
        .rev()
        .filter_map(|c| c.to_digit(10))
        .zip(WEIGHTS.iter().cycle())
        .map(|(digit, weight)| digit * weight)
        .sum();
    let check = (10 - sum % 10) % 10;
    format!("{id}{check}")
}

/// Canonical payment record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transaction {
    id: Option<TransactionId>,
    sum: Option<Decimal>,
    currency: Option<String>,
    language: Option<String>,
    comment: Option<String>,
    reference: Option<String>,
}

impl Transaction {
    /// Creates an empty transaction.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a transaction with an id and an amount.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] if the id is not numeric or the amount
    /// does not parse.
    pub fn create(id: &str, sum: &str) -> Result<Self, ValidationError> {
        let mut transaction = Self::new();
        transaction.set_id(id)?;
        transaction.set_sum(sum)?;
        Ok(transaction)
    }

    /// Returns the transaction id.
    #[must_use]
    pub const fn id(&self) -> Option<&TransactionId> {
        self.id.as_ref()
    }

    /// Sets the id from its string form.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::NonNumericTransactionId`] for anything but
    /// digits.
    pub fn set_id(&mut self, id: &str) -> Result<&mut Self, ValidationError> {
        self.id = Some(id.parse()?);
        Ok(self)
    }

    /// Clears the id.
    pub fn clear_id(&mut self) -> &mut Self {
        self.id = None;
        self
    }

    /// Returns the amount.
    #[must_use]
    pub const fn sum(&self) -> Option<Decimal> {
        self.sum
    }

    /// Sets the amount from its string form (`"35,50"` or `"35.50"`).
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidAmount`] if the value is not a number.
    pub fn set_sum(&mut self, sum: &str) -> Result<&mut Self, ValidationError> {
        self.sum = Some(parse_amount(sum)?);
        Ok(self)
    }

    /// Sets the amount.
    pub fn set_sum_decimal(&mut self, sum: Decimal) -> &mut Self {
        self.sum = Some(sum);
        self
    }

    /// Returns the currency, [`DEFAULT_CURRENCY`] if unset.
    #[must_use]
    pub fn currency(&self) -> &str {
        self.currency.as_deref().unwrap_or(DEFAULT_CURRENCY)
    }

    /// Sets the currency.
    pub fn set_currency(&mut self, currency: impl Into<String>) -> &mut Self {
        self.currency = Some(currency.into());
        self
    }

    /// Returns the language code, [`DEFAULT_LANGUAGE`] if unset.
    #[must_use]
    pub fn language(&self) -> &str {
        self.language.as_deref().unwrap_or(DEFAULT_LANGUAGE)
    }

    /// Sets the language code.
    pub fn set_language(&mut self, language: impl Into<String>) -> &mut Self {
        self.language = Some(language.into());
        self
    }

    /// Returns the comment.
    #[must_use]
    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    /// Sets the comment.
    pub fn set_comment(&mut self, comment: impl Into<String>) -> &mut Self {
        self.comment = Some(comment.into());
        self
    }

    /// Returns the reference number.
    #[must_use]
    pub fn reference(&self) -> Option<&str> {
        self.reference.as_deref()
    }

    /// Sets the reference number.
    pub fn set_reference(&mut self, reference: impl Into<String>) -> &mut Self {
        self.reference = Some(reference.into());
        self
    }

    /// Derives the reference number from the id, if one is set.
    pub fn generate_reference(&mut self) -> &mut Self {
        if let Some(id) = &self.id {
            self.reference = Some(id.reference());
        }
        self
    }
}
