//! Inbound bank response.

use serde::Serialize;

use crate::params::Params;
use crate::transaction::Transaction;

/// A bank response as it moves through the dispatcher: received, verified,
/// classified and finally given its [`Transaction`].
#[derive(Debug, Clone, Default)]
pub struct Response {
    params: Params,
    successful: bool,
    automatic: Option<bool>,
    transaction: Option<Transaction>,
}

impl Response {
    /// Wraps the inbound fields. The response starts out unsuccessful.
    #[must_use]
    pub fn new(params: Params) -> Self {
        Self {
            params,
            ..Self::default()
        }
    }

    /// Builds a response from raw request pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self::new(pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }

    /// Returns the inbound fields.
    #[must_use]
    pub const fn params(&self) -> &Params {
        &self.params
    }

    /// Returns `true` if the bank reported the payment as completed.
    #[must_use]
    pub const fn is_successful(&self) -> bool {
        self.successful
    }

    /// Sets the success flag.
    pub const fn set_successful(&mut self, successful: bool) {
        self.successful = successful;
    }

    /// Returns whether this is a server-to-server notification, if the
    /// protocol tells.
    #[must_use]
    pub const fn automatic(&self) -> Option<bool> {
        self.automatic
    }

    /// Sets the automatic-notification flag.
    pub const fn set_automatic(&mut self, automatic: Option<bool>) {
        self.automatic = automatic;
    }

    /// Returns the extracted transaction, once attached.
    #[must_use]
    pub const fn transaction(&self) -> Option<&Transaction> {
        self.transaction.as_ref()
    }

    /// Attaches the extracted transaction.
    pub fn set_transaction(&mut self, transaction: Transaction) {
        self.transaction = Some(transaction);
    }

    /// Returns a serializable view for logging.
    #[must_use]
    pub const fn summary(&self) -> ResponseSummary<'_> {
        ResponseSummary {
            successful: self.successful,
            automatic: self.automatic,
            params: &self.params,
        }
    }
}

/// Serializable view of a [`Response`].
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseSummary<'a> {
    /// Success flag.
    pub successful: bool,
    /// Automatic-notification flag.
    pub automatic: Option<bool>,
    /// Inbound fields.
    pub params: &'a Params,
}
