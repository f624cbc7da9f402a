//! Outgoing payment form.

use serde::Serialize;

use crate::params::Params;

/// A signed request ready to be rendered as an auto-submitting HTML form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentForm {
    /// Configuration key of the adapter that built the form.
    pub tag: String,
    /// Display name of the bank.
    pub provider_name: String,
    /// Gateway URL the form posts to.
    pub action: String,
    /// Charset label to declare in `accept-charset`.
    pub charset: String,
    /// Signed form fields in wire order.
    pub params: Params,
}

impl PaymentForm {
    /// Returns the form fields as `(name, value)` pairs in wire order.
    #[must_use]
    pub fn fields(&self) -> Vec<(String, String)> {
        self.params.to_ordered_list()
    }
}
