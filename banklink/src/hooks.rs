//! Host collaborators.
//!
//! Adapters never talk to a web framework directly. Everything they need
//! from the host application goes through three small traits:
//!
//! - [`UrlBuilder`]: turns a configured route into the absolute return URL
//! - [`PathResolver`]: turns a configured key or certificate path into a file path
//! - [`PaymentHooks`]: rewrites configuration values and finalizes forms
//!
//! All methods of [`PaymentHooks`] have default no-op implementations.
//! [`Collaborators`] bundles one of each and is handed to every adapter at
//! construction.

use std::fmt::{self, Debug};
use std::path::PathBuf;
use std::sync::Arc;

use serde_json::Value;

use crate::adapter::PaymentAdapter;
use crate::form::PaymentForm;

/// Builds absolute URLs from configured routes.
pub trait UrlBuilder: Send + Sync {
    /// Returns the absolute URL of `route`.
    fn absolute_url(&self, route: &str) -> String;
}

impl<F> UrlBuilder for F
where
    F: Fn(&str) -> String + Send + Sync,
{
    fn absolute_url(&self, route: &str) -> String {
        self(route)
    }
}

/// Resolves configured file paths.
pub trait PathResolver: Send + Sync {
    /// Returns the file system path for a configured path.
    fn resolve(&self, path: &str) -> PathBuf {
        PathBuf::from(path)
    }
}

/// Uses configured paths as they are.
#[derive(Debug, Clone, Copy, Default)]
pub struct VerbatimPaths;

impl PathResolver for VerbatimPaths {}

/// Resolves relative paths against a base directory.
#[derive(Debug, Clone)]
pub struct RelativeTo(pub PathBuf);

impl PathResolver for RelativeTo {
    fn resolve(&self, path: &str) -> PathBuf {
        self.0.join(path)
    }
}

/// Host hooks around configuration reads and form generation.
///
/// This trait is dyn-compatible.
pub trait PaymentHooks: Send + Sync {
    /// Rewrites a bank-specific configuration value right before an adapter
    /// uses it.
    fn format_config_param(&self, _name: &str, value: Value) -> Value {
        value
    }

    /// Adjusts a signed form before it is returned to the caller, e.g. to
    /// add presentation-only fields.
    fn finalize_form(&self, _form: &mut PaymentForm, _adapter: &dyn PaymentAdapter) {}
}

/// Hooks that change nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHooks;

impl PaymentHooks for NoHooks {}

/// The collaborators an adapter is built with.
///
/// The default uses configured routes as URLs and configured paths as they
/// are, with [`NoHooks`].
#[derive(Clone)]
pub struct Collaborators {
    /// Return URL builder.
    pub urls: Arc<dyn UrlBuilder>,
    /// Key and certificate path resolver.
    pub paths: Arc<dyn PathResolver>,
    /// Configuration and form hooks.
    pub hooks: Arc<dyn PaymentHooks>,
}

impl Collaborators {
    /// Replaces the URL builder.
    #[must_use]
    pub fn with_urls(mut self, urls: impl UrlBuilder + 'static) -> Self {
        self.urls = Arc::new(urls);
        self
    }

    /// Replaces the path resolver.
    #[must_use]
    pub fn with_paths(mut self, paths: impl PathResolver + 'static) -> Self {
        self.paths = Arc::new(paths);
        self
    }

    /// Replaces the hooks.
    #[must_use]
    pub fn with_hooks(mut self, hooks: impl PaymentHooks + 'static) -> Self {
        self.hooks = Arc::new(hooks);
        self
    }
}

impl Default for Collaborators {
    fn default() -> Self {
        Self {
            urls: Arc::new(|route: &str| route.to_owned()),
            paths: Arc::new(VerbatimPaths),
            hooks: Arc::new(NoHooks),
        }
    }
}

impl Debug for Collaborators {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collaborators")
            .field("urls", &"<UrlBuilder>")
            .field("paths", &"<PathResolver>")
            .field("hooks", &"<PaymentHooks>")
            .finish()
    }
}
