//! Origin Resolver: logical backend name to base URL.
//!
//! Each backend is deployed and versioned on its own, so every address is
//! configured separately and normalized here rather than at call sites.
//! A resolved base never ends in `/`, so `format!("{base}/{resource}")` is
//! always well-formed.

use std::fmt;

use reqwest::Url;

use crate::error::GatewayError;

/// The three backends the back office talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Origin {
    Auth,
    Category,
    Product,
}

impl Origin {
    pub const ALL: [Self; 3] = [Self::Auth, Self::Category, Self::Product];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Auth => "auth",
            Self::Category => "category",
            Self::Product => "product",
        }
    }

    /// Environment variable holding this origin's base address.
    #[must_use]
    pub fn env_var(self) -> &'static str {
        match self {
            Self::Auth => "API_AUTH",
            Self::Category => "API_CATEGORY",
            Self::Product => "API_PRODUCT",
        }
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configured base addresses. Any of them may be missing; the failure is
/// raised when that origin is first resolved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Origins {
    auth: Option<String>,
    category: Option<String>,
    product: Option<String>,
}

impl Origins {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the raw base address for `origin`. Blank values count as unset.
    #[must_use]
    pub fn with(mut self, origin: Origin, base: impl Into<String>) -> Self {
        let base = base.into();
        let value = if base.trim().is_empty() { None } else { Some(base.trim().to_owned()) };
        *self.slot_mut(origin) = value;
        self
    }

    fn slot(&self, origin: Origin) -> Option<&str> {
        match origin {
            Origin::Auth => self.auth.as_deref(),
            Origin::Category => self.category.as_deref(),
            Origin::Product => self.product.as_deref(),
        }
    }

    fn slot_mut(&mut self, origin: Origin) -> &mut Option<String> {
        match origin {
            Origin::Auth => &mut self.auth,
            Origin::Category => &mut self.category,
            Origin::Product => &mut self.product,
        }
    }

    /// Normalized base URL for `origin`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Configuration`] when the origin has no address,
    /// or the address is not an absolute `http`/`https` URL.
    pub fn resolve(&self, origin: Origin) -> Result<String, GatewayError> {
        let Some(raw) = self.slot(origin) else {
            return Err(GatewayError::Configuration {
                origin,
                reason: format!("{} is not set", origin.env_var()),
            });
        };

        let parsed = Url::parse(raw).map_err(|e| GatewayError::Configuration {
            origin,
            reason: format!("{} is not an absolute URL ({e}): {raw}", origin.env_var()),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(GatewayError::Configuration {
                origin,
                reason: format!("{} must use http or https: {raw}", origin.env_var()),
            });
        }

        Ok(raw.trim_end_matches('/').to_owned())
    }
}

#[cfg(test)]
#[path = "origin_test.rs"]
mod tests;
