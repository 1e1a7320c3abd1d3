//! Auth Boundary: login, registration, logout and the protected-view guard.
//!
//! Login is the only path that moves the session from absent to present.
//! Registration never touches the session. A failed login leaves whatever
//! session existed before exactly as it was.

use std::fmt;

use serde_json::{Value, json};

use crate::error::GatewayError;
use crate::gateway::{Gateway, RequestDescriptor};
use crate::origin::Origin;
use crate::session::{SessionError, SessionStore, Token};

// =============================================================================
// NAVIGATION
// =============================================================================

/// Views of the back office. Gateway signals resolve to one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Login,
    Register,
    Dashboard,
    Categories,
    Products,
}

impl Route {
    #[must_use]
    pub fn path(self) -> &'static str {
        match self {
            Self::Login => "/login",
            Self::Register => "/register",
            Self::Dashboard => "/dashboard",
            Self::Categories => "/dashboard/categories",
            Self::Products => "/dashboard/products",
        }
    }

    /// Views that require a session.
    #[must_use]
    pub fn is_protected(self) -> bool {
        matches!(self, Self::Dashboard | Self::Categories | Self::Products)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

// =============================================================================
// GUARD
// =============================================================================

/// Outcome of checking the session for a protected view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Authorized,
    Redirect(Route),
}

/// Read the session once and decide whether a protected view may render.
#[must_use]
pub fn guard(session: &SessionStore) -> Access {
    if session.is_present() { Access::Authorized } else { Access::Redirect(Route::Login) }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewState {
    /// Not yet decided; the view must render nothing.
    Unchecked,
    Authorized,
    Redirecting,
}

/// Per-mount guard state: `Unchecked → {Authorized, Redirecting}`.
///
/// The decision is taken on the first [`ProtectedView::check`] and is final
/// for the lifetime of this value. A fresh mount means a fresh `ProtectedView`.
#[derive(Debug, Clone)]
pub struct ProtectedView {
    route: Route,
    state: ViewState,
}

impl ProtectedView {
    #[must_use]
    pub fn new(route: Route) -> Self {
        Self { route, state: ViewState::Unchecked }
    }

    #[must_use]
    pub fn route(&self) -> Route {
        self.route
    }

    #[must_use]
    pub fn state(&self) -> ViewState {
        self.state
    }

    /// Run the guard if it has not run yet and return the settled state.
    ///
    /// Public views (login, register) are authorized without a session.
    pub fn check(&mut self, session: &SessionStore) -> ViewState {
        if self.state == ViewState::Unchecked {
            self.state = if self.route.is_protected() {
                match guard(session) {
                    Access::Authorized => ViewState::Authorized,
                    Access::Redirect(_) => ViewState::Redirecting,
                }
            } else {
                ViewState::Authorized
            };
            tracing::debug!(route = %self.route, state = ?self.state, "view access decided");
        }
        self.state
    }

    /// Where to render: the view itself once authorized, the login view otherwise.
    #[must_use]
    pub fn destination(&self) -> Option<Route> {
        match self.state {
            ViewState::Unchecked => None,
            ViewState::Authorized => Some(self.route),
            ViewState::Redirecting => Some(Route::Login),
        }
    }
}

// =============================================================================
// AUTH CLIENT
// =============================================================================

#[derive(Clone)]
pub struct AuthClient {
    gateway: Gateway,
}

impl AuthClient {
    #[must_use]
    pub fn new(gateway: Gateway) -> Self {
        Self { gateway }
    }

    /// Exchange credentials for a session and install it.
    ///
    /// On success the caller navigates to [`Route::Dashboard`].
    ///
    /// # Errors
    ///
    /// Returns the gateway failure (with the server's message for a rejected
    /// login) or [`GatewayError::Decode`] if the response carries no token.
    /// The existing session is untouched on every error path.
    pub async fn login(&self, email: &str, password: &str) -> Result<Token, GatewayError> {
        let body = self
            .gateway
            .send_raw(RequestDescriptor::post(Origin::Auth, "login").json(json!({
                "email": email,
                "password": password,
            })))
            .await?;

        let raw = body
            .get("token")
            .or_else(|| body.get("data").and_then(|data| data.get("token")))
            .and_then(Value::as_str)
            .ok_or_else(|| GatewayError::Decode("login response carried no token".into()))?;

        let token = self.gateway.session().set(raw).map_err(|e| match e {
            SessionError::EmptyToken => GatewayError::Decode("login response carried an empty token".into()),
            other => GatewayError::Session(other),
        })?;
        tracing::info!("operator logged in");
        Ok(token)
    }

    /// Create an account. Does not log in; the caller navigates to [`Route::Login`].
    ///
    /// Any 2xx counts as success, whatever the body holds.
    ///
    /// # Errors
    ///
    /// Returns the gateway failure, carrying the server's message when present.
    pub async fn register(&self, name: &str, email: &str, password: &str) -> Result<(), GatewayError> {
        self.gateway
            .send_status(RequestDescriptor::post(Origin::Auth, "register").json(json!({
                "name": name,
                "email": email,
                "password": password,
            })))
            .await?;
        tracing::info!("account registered");
        Ok(())
    }

    /// Drop the session and return the view to show next.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the persisted session could not be removed.
    pub fn logout(&self) -> Result<Route, GatewayError> {
        self.gateway.session().clear()?;
        tracing::info!("operator logged out");
        Ok(Route::Login)
    }
}

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;
