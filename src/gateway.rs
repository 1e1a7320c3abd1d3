//! Request Gateway: every backend call goes through [`Gateway::send`].
//!
//! FLOW
//! ====
//! 1. Resolve the origin (configuration errors surface unchanged).
//! 2. Protected call with no session: stop, return `Unauthenticated`.
//! 3. Execute once, with `Authorization: Bearer` when a credential was read.
//! 4. No response: `Network`.
//! 5. 401/403 on a credentialed call: evict the session, `SessionExpired`.
//! 6. Other non-2xx: `RequestFailed` with the server's message.
//! 7. 2xx: unwrap a `{ "data": ... }` envelope if present.
//!
//! Callers that only need the outcome use [`Gateway::send_status`], which
//! accepts any 2xx body, JSON or not.
//!
//! There are no retries. Navigation is left to the caller via
//! [`GatewayError::redirect`].

use std::sync::Arc;
use std::time::Duration;

use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::config::GatewayConfig;
use crate::error::GatewayError;
use crate::origin::{Origin, Origins};
use crate::session::SessionStore;
use crate::transport::{HttpRequest, HttpResponse, ReqwestTransport, Transport};

// =============================================================================
// DESCRIPTOR
// =============================================================================

/// One outbound call, built per request and consumed by [`Gateway::send`].
#[derive(Debug, Clone, PartialEq)]
pub struct RequestDescriptor {
    pub origin: Origin,
    pub method: Method,
    /// Resource path relative to the origin, e.g. `categories/42`.
    pub path: String,
    pub body: Option<Value>,
    pub requires_auth: bool,
}

impl RequestDescriptor {
    #[must_use]
    pub fn new(origin: Origin, method: Method, path: impl Into<String>) -> Self {
        Self { origin, method, path: path.into(), body: None, requires_auth: false }
    }

    #[must_use]
    pub fn get(origin: Origin, path: impl Into<String>) -> Self {
        Self::new(origin, Method::GET, path)
    }

    #[must_use]
    pub fn post(origin: Origin, path: impl Into<String>) -> Self {
        Self::new(origin, Method::POST, path)
    }

    #[must_use]
    pub fn delete(origin: Origin, path: impl Into<String>) -> Self {
        Self::new(origin, Method::DELETE, path)
    }

    #[must_use]
    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Require the session credential; without one the call is never sent.
    #[must_use]
    pub fn authenticated(mut self) -> Self {
        self.requires_auth = true;
        self
    }
}

// =============================================================================
// GATEWAY
// =============================================================================

#[derive(Clone)]
pub struct Gateway {
    origins: Arc<Origins>,
    session: SessionStore,
    transport: Arc<dyn Transport>,
}

impl Gateway {
    #[must_use]
    pub fn new(origins: Origins, session: SessionStore, transport: Arc<dyn Transport>) -> Self {
        Self { origins: Arc::new(origins), session, transport }
    }

    /// Gateway over the real HTTP client using configured timeouts.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::HttpClientBuild`] if the HTTP client fails to build.
    pub fn from_config(config: &GatewayConfig, session: SessionStore) -> Result<Self, GatewayError> {
        let transport = ReqwestTransport::new(
            Duration::from_secs(config.timeouts.request_secs),
            Duration::from_secs(config.timeouts.connect_secs),
        )?;
        Ok(Self::new(config.origins.clone(), session, Arc::new(transport)))
    }

    #[must_use]
    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    /// Perform one call and return the unwrapped payload.
    ///
    /// # Errors
    ///
    /// See the module docs for the classification of each failure.
    pub async fn send(&self, descriptor: RequestDescriptor) -> Result<Value, GatewayError> {
        self.send_raw(descriptor).await.map(unwrap_envelope)
    }

    /// [`Gateway::send`] without envelope unwrapping, for callers that read
    /// top-level fields next to `data` (the login token).
    ///
    /// # Errors
    ///
    /// Same classification as [`Gateway::send`].
    pub async fn send_raw(&self, descriptor: RequestDescriptor) -> Result<Value, GatewayError> {
        let response = self.dispatch(descriptor).await?;
        parse_body(&response.body)
    }

    /// Perform one call where only success matters; the 2xx body is ignored.
    ///
    /// # Errors
    ///
    /// Same classification as [`Gateway::send`], minus [`GatewayError::Decode`].
    pub async fn send_status(&self, descriptor: RequestDescriptor) -> Result<u16, GatewayError> {
        self.dispatch(descriptor).await.map(|response| response.status)
    }

    /// Steps 1 to 6: everything up to a 2xx response.
    async fn dispatch(&self, descriptor: RequestDescriptor) -> Result<HttpResponse, GatewayError> {
        let RequestDescriptor { origin, method, path, body, requires_auth } = descriptor;
        let base = self.origins.resolve(origin)?;

        let bearer = if requires_auth {
            let Some(token) = self.session.get() else {
                tracing::debug!(%origin, %path, "protected call without a session; not sent");
                return Err(GatewayError::Unauthenticated);
            };
            Some(token.as_str().to_owned())
        } else {
            None
        };
        let credentialed = bearer.is_some();

        let url = join_url(&base, &path);
        tracing::debug!(%origin, %method, %url, credentialed, "sending request");

        let response = self
            .transport
            .execute(HttpRequest { method: method.clone(), url, bearer, body })
            .await
            .map_err(|e| {
                tracing::warn!(%origin, %method, %path, error = %e, "no response from backend");
                GatewayError::Network(e.to_string())
            })?;

        let status = response.status;
        if credentialed && matches!(status, 401 | 403) {
            self.evict(origin, status);
            return Err(GatewayError::SessionExpired { status });
        }

        if !response.is_success() {
            let message = extract_message(&response.body, status);
            tracing::warn!(%origin, %method, %path, status, %message, "request rejected");
            return Err(GatewayError::RequestFailed { status, message });
        }

        Ok(response)
    }

    /// [`Gateway::send`], then decode the payload into `T`.
    ///
    /// # Errors
    ///
    /// Everything `send` returns, plus [`GatewayError::Decode`] when the
    /// payload does not match `T`.
    pub async fn send_as<T: DeserializeOwned>(&self, descriptor: RequestDescriptor) -> Result<T, GatewayError> {
        let payload = self.send(descriptor).await?;
        serde_json::from_value(payload).map_err(|e| GatewayError::Decode(e.to_string()))
    }

    fn evict(&self, origin: Origin, status: u16) {
        tracing::warn!(%origin, status, "credential rejected; evicting session");
        if let Err(e) = self.session.clear() {
            // In-memory session is already gone; only the persisted copy lingers.
            tracing::error!(error = %e, "failed to remove persisted session during eviction");
        }
    }
}

fn join_url(base: &str, path: &str) -> String {
    format!("{base}/{}", path.trim_start_matches('/'))
}

fn parse_body(body: &str) -> Result<Value, GatewayError> {
    if body.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(body).map_err(|e| GatewayError::Decode(format!("response body is not JSON: {e}")))
}

/// Payload of a success body: the `data` field of an envelope, else the body itself.
#[must_use]
pub fn unwrap_envelope(body: Value) -> Value {
    match body {
        Value::Object(mut map) if map.contains_key("data") => map.remove("data").unwrap_or(Value::Null),
        other => other,
    }
}

/// Human-readable reason from an error body: `message`, then `error`, then
/// the compact JSON body itself, then a generic fallback.
#[must_use]
pub fn extract_message(body: &str, status: u16) -> String {
    let Ok(value) = serde_json::from_str::<Value>(body) else {
        return fallback_message(status);
    };
    let field = ["message", "error"]
        .iter()
        .find_map(|key| value.get(*key).and_then(Value::as_str).filter(|s| !s.trim().is_empty()));
    if let Some(message) = field {
        return message.to_owned();
    }
    match value {
        Value::Null => fallback_message(status),
        Value::String(s) if s.trim().is_empty() => fallback_message(status),
        Value::String(s) => s,
        Value::Object(ref map) if map.is_empty() => fallback_message(status),
        Value::Array(ref items) if items.is_empty() => fallback_message(status),
        other => other.to_string(),
    }
}

fn fallback_message(status: u16) -> String {
    format!("request failed with status {status}")
}

#[cfg(test)]
#[path = "gateway_test.rs"]
mod tests;
