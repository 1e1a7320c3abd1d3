//! Gateway configuration parsed from environment variables.

use std::path::PathBuf;

use crate::origin::{Origin, Origins};
use crate::transport::{DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_REQUEST_TIMEOUT_SECS};

pub const SESSION_FILE_ENV: &str = "BACKOFFICE_SESSION_FILE";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self { request_secs: DEFAULT_REQUEST_TIMEOUT_SECS, connect_secs: DEFAULT_CONNECT_TIMEOUT_SECS }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GatewayConfig {
    pub origins: Origins,
    pub timeouts: Timeouts,
    /// Overrides the default session file location when set.
    pub session_file: Option<PathBuf>,
}

impl GatewayConfig {
    /// Build typed config from environment variables.
    ///
    /// All optional; a missing origin only fails when that origin is used:
    /// - `API_AUTH`, `API_CATEGORY`, `API_PRODUCT`: backend base addresses
    /// - `API_REQUEST_TIMEOUT_SECS`: default 30
    /// - `API_CONNECT_TIMEOUT_SECS`: default 10
    /// - `BACKOFFICE_SESSION_FILE`: session file path
    #[must_use]
    pub fn from_env() -> Self {
        let origins = Origin::ALL.into_iter().fold(Origins::new(), |origins, origin| {
            match std::env::var(origin.env_var()) {
                Ok(base) => origins.with(origin, base),
                Err(_) => origins,
            }
        });
        let timeouts = Timeouts {
            request_secs: env_parse_u64("API_REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS),
            connect_secs: env_parse_u64("API_CONNECT_TIMEOUT_SECS", DEFAULT_CONNECT_TIMEOUT_SECS),
        };
        let session_file = std::env::var(SESSION_FILE_ENV)
            .ok()
            .filter(|raw| !raw.trim().is_empty())
            .map(PathBuf::from);

        Self { origins, timeouts, session_file }
    }
}

fn env_parse_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .filter(|secs| *secs > 0)
        .unwrap_or(default)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
