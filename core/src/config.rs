//! Client configuration.
//!
//! There is no config file. `ClientConfig::default()` targets the production
//! site; tests point `origin` at the mock server.

use std::time::Duration;

pub const DEFAULT_ORIGIN: &str = "https://informatics.msk.ru/";
pub const DEFAULT_BACKEND_PREFIX: &str = "py/";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);
/// Text the site renders in the footer of every page once logged in.
pub const DEFAULT_LOGGED_IN_MARKER: &str = "Вы зашли под именем";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Site root, e.g. `https://informatics.msk.ru/`.
    pub origin: String,
    /// Path of the JSON backend relative to `origin`.
    pub backend_prefix: String,
    /// Applied to every request.
    pub timeout: Duration,
    pub logged_in_marker: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            origin: DEFAULT_ORIGIN.to_string(),
            backend_prefix: DEFAULT_BACKEND_PREFIX.to_string(),
            timeout: DEFAULT_TIMEOUT,
            logged_in_marker: DEFAULT_LOGGED_IN_MARKER.to_string(),
        }
    }
}

impl ClientConfig {
    /// Defaults overridden by `INFORMATICS_ORIGIN` and `INFORMATICS_TIMEOUT_SECS`.
    ///
    /// An unparsable timeout is ignored with a warning.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(origin) = lookup("INFORMATICS_ORIGIN") {
            config.origin = origin;
        }
        if let Some(raw) = lookup("INFORMATICS_TIMEOUT_SECS") {
            match raw.parse::<u64>() {
                Ok(secs) => config.timeout = Duration::from_secs(secs),
                Err(_) => tracing::warn!(value = %raw, "ignoring invalid INFORMATICS_TIMEOUT_SECS"),
            }
        }
        config
    }

    pub fn with_origin(mut self, origin: &str) -> Self {
        self.origin = origin.to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}
