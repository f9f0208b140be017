use std::str::FromStr;

/// Connection settings for the management API.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL without the `/rest/v1` suffix (default: `http://localhost:8080`).
    pub base_url: String,
    /// Basic-auth user; an empty user disables authentication.
    pub username: String,
    pub password: String,
    /// Per-request timeout in seconds (default: `15`).
    pub request_timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".into(),
            username: "admin".into(),
            password: "admin".into(),
            request_timeout_secs: 15,
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                     | Default                 |
    /// |-----------------------------|-------------------------|
    /// | `MGMT_API_URL`              | `http://localhost:8080` |
    /// | `MGMT_API_USER`             | `admin`                 |
    /// | `MGMT_API_PASSWORD`         | `admin`                 |
    /// | `MGMT_REQUEST_TIMEOUT_SECS` | `15`                    |
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            base_url: std::env::var("MGMT_API_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.base_url),
            username: std::env::var("MGMT_API_USER").unwrap_or(defaults.username),
            password: std::env::var("MGMT_API_PASSWORD").unwrap_or(defaults.password),
            request_timeout_secs: env_parse(
                "MGMT_REQUEST_TIMEOUT_SECS",
                defaults.request_timeout_secs,
            ),
        }
    }

    /// Basic-auth credentials, if configured.
    pub fn credentials(&self) -> Option<(String, String)> {
        (!self.username.is_empty()).then(|| (self.username.clone(), self.password.clone()))
    }
}

/// Parse `key` from the environment, falling back to `default` when unset
/// or malformed.
pub fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %raw, "Invalid value, using default");
            default
        }),
        Err(_) => default,
    }
}
