/// Errors from the management API read layer.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The management API returned a non-2xx status code.
    #[error("management API error ({status}): {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// The response body did not match the expected shape.
    #[error("failed to decode {resource} page: {message}")]
    Decode {
        resource: &'static str,
        message: String,
    },

    /// The client could not be built from its configuration.
    #[error("invalid client configuration: {0}")]
    Config(String),
}

impl ClientError {
    /// Whether a later attempt could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Request(_) => true,
            Self::Api { status, .. } => *status >= 500 || *status == 429,
            Self::Decode { .. } | Self::Config(_) => false,
        }
    }
}
