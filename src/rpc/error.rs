use thiserror::Error;

/// Failures raised by the transport and the RPC client.
///
/// The `Display` text is what the UI shows, so each message is phrased for
/// the person holding the phone rather than for a log reader.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum RpcError {
    #[error("Request timeout. Please check your connection.")]
    Timeout,
    #[error("Network error. Please check your internet connection and server URL.")]
    Network(String),
    #[error("HTTP error: {status} {reason}")]
    Transport { status: u16, reason: String },
    #[error("{0}")]
    Remote(String),
    #[error("Invalid credentials. Please check your email and password.")]
    InvalidCredentials,
    #[error("Not authenticated. Please log in first.")]
    NotAuthenticated,
    #[error("Server address is not configured.")]
    NotConfigured,
    #[error("Unexpected response from server: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for RpcError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            RpcError::Timeout
        } else if let Some(status) = e.status() {
            RpcError::Transport {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("").to_string(),
            }
        } else if e.is_decode() {
            RpcError::Decode(e.to_string())
        } else {
            RpcError::Network(e.to_string())
        }
    }
}

impl From<serde_json::Error> for RpcError {
    fn from(e: serde_json::Error) -> Self {
        RpcError::Decode(e.to_string())
    }
}
