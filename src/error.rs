use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExporterError {
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("HTTP status {status} for command '{command}': {body}")]
    Status {
        command: String,
        status: u16,
        body: String,
    },

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Token renewal failed: {0}")]
    TokenRenewal(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The array answered 200 with no body. Not a real failure.
    #[error("Empty response body for command '{0}'")]
    EmptyResponse(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),
}

impl ExporterError {
    /// Errors that collectors may return but that should not be reported.
    pub fn is_benign(&self) -> bool {
        matches!(self, ExporterError::EmptyResponse(_))
    }

    /// Whether the remote system rejected the session token (401/403).
    pub fn is_token_rejection(&self) -> bool {
        matches!(self, ExporterError::Status { status, .. } if *status == 401 || *status == 403)
    }
}

pub type Result<T> = std::result::Result<T, ExporterError>;
