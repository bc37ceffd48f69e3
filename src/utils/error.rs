use thiserror::Error;

/// Longest response body kept on a [`AppError::RemoteRejection`].
pub const MAX_REJECTION_BODY_CHARS: usize = 240;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Missing credentials: {message}")]
    MissingCredentials { message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Remote rejection: status {status}: {body}")]
    RemoteRejection { status: u16, body: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Logging initialization error: {0}")]
    LoggingInit(#[from] tracing_appender::rolling::InitError),

    #[error("Generic error: {0}")]
    Generic(#[from] anyhow::Error),

    #[error("HMAC error: {0}")]
    Hmac(#[from] hmac::digest::InvalidLength),
}

impl AppError {
    pub fn missing_credentials(message: impl Into<String>) -> Self {
        Self::MissingCredentials {
            message: message.into(),
        }
    }

    /// Builds a rejection, keeping at most [`MAX_REJECTION_BODY_CHARS`] of the body.
    pub fn remote_rejection(status: u16, body: &str) -> Self {
        Self::RemoteRejection {
            status,
            body: body.chars().take(MAX_REJECTION_BODY_CHARS).collect(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Transport failures, throttling and server errors may succeed on a later attempt.
    /// Any other rejection (bad signature, bad credentials, bad request) will not.
    pub fn is_retryable(&self) -> bool {
        match self {
            AppError::Network(_) => true,
            AppError::RemoteRejection { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
