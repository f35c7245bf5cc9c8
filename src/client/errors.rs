use thiserror::Error;

/// What went wrong below the HTTP layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkErrorKind {
    /// The request outlived the configured timeout and was aborted
    Timeout,
    /// The backend could not be reached at all
    Connection,
    /// Any other transport failure (TLS, body read, redirect loop, ...)
    Other,
}

/// Errors produced by the backend client
///
/// The `Display` output is the raw message; user-facing text always goes
/// through [`humanize_error`].
#[derive(Debug, Error)]
pub enum ClientError {
    /// Bad or missing input, caught before any request is made
    #[error("{0}")]
    Validation(String),

    /// Timeout or transport failure
    #[error("{message}")]
    Network {
        kind: NetworkErrorKind,
        message: String,
    },

    /// Non-2xx response; `message` is the server `detail` or `HTTP <status>`
    #[error("{message}")]
    Api { status: u16, message: String },

    /// 2xx response whose payload reports a logical failure
    #[error("{0}")]
    Application(String),

    /// 2xx response whose body could not be decoded
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Local file error while saving an artifact
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ClientError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Self::Network {
                kind: NetworkErrorKind::Timeout,
                ..
            }
        )
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            NetworkErrorKind::Timeout
        } else if err.is_connect() {
            NetworkErrorKind::Connection
        } else if err.is_decode() {
            return Self::InvalidResponse(err.to_string());
        } else {
            NetworkErrorKind::Other
        };

        let message = match kind {
            NetworkErrorKind::Timeout => "Request timeout".to_string(),
            _ => err.to_string(),
        };

        Self::Network { kind, message }
    }
}

const MSG_TIMEOUT: &str = "The request timed out. The server may be busy, please try again.";
const MSG_CONNECTION: &str = "Cannot reach the download server. Check that it is running and try again.";
const MSG_RATE_LIMITED: &str = "Too many requests. Please wait a moment and try again.";
const MSG_SERVER_ERROR: &str = "The server ran into a problem. Please try again later.";
const MSG_UNAVAILABLE: &str = "This video is unavailable. It may be private or removed.";
const MSG_AGE_RESTRICTED: &str = "This video is age-restricted and cannot be downloaded.";
const MSG_COPYRIGHT: &str = "This video cannot be downloaded due to copyright restrictions.";

/// Map an error to the sentence shown to the user.
///
/// Pure and deterministic: the same error always yields the same text.
/// Server messages that name a specific cause win over the generic
/// transport/status categories.
pub fn humanize_error(error: &ClientError) -> String {
    if let ClientError::Validation(message) = error {
        return message.clone();
    }

    let raw = error.to_string();
    let lower = raw.to_lowercase();

    if lower.contains("video unavailable") {
        return MSG_UNAVAILABLE.to_string();
    }
    if lower.contains("age restricted") || lower.contains("age-restricted") {
        return MSG_AGE_RESTRICTED.to_string();
    }
    if lower.contains("copyright") {
        return MSG_COPYRIGHT.to_string();
    }

    if error.is_timeout() {
        return MSG_TIMEOUT.to_string();
    }

    match error {
        ClientError::Network {
            kind: NetworkErrorKind::Connection,
            ..
        } => return MSG_CONNECTION.to_string(),
        ClientError::Api { status: 429, .. } => return MSG_RATE_LIMITED.to_string(),
        ClientError::Api { status, .. } if (500..600).contains(status) => {
            return MSG_SERVER_ERROR.to_string();
        }
        _ => {}
    }

    if lower.contains("timeout") || lower.contains("timed out") {
        MSG_TIMEOUT.to_string()
    } else if raw.contains("HTTP 429") {
        MSG_RATE_LIMITED.to_string()
    } else if raw.contains("HTTP 500") {
        MSG_SERVER_ERROR.to_string()
    } else {
        format!("Error: {}", raw)
    }
}
