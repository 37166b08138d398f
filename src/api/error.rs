use thiserror::Error;

/// Outcome of a single failed page request.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PageError {
    #[error("no response from the tracking server: {0}")]
    TransientNetwork(String),
    #[error("tracking server temporarily unavailable ({status}): {message}")]
    TransientServerStatus { status: u16, message: String },
    #[error("tracking server answered {status}: {message}")]
    Status { status: u16, message: String },
    #[error("malformed response: {0}")]
    MalformedResponse(String),
    #[error("invalid request: {0}")]
    Request(String),
}

impl PageError {
    /// Whether a later attempt could succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            PageError::TransientNetwork(_) | PageError::TransientServerStatus { .. }
        )
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            PageError::TransientServerStatus { status, .. } | PageError::Status { status, .. } => Some(*status),
            PageError::TransientNetwork(_) | PageError::MalformedResponse(_) | PageError::Request(_) => None,
        }
    }

    fn message(&self) -> &str {
        match self {
            PageError::TransientNetwork(message)
            | PageError::TransientServerStatus { message, .. }
            | PageError::Status { message, .. }
            | PageError::MalformedResponse(message)
            | PageError::Request(message) => message,
        }
    }
}

/// Why a whole aggregation failed. Partial results are never returned alongside.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("{}fetch failed after {attempts} attempt(s): {message}", status_prefix(.status))]
    FetchFailed {
        status: Option<u16>,
        message: String,
        attempts: u32,
    },
    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

fn status_prefix(status: &Option<u16>) -> String {
    status.map(|status| format!("Error {}: ", status)).unwrap_or_default()
}

impl FetchError {
    pub(crate) fn from_page(error: PageError, attempts: u32) -> Self {
        match error {
            PageError::MalformedResponse(message) => FetchError::MalformedResponse(message),
            error => FetchError::FetchFailed {
                status: error.status(),
                message: error.message().to_owned(),
                attempts,
            },
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::FetchFailed { .. } => "FetchFailed",
            FetchError::MalformedResponse(_) => "MalformedResponse",
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::FetchFailed { status, .. } => *status,
            FetchError::MalformedResponse(_) => None,
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("could not read config file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}
