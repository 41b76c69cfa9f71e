use reqwest::StatusCode;
use thiserror::Error;

/// ValidationError
///
/// Raised by the form checks in `validation` before any request is built.
/// The display strings are shown to the user as-is.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Passwords do not match")]
    PasswordMismatch,

    #[error("Password must be at least {min} characters long")]
    PasswordTooShort { min: usize },

    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("{field} is not a {kind} field")]
    UnknownField { kind: &'static str, field: String },
}

/// ApiError
///
/// Every failure the REST backend can produce, as seen from the client.
/// A non-2xx status is always an error; nothing is retried.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request never produced a response (DNS, connect, timeout, body read).
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The backend answered with a non-success status.
    #[error("backend returned {status}")]
    Status {
        status: StatusCode,
        /// Human-readable message pulled out of the body, when there was one.
        message: Option<String>,
    },

    /// A 2xx body that did not match the expected shape.
    #[error("unexpected response body: {0}")]
    Decode(String),

    #[error("invalid API base URL: {0}")]
    InvalidBaseUrl(String),

    /// A form built for one content kind was submitted to another's endpoint.
    #[error("a {got} form cannot be submitted as a {expected}")]
    KindMismatch {
        expected: &'static str,
        got: &'static str,
    },

    /// Attachments are read from disk before the multipart body is built.
    #[error("failed to read attachment {path}: {source}")]
    Attachment {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl ApiError {
    /// The server-supplied message, if the failure carried one.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            ApiError::Status { message, .. } => message.as_deref(),
            _ => None,
        }
    }

    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            ApiError::Network(e) => e.status(),
            _ => None,
        }
    }
}

/// StorageError
///
/// Failures of the persisted key-value slot backing the session.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("session store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("session store is corrupt: {0}")]
    Serde(#[from] serde_json::Error),

    /// Used by the in-memory fake to simulate an unwritable store.
    #[error("session store unavailable: {0}")]
    Unavailable(String),
}

/// AuthError
///
/// The single failure signal surfaced by `SessionManager::login` and
/// `SessionManager::signup`.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Login succeeded at the HTTP level but the body lacked token, email or role.
    #[error("login response is missing {0}")]
    MalformedResponse(&'static str),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl AuthError {
    /// Message to show next to the form.
    ///
    /// Validation errors always use their own text. Backend failures use the
    /// server's message when one could be extracted, and `fallback` otherwise.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            AuthError::Validation(e) => e.to_string(),
            AuthError::Api(e) => e
                .server_message()
                .map(str::to_string)
                .unwrap_or_else(|| fallback.to_string()),
            _ => fallback.to_string(),
        }
    }
}

/// ConfigError
///
/// Raised by `AppConfig::load` when the environment is incomplete.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set in production")]
    Missing(&'static str),

    #[error("{name} has an invalid value: {value}")]
    Invalid { name: &'static str, value: String },
}

/// StartupError
///
/// Anything that stops `AppState::bootstrap` from producing a usable client.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}
