use shared::fields::Field;
use thiserror::Error;

/// How an error is allowed to travel through a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Invalid or missing credential. Aborts immediately, never retried.
    Auth,
    /// No cache row, empty page, unknown release. Moves on to the next source.
    NotFound,
    /// Network failure or malformed body. Skips the current item or page if possible.
    Transient,
    /// A value failed its field predicate. The field becomes unavailable.
    Validation,
    /// Anything that leaves the run unable to continue.
    Fatal,
}

#[derive(Debug, Error)]
pub enum SleeveError {
    #[error("Authentication rejected ({status}): {message}")]
    Auth { status: u16, message: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Transient failure: {0}")]
    Transient(String),

    #[error("Invalid value for {field}: {reason}")]
    Validation { field: Field, reason: String },

    #[error("Service not configured: {0}")]
    NotConfigured(String),

    #[error("Registry error: {0}")]
    Registry(String),

    #[error("Assembly failed: {0}")]
    Assembly(String),

    #[error("Formatting failed: {0}")]
    Format(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::ser::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SleeveError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SleeveError::Auth { .. } => ErrorKind::Auth,
            SleeveError::NotFound(_) => ErrorKind::NotFound,
            SleeveError::Transient(_) | SleeveError::Http(_) | SleeveError::Json(_) => {
                ErrorKind::Transient
            }
            SleeveError::Validation { .. } => ErrorKind::Validation,
            SleeveError::NotConfigured(_)
            | SleeveError::Registry(_)
            | SleeveError::Assembly(_)
            | SleeveError::Format(_)
            | SleeveError::Url(_)
            | SleeveError::Database(_)
            | SleeveError::Toml(_)
            | SleeveError::Io(_) => ErrorKind::Fatal,
        }
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self.kind(), ErrorKind::Auth | ErrorKind::Fatal)
    }

    /// Maps a non-success HTTP status onto the taxonomy.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            401 | 403 => SleeveError::Auth { status, message },
            404 => SleeveError::NotFound(message),
            _ => SleeveError::Transient(format!("HTTP {status}: {message}")),
        }
    }
}

pub type Result<T> = std::result::Result<T, SleeveError>;
