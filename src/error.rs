//! Error types for tax-records.
//!
//! Every failure the Record Store, the CRUD Gateway or the CLI can produce is a
//! variant of [`Error`]. Each variant knows which HTTP-equivalent status it maps
//! to, so the gateway never has to inspect error strings.

use crate::schema::ValidationError;
use thiserror::Error;

/// HTTP-equivalent classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Caller sent something missing or malformed (400).
    Client,
    /// Caller is not signed in or the credentials are wrong (401).
    Unauthorized,
    /// Request conflicts with stored state (409).
    Conflict,
    /// Storage or internal failure (500).
    Internal,
}

impl ErrorClass {
    pub fn status_code(&self) -> u16 {
        match self {
            ErrorClass::Client => 400,
            ErrorClass::Unauthorized => 401,
            ErrorClass::Conflict => 409,
            ErrorClass::Internal => 500,
        }
    }
}

/// The main error type for tax-records operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Client errors ===
    /// One or more record fields failed validation.
    #[error("{}", join_validation(.0))]
    Validation(Vec<ValidationError>),

    /// A required query parameter was not supplied.
    #[error("{0} parameter is required")]
    MissingParameter(&'static str),

    /// A query parameter was supplied but could not be parsed.
    #[error("invalid {name} parameter: {value:?}")]
    InvalidParameter {
        name: &'static str,
        value: String,
    },

    // === Conflicts ===
    /// A Year with this value already exists.
    #[error("tax year {0} already exists")]
    DuplicateYear(i32),

    /// A Year still has income or expense records and cannot be deleted.
    #[error("tax year {year} still has {records} record(s)")]
    YearInUse { year: i32, records: i64 },

    // === Authentication ===
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("password hashing failed: {0}")]
    PasswordHash(String),

    #[error("token error: {0}")]
    Token(String),

    // === Storage and I/O ===
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("failed to load configuration: {0}")]
    Config(Box<figment::Error>),

    #[error("invalid configuration: {0}")]
    ConfigValidation(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// An internal error occurred (bug or poisoned lock).
    #[error("internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for tax-records operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::Config(Box::new(err))
    }
}

impl From<Vec<ValidationError>> for Error {
    fn from(errors: Vec<ValidationError>) -> Self {
        Self::Validation(errors)
    }
}

fn join_validation(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl Error {
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized(message.into())
    }

    pub fn class(&self) -> ErrorClass {
        match self {
            Error::Validation(_) | Error::MissingParameter(_) | Error::InvalidParameter { .. } => {
                ErrorClass::Client
            }
            Error::Unauthorized(_) | Error::Token(_) => ErrorClass::Unauthorized,
            Error::DuplicateYear(_) | Error::YearInUse { .. } => ErrorClass::Conflict,
            _ => ErrorClass::Internal,
        }
    }

    /// Message safe to show to a client.
    ///
    /// Internal failures are reduced to a generic string; their detail only
    /// goes to the log.
    pub fn public_message(&self) -> String {
        match self.class() {
            ErrorClass::Internal => "internal storage error".to_string(),
            _ => self.to_string(),
        }
    }
}
