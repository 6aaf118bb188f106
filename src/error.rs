//! The crate-wide [`Error`] type.

use chrono::NaiveDate;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),

    #[error("could not connect to {url}: {source}")]
    Connection {
        url: String,
        #[source]
        source: diesel::ConnectionError,
    },

    #[error("migration error: {0}")]
    Migration(String),

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The remote service answered, but refused the request.
    #[error("{service} rejected the request: {message}")]
    Remote {
        service: &'static str,
        message: String,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unknown zone '{0}'")]
    UnknownZone(String),

    #[error("unknown seat '{0}'")]
    UnknownSeat(String),

    #[error("seat '{0}' has no student assigned")]
    UnassignedSeat(String),

    #[error("invalid input: {0}")]
    Invalid(String),

    #[error("a bug report needs a description or error details")]
    EmptyBugReport,

    #[error("{0} is not configured")]
    NotConfigured(&'static str),

    #[error("check-in for {date} is closed (window {opens}-{closes}); pass --force to override")]
    CheckInClosed {
        date: NaiveDate,
        opens: String,
        closes: String,
    },

    #[error("render error: {0}")]
    Render(String),

    #[error("mail error: {0}")]
    Mail(String),
}
