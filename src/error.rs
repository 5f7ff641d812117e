use thiserror::Error;

#[derive(Error, Debug)]
pub enum CellfinderError {
    #[error("Config error: {0}")]
    Config(String),
    #[error("Persistence error: {0}")]
    Persistence(String),
    #[error("Data corruption: {message}")]
    DataCorruption { message: String },
    #[error("Invalid property: {0}")]
    InvalidProperty(String),
    #[error("Invalid print request: {0}")]
    InvalidPrintRequest(String),
    #[error("Type mismatch for property '{property}': stored as {stored}, got {given}")]
    TypeMismatch { property: String, stored: String, given: String },
    #[error("Lock poisoned: {0}")]
    Lock(String),
}

pub type Result<T> = std::result::Result<T, CellfinderError>;

// Helper conversions
impl From<rusqlite::Error> for CellfinderError {
    fn from(e: rusqlite::Error) -> Self {
        match e {
            rusqlite::Error::FromSqlConversionFailure(..) => Self::DataCorruption { message: e.to_string() },
            _ => Self::Persistence(e.to_string()),
        }
    }
}

impl From<serde_json::Error> for CellfinderError {
    fn from(e: serde_json::Error) -> Self { Self::DataCorruption { message: e.to_string() } }
}

impl From<::config::ConfigError> for CellfinderError {
    fn from(e: ::config::ConfigError) -> Self { Self::Config(e.to_string()) }
}

impl<T> From<std::sync::PoisonError<T>> for CellfinderError {
    fn from(e: std::sync::PoisonError<T>) -> Self { Self::Lock(e.to_string()) }
}
