use thiserror::Error;

#[derive(Error, Debug)]
pub enum ForecastError {
    #[error("Forecast series is empty: KPIs need at least one week")]
    EmptySeries,

    #[error("No transactions available for entity: {0}")]
    EmptyInput(String),

    #[error("Invalid transaction at row {row}: {details}")]
    InvalidTransaction { row: usize, details: String },

    #[error("Invalid settings: {0}")]
    InvalidSettings(String),

    #[error("Upstream store unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Language model service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Language model rejected credentials: {0}")]
    AuthError(String),

    #[error("Language model request timed out: {0}")]
    Timeout(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ForecastError>;
