use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum HrvError {
    #[error("Invalid filter specification: {0}")]
    InvalidSpec(String),

    #[error("Invalid sampling rate: {0} Hz")]
    InvalidRate(f64),

    #[error("Numeric instability: {0}")]
    NumericInstability(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to load trace: {0}")]
    Load(String),
}

pub type Result<T> = std::result::Result<T, HrvError>;
