use thiserror::Error;

#[derive(Debug, Error)]
pub enum CakedayError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid date: {0}")]
    InvalidDate(String),
}

pub type Result<T> = std::result::Result<T, CakedayError>;
