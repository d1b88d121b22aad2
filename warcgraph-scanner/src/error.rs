use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Payload parse error: {0}")]
    PayloadParse(String),

    #[error("Hash algorithm unavailable: {0}")]
    HashUnavailable(String),

    #[error("Malformed WARC record: {0}")]
    Warc(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ScanError>;
