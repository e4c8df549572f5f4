// thiserror-based error types for the parts of the core that touch I/O.
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),
    #[error("serde: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("other: {0}")]
    Other(String),
}

impl From<CoreError> for hvac_protocol::HvacError {
    fn from(e: CoreError) -> Self {
        hvac_protocol::HvacError::Storage(e.to_string())
    }
}
