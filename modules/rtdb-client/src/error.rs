use thiserror::Error;

pub type Result<T> = std::result::Result<T, RtdbError>;

#[derive(Debug, Error)]
pub enum RtdbError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Parse error: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for RtdbError {
    fn from(err: reqwest::Error) -> Self {
        RtdbError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for RtdbError {
    fn from(err: serde_json::Error) -> Self {
        RtdbError::Parse(err.to_string())
    }
}
