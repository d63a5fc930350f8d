use std::error::Error;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("unexpected end of input at byte {0}")]
    PrematureEnd(usize),
    #[error("invalid tag name at byte {0}")]
    InvalidName(usize),
    #[error("unexpected closing tag </{found}> at byte {at}")]
    UnexpectedClose { found: String, at: usize },
    #[error("expected </{expected}>, found </{found}> at byte {at}")]
    MismatchedClose {
        expected: String,
        found: String,
        at: usize,
    },
    #[error("<{name}> opened at byte {at} is never closed")]
    Unclosed { name: String, at: usize },
}

#[derive(Debug, Error)]
pub enum RequestError {
    #[error("request failed with status {status}: {message}")]
    Status { status: u16, message: String },
    #[error("transport error")]
    Transport(#[source] Box<dyn Error + Send + Sync + 'static>),
    #[error("failed to decode response body")]
    Decode(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("session store io error")]
    Io(#[from] std::io::Error),
    #[error("session store holds invalid data")]
    Decode(#[from] serde_json::Error),
}
