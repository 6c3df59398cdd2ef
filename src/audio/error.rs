use thiserror::Error;

use crate::lifecycle::{LifecycleEvent, LifecyclePhase};

#[derive(Error, Debug)]
pub enum PlayerError {
    /// Input that does not name a playable http(s) or file URL
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("server error: {0}")]
    HttpStatus(reqwest::StatusCode),

    #[error("cannot read media: {0}")]
    Io(#[from] std::io::Error),

    #[error("unsupported audio format: {0}")]
    Decode(String),

    // Device could not be opened or refused the stream
    #[error("audio output unavailable: {0}")]
    Output(String),

    #[error("preparation cancelled")]
    Cancelled,

    #[error("audio engine is not running")]
    EngineClosed,

    #[error("lifecycle event {event:?} is not allowed while {phase:?}")]
    Lifecycle {
        phase: LifecyclePhase,
        event: LifecycleEvent,
    },
}

pub type Result<T> = std::result::Result<T, PlayerError>;
