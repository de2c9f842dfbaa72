use thiserror::Error;

/// Failure taxonomy shared by every courier crate.
///
/// Callers on the realtime paths log these and degrade to a no-op; nothing
/// here is fatal to a running channel.
#[derive(Debug, Error)]
pub enum CourierError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API returned error status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Failed to decode payload: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Subscription to {channel} failed: {reason}")]
    Subscription { channel: String, reason: String },

    #[error("Realtime transport error: {0}")]
    Transport(String),

    #[error("Audio playback failed: {0}")]
    Audio(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

pub type CourierResult<T> = Result<T, CourierError>;
