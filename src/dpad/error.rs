//! Error type shared by the engine and profile handling.

use thiserror::Error;

/// Errors raised around the pad core: engine plumbing and profile handling.
/// The direction state machine itself never fails.
#[derive(Debug, Error)]
pub enum DpadError {
    #[error("Unknown dpad index: {0}")]
    UnknownDpad(usize),

    #[error("Unknown set index: {0}")]
    UnknownSet(usize),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Initialization error: {0}")]
    InitializationError(String),

    #[error("Channel error: {0}")]
    ChannelError(String),

    #[error("Thread error: {0}")]
    ThreadError(String),
}
