pub mod dedup;
pub mod narration;
pub mod observation;
pub mod scoring;
pub mod session;
pub mod speech;
pub mod utils;
pub mod vision;

use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum HeraldError {
    #[error("Detection timed out: {0}")]
    DetectionTimeout(String),

    #[error("Malformed observation: {0}")]
    MalformedObservation(String),

    #[error("Unsupported language: {0}")]
    UnsupportedLanguage(String),

    #[error("Speech dispatch failed: {0}")]
    DispatchFailure(String),

    #[error("Frame capture failed: {0}")]
    FrameCapture(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Channel error: {0}")]
    Channel(String),
}

impl HeraldError {
    /// Check if this error is recoverable.
    ///
    /// Recoverable errors degrade a single cycle's output; the loop keeps
    /// running. Non-recoverable errors are rejected before a session is
    /// affected (configuration) or mean the session is gone (channel).
    pub fn is_recoverable(&self) -> bool {
        match self {
            // A slow collaborator costs one source for one cycle
            HeraldError::DetectionTimeout(_) => true,
            // A bad entry is dropped, the rest of the batch proceeds
            HeraldError::MalformedObservation(_) => true,
            // Composition falls back to the default language
            HeraldError::UnsupportedLanguage(_) => true,
            // The next cycle retries the backend
            HeraldError::DispatchFailure(_) => true,
            // An empty-observation cycle, nothing more
            HeraldError::FrameCapture(_) => true,
            // Rejected at configure time, never mid-session
            HeraldError::Configuration(_) => false,
            // The worker or its channels are gone
            HeraldError::Channel(_) => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, HeraldError>;
