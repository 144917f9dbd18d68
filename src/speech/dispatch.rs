//! Single-slot speech dispatch with interrupt-and-replace semantics.
//!
//! At most one utterance is in flight at a time. A new utterance cancels a
//! still-playing one before speaking: stale narration is worse than a
//! truncated one. Silence never cancels anything.

use crate::narration::Language;
use crate::{HeraldError, Result};
use tracing::{debug, warn};
use uuid::Uuid;

/// Cancellation token for one utterance handed to the speech backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SpeechHandle(Uuid);

impl SpeechHandle {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SpeechHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// External speech-synthesis collaborator.
///
/// The engine depends only on these three operations; tests use a
/// recording fake instead of a real audio backend.
pub trait SpeechBackend: Send {
    /// Begin speaking; returns the handle used to cancel or query it.
    fn speak(&mut self, text: &str, language: &Language) -> Result<SpeechHandle>;

    /// Request cancellation of an utterance.
    fn cancel(&mut self, handle: SpeechHandle) -> Result<()>;

    /// Whether the given utterance is still playing.
    fn is_speaking(&self, handle: SpeechHandle) -> bool;
}

/// Serializes composed narration to the backend, one utterance in flight.
pub struct SpeechDispatcher {
    backend: Box<dyn SpeechBackend>,
    in_flight: Option<SpeechHandle>,
}

impl SpeechDispatcher {
    pub fn new(backend: Box<dyn SpeechBackend>) -> Self {
        Self {
            backend,
            in_flight: None,
        }
    }

    /// Speak a new utterance, interrupting a still-playing one first.
    ///
    /// Backend failures surface as [`HeraldError::DispatchFailure`]; the
    /// caller counts them and the next cycle simply retries.
    pub fn dispatch(&mut self, text: &str, language: &Language) -> Result<SpeechHandle> {
        if let Some(previous) = self.in_flight.take() {
            if self.backend.is_speaking(previous) {
                debug!("Interrupting in-flight utterance for new narration");
                if let Err(e) = self.backend.cancel(previous) {
                    warn!("Cancel of in-flight utterance failed: {}", e);
                }
            }
        }

        let handle = self
            .backend
            .speak(text, language)
            .map_err(|e| HeraldError::DispatchFailure(e.to_string()))?;
        self.in_flight = Some(handle);
        Ok(handle)
    }

    /// Cancel whatever is playing. Used when the session stops.
    pub fn cancel_in_flight(&mut self) {
        if let Some(handle) = self.in_flight.take() {
            if self.backend.is_speaking(handle) {
                debug!("Cancelling in-flight utterance");
                if let Err(e) = self.backend.cancel(handle) {
                    warn!("Cancel of in-flight utterance failed: {}", e);
                }
            }
        }
    }

    pub fn has_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }
}
