//! Speech dispatch: the boundary to the external speech-synthesis backend.

pub mod dispatch;

pub use dispatch::{SpeechBackend, SpeechDispatcher, SpeechHandle};
