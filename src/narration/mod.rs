//! Narration composition: language packs and the ranking/truncation/sentence
//! assembly that turns surviving observations into one spoken utterance.

pub mod composer;
pub mod templates;

pub use composer::{Composer, Composition, DEFAULT_MAX_SPOKEN_ITEMS, DEFAULT_PAUSE_MARKER};
pub use templates::{Language, LanguagePack, Position, TemplateSet};
