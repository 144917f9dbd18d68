//! Narration composer: ranks the surviving observations, truncates to the
//! per-cycle spoken-item cap, and renders each into a sentence.
//!
//! The cap bounds both latency and cognitive load: three sentences per
//! cycle is already a lot to absorb while walking.

use crate::narration::templates::{Language, TemplateSet};
use crate::observation::{NarrationUnit, ScoredObservation};
use crate::scoring;
use tracing::{debug, warn};

/// Default maximum spoken items per cycle.
pub const DEFAULT_MAX_SPOKEN_ITEMS: usize = 3;

/// Default pause between sentences within one utterance.
pub const DEFAULT_PAUSE_MARKER: &str = ". ";

/// Everything one composition pass produced.
#[derive(Debug, Clone)]
pub struct Composition {
    /// Ranked units, highest urgency first.
    pub units: Vec<NarrationUnit>,
    /// The single combined spoken string; `None` when nothing survived.
    pub utterance: Option<String>,
    /// Language actually used for rendering.
    pub language: Language,
    /// True when the requested language had no pack.
    pub language_fallback: bool,
}

#[derive(Debug, Clone)]
pub struct Composer {
    templates: TemplateSet,
    max_items: usize,
    pause_marker: String,
}

impl Composer {
    pub fn new(templates: TemplateSet, max_items: usize, pause_marker: impl Into<String>) -> Self {
        Self {
            templates,
            max_items,
            pause_marker: pause_marker.into(),
        }
    }

    pub fn set_max_items(&mut self, max_items: usize) {
        self.max_items = max_items;
    }

    pub fn set_pause_marker(&mut self, pause_marker: impl Into<String>) {
        self.pause_marker = pause_marker.into();
    }

    pub fn templates_mut(&mut self) -> &mut TemplateSet {
        &mut self.templates
    }

    /// Compose one cycle's narration in the requested language.
    ///
    /// Survivors are stably sorted by the announcement-priority comparator,
    /// truncated to the item cap, and rendered in rank order. An unsupported
    /// language falls back to the default pack rather than going silent.
    pub fn compose(
        &self,
        mut survivors: Vec<ScoredObservation>,
        requested: &Language,
    ) -> Composition {
        let (language, language_fallback) = self.templates.resolve(requested);
        if language_fallback {
            warn!(
                "Unsupported language '{}', composing in '{}'",
                requested, language
            );
        }

        survivors.sort_by(scoring::compare);
        if survivors.len() > self.max_items {
            debug!(
                "Truncating {} survivors to {} spoken items",
                survivors.len(),
                self.max_items
            );
            survivors.truncate(self.max_items);
        }

        let pack = self.templates.pack(&language);
        let units: Vec<NarrationUnit> = survivors
            .into_iter()
            .enumerate()
            .map(|(rank, source)| NarrationUnit {
                text: pack.render(&source),
                rank,
                source,
            })
            .collect();

        let utterance = if units.is_empty() {
            None
        } else {
            let joined = units
                .iter()
                .map(|unit| unit.text.as_str())
                .collect::<Vec<_>>()
                .join(&self.pause_marker);
            Some(format!("{}.", joined))
        };

        Composition {
            units,
            utterance,
            language,
            language_fallback,
        }
    }
}

impl Default for Composer {
    fn default() -> Self {
        Self::new(
            TemplateSet::builtin(),
            DEFAULT_MAX_SPOKEN_ITEMS,
            DEFAULT_PAUSE_MARKER,
        )
    }
}
