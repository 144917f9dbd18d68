use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What produced an observation: the object detector or the OCR engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObservationKind {
    Object,
    Text,
}

/// Normalized rectangle in frame-relative coordinates.
///
/// All values are fractions of the frame: `x`/`y` locate the top-left
/// corner, `w`/`h` the extent. Validated by the normalizer; a box that
/// exists was in range when it was built.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl BoundingBox {
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    /// Fraction of the frame covered by this box, a proxy for proximity.
    pub fn area(&self) -> f32 {
        self.w * self.h
    }

    pub fn center_x(&self) -> f32 {
        self.x + self.w / 2.0
    }

    pub fn center_y(&self) -> f32 {
        self.y + self.h / 2.0
    }

    /// Whether the box sits directly ahead of the user.
    pub fn is_centered(&self) -> bool {
        (self.center_x() - 0.5).abs() < CENTER_BAND
    }
}

/// Half-width of the horizontal band treated as "directly ahead".
pub const CENTER_BAND: f32 = 0.15;

/// One detected entity or recognized text fragment in one capture cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub kind: ObservationKind,

    /// Object class name, or the recognized text string.
    pub label: String,

    /// Upstream model confidence in [0,1].
    pub confidence: f32,

    pub bbox: BoundingBox,

    /// Capture-cycle time this observation belongs to.
    pub observed_at: DateTime<Utc>,
}

impl Observation {
    pub fn new(
        kind: ObservationKind,
        label: impl Into<String>,
        confidence: f32,
        bbox: BoundingBox,
        observed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            kind,
            label: label.into(),
            confidence,
            bbox,
            observed_at,
        }
    }
}

/// Urgency class of an observation.
///
/// Categories carry a fixed announcement precedence used to break scoring
/// ties: a hazard always beats a person at equal urgency, signage and plain
/// text rank together, generic objects come last. Derivation from labels
/// and the per-category base weights live in [`crate::scoring`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Hazard,
    Person,
    Signage,
    Object,
    Text,
}

impl Category {
    /// Tie-break rank, lower announces first. Signage and Text share a rank.
    pub fn rank(&self) -> u8 {
        match self {
            Category::Hazard => 0,
            Category::Person => 1,
            Category::Signage => 2,
            Category::Text => 2,
            Category::Object => 3,
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Category::Hazard => "hazard",
            Category::Person => "person",
            Category::Signage => "signage",
            Category::Object => "object",
            Category::Text => "text",
        };
        write!(f, "{}", name)
    }
}

/// An observation with its derived urgency and category.
///
/// Urgency is always derived from the owned observation, never stored
/// apart from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredObservation {
    pub observation: Observation,

    /// Rule-based urgency in [0,100].
    pub urgency: f32,

    pub category: Category,
}

impl ScoredObservation {
    pub fn label(&self) -> &str {
        &self.observation.label
    }

    pub fn bbox(&self) -> &BoundingBox {
        &self.observation.bbox
    }

    pub fn kind(&self) -> ObservationKind {
        self.observation.kind
    }
}

/// One composed sentence, ranked within its cycle.
///
/// Keeps a copy of the scored observation it was rendered from for
/// diagnostics; both are discarded with the cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NarrationUnit {
    /// Sentence text in the language actually used for composition.
    pub text: String,

    /// Priority rank within the cycle, 0 = spoken first.
    pub rank: usize,

    pub source: ScoredObservation,
}
