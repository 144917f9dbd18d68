pub mod normalizer;
pub mod types;

pub use normalizer::{NormalizedBatch, Normalizer, DEFAULT_MIN_CONFIDENCE};
pub use types::{
    BoundingBox, Category, NarrationUnit, Observation, ObservationKind, ScoredObservation,
    CENTER_BAND,
};
