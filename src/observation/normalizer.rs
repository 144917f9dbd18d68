//! Detection normalizer: converts raw detector and OCR output into a
//! uniform, validated observation sequence.
//!
//! Order is stable: detector results first, then OCR results, each in the
//! order supplied upstream. Sorting is the composer's job, not ours.

use crate::observation::types::{BoundingBox, Observation, ObservationKind};
use crate::vision::{RawDetection, RawText};
use chrono::{DateTime, Utc};
use tracing::warn;

/// Minimum confidence an entry needs to enter the pipeline.
pub const DEFAULT_MIN_CONFIDENCE: f32 = 0.4;

/// Output of one normalization pass.
#[derive(Debug, Clone, Default)]
pub struct NormalizedBatch {
    /// Validated observations: detections first, then texts, upstream order.
    pub observations: Vec<Observation>,

    /// Entries below the confidence threshold. Filtering, not a failure.
    pub dropped_low_confidence: u32,

    /// Entries with an invalid bbox or confidence. Discarded, never fatal.
    pub dropped_malformed: u32,
}

/// Converts raw collaborator output into validated [`Observation`]s.
#[derive(Debug, Clone)]
pub struct Normalizer {
    min_confidence: f32,
}

impl Normalizer {
    pub fn new(min_confidence: f32) -> Self {
        Self { min_confidence }
    }

    pub fn set_min_confidence(&mut self, min_confidence: f32) {
        self.min_confidence = min_confidence;
    }

    /// Normalize one cycle's raw detector and OCR results.
    pub fn normalize(
        &self,
        detections: Vec<RawDetection>,
        texts: Vec<RawText>,
        observed_at: DateTime<Utc>,
    ) -> NormalizedBatch {
        let mut batch = NormalizedBatch::default();
        batch
            .observations
            .reserve(detections.len() + texts.len());

        for raw in detections {
            self.push(
                &mut batch,
                ObservationKind::Object,
                raw.label,
                raw.confidence,
                raw.bbox,
                observed_at,
            );
        }
        for raw in texts {
            self.push(
                &mut batch,
                ObservationKind::Text,
                raw.text,
                raw.confidence,
                raw.bbox,
                observed_at,
            );
        }

        batch
    }

    fn push(
        &self,
        batch: &mut NormalizedBatch,
        kind: ObservationKind,
        label: String,
        confidence: f32,
        bbox: BoundingBox,
        observed_at: DateTime<Utc>,
    ) {
        if let Err(reason) = validate(confidence, &bbox) {
            warn!("Dropping malformed entry '{}': {}", label, reason);
            batch.dropped_malformed += 1;
            return;
        }

        if confidence < self.min_confidence {
            batch.dropped_low_confidence += 1;
            return;
        }

        batch
            .observations
            .push(Observation::new(kind, label, confidence, bbox, observed_at));
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_CONFIDENCE)
    }
}

/// Check the upstream invariants: confidence in [0,1], every bbox
/// coordinate finite and in [0,1], positive extent.
fn validate(confidence: f32, bbox: &BoundingBox) -> std::result::Result<(), &'static str> {
    if confidence.is_nan() || !(0.0..=1.0).contains(&confidence) {
        return Err("confidence outside [0,1]");
    }
    for value in [bbox.x, bbox.y, bbox.w, bbox.h] {
        if value.is_nan() || !(0.0..=1.0).contains(&value) {
            return Err("bbox coordinate outside [0,1]");
        }
    }
    if bbox.w <= 0.0 || bbox.h <= 0.0 {
        return Err("bbox has no extent");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts() -> DateTime<Utc> {
        Utc::now()
    }

    fn detection(label: &str, confidence: f32, bbox: BoundingBox) -> RawDetection {
        RawDetection {
            label: label.to_string(),
            confidence,
            bbox,
        }
    }

    fn text(content: &str, confidence: f32, bbox: BoundingBox) -> RawText {
        RawText {
            text: content.to_string(),
            confidence,
            bbox,
        }
    }

    #[test]
    fn test_detector_results_precede_texts() {
        let normalizer = Normalizer::default();
        let batch = normalizer.normalize(
            vec![
                detection("chair", 0.9, BoundingBox::new(0.1, 0.1, 0.2, 0.2)),
                detection("person", 0.8, BoundingBox::new(0.4, 0.2, 0.3, 0.5)),
            ],
            vec![text("EXIT", 0.7, BoundingBox::new(0.6, 0.1, 0.2, 0.1))],
            ts(),
        );

        let labels: Vec<&str> = batch.observations.iter().map(|o| o.label.as_str()).collect();
        assert_eq!(labels, vec!["chair", "person", "EXIT"]);
        assert_eq!(batch.observations[0].kind, ObservationKind::Object);
        assert_eq!(batch.observations[2].kind, ObservationKind::Text);
    }

    #[test]
    fn test_low_confidence_is_counted_not_fatal() {
        let normalizer = Normalizer::default();
        let batch = normalizer.normalize(
            vec![
                detection("chair", 0.39, BoundingBox::new(0.1, 0.1, 0.2, 0.2)),
                detection("person", 0.41, BoundingBox::new(0.4, 0.2, 0.3, 0.5)),
            ],
            vec![],
            ts(),
        );

        assert_eq!(batch.observations.len(), 1);
        assert_eq!(batch.observations[0].label, "person");
        assert_eq!(batch.dropped_low_confidence, 1);
        assert_eq!(batch.dropped_malformed, 0);
    }

    #[test]
    fn test_malformed_bbox_is_discarded() {
        let normalizer = Normalizer::default();
        let batch = normalizer.normalize(
            vec![
                detection("chair", 0.9, BoundingBox::new(f32::NAN, 0.1, 0.2, 0.2)),
                detection("door", 0.9, BoundingBox::new(1.2, 0.1, 0.2, 0.2)),
                detection("stairs", 0.9, BoundingBox::new(0.1, 0.1, 0.0, 0.2)),
            ],
            vec![],
            ts(),
        );

        assert!(batch.observations.is_empty());
        assert_eq!(batch.dropped_malformed, 3);
    }

    #[test]
    fn test_out_of_range_confidence_is_malformed() {
        let normalizer = Normalizer::default();
        let batch = normalizer.normalize(
            vec![detection("chair", 1.3, BoundingBox::new(0.1, 0.1, 0.2, 0.2))],
            vec![text("hello", f32::NAN, BoundingBox::new(0.1, 0.1, 0.2, 0.2))],
            ts(),
        );

        assert!(batch.observations.is_empty());
        assert_eq!(batch.dropped_malformed, 2);
        assert_eq!(batch.dropped_low_confidence, 0);
    }

    #[test]
    fn test_empty_inputs_yield_empty_batch() {
        let normalizer = Normalizer::default();
        let batch = normalizer.normalize(vec![], vec![], ts());
        assert!(batch.observations.is_empty());
        assert_eq!(batch.dropped_low_confidence, 0);
        assert_eq!(batch.dropped_malformed, 0);
    }
}
