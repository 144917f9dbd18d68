//! Urgency scorer: a deterministic, explainable rule set that turns each
//! observation into a scored observation.
//!
//! No learned model, no randomness, no wall clock. The same input always
//! produces the same urgency, so every score can be traced back to the
//! category table and the box geometry.

use crate::observation::{Category, Observation, ObservationKind, ScoredObservation};
use std::cmp::Ordering;

/// Base urgency per category, before proximity and confidence.
pub const HAZARD_WEIGHT: f32 = 80.0;
pub const PERSON_WEIGHT: f32 = 60.0;
pub const SIGNAGE_WEIGHT: f32 = 50.0;
pub const TEXT_WEIGHT: f32 = 50.0;
pub const OBJECT_WEIGHT: f32 = 30.0;

/// Cap on the bounding-box-area proximity boost.
pub const PROXIMITY_BOOST_CAP: f32 = 30.0;

/// Flat bonus for an observation sitting directly ahead.
pub const CENTER_BIAS: f32 = 5.0;

/// Object labels that are immediate hazards to a walking user.
const HAZARD_LABELS: &[&str] = &[
    "stairs",
    "car",
    "truck",
    "bus",
    "train",
    "motorcycle",
    "bicycle",
    "fire",
    "knife",
];

/// Object labels that are signage rather than obstacles.
const SIGNAGE_LABELS: &[&str] = &["stop sign", "traffic light", "exit sign", "sign"];

/// Keywords that promote recognized text to signage urgency.
const SIGN_KEYWORDS: &[&str] = &[
    "exit",
    "entrance",
    "danger",
    "warning",
    "caution",
    "stop",
    "emergency",
    "no entry",
    "closed",
    "open",
    "stairs",
    "elevator",
];

/// Base weight for a category, from the fixed rule table.
pub fn category_weight(category: Category) -> f32 {
    match category {
        Category::Hazard => HAZARD_WEIGHT,
        Category::Person => PERSON_WEIGHT,
        Category::Signage => SIGNAGE_WEIGHT,
        Category::Text => TEXT_WEIGHT,
        Category::Object => OBJECT_WEIGHT,
    }
}

/// Derive the category of an observation from its kind and label.
///
/// Object labels go through a fixed lookup; unknown labels are generic
/// objects. Recognized text is signage when it carries an important-sign
/// keyword or looks like a short all-caps sign, plain text otherwise.
pub fn categorize(observation: &Observation) -> Category {
    match observation.kind {
        ObservationKind::Object => categorize_object(&observation.label),
        ObservationKind::Text => categorize_text(&observation.label),
    }
}

fn categorize_object(label: &str) -> Category {
    let label = label.to_lowercase();
    if HAZARD_LABELS.contains(&label.as_str()) {
        Category::Hazard
    } else if label == "person" {
        Category::Person
    } else if SIGNAGE_LABELS.contains(&label.as_str()) {
        Category::Signage
    } else {
        Category::Object
    }
}

fn categorize_text(text: &str) -> Category {
    let lower = text.to_lowercase();
    if SIGN_KEYWORDS.iter().any(|kw| lower.contains(kw)) {
        return Category::Signage;
    }
    // Short all-caps strings read like signs even without a known keyword
    let trimmed = text.trim();
    if !trimmed.is_empty()
        && trimmed.len() <= 20
        && trimmed.chars().any(|c| c.is_alphabetic())
        && !trimmed.chars().any(|c| c.is_lowercase())
    {
        return Category::Signage;
    }
    Category::Text
}

/// Score one observation.
///
/// `urgency = (category weight + proximity boost) × confidence`, plus a
/// flat center bias when the box sits directly ahead, clamped to [0,100].
/// The proximity boost is `min(30, area × 100)`: a bigger box is closer.
pub fn score(observation: Observation) -> ScoredObservation {
    let category = categorize(&observation);
    let boost = (observation.bbox.area() * 100.0).min(PROXIMITY_BOOST_CAP);
    let mut urgency = (category_weight(category) + boost) * observation.confidence;
    if observation.bbox.is_centered() {
        urgency += CENTER_BIAS;
    }
    let urgency = urgency.clamp(0.0, 100.0);

    ScoredObservation {
        observation,
        urgency,
        category,
    }
}

/// Score a whole cycle's observations, preserving input order.
///
/// Ranking happens in the composer, after deduplication has removed the
/// candidates that would otherwise consume ranking slots.
pub fn score_batch(observations: Vec<Observation>) -> Vec<ScoredObservation> {
    observations.into_iter().map(score).collect()
}

/// Announcement-priority comparator: urgency descending, then category
/// precedence, then larger box.
///
/// Used with a stable sort so full ties keep the original detection order.
pub fn compare(a: &ScoredObservation, b: &ScoredObservation) -> Ordering {
    b.urgency
        .partial_cmp(&a.urgency)
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.category.rank().cmp(&b.category.rank()))
        .then_with(|| {
            b.bbox()
                .area()
                .partial_cmp(&a.bbox().area())
                .unwrap_or(Ordering::Equal)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observation::BoundingBox;
    use chrono::Utc;

    fn object(label: &str, confidence: f32, bbox: BoundingBox) -> Observation {
        Observation::new(ObservationKind::Object, label, confidence, bbox, Utc::now())
    }

    fn text(content: &str, confidence: f32, bbox: BoundingBox) -> Observation {
        Observation::new(ObservationKind::Text, content, confidence, bbox, Utc::now())
    }

    #[test]
    fn test_object_label_lookup() {
        let bbox = BoundingBox::new(0.1, 0.1, 0.2, 0.2);
        assert_eq!(categorize(&object("stairs", 0.9, bbox)), Category::Hazard);
        assert_eq!(categorize(&object("CAR", 0.9, bbox)), Category::Hazard);
        assert_eq!(categorize(&object("person", 0.9, bbox)), Category::Person);
        assert_eq!(
            categorize(&object("stop sign", 0.9, bbox)),
            Category::Signage
        );
        // Unknown labels are generic objects
        assert_eq!(categorize(&object("zebra", 0.9, bbox)), Category::Object);
    }

    #[test]
    fn test_text_categorization() {
        let bbox = BoundingBox::new(0.1, 0.1, 0.2, 0.2);
        // Keyword match, regardless of case
        assert_eq!(categorize(&text("Fire exit", 0.9, bbox)), Category::Signage);
        // Short all-caps reads like a sign
        assert_eq!(categorize(&text("ROOM 204", 0.9, bbox)), Category::Signage);
        // Ordinary prose stays plain text
        assert_eq!(
            categorize(&text("welcome to the lobby", 0.9, bbox)),
            Category::Text
        );
        // Long all-caps strings are not treated as signs
        assert_eq!(
            categorize(&text("THIS IS A VERY LONG BANNER TEXT", 0.9, bbox)),
            Category::Text
        );
    }

    #[test]
    fn test_urgency_formula() {
        // Off-center chair: (30 + 0.09 * 100) * 0.9 = 35.1, no bias
        let scored = score(object("chair", 0.9, BoundingBox::new(0.0, 0.1, 0.3, 0.3)));
        assert!((scored.urgency - 35.1).abs() < 1e-4);

        // Centered person: (60 + 25) * 0.8 + 5 = 73
        let scored = score(object("person", 0.8, BoundingBox::new(0.25, 0.3, 0.5, 0.5)));
        assert_eq!(scored.category, Category::Person);
        assert!((scored.urgency - 73.0).abs() < 1e-4);
    }

    #[test]
    fn test_proximity_boost_is_capped() {
        // Full-frame box: area 1.0 would boost 100 without the cap
        let scored = score(object(
            "chair",
            1.0,
            BoundingBox::new(0.001, 0.001, 0.998, 0.998),
        ));
        // (30 + 30) * 1.0 + 5 (centered) = 65
        assert!((scored.urgency - 65.0).abs() < 0.1);
    }

    #[test]
    fn test_urgency_stays_in_range() {
        let boxes = [
            BoundingBox::new(0.0, 0.0, 1.0, 1.0),
            BoundingBox::new(0.45, 0.45, 0.1, 0.1),
            BoundingBox::new(0.9, 0.9, 0.1, 0.1),
        ];
        for label in ["stairs", "person", "stop sign", "chair"] {
            for bbox in boxes {
                for confidence in [0.0, 0.4, 1.0] {
                    let scored = score(object(label, confidence, bbox));
                    assert!(
                        (0.0..=100.0).contains(&scored.urgency),
                        "{} conf {} -> {}",
                        label,
                        confidence,
                        scored.urgency
                    );
                }
            }
        }
    }

    #[test]
    fn test_person_outranks_confident_chair() {
        let chair = score(object("chair", 0.9, BoundingBox::new(0.1, 0.1, 0.3, 0.3)));
        let person = score(object("person", 0.8, BoundingBox::new(0.4, 0.3, 0.5, 0.5)));
        assert!(person.urgency > chair.urgency);
        assert_eq!(compare(&person, &chair), Ordering::Less);
    }

    #[test]
    fn test_tie_break_prefers_higher_category() {
        // Crafted equal urgency: hazard (80+20)*0.5 = 50, person (60+20)*0.625 = 50
        let hazard = score(object("car", 0.5, BoundingBox::new(0.0, 0.1, 0.5, 0.4)));
        let person = score(object("person", 0.625, BoundingBox::new(0.0, 0.5, 0.5, 0.4)));
        assert!((hazard.urgency - person.urgency).abs() < 1e-4);
        assert_eq!(compare(&hazard, &person), Ordering::Less);
        assert_eq!(compare(&person, &hazard), Ordering::Greater);
    }

    #[test]
    fn test_tie_break_prefers_larger_box() {
        // Same category, same urgency via matched confidence, different area
        let near = score(object("chair", 0.5, BoundingBox::new(0.0, 0.1, 0.5, 0.4)));
        let far_conf = (30.0 + 20.0) * 0.5 / (30.0 + 10.0);
        let far = score(object(
            "chair",
            far_conf,
            BoundingBox::new(0.0, 0.1, 0.5, 0.2),
        ));
        assert!((near.urgency - far.urgency).abs() < 1e-4);
        assert_eq!(compare(&near, &far), Ordering::Less);
    }

    #[test]
    fn test_batch_preserves_input_order() {
        let observations = vec![
            object("chair", 0.5, BoundingBox::new(0.1, 0.1, 0.2, 0.2)),
            object("stairs", 0.9, BoundingBox::new(0.3, 0.3, 0.4, 0.4)),
            text("EXIT", 0.8, BoundingBox::new(0.6, 0.1, 0.2, 0.1)),
        ];
        let scored = score_batch(observations);
        let labels: Vec<&str> = scored.iter().map(|s| s.label()).collect();
        assert_eq!(labels, vec!["chair", "stairs", "EXIT"]);
    }
}
