//! Session configuration: validated at construction and on every runtime
//! update, so an invalid option can never reach a running session.

use crate::dedup::{DEFAULT_ESCALATION_MARGIN, DEFAULT_RECORD_CAPACITY, DEFAULT_WINDOW_SECONDS};
use crate::narration::{Language, DEFAULT_MAX_SPOKEN_ITEMS, DEFAULT_PAUSE_MARKER};
use crate::observation::DEFAULT_MIN_CONFIDENCE;
use crate::{HeraldError, Result};
use std::time::Duration;

/// Allowed capture interval range, in seconds.
pub const MIN_CAPTURE_INTERVAL_SECONDS: u64 = 1;
pub const MAX_CAPTURE_INTERVAL_SECONDS: u64 = 10;

/// Runtime configuration for one narration session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Seconds between timer-driven cycles, 1–10.
    pub capture_interval_seconds: u64,

    /// Active narration language.
    pub language: Language,

    /// Fraction of cycles that run OCR, 0.0–1.0.
    pub ocr_sample_rate: f32,

    /// Maximum spoken items per cycle, at least 1.
    pub max_spoken_items: usize,

    /// Minimum confidence for an entry to enter the pipeline.
    pub min_confidence: f32,

    /// Rolling suppression window for repeat announcements.
    pub suppression_window_seconds: u64,

    /// Urgency increase required to re-announce inside the window.
    pub escalation_margin: f32,

    /// Bound on retained announcement records.
    pub record_capacity: usize,

    /// Deadline for collaborator results; `None` means 2× the interval.
    pub detection_timeout_ms: Option<u64>,

    /// Pause inserted between sentences within one utterance.
    pub pause_marker: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            capture_interval_seconds: 3,
            language: Language::En,
            ocr_sample_rate: 0.3,
            max_spoken_items: DEFAULT_MAX_SPOKEN_ITEMS,
            min_confidence: DEFAULT_MIN_CONFIDENCE,
            suppression_window_seconds: DEFAULT_WINDOW_SECONDS as u64,
            escalation_margin: DEFAULT_ESCALATION_MARGIN,
            record_capacity: DEFAULT_RECORD_CAPACITY,
            detection_timeout_ms: None,
            pause_marker: DEFAULT_PAUSE_MARKER.to_string(),
        }
    }
}

impl SessionConfig {
    pub fn with_interval(mut self, seconds: u64) -> Self {
        self.capture_interval_seconds = seconds;
        self
    }

    pub fn with_language(mut self, language: Language) -> Self {
        self.language = language;
        self
    }

    pub fn with_ocr_sample_rate(mut self, rate: f32) -> Self {
        self.ocr_sample_rate = rate;
        self
    }

    pub fn with_max_spoken_items(mut self, max_items: usize) -> Self {
        self.max_spoken_items = max_items;
        self
    }

    pub fn with_min_confidence(mut self, min_confidence: f32) -> Self {
        self.min_confidence = min_confidence;
        self
    }

    pub fn with_suppression_window(mut self, seconds: u64) -> Self {
        self.suppression_window_seconds = seconds;
        self
    }

    pub fn with_escalation_margin(mut self, margin: f32) -> Self {
        self.escalation_margin = margin;
        self
    }

    pub fn with_detection_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.detection_timeout_ms = Some(timeout_ms);
        self
    }

    /// Deadline for collecting collaborator results in one cycle.
    pub fn detection_deadline(&self) -> Duration {
        match self.detection_timeout_ms {
            Some(ms) => Duration::from_millis(ms),
            None => Duration::from_secs(self.capture_interval_seconds * 2),
        }
    }

    pub fn capture_interval(&self) -> Duration {
        Duration::from_secs(self.capture_interval_seconds)
    }

    /// Validate the configuration. Rejection happens here, synchronously,
    /// never mid-session.
    pub fn validate(&self) -> Result<()> {
        if !(MIN_CAPTURE_INTERVAL_SECONDS..=MAX_CAPTURE_INTERVAL_SECONDS)
            .contains(&self.capture_interval_seconds)
        {
            return Err(HeraldError::Configuration(format!(
                "capture interval must be {}-{} seconds, got {}",
                MIN_CAPTURE_INTERVAL_SECONDS,
                MAX_CAPTURE_INTERVAL_SECONDS,
                self.capture_interval_seconds
            )));
        }
        if self.ocr_sample_rate.is_nan() || !(0.0..=1.0).contains(&self.ocr_sample_rate) {
            return Err(HeraldError::Configuration(format!(
                "OCR sample rate must be in [0,1], got {}",
                self.ocr_sample_rate
            )));
        }
        if self.max_spoken_items == 0 {
            return Err(HeraldError::Configuration(
                "max spoken items must be at least 1".to_string(),
            ));
        }
        if self.min_confidence.is_nan() || !(0.0..=1.0).contains(&self.min_confidence) {
            return Err(HeraldError::Configuration(format!(
                "minimum confidence must be in [0,1], got {}",
                self.min_confidence
            )));
        }
        if self.suppression_window_seconds == 0 {
            return Err(HeraldError::Configuration(
                "suppression window must be positive".to_string(),
            ));
        }
        if self.escalation_margin.is_nan() || self.escalation_margin < 0.0 {
            return Err(HeraldError::Configuration(format!(
                "escalation margin must be non-negative, got {}",
                self.escalation_margin
            )));
        }
        if self.record_capacity == 0 {
            return Err(HeraldError::Configuration(
                "record capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Runtime update to a running session. Unset fields keep their value.
#[derive(Debug, Clone, Default)]
pub struct ConfigUpdate {
    pub capture_interval_seconds: Option<u64>,
    pub language: Option<Language>,
    pub ocr_sample_rate: Option<f32>,
    pub max_spoken_items: Option<usize>,
}

impl ConfigUpdate {
    pub fn interval(mut self, seconds: u64) -> Self {
        self.capture_interval_seconds = Some(seconds);
        self
    }

    pub fn language(mut self, language: Language) -> Self {
        self.language = Some(language);
        self
    }

    pub fn ocr_sample_rate(mut self, rate: f32) -> Self {
        self.ocr_sample_rate = Some(rate);
        self
    }

    pub fn max_spoken_items(mut self, max_items: usize) -> Self {
        self.max_spoken_items = Some(max_items);
        self
    }

    /// Merge into an existing configuration, producing the candidate the
    /// session will validate before applying.
    pub fn apply(&self, mut config: SessionConfig) -> SessionConfig {
        if let Some(seconds) = self.capture_interval_seconds {
            config.capture_interval_seconds = seconds;
        }
        if let Some(language) = &self.language {
            config.language = language.clone();
        }
        if let Some(rate) = self.ocr_sample_rate {
            config.ocr_sample_rate = rate;
        }
        if let Some(max_items) = self.max_spoken_items {
            config.max_spoken_items = max_items;
        }
        config
    }

    /// Range-check the provided options without a base configuration.
    /// Lets callers reject a bad update before it crosses a channel.
    pub fn validate(&self) -> Result<()> {
        self.apply(SessionConfig::default()).validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(SessionConfig::default().validate().is_ok());
    }

    #[test]
    fn test_interval_bounds_are_enforced() {
        assert!(SessionConfig::default().with_interval(0).validate().is_err());
        assert!(SessionConfig::default().with_interval(11).validate().is_err());
        assert!(SessionConfig::default().with_interval(1).validate().is_ok());
        assert!(SessionConfig::default().with_interval(10).validate().is_ok());
    }

    #[test]
    fn test_rate_and_items_bounds() {
        assert!(SessionConfig::default()
            .with_ocr_sample_rate(1.5)
            .validate()
            .is_err());
        assert!(SessionConfig::default()
            .with_ocr_sample_rate(f32::NAN)
            .validate()
            .is_err());
        assert!(SessionConfig::default()
            .with_max_spoken_items(0)
            .validate()
            .is_err());
    }

    #[test]
    fn test_detection_deadline_defaults_to_twice_interval() {
        let config = SessionConfig::default().with_interval(4);
        assert_eq!(config.detection_deadline(), Duration::from_secs(8));

        let config = config.with_detection_timeout_ms(500);
        assert_eq!(config.detection_deadline(), Duration::from_millis(500));
    }

    #[test]
    fn test_update_merges_only_set_fields() {
        let config = SessionConfig::default();
        let update = ConfigUpdate::default()
            .interval(5)
            .language(Language::Hi);

        let merged = update.apply(config.clone());
        assert_eq!(merged.capture_interval_seconds, 5);
        assert_eq!(merged.language, Language::Hi);
        assert_eq!(merged.ocr_sample_rate, config.ocr_sample_rate);
        assert_eq!(merged.max_spoken_items, config.max_spoken_items);
    }

    #[test]
    fn test_update_validation_catches_bad_options() {
        assert!(ConfigUpdate::default().interval(20).validate().is_err());
        assert!(ConfigUpdate::default().ocr_sample_rate(-0.1).validate().is_err());
        assert!(ConfigUpdate::default().max_spoken_items(0).validate().is_err());
        assert!(ConfigUpdate::default().interval(2).validate().is_ok());
    }
}
