//! Cycle orchestration: the session-scoped pipeline runner.
//!
//! A [`Session`] owns one narration pipeline end to end: configuration,
//! normalizer, deduplicator state, composer, dispatcher, and the
//! collaborator workers. `run_cycle` is synchronous and infallible — every
//! runtime failure is recovered into the cycle's stats, because degraded
//! narration beats a stopped loop.

pub mod config;
pub mod orchestrator;

pub use config::{ConfigUpdate, SessionConfig};
pub use orchestrator::{Orchestrator, OrchestratorCommand, OrchestratorEvent, OrchestratorHandle};

use crate::dedup::Deduplicator;
use crate::narration::{Composer, Language, TemplateSet};
use crate::observation::{NarrationUnit, Normalizer};
use crate::scoring;
use crate::speech::{SpeechBackend, SpeechDispatcher};
use crate::utils::perf::{Stopwatch, TimingTracker};
use crate::vision::{FrameSource, ObjectDetector, OcrEngine, RawDetection, RawText, VisionWorker};
use crate::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// How a cycle was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CycleMode {
    /// Timer-driven cycle; OCR runs on sampled cycles only.
    Continuous,
    /// Explicit "capture now" request; always runs OCR.
    SingleShot,
}

/// Recovered-error and filter counters for one cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleStats {
    pub raw_detections: u32,
    pub raw_texts: u32,
    pub dropped_low_confidence: u32,
    pub dropped_malformed: u32,
    pub suppressed: u32,
    pub detection_timeouts: u32,
    pub language_fallbacks: u32,
    pub dispatch_failures: u32,
    pub frame_failures: u32,
}

/// Per-stage timing for one cycle.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CycleTiming {
    pub started_at: Option<DateTime<Utc>>,
    pub capture_ms: u64,
    pub detect_ms: u64,
    pub pipeline_ms: u64,
    pub total_ms: u64,
}

/// The full output of one orchestration cycle.
///
/// Handed to the transport layer as-is (serde-serializable) and then
/// discarded; only announcement records survive into the next cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleResult {
    /// Monotonic cycle number within the session.
    pub sequence: u64,
    pub mode: CycleMode,
    /// Ranked narration, highest urgency first.
    pub units: Vec<NarrationUnit>,
    /// The single combined spoken string, `None` when nothing survived.
    pub utterance: Option<String>,
    /// Language actually used for composition.
    pub language: Language,
    /// Normalized observations that entered the scorer.
    pub observation_count: u32,
    pub stats: CycleStats,
    pub timing: CycleTiming,
}

/// Deterministic fractional-stride OCR sampler.
///
/// Accumulates the rate each continuous cycle and fires when it crosses
/// 1.0: rate 0.0 never samples, 1.0 samples every cycle, 0.3 roughly every
/// third — with no randomness, so cycle traces replay identically.
#[derive(Debug, Clone, Copy, Default)]
struct OcrSampler {
    accumulator: f32,
}

impl OcrSampler {
    fn tick(&mut self, rate: f32) -> bool {
        self.accumulator += rate;
        if self.accumulator >= 1.0 - 1e-6 {
            self.accumulator -= 1.0;
            true
        } else {
            false
        }
    }
}

/// One narration session: owns all pipeline state and the collaborators.
pub struct Session {
    config: SessionConfig,
    normalizer: Normalizer,
    dedup: Deduplicator,
    composer: Composer,
    dispatcher: SpeechDispatcher,
    frame_source: Box<dyn FrameSource>,
    detector: VisionWorker<RawDetection>,
    ocr: VisionWorker<RawText>,
    sampler: OcrSampler,
    sequence: u64,
    cycle_times: TimingTracker,
}

impl Session {
    /// Build a session around the four external collaborators.
    ///
    /// Fails only on invalid configuration or if a worker thread cannot
    /// be spawned.
    pub fn new(
        config: SessionConfig,
        frame_source: Box<dyn FrameSource>,
        mut object_detector: Box<dyn ObjectDetector>,
        mut ocr_engine: Box<dyn OcrEngine>,
        speech_backend: Box<dyn SpeechBackend>,
    ) -> Result<Self> {
        config.validate()?;

        let normalizer = Normalizer::new(config.min_confidence);
        let dedup = Deduplicator::new(
            config.suppression_window_seconds as i64,
            config.escalation_margin,
            config.record_capacity,
        );
        let composer = Composer::new(
            TemplateSet::builtin(),
            config.max_spoken_items,
            config.pause_marker.clone(),
        );
        let dispatcher = SpeechDispatcher::new(speech_backend);

        let detector = VisionWorker::spawn("detector", move |frame| object_detector.detect(frame))?;
        let ocr = VisionWorker::spawn("ocr", move |frame| ocr_engine.recognize(frame))?;

        info!(
            "Session ready: interval {}s, language {}, ocr rate {}",
            config.capture_interval_seconds, config.language, config.ocr_sample_rate
        );

        Ok(Self {
            config,
            normalizer,
            dedup,
            composer,
            dispatcher,
            frame_source,
            detector,
            ocr,
            sampler: OcrSampler::default(),
            sequence: 0,
            cycle_times: TimingTracker::new(32),
        })
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Register an additional narration language at runtime.
    pub fn register_language(&mut self, language: Language, pack: crate::narration::LanguagePack) {
        self.composer.templates_mut().register(language, pack);
    }

    /// Apply a validated runtime configuration update.
    ///
    /// Rejected updates leave the session untouched; this is the only
    /// synchronous error surface of a running session.
    pub fn configure(&mut self, update: ConfigUpdate) -> Result<()> {
        let merged = update.apply(self.config.clone());
        merged.validate()?;

        self.normalizer.set_min_confidence(merged.min_confidence);
        self.dedup
            .set_window_seconds(merged.suppression_window_seconds as i64);
        self.dedup.set_escalation_margin(merged.escalation_margin);
        self.composer.set_max_items(merged.max_spoken_items);
        info!(
            "Configuration updated: interval {}s, language {}, ocr rate {}, max items {}",
            merged.capture_interval_seconds,
            merged.language,
            merged.ocr_sample_rate,
            merged.max_spoken_items
        );
        self.config = merged;
        Ok(())
    }

    /// Run one full capture→detect→score→narrate→dispatch cycle.
    pub fn run_cycle(&mut self, mode: CycleMode) -> CycleResult {
        self.sequence += 1;
        let sequence = self.sequence;
        let now = Utc::now();
        let mut watch = Stopwatch::start();
        let mut stats = CycleStats::default();

        // Capture. A failed frame is an empty-observation cycle.
        let frame = match self.frame_source.capture() {
            Ok(frame) => Some(frame),
            Err(e) => {
                warn!("Frame capture failed: {}", e);
                stats.frame_failures += 1;
                None
            }
        };
        watch.split("capture");

        // Detection. OCR only on sampled cycles; an explicit capture-now
        // request reads the whole scene.
        let run_ocr = match mode {
            CycleMode::SingleShot => true,
            CycleMode::Continuous => self.sampler.tick(self.config.ocr_sample_rate),
        };
        let (detections, texts) = match &frame {
            Some(frame) => self.collect_detections(sequence, frame, run_ocr, &mut stats),
            None => (Vec::new(), Vec::new()),
        };
        watch.split("detect");
        stats.raw_detections = detections.len() as u32;
        stats.raw_texts = texts.len() as u32;

        // Normalize, score, deduplicate, compose.
        let batch = self.normalizer.normalize(detections, texts, now);
        stats.dropped_low_confidence = batch.dropped_low_confidence;
        stats.dropped_malformed = batch.dropped_malformed;
        let observation_count = batch.observations.len() as u32;

        let scored = scoring::score_batch(batch.observations);
        let outcome = self.dedup.filter(scored, now);
        stats.suppressed = outcome.suppressed;

        let composition = self.composer.compose(outcome.survivors, &self.config.language);
        if composition.language_fallback {
            stats.language_fallbacks += 1;
        }
        self.dedup.commit(&composition.units, now);

        // Dispatch. Silence is not an event: an empty cycle neither speaks
        // nor cancels ongoing speech.
        if let Some(utterance) = &composition.utterance {
            if let Err(e) = self.dispatcher.dispatch(utterance, &composition.language) {
                warn!("Speech dispatch failed: {}", e);
                stats.dispatch_failures += 1;
            }
        }

        let timing = self.finish_timing(now, watch);
        debug!(
            "Cycle {} ({:?}): {} observations, {} spoken, {} suppressed, {}ms",
            sequence,
            mode,
            observation_count,
            composition.units.len(),
            stats.suppressed,
            timing.total_ms
        );

        CycleResult {
            sequence,
            mode,
            units: composition.units,
            utterance: composition.utterance,
            language: composition.language,
            observation_count,
            stats,
            timing,
        }
    }

    /// Stop the session: cancel in-flight speech, keep announcement
    /// records (they die with the session, no persistence).
    pub fn stop(&mut self) {
        self.dispatcher.cancel_in_flight();
        info!(
            "Session stopped after {} cycles (avg {:?})",
            self.sequence,
            self.cycle_times.average()
        );
    }

    /// Number of retained announcement records, for diagnostics.
    pub fn record_count(&self) -> usize {
        self.dedup.len()
    }

    fn collect_detections(
        &mut self,
        sequence: u64,
        frame: &crate::vision::Frame,
        run_ocr: bool,
        stats: &mut CycleStats,
    ) -> (Vec<RawDetection>, Vec<RawText>) {
        let deadline = self.config.detection_deadline();

        let detector_pending = match self.detector.submit(sequence, frame.clone()) {
            Ok(()) => true,
            Err(e) => {
                warn!("Detector submit failed: {}", e);
                false
            }
        };
        let ocr_pending = run_ocr
            && match self.ocr.submit(sequence, frame.clone()) {
                Ok(()) => true,
                Err(e) => {
                    warn!("OCR submit failed: {}", e);
                    false
                }
            };

        let detections = if detector_pending {
            self.collect_one(&self.detector, sequence, deadline, "detector", stats)
        } else {
            Vec::new()
        };
        let texts = if ocr_pending {
            self.collect_one(&self.ocr, sequence, deadline, "ocr", stats)
        } else {
            Vec::new()
        };
        (detections, texts)
    }

    fn collect_one<R: Send + 'static>(
        &self,
        worker: &VisionWorker<R>,
        sequence: u64,
        deadline: std::time::Duration,
        name: &str,
        stats: &mut CycleStats,
    ) -> Vec<R> {
        match worker.collect(sequence, deadline) {
            Ok(results) => results,
            Err(crate::HeraldError::DetectionTimeout(msg)) => {
                warn!("{} timed out, proceeding without it: {}", name, msg);
                stats.detection_timeouts += 1;
                Vec::new()
            }
            Err(e) => {
                warn!("{} failed this cycle: {}", name, e);
                Vec::new()
            }
        }
    }

    fn finish_timing(&mut self, started_at: DateTime<Utc>, watch: Stopwatch) -> CycleTiming {
        let total = watch.elapsed();
        self.cycle_times.record(total);

        let splits = watch.splits();
        let capture_ms = splits
            .first()
            .map(|(_, d)| d.as_millis() as u64)
            .unwrap_or(0);
        let detect_end_ms = splits
            .get(1)
            .map(|(_, d)| d.as_millis() as u64)
            .unwrap_or(capture_ms);
        let total_ms = total.as_millis() as u64;

        CycleTiming {
            started_at: Some(started_at),
            capture_ms,
            detect_ms: detect_end_ms.saturating_sub(capture_ms),
            pipeline_ms: total_ms.saturating_sub(detect_end_ms),
            total_ms,
        }
    }
}
