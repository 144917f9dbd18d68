//! Demo binary: drives a short narration session against scripted
//! collaborators and logs what would be spoken.

use anyhow::Result;
use herald::narration::Language;
use herald::observation::BoundingBox;
use herald::session::{CycleMode, Session, SessionConfig};
use herald::speech::{SpeechBackend, SpeechHandle};
use herald::vision::{Frame, FrameSource, ObjectDetector, OcrEngine, RawDetection, RawText};
use std::collections::VecDeque;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

struct StaticCamera;

impl FrameSource for StaticCamera {
    fn capture(&mut self) -> herald::Result<Frame> {
        Ok(Frame::new(vec![0u8; 64], 8, 8))
    }
}

/// Plays back a fixed script of scenes, one per cycle.
struct ScriptedDetector {
    scenes: VecDeque<Vec<RawDetection>>,
}

impl ObjectDetector for ScriptedDetector {
    fn detect(&mut self, _frame: &Frame) -> herald::Result<Vec<RawDetection>> {
        Ok(self.scenes.pop_front().unwrap_or_default())
    }
}

struct ScriptedOcr {
    scenes: VecDeque<Vec<RawText>>,
}

impl OcrEngine for ScriptedOcr {
    fn recognize(&mut self, _frame: &Frame) -> herald::Result<Vec<RawText>> {
        Ok(self.scenes.pop_front().unwrap_or_default())
    }
}

/// Logs utterances instead of synthesizing them.
struct ConsoleSpeech;

impl SpeechBackend for ConsoleSpeech {
    fn speak(&mut self, text: &str, language: &Language) -> herald::Result<SpeechHandle> {
        info!("[speak:{}] {}", language, text);
        Ok(SpeechHandle::new())
    }

    fn cancel(&mut self, _handle: SpeechHandle) -> herald::Result<()> {
        info!("[speak] cancelled");
        Ok(())
    }

    fn is_speaking(&self, _handle: SpeechHandle) -> bool {
        false
    }
}

fn detection(label: &str, confidence: f32, bbox: BoundingBox) -> RawDetection {
    RawDetection {
        label: label.to_string(),
        confidence,
        bbox,
    }
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "herald=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting herald demo session");

    // Four scenes: approach a person, stairs appear, the stairs get
    // closer (escalation), then an exit sign.
    let detector = ScriptedDetector {
        scenes: VecDeque::from(vec![
            vec![detection("person", 0.85, BoundingBox::new(0.4, 0.3, 0.25, 0.5))],
            vec![
                detection("person", 0.85, BoundingBox::new(0.4, 0.3, 0.25, 0.5)),
                detection("stairs", 0.8, BoundingBox::new(0.35, 0.5, 0.2, 0.2)),
            ],
            vec![detection("stairs", 0.9, BoundingBox::new(0.25, 0.4, 0.5, 0.5))],
            vec![],
        ]),
    };
    let ocr = ScriptedOcr {
        scenes: VecDeque::from(vec![vec![RawText {
            text: "EXIT".to_string(),
            confidence: 0.75,
            bbox: BoundingBox::new(0.7, 0.1, 0.2, 0.1),
        }]]),
    };

    let config = SessionConfig::default().with_interval(1);
    let mut session = Session::new(
        config,
        Box::new(StaticCamera),
        Box::new(detector),
        Box::new(ocr),
        Box::new(ConsoleSpeech),
    )?;

    for cycle in 1..=4 {
        // The last cycle is a manual "capture now", which forces OCR
        let mode = if cycle == 4 {
            CycleMode::SingleShot
        } else {
            CycleMode::Continuous
        };
        let result = session.run_cycle(mode);
        match &result.utterance {
            Some(utterance) => info!("Cycle {}: \"{}\"", result.sequence, utterance),
            None => info!("Cycle {}: silence", result.sequence),
        }
    }

    session.stop();
    Ok(())
}
