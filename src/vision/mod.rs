//! Collaborator contracts for the capture side of the pipeline.
//!
//! The engine never inspects pixels or runs models itself. It hands an
//! opaque [`Frame`] to the detector and OCR collaborators and consumes
//! their raw results; everything past that boundary is out of scope.

pub mod worker;

use crate::observation::BoundingBox;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub use worker::VisionWorker;

/// One captured camera frame. Opaque to the engine; cheap to clone.
#[derive(Debug, Clone)]
pub struct Frame {
    pub data: Arc<Vec<u8>>,
    pub width: u32,
    pub height: u32,
}

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32) -> Self {
        Self {
            data: Arc::new(data),
            width,
            height,
        }
    }
}

/// Raw object-detector output for one frame, before validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawDetection {
    pub label: String,
    pub confidence: f32,
    pub bbox: BoundingBox,
}

/// Raw OCR output for one frame, before validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawText {
    pub text: String,
    pub confidence: f32,
    pub bbox: BoundingBox,
}

/// Produces one frame per capture request.
///
/// Failure (no camera, read error) is an empty-observation cycle for the
/// caller, never fatal.
pub trait FrameSource: Send {
    fn capture(&mut self) -> Result<Frame>;
}

/// Object-detection collaborator. May return empty; may be slow, in which
/// case the session treats it as "no result" for the cycle.
pub trait ObjectDetector: Send {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<RawDetection>>;
}

/// OCR collaborator. Same contract as the detector; only invoked on
/// sampled cycles.
pub trait OcrEngine: Send {
    fn recognize(&mut self, frame: &Frame) -> Result<Vec<RawText>>;
}
