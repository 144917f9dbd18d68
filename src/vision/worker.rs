//! Worker-thread plumbing that isolates slow collaborators from the cycle.
//!
//! Each detector and OCR collaborator lives on its own long-lived thread,
//! fed one sequence-tagged request per cycle. The cycle collects with a
//! deadline; a collaborator that blows the deadline costs this cycle its
//! results for that source, nothing more. A stale result arriving later is
//! discarded by sequence number.

use crate::vision::Frame;
use crate::{HeraldError, Result};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

enum WorkerCommand {
    Process { seq: u64, frame: Frame },
    Shutdown,
}

struct WorkResult<R> {
    seq: u64,
    outcome: Result<Vec<R>>,
}

/// A collaborator running on its own thread, driven per cycle.
pub struct VisionWorker<R: Send + 'static> {
    name: &'static str,
    command_tx: Sender<WorkerCommand>,
    result_rx: Receiver<WorkResult<R>>,
    handle: Option<JoinHandle<()>>,
}

impl<R: Send + 'static> VisionWorker<R> {
    /// Spawn a worker that runs `op` on every submitted frame.
    pub fn spawn<F>(name: &'static str, mut op: F) -> Result<Self>
    where
        F: FnMut(&Frame) -> Result<Vec<R>> + Send + 'static,
    {
        let (command_tx, command_rx) = bounded::<WorkerCommand>(4);
        let (result_tx, result_rx) = bounded::<WorkResult<R>>(4);

        let handle = thread::Builder::new()
            .name(format!("herald-{}", name))
            .spawn(move || loop {
                match command_rx.recv() {
                    Ok(WorkerCommand::Process { seq, frame }) => {
                        let outcome = op(&frame);
                        if result_tx.send(WorkResult { seq, outcome }).is_err() {
                            break;
                        }
                    }
                    Ok(WorkerCommand::Shutdown) | Err(_) => break,
                }
            })
            .map_err(|e| HeraldError::Channel(format!("Failed to spawn {} worker: {}", name, e)))?;

        Ok(Self {
            name,
            command_tx,
            result_rx,
            handle: Some(handle),
        })
    }

    /// Submit one frame for processing under the given cycle sequence.
    pub fn submit(&self, seq: u64, frame: Frame) -> Result<()> {
        self.command_tx
            .send(WorkerCommand::Process { seq, frame })
            .map_err(|_| HeraldError::Channel(format!("{} worker is gone", self.name)))
    }

    /// Wait up to `deadline` for the result of cycle `seq`.
    ///
    /// Results tagged with an older sequence belong to a cycle that already
    /// timed out and are dropped on the floor.
    pub fn collect(&self, seq: u64, deadline: Duration) -> Result<Vec<R>> {
        let deadline_at = Instant::now() + deadline;
        loop {
            let remaining = deadline_at.saturating_duration_since(Instant::now());
            match self.result_rx.recv_timeout(remaining) {
                Ok(result) if result.seq == seq => return result.outcome,
                Ok(stale) => {
                    debug!(
                        "Discarding stale {} result for cycle {} (waiting on {})",
                        self.name, stale.seq, seq
                    );
                }
                Err(RecvTimeoutError::Timeout) => {
                    return Err(HeraldError::DetectionTimeout(format!(
                        "{} exceeded {:?} for cycle {}",
                        self.name, deadline, seq
                    )));
                }
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(HeraldError::Channel(format!(
                        "{} worker is gone",
                        self.name
                    )));
                }
            }
        }
    }
}

impl<R: Send + 'static> Drop for VisionWorker<R> {
    fn drop(&mut self) {
        let _ = self.command_tx.send(WorkerCommand::Shutdown);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("{} worker panicked during shutdown", self.name);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vision::RawDetection;
    use crate::observation::BoundingBox;

    fn frame() -> Frame {
        Frame::new(vec![0u8; 16], 4, 4)
    }

    fn detection(label: &str) -> RawDetection {
        RawDetection {
            label: label.to_string(),
            confidence: 0.9,
            bbox: BoundingBox::new(0.1, 0.1, 0.2, 0.2),
        }
    }

    #[test]
    fn test_submit_and_collect() {
        let worker =
            VisionWorker::spawn("detector", |_frame| Ok(vec![detection("chair")])).unwrap();

        worker.submit(1, frame()).unwrap();
        let results = worker.collect(1, Duration::from_secs(1)).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].label, "chair");
    }

    #[test]
    fn test_deadline_exceeded_is_a_timeout() {
        let worker = VisionWorker::spawn("detector", |_frame| {
            thread::sleep(Duration::from_millis(200));
            Ok(vec![detection("chair")])
        })
        .unwrap();

        worker.submit(1, frame()).unwrap();
        let result = worker.collect(1, Duration::from_millis(20));
        assert!(matches!(result, Err(HeraldError::DetectionTimeout(_))));
    }

    #[test]
    fn test_stale_results_are_discarded() {
        let worker =
            VisionWorker::spawn("detector", |f: &Frame| Ok(vec![detection(&format!("w{}", f.width))]))
                .unwrap();

        // The result for cycle 1 was never collected; cycle 2 must not see it
        worker.submit(1, Frame::new(vec![0u8; 1], 1, 1)).unwrap();
        worker.submit(2, Frame::new(vec![0u8; 4], 2, 2)).unwrap();

        let results = worker.collect(2, Duration::from_secs(1)).unwrap();
        assert_eq!(results[0].label, "w2");
    }

    #[test]
    fn test_collaborator_error_propagates() {
        let worker: VisionWorker<RawDetection> = VisionWorker::spawn("detector", |_frame| {
            Err(HeraldError::FrameCapture("lens cap on".into()))
        })
        .unwrap();

        worker.submit(1, frame()).unwrap();
        assert!(worker.collect(1, Duration::from_secs(1)).is_err());
    }
}
