//! Cycle timing instrumentation.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Tracks cycle latencies over a sliding window.
#[derive(Debug)]
pub struct TimingTracker {
    samples: VecDeque<Duration>,
    max_samples: usize,
}

impl TimingTracker {
    pub fn new(max_samples: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(max_samples),
            max_samples,
        }
    }

    pub fn record(&mut self, duration: Duration) {
        if self.samples.len() >= self.max_samples {
            self.samples.pop_front();
        }
        self.samples.push_back(duration);
    }

    pub fn average(&self) -> Duration {
        if self.samples.is_empty() {
            return Duration::ZERO;
        }
        let total: Duration = self.samples.iter().sum();
        total / self.samples.len() as u32
    }

    pub fn min(&self) -> Duration {
        self.samples.iter().min().copied().unwrap_or(Duration::ZERO)
    }

    pub fn max(&self) -> Duration {
        self.samples.iter().max().copied().unwrap_or(Duration::ZERO)
    }

    pub fn count(&self) -> usize {
        self.samples.len()
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }
}

/// A simple stopwatch with labeled split times, used to attribute a
/// cycle's latency to its stages.
#[derive(Debug)]
pub struct Stopwatch {
    start: Instant,
    splits: Vec<(String, Duration)>,
}

impl Stopwatch {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
            splits: Vec::new(),
        }
    }

    /// Record the elapsed time so far under a label.
    pub fn split(&mut self, label: impl Into<String>) {
        self.splits.push((label.into(), self.start.elapsed()));
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }

    pub fn splits(&self) -> &[(String, Duration)] {
        &self.splits
    }
}
