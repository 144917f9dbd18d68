//! Shared utilities.

pub mod perf;

pub use perf::{Stopwatch, TimingTracker};
