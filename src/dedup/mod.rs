//! Temporal deduplicator: suppresses repeat announcements across a rolling
//! window of capture cycles.
//!
//! Only a compact fingerprint of what was actually narrated survives from
//! one cycle to the next; the observations themselves die with their cycle.

use crate::observation::{BoundingBox, Category, NarrationUnit, ScoredObservation};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use tracing::debug;

/// Default rolling suppression window.
pub const DEFAULT_WINDOW_SECONDS: i64 = 30;

/// Default urgency increase required to re-announce inside the window.
pub const DEFAULT_ESCALATION_MARGIN: f32 = 15.0;

/// Default bound on retained announcement records.
pub const DEFAULT_RECORD_CAPACITY: usize = 64;

/// Compact repeat-announcement key: category, lowercased label, and the
/// 3×3 grid cell holding the box centroid.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint {
    pub category: Category,
    pub label: String,
    pub cell: (u8, u8),
}

impl Fingerprint {
    pub fn of(scored: &ScoredObservation) -> Self {
        Self {
            category: scored.category,
            label: scored.label().to_lowercase(),
            cell: grid_cell(scored.bbox()),
        }
    }
}

/// Quantize a box centroid into a 3×3 grid over the frame.
fn grid_cell(bbox: &BoundingBox) -> (u8, u8) {
    let col = ((bbox.center_x() * 3.0) as i32).clamp(0, 2) as u8;
    let row = ((bbox.center_y() * 3.0) as i32).clamp(0, 2) as u8;
    (col, row)
}

/// What was last said for one fingerprint, and when.
#[derive(Debug, Clone, Copy)]
pub struct AnnouncementRecord {
    pub urgency: f32,
    pub announced_at: DateTime<Utc>,
}

/// Survivors of one deduplication pass plus the suppression count.
#[derive(Debug, Clone)]
pub struct FilterOutcome {
    pub survivors: Vec<ScoredObservation>,
    pub suppressed: u32,
}

/// Session-scoped rolling set of announcement records.
///
/// Retention is FIFO by announcement time: an old record ages out of the
/// window whether or not its fingerprint keeps matching, and the capacity
/// bound evicts the oldest-announced records first.
#[derive(Debug)]
pub struct Deduplicator {
    records: HashMap<Fingerprint, AnnouncementRecord>,
    window: Duration,
    escalation_margin: f32,
    capacity: usize,
}

impl Deduplicator {
    pub fn new(window_seconds: i64, escalation_margin: f32, capacity: usize) -> Self {
        Self {
            records: HashMap::new(),
            window: Duration::seconds(window_seconds),
            escalation_margin,
            capacity,
        }
    }

    pub fn set_window_seconds(&mut self, window_seconds: i64) {
        self.window = Duration::seconds(window_seconds);
    }

    pub fn set_escalation_margin(&mut self, escalation_margin: f32) {
        self.escalation_margin = escalation_margin;
    }

    /// Drop observations whose fingerprint was announced within the window,
    /// unless their urgency escalated past the recorded one by the margin.
    ///
    /// Suppression leaves the existing record untouched; only `commit`
    /// writes records.
    pub fn filter(&mut self, scored: Vec<ScoredObservation>, now: DateTime<Utc>) -> FilterOutcome {
        self.evict_expired(now);

        let mut survivors = Vec::with_capacity(scored.len());
        let mut suppressed = 0u32;

        for observation in scored {
            let fingerprint = Fingerprint::of(&observation);
            match self.records.get(&fingerprint) {
                Some(record) if observation.urgency < record.urgency + self.escalation_margin => {
                    debug!(
                        "Suppressing repeat '{}' ({:.1} < {:.1} + {:.1})",
                        observation.label(),
                        observation.urgency,
                        record.urgency,
                        self.escalation_margin
                    );
                    suppressed += 1;
                }
                _ => survivors.push(observation),
            }
        }

        FilterOutcome {
            survivors,
            suppressed,
        }
    }

    /// Record the observations that were actually narrated this cycle.
    ///
    /// Last-write-wins per fingerprint: a re-announcement refreshes the
    /// timestamp and urgency of its existing record.
    pub fn commit(&mut self, units: &[NarrationUnit], now: DateTime<Utc>) {
        for unit in units {
            let fingerprint = Fingerprint::of(&unit.source);
            self.records.insert(
                fingerprint,
                AnnouncementRecord {
                    urgency: unit.source.urgency,
                    announced_at: now,
                },
            );
        }
        self.enforce_capacity();
    }

    /// Number of retained records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Forget everything. Useful between test scenarios.
    pub fn clear(&mut self) {
        self.records.clear();
    }

    fn evict_expired(&mut self, now: DateTime<Utc>) {
        let window = self.window;
        self.records
            .retain(|_, record| now - record.announced_at <= window);
    }

    fn enforce_capacity(&mut self) {
        if self.records.len() <= self.capacity {
            return;
        }
        // Oldest announcement goes first; the fingerprint itself breaks
        // timestamp ties deterministically.
        let mut entries: Vec<(Fingerprint, DateTime<Utc>)> = self
            .records
            .iter()
            .map(|(fp, record)| (fp.clone(), record.announced_at))
            .collect();
        entries.sort_by(|a, b| {
            a.1.cmp(&b.1)
                .then_with(|| a.0.label.cmp(&b.0.label))
                .then_with(|| a.0.category.rank().cmp(&b.0.category.rank()))
                .then_with(|| a.0.cell.cmp(&b.0.cell))
        });
        let excess = self.records.len() - self.capacity;
        for (fingerprint, _) in entries.into_iter().take(excess) {
            self.records.remove(&fingerprint);
        }
    }
}

impl Default for Deduplicator {
    fn default() -> Self {
        Self::new(
            DEFAULT_WINDOW_SECONDS,
            DEFAULT_ESCALATION_MARGIN,
            DEFAULT_RECORD_CAPACITY,
        )
    }
}
