//! Periodic progress reporting for long section scans.

use std::time::Instant;

/// Section scan stages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanStage {
    Edges,
    EdgeMarkers,
    EdgesReverse,
    Chunks,
    Nodes,
}

impl ScanStage {
    pub fn label(self) -> &'static str {
        match self {
            ScanStage::Edges => "edge scan",
            ScanStage::EdgeMarkers => "edge scan (pass1)",
            ScanStage::EdgesReverse => "edge scan (pass2)",
            ScanStage::Chunks => "chunk scan",
            ScanStage::Nodes => "node scan",
        }
    }
}

/// Counts records and logs a percentage every `interval` records.
#[derive(Debug)]
pub struct ScanProgress {
    stage: ScanStage,
    interval: u64,
    pending: u64,
    started: Instant,
}

impl ScanProgress {
    pub fn new(stage: ScanStage, interval: u64) -> Self {
        Self {
            stage,
            interval: interval.max(1),
            pending: 0,
            started: Instant::now(),
        }
    }

    /// Records one unit of work; `done`/`total` are only consulted when a
    /// report is due.
    pub fn tick(&mut self, done: u64, total: u64) {
        self.pending += 1;
        if self.pending >= self.interval {
            self.pending = 0;
            log::debug!("{}: {:.2}%", self.stage.label(), percent(done, total));
        }
    }

    pub fn finish(self) {
        log::debug!(
            "{}: 100.00% ({:.2?})",
            self.stage.label(),
            self.started.elapsed()
        );
    }
}

pub fn percent(done: u64, total: u64) -> f64 {
    if total == 0 {
        100.0
    } else {
        (done as f64 / total as f64) * 100.0
    }
}
