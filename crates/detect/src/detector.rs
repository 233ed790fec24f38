//! Throttled detector state

use crate::dfs::find_cycle;
use dlmon_ledger::{ResourceLedger, WaitForGraph};
use dlmon_types::DeadlockCycle;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// Default minimum time between two scans
pub const DEFAULT_MIN_INTERVAL: Duration = Duration::from_millis(100);

/// Result of a detection call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Detection {
    NoCycle,
    Cycle(DeadlockCycle),
}

impl Detection {
    #[must_use]
    pub fn is_cycle(&self) -> bool {
        matches!(self, Self::Cycle(_))
    }

    #[must_use]
    pub fn cycle(&self) -> Option<&DeadlockCycle> {
        match self {
            Self::Cycle(cycle) => Some(cycle),
            Self::NoCycle => None,
        }
    }

    #[must_use]
    pub fn into_cycle(self) -> Option<DeadlockCycle> {
        match self {
            Self::Cycle(cycle) => Some(cycle),
            Self::NoCycle => None,
        }
    }
}

/// Throttled cycle detector
#[derive(Debug, Clone)]
pub struct CycleDetector {
    min_interval: Duration,
    last_scan: Option<Instant>,
    scans: u64,
    throttled: u64,
}

impl CycleDetector {
    #[must_use]
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_scan: None,
            scans: 0,
            throttled: 0,
        }
    }

    /// Scan the ledger unless the previous scan was too recent
    pub fn detect(&mut self, ledger: &ResourceLedger) -> Detection {
        self.detect_at(ledger, Instant::now())
    }

    /// Same as [`CycleDetector::detect`] with an explicit clock reading
    ///
    /// A scan runs when at least the minimum interval has elapsed since the
    /// previous one. The first scan after construction or reset always runs.
    pub fn detect_at(&mut self, ledger: &ResourceLedger, now: Instant) -> Detection {
        if let Some(last) = self.last_scan {
            if now.saturating_duration_since(last) < self.min_interval {
                self.throttled += 1;
                trace!("detection throttled");
                return Detection::NoCycle;
            }
        }
        self.last_scan = Some(now);
        self.scans += 1;

        if ledger.processes().filter(|p| p.is_waiting()).take(2).count() < 2 {
            return Detection::NoCycle;
        }

        let graph = WaitForGraph::build(ledger);
        match find_cycle(&graph) {
            Some(cycle) => {
                debug!(%cycle, edges = graph.edge_count(), "wait cycle found");
                Detection::Cycle(cycle)
            }
            None => Detection::NoCycle,
        }
    }

    /// Forget the previous scan so the next call is never throttled
    pub fn reset(&mut self) {
        self.last_scan = None;
        self.scans = 0;
        self.throttled = 0;
    }

    #[must_use]
    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    pub fn set_min_interval(&mut self, min_interval: Duration) {
        self.min_interval = min_interval;
    }

    /// Number of scans that actually ran
    #[must_use]
    pub fn scans(&self) -> u64 {
        self.scans
    }

    /// Number of calls answered by the throttle
    #[must_use]
    pub fn throttled(&self) -> u64 {
        self.throttled
    }
}

impl Default for CycleDetector {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_INTERVAL)
    }
}
