#![allow(clippy::cast_precision_loss)] // Throughput is a float by nature

//! Bounded event log and derived performance counters

use chrono::{DateTime, Utc};
use dlmon_config::MetricsConfig;
use dlmon_types::{
    DeadlockCycle, DeadlockRecord, EventKind, EventLog, EventRecord, MetricsSnapshot, ProcessId,
    SystemSnapshot,
};
use std::collections::VecDeque;
use std::time::{Duration, Instant};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Default)]
struct Counters {
    requests_processed: u64,
    requests_queued: u64,
    requests_denied: u64,
    auto_grants: u64,
    releases: u64,
    deadlocks_detected: u64,
    deadlocks_resolved: u64,
    ticks: u64,
    tick_failures: u64,
}

/// Observes ledger events and keeps the counters callers read
///
/// Events and deadlock history live in fixed-capacity ring buffers; the
/// oldest entry is evicted when a buffer is full.
#[derive(Debug, Clone)]
pub struct MetricsRecorder {
    events: VecDeque<EventRecord>,
    event_capacity: usize,
    deadlocks: VecDeque<DeadlockRecord>,
    deadlock_capacity: usize,
    latency_window: usize,
    counters: Counters,
    clock: Instant,
    started_at: DateTime<Utc>,
}

impl MetricsRecorder {
    #[must_use]
    pub fn new(config: &MetricsConfig) -> Self {
        let event_capacity = config.event_log_capacity.max(1);
        let deadlock_capacity = config.deadlock_history_capacity.max(1);
        Self {
            events: VecDeque::with_capacity(event_capacity),
            event_capacity,
            deadlocks: VecDeque::with_capacity(deadlock_capacity),
            deadlock_capacity,
            latency_window: config.latency_window.max(1),
            counters: Counters::default(),
            clock: Instant::now(),
            started_at: Utc::now(),
        }
    }

    /// Log an event and update the counter it feeds
    pub fn observe(&mut self, record: &EventRecord) {
        let counter = match record.kind {
            EventKind::Grant => &mut self.counters.requests_processed,
            EventKind::Wait => &mut self.counters.requests_queued,
            EventKind::AutoGrant => &mut self.counters.auto_grants,
            EventKind::Release => &mut self.counters.releases,
            EventKind::DeadlockDetected => &mut self.counters.deadlocks_detected,
            EventKind::Resolution => &mut self.counters.deadlocks_resolved,
        };
        *counter += 1;

        if self.events.len() >= self.event_capacity {
            self.events.pop_front();
        }
        self.events.push_back(record.clone());
    }

    pub fn observe_all<'a>(&mut self, records: impl IntoIterator<Item = &'a EventRecord>) {
        for record in records {
            self.observe(record);
        }
    }

    /// Denials are not ledger events; they only move a counter
    pub fn record_denial(&mut self) {
        self.counters.requests_denied += 1;
    }

    /// Append a detected cycle to the deadlock history
    pub fn record_deadlock(&mut self, cycle: DeadlockCycle, victim: Option<ProcessId>) {
        if self.deadlocks.len() >= self.deadlock_capacity {
            self.deadlocks.pop_front();
        }
        self.deadlocks.push_back(DeadlockRecord {
            timestamp: Utc::now(),
            cycle,
            victim,
        });
    }

    pub fn record_tick(&mut self) {
        self.counters.ticks += 1;
    }

    pub fn record_tick_failure(&mut self) {
        self.counters.tick_failures += 1;
    }

    /// Restart the uptime clock used for throughput
    pub fn restart_clock(&mut self) {
        self.clock = Instant::now();
        self.started_at = Utc::now();
    }

    /// Mean response time over the most recent request-path events
    ///
    /// Releases and recovery records carry no request latency and are
    /// left out of the window.
    #[must_use]
    pub fn avg_response_time(&self) -> Duration {
        let (total, samples) = self
            .events
            .iter()
            .rev()
            .filter(|e| is_latency_sample(e.kind))
            .take(self.latency_window)
            .fold((Duration::ZERO, 0u32), |(total, n), e| {
                (total + e.response_time, n + 1)
            });
        if samples == 0 {
            return Duration::ZERO;
        }
        total / samples
    }

    #[must_use]
    pub fn uptime(&self) -> Duration {
        self.clock.elapsed()
    }

    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        let uptime = self.uptime();
        let c = self.counters;
        MetricsSnapshot {
            requests_processed: c.requests_processed,
            requests_queued: c.requests_queued,
            requests_denied: c.requests_denied,
            auto_grants: c.auto_grants,
            releases: c.releases,
            deadlocks_detected: c.deadlocks_detected,
            deadlocks_resolved: c.deadlocks_resolved,
            ticks: c.ticks,
            tick_failures: c.tick_failures,
            avg_response_time: self.avg_response_time(),
            throughput: c.requests_processed as f64 / uptime.as_secs_f64().max(1.0),
            uptime,
        }
    }

    /// Logged events, oldest first
    pub fn events(&self) -> impl Iterator<Item = &EventRecord> {
        self.events.iter()
    }

    /// Deadlock history, oldest first
    pub fn deadlock_history(&self) -> impl Iterator<Item = &DeadlockRecord> {
        self.deadlocks.iter()
    }

    #[must_use]
    pub fn event_log(&self, session_id: Uuid, final_state: SystemSnapshot) -> EventLog {
        EventLog {
            session_id,
            started_at: self.started_at,
            captured_at: Utc::now(),
            events: self.events.iter().cloned().collect(),
            deadlock_history: self.deadlocks.iter().cloned().collect(),
            metrics: self.snapshot(),
            final_state,
            total_events: self.events.len(),
        }
    }

    /// Drop all history and counters and restart the clock
    pub fn reset(&mut self) {
        self.events.clear();
        self.deadlocks.clear();
        self.counters = Counters::default();
        self.restart_clock();
    }
}

fn is_latency_sample(kind: EventKind) -> bool {
    matches!(
        kind,
        EventKind::Grant | EventKind::Wait | EventKind::AutoGrant
    )
}
