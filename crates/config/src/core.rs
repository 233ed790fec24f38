//! Monitor and metrics configuration sections

use crate::constants::{
    DEFAULT_DEADLOCK_HISTORY_CAPACITY, DEFAULT_DETECTION_THROTTLE_MS,
    DEFAULT_EVENT_LOG_CAPACITY, DEFAULT_LATENCY_WINDOW, DEFAULT_METRICS_EVERY_TICKS,
    DEFAULT_TICK_INTERVAL_MS,
};
use dlmon_types::{OutputFormat, VictimPolicy};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// General configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    #[serde(default = "default_output_format")]
    pub default_output: OutputFormat,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            default_output: OutputFormat::Table,
        }
    }
}

/// Monitor loop and detection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Period of the background monitor loop
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    /// Minimum time between two full detection scans
    #[serde(default = "default_detection_throttle_ms")]
    pub detection_throttle_ms: u64,
    /// Terminate a victim automatically; when false cycles go to callbacks
    #[serde(default = "default_auto_resolve")]
    pub auto_resolve: bool,
    #[serde(default)]
    pub victim_policy: VictimPolicy,
    /// Emit a performance snapshot every N ticks (0 disables)
    #[serde(default = "default_metrics_every_ticks")]
    pub metrics_every_ticks: u64,
}

impl MonitorConfig {
    #[must_use]
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    #[must_use]
    pub fn detection_throttle(&self) -> Duration {
        Duration::from_millis(self.detection_throttle_ms)
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
            detection_throttle_ms: DEFAULT_DETECTION_THROTTLE_MS,
            auto_resolve: true,
            victim_policy: VictimPolicy::LowestPriority,
            metrics_every_ticks: DEFAULT_METRICS_EVERY_TICKS,
        }
    }
}

/// Event log and metrics configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Ring buffer capacity of the event log
    #[serde(default = "default_event_log_capacity")]
    pub event_log_capacity: usize,
    /// Number of recent events averaged for response time
    #[serde(default = "default_latency_window")]
    pub latency_window: usize,
    #[serde(default = "default_deadlock_history_capacity")]
    pub deadlock_history_capacity: usize,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            event_log_capacity: DEFAULT_EVENT_LOG_CAPACITY,
            latency_window: DEFAULT_LATENCY_WINDOW,
            deadlock_history_capacity: DEFAULT_DEADLOCK_HISTORY_CAPACITY,
        }
    }
}

// Default value functions for serde
fn default_output_format() -> OutputFormat {
    OutputFormat::Table
}

fn default_tick_interval_ms() -> u64 {
    DEFAULT_TICK_INTERVAL_MS
}

fn default_detection_throttle_ms() -> u64 {
    DEFAULT_DETECTION_THROTTLE_MS
}

fn default_auto_resolve() -> bool {
    true
}

fn default_metrics_every_ticks() -> u64 {
    DEFAULT_METRICS_EVERY_TICKS
}

fn default_event_log_capacity() -> usize {
    DEFAULT_EVENT_LOG_CAPACITY
}

fn default_latency_window() -> usize {
    DEFAULT_LATENCY_WINDOW
}

fn default_deadlock_history_capacity() -> usize {
    DEFAULT_DEADLOCK_HISTORY_CAPACITY
}
