//! Default values and environment variable names

pub const DEFAULT_TICK_INTERVAL_MS: u64 = 500;
pub const DEFAULT_DETECTION_THROTTLE_MS: u64 = 100;
pub const DEFAULT_METRICS_EVERY_TICKS: u64 = 10;

pub const DEFAULT_EVENT_LOG_CAPACITY: usize = 1000;
pub const DEFAULT_LATENCY_WINDOW: usize = 10;
pub const DEFAULT_DEADLOCK_HISTORY_CAPACITY: usize = 100;

pub const ENV_TICK_INTERVAL_MS: &str = "DLMON_TICK_INTERVAL_MS";
pub const ENV_DETECTION_THROTTLE_MS: &str = "DLMON_DETECTION_THROTTLE_MS";
pub const ENV_AUTO_RESOLVE: &str = "DLMON_AUTO_RESOLVE";
pub const ENV_VICTIM_POLICY: &str = "DLMON_VICTIM_POLICY";
pub const ENV_EVENT_LOG_CAPACITY: &str = "DLMON_EVENT_LOG_CAPACITY";
pub const ENV_OUTPUT: &str = "DLMON_OUTPUT";
