#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Real-time deadlock monitor
//!
//! [`DeadlockMonitor`] owns the resource ledger, the throttled cycle
//! detector, the recovery engine and the metrics recorder, and drives them
//! from an optional background loop on the tokio runtime.
//!
//! Each tick:
//! 1. scans for a wait cycle (subject to the detection throttle)
//! 2. terminates a victim, or hands the cycle to registered callbacks when
//!    auto-resolve is off or recovery fails
//! 3. grants freed resources to queued waiters, first-in first-out per
//!    resource
//!
//! A tick that starts while another is still running is skipped.

mod callbacks;
mod monitor;
mod recorder;
mod report;
mod runner;

pub use callbacks::DeadlockCallback;
pub use dlmon_detect::Detection;
pub use dlmon_safety::SafetyAssessment;
pub use monitor::DeadlockMonitor;
pub use recorder::MetricsRecorder;
pub use report::{RecoveryAdvice, TickReport};
