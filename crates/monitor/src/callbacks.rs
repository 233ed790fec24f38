//! Deadlock callback registry

use dlmon_types::DeadlockCycle;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::error;

/// Invoked with every cycle the monitor does not resolve itself
pub type DeadlockCallback = Arc<dyn Fn(&DeadlockCycle) + Send + Sync>;

/// Run every callback, isolating panics
///
/// Returns the number of callbacks that panicked.
pub(crate) fn invoke_all(callbacks: &[DeadlockCallback], cycle: &DeadlockCycle) -> usize {
    let mut panicked = 0;
    for (index, callback) in callbacks.iter().enumerate() {
        if catch_unwind(AssertUnwindSafe(|| callback(cycle))).is_err() {
            error!(callback = index, %cycle, "deadlock callback panicked");
            panicked += 1;
        }
    }
    panicked
}
