//! Background monitor loop

use crate::monitor::Inner;
use std::sync::Weak;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::debug;

/// Handle to a running loop
#[derive(Debug)]
pub(crate) struct LoopHandle {
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
    period: Duration,
}

impl LoopHandle {
    /// Spawn the loop on `runtime`, ticking every `period`
    ///
    /// The loop holds only a weak reference to the monitor and exits once
    /// the monitor is gone, the handle is dropped or a stop is signalled.
    pub(crate) fn spawn(runtime: &Handle, inner: Weak<Inner>, period: Duration) -> Self {
        let (stop, stop_rx) = watch::channel(false);
        let task = runtime.spawn(run(inner, period, stop_rx));
        Self { stop, task, period }
    }

    pub(crate) fn is_active(&self) -> bool {
        !self.task.is_finished()
    }

    pub(crate) fn period(&self) -> Duration {
        self.period
    }

    /// Signal the loop; it exits before its next tick
    pub(crate) fn signal_stop(&self) {
        // A closed channel means the loop already exited
        let _ = self.stop.send(true);
    }

    pub(crate) async fn join(self) {
        self.signal_stop();
        let _ = self.task.await;
    }
}

async fn run(inner: Weak<Inner>, period: Duration, mut stop: watch::Receiver<bool>) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;

            changed = stop.changed() => {
                if changed.is_err() || *stop.borrow() {
                    break;
                }
            }

            _ = ticker.tick() => {
                let Some(inner) = inner.upgrade() else {
                    break;
                };
                if let Err(e) = inner.tick() {
                    inner.report_tick_error(&e);
                }
            }
        }
    }

    debug!("monitor loop exited");
}
