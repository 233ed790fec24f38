//! The deadlock monitor facade
//!
//! All ledger, detector, recovery and metrics state sits behind a single
//! mutex so every foreground operation and every tick phase is one
//! critical section. Callbacks and event emission run outside it.

use crate::callbacks::{invoke_all, DeadlockCallback};
use crate::recorder::MetricsRecorder;
use crate::report::{RecoveryAdvice, TickReport};
use crate::runner::LoopHandle;
use dlmon_config::{Config, MonitorConfig};
use dlmon_detect::{CycleDetector, Detection};
use dlmon_errors::{Error, LedgerError, MonitorError};
use dlmon_events::{
    AppEvent, DeadlockEvent, EventEmitter, EventMeta, EventSender, FailureContext, LedgerEvent,
    MonitorEvent,
};
use dlmon_ledger::ResourceLedger;
use dlmon_recovery::{preemption_plan, termination_options, RecoveryEngine};
use dlmon_safety::SafetyAssessment;
use dlmon_types::{
    DeadlockCycle, EventKind, EventLog, EventRecord, MetricsSnapshot, Priority, ProcessId,
    RequestOutcome, Resolution, ResourceId, SystemSnapshot,
};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};
use std::time::Duration;
use tokio::runtime::Handle;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Everything guarded by the monitor's single lock
#[derive(Debug)]
struct MonitorState {
    ledger: ResourceLedger,
    detector: CycleDetector,
    recovery: RecoveryEngine,
    metrics: MetricsRecorder,
}

impl MonitorState {
    /// Journal a detected cycle; must precede any recovery records for it
    fn journal_detection(&mut self, cycle: &DeadlockCycle) {
        if let Some(first) = cycle.members().first() {
            self.ledger.record_event(EventRecord::new(
                EventKind::DeadlockDetected,
                *first,
                None,
                Duration::ZERO,
            ));
        }
    }

    /// Move journaled ledger events into the recorder
    fn drain_journal(&mut self) -> Vec<EventRecord> {
        let records = self.ledger.drain_events();
        self.metrics.observe_all(&records);
        records
    }
}

pub(crate) struct Inner {
    config: MonitorConfig,
    state: Mutex<MonitorState>,
    callbacks: Mutex<Vec<DeadlockCallback>>,
    runner: Mutex<Option<LoopHandle>>,
    session: RwLock<Uuid>,
    /// Bumped under the state lock by every reset
    generation: AtomicU64,
    ticking: AtomicBool,
    ticks: AtomicU64,
    events: Option<EventSender>,
}

impl EventEmitter for Inner {
    fn event_sender(&self) -> Option<&EventSender> {
        self.events.as_ref()
    }

    fn session_id(&self) -> Option<Uuid> {
        self.session.read().ok().map(|s| *s)
    }
}

/// Clears the in-progress flag when a tick ends
struct TickGuard<'a>(&'a AtomicBool);

impl<'a> TickGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for TickGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Inner {
    fn lock_state(&self) -> Result<MutexGuard<'_, MonitorState>, MonitorError> {
        self.state
            .lock()
            .map_err(|_| MonitorError::poisoned("monitor state"))
    }

    /// Run `op` under the state lock, then publish the ledger events it caused
    fn mutate<R>(&self, op: impl FnOnce(&mut MonitorState) -> R) -> Result<R, MonitorError> {
        let (result, records, session) = {
            let mut state = self.lock_state()?;
            let result = op(&mut *state);
            let records = state.drain_journal();
            (result, records, self.session_id())
        };
        self.emit_records(session, &records);
        Ok(result)
    }

    fn emit_records(&self, session: Option<Uuid>, records: &[EventRecord]) {
        if self.event_sender().is_none() {
            return;
        }
        for record in records {
            let Some(resource) = record.resource else {
                continue;
            };
            let process = record.process;
            let event = match record.kind {
                EventKind::Grant => LedgerEvent::Granted {
                    process,
                    resource,
                    response_time_us: u64::try_from(record.response_time.as_micros())
                        .unwrap_or(u64::MAX),
                },
                EventKind::Wait => LedgerEvent::Queued { process, resource },
                EventKind::AutoGrant => LedgerEvent::AutoGranted { process, resource },
                EventKind::Release => LedgerEvent::Released { process, resource },
                // Published as deadlock events by the tick
                EventKind::DeadlockDetected | EventKind::Resolution => continue,
            };
            self.emit_for(session, AppEvent::Ledger(event));
        }
    }

    /// Emit an event tagged with `session` instead of the current one
    fn emit_for(&self, session: Option<Uuid>, event: AppEvent) {
        if self.event_sender().is_none() {
            return;
        }
        let mut meta = EventMeta::new(event.log_level(), event.event_source());
        meta.session_id = session;
        self.emit_with_meta(meta, event);
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::Acquire) == generation
    }

    fn registered_callbacks(&self) -> Result<Vec<DeadlockCallback>, MonitorError> {
        self.callbacks
            .lock()
            .map(|callbacks| callbacks.clone())
            .map_err(|_| MonitorError::poisoned("deadlock callbacks"))
    }

    /// One monitor cycle: detect, resolve or notify, then serve waiters
    ///
    /// A reset that lands while the tick is outside the lock bumps the
    /// generation; the tick then drops whatever it has not yet recorded.
    pub(crate) fn tick(&self) -> Result<TickReport, MonitorError> {
        let Some(_guard) = TickGuard::acquire(&self.ticking) else {
            debug!("previous tick still running, skipping");
            return Ok(TickReport::skipped());
        };
        let tick = self.ticks.fetch_add(1, Ordering::AcqRel) + 1;
        let mut report = TickReport {
            tick,
            ..TickReport::default()
        };

        let (generation, session, unresolved_reason) = self.detect_and_resolve(&mut report)?;
        if !self.announce(&mut report, generation, session, unresolved_reason)? {
            debug!(tick, "system reset during tick, dropping its results");
            return Ok(report);
        }

        // Waiter retry and bookkeeping
        let (records, metrics) = {
            let mut state = self.lock_state()?;
            if !self.is_current(generation) {
                debug!(tick, "system reset during tick, dropping its results");
                return Ok(report);
            }
            report.auto_granted = state.ledger.retry_waiters();
            let records = state.drain_journal();
            state.metrics.record_tick();
            if report.failure.is_some() {
                state.metrics.record_tick_failure();
            }
            let every = self.config.metrics_every_ticks;
            let metrics = (every > 0 && tick % every == 0).then(|| state.metrics.snapshot());
            (records, metrics)
        };

        self.emit_records(session, &records);
        if let Some(message) = &report.failure {
            let failure = MonitorError::TickFailed {
                message: message.clone(),
            };
            self.emit_for(
                session,
                AppEvent::Monitor(MonitorEvent::TickFailed {
                    tick,
                    failure: FailureContext::from_error(&failure),
                }),
            );
        }
        if let Some(metrics) = metrics {
            self.emit_for(session, AppEvent::Monitor(MonitorEvent::Metrics { metrics }));
        }
        Ok(report)
    }

    /// Tick phase one, under the lock. Returns the generation and session
    /// the tick belongs to and, for a cycle left standing, why.
    fn detect_and_resolve(
        &self,
        report: &mut TickReport,
    ) -> Result<(u64, Option<Uuid>, Option<String>), MonitorError> {
        let tick = report.tick;
        let mut guard = self.lock_state()?;
        let state = &mut *guard;
        let generation = self.generation.load(Ordering::Acquire);
        let session = self.session_id();
        let mut unresolved_reason = None;

        if let Detection::Cycle(cycle) = state.detector.detect(&state.ledger) {
            warn!(tick, %cycle, "deadlock detected");
            state.journal_detection(&cycle);
            if self.config.auto_resolve {
                match state.recovery.auto_resolve(&mut state.ledger, &cycle) {
                    Ok(resolution) => report.resolution = Some(resolution),
                    Err(e) => {
                        warn!(tick, error = %e, "deadlock recovery failed");
                        unresolved_reason = Some(e.to_string());
                        report.failure = Some(e.to_string());
                    }
                }
            } else {
                unresolved_reason = Some("auto-resolve disabled".to_string());
            }
            let victim = report.resolution.as_ref().and_then(Resolution::victim);
            state.metrics.record_deadlock(cycle.clone(), victim);
            report.cycle = Some(cycle);
        }
        Ok((generation, session, unresolved_reason))
    }

    /// Tick phase two, outside the lock: publish the cycle and run callbacks
    /// for one left standing. Returns false if a reset happened meanwhile.
    fn announce(
        &self,
        report: &mut TickReport,
        generation: u64,
        session: Option<Uuid>,
        unresolved_reason: Option<String>,
    ) -> Result<bool, MonitorError> {
        let Some(cycle) = &report.cycle else {
            return Ok(true);
        };
        self.emit_for(
            session,
            AppEvent::Deadlock(DeadlockEvent::Detected {
                cycle: cycle.clone(),
            }),
        );
        if let Some(Resolution::Resolved {
            victim, released, ..
        }) = &report.resolution
        {
            self.emit_for(
                session,
                AppEvent::Deadlock(DeadlockEvent::Resolved {
                    cycle: cycle.clone(),
                    victim: *victim,
                    released: released.clone(),
                }),
            );
            return Ok(true);
        }

        let callbacks = self.registered_callbacks()?;
        let panicked = invoke_all(&callbacks, cycle);
        let event = AppEvent::Deadlock(DeadlockEvent::Unresolved {
            cycle: cycle.clone(),
            callbacks: callbacks.len(),
            reason: unresolved_reason,
        });
        report.callbacks_invoked = callbacks.len();
        if panicked > 0 {
            report.failure = Some(format!("{panicked} deadlock callback(s) panicked"));
        }
        if !self.is_current(generation) {
            return Ok(false);
        }
        self.emit_for(session, event);
        Ok(true)
    }

    /// Surface a tick that could not run at all
    pub(crate) fn report_tick_error(&self, error: &MonitorError) {
        warn!(error = %error, "monitor tick failed");
        if let Ok(mut state) = self.lock_state() {
            state.metrics.record_tick_failure();
        }
        self.emit(AppEvent::Monitor(MonitorEvent::TickFailed {
            tick: self.ticks.load(Ordering::Acquire),
            failure: FailureContext::from_error(error),
        }));
    }
}

/// Real-time deadlock monitor
///
/// Cheap to clone; clones share the same state. Foreground calls never
/// block on resources: a request is granted, queued or denied and returns
/// at once. The optional background loop started by
/// [`DeadlockMonitor::start_monitoring`] detects cycles, resolves them (or
/// hands them to callbacks) and grants freed resources to queued waiters.
#[derive(Clone)]
pub struct DeadlockMonitor {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for DeadlockMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeadlockMonitor")
            .field("config", &self.inner.config)
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

impl Default for DeadlockMonitor {
    fn default() -> Self {
        Self::new(&Config::default())
    }
}

impl DeadlockMonitor {
    #[must_use]
    pub fn new(config: &Config) -> Self {
        Self::build(config, None)
    }

    /// Create a monitor that publishes [`AppEvent`]s on `sender`
    #[must_use]
    pub fn with_events(config: &Config, sender: EventSender) -> Self {
        Self::build(config, Some(sender))
    }

    fn build(config: &Config, events: Option<EventSender>) -> Self {
        let state = MonitorState {
            ledger: ResourceLedger::new(),
            detector: CycleDetector::new(config.monitor.detection_throttle()),
            recovery: RecoveryEngine::new(config.monitor.victim_policy),
            metrics: MetricsRecorder::new(&config.metrics),
        };
        Self {
            inner: Arc::new(Inner {
                config: config.monitor.clone(),
                state: Mutex::new(state),
                callbacks: Mutex::new(Vec::new()),
                runner: Mutex::new(None),
                session: RwLock::new(Uuid::new_v4()),
                generation: AtomicU64::new(0),
                ticking: AtomicBool::new(false),
                ticks: AtomicU64::new(0),
                events,
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &MonitorConfig {
        &self.inner.config
    }

    /// Current session id; changes on every reset
    #[must_use]
    pub fn session_id(&self) -> Uuid {
        self.inner.session_id().unwrap_or_default()
    }

    /// Register a process
    ///
    /// # Errors
    ///
    /// Fails with `DuplicateEntity` if the id is taken.
    pub fn add_process(
        &self,
        id: ProcessId,
        name: impl Into<String>,
        priority: Priority,
    ) -> Result<(), Error> {
        let name = name.into();
        let registered = name.clone();
        self.inner
            .mutate(|state| state.ledger.add_process(id, registered, priority))??;
        self.inner.emit_ledger(LedgerEvent::ProcessRegistered {
            process: id,
            name,
            priority,
        });
        Ok(())
    }

    /// Register a resource with `total` instances
    ///
    /// # Errors
    ///
    /// Fails with `DuplicateEntity` if the id is taken.
    pub fn add_resource(
        &self,
        id: ResourceId,
        name: impl Into<String>,
        total: u32,
    ) -> Result<(), Error> {
        let name = name.into();
        let registered = name.clone();
        self.inner
            .mutate(|state| state.ledger.add_resource(id, registered, total))??;
        self.inner.emit_ledger(LedgerEvent::ResourceRegistered {
            resource: id,
            name,
            total,
        });
        Ok(())
    }

    /// Request one instance of `resource`; never blocks
    ///
    /// # Errors
    ///
    /// Fails with `UnknownEntity` if either id is unregistered.
    pub fn request_resource(
        &self,
        process: ProcessId,
        resource: ResourceId,
    ) -> Result<RequestOutcome, Error> {
        let outcome = self.inner.mutate(|state| {
            let outcome = state.ledger.request_resource(process, resource)?;
            if outcome.denial().is_some() {
                state.metrics.record_denial();
            }
            Ok::<_, LedgerError>(outcome)
        })??;

        if let Some(reason) = outcome.denial() {
            self.inner.emit_ledger(LedgerEvent::Denied {
                process,
                resource,
                reason,
            });
        }
        Ok(outcome)
    }

    /// Release a held instance; `false` if it was not held
    ///
    /// # Errors
    ///
    /// Fails with `UnknownEntity` if either id is unregistered.
    pub fn release_resource(&self, process: ProcessId, resource: ResourceId) -> Result<bool, Error> {
        Ok(self
            .inner
            .mutate(|state| state.ledger.release_resource(process, resource))??)
    }

    /// Stop monitoring and clear all state, history and callbacks
    ///
    /// # Errors
    ///
    /// Fails only if the state lock is poisoned.
    pub fn reset_system(&self) -> Result<(), Error> {
        self.stop_monitoring();
        self.inner
            .callbacks
            .lock()
            .map_err(|_| MonitorError::poisoned("deadlock callbacks"))?
            .clear();
        {
            let mut state = self.inner.lock_state()?;
            state.ledger.reset();
            state.detector.reset();
            state.metrics.reset();
            // In-flight ticks compare against this and drop their results
            self.inner.generation.fetch_add(1, Ordering::AcqRel);
            if let Ok(mut session) = self.inner.session.write() {
                *session = Uuid::new_v4();
            }
            self.inner.ticks.store(0, Ordering::Release);
        }
        info!("system reset");
        self.inner.emit_ledger(LedgerEvent::SystemReset);
        Ok(())
    }

    /// Register a callback for cycles the monitor does not resolve itself
    ///
    /// # Errors
    ///
    /// Fails only if the callback registry lock is poisoned.
    pub fn register_deadlock_callback<F>(&self, callback: F) -> Result<(), MonitorError>
    where
        F: Fn(&DeadlockCycle) + Send + Sync + 'static,
    {
        self.inner
            .callbacks
            .lock()
            .map_err(|_| MonitorError::poisoned("deadlock callbacks"))?
            .push(Arc::new(callback));
        Ok(())
    }

    #[must_use]
    pub fn callback_count(&self) -> usize {
        self.inner.callbacks.lock().map_or(0, |c| c.len())
    }

    /// Start the background loop, ticking every `interval` (or the
    /// configured tick interval)
    ///
    /// # Errors
    ///
    /// Fails with `InvalidInterval` for a zero interval, `NoRuntime` outside
    /// a tokio runtime and `AlreadyRunning` if a loop is active.
    pub fn start_monitoring(&self, interval: Option<Duration>) -> Result<(), MonitorError> {
        let period = interval.unwrap_or_else(|| self.inner.config.tick_interval());
        if period.is_zero() {
            return Err(MonitorError::InvalidInterval { interval_ms: 0 });
        }
        let runtime = Handle::try_current().map_err(|_| MonitorError::NoRuntime)?;

        let mut runner = self
            .inner
            .runner
            .lock()
            .map_err(|_| MonitorError::poisoned("monitor runner"))?;
        if runner.as_ref().is_some_and(LoopHandle::is_active) {
            return Err(MonitorError::AlreadyRunning);
        }

        self.inner.lock_state()?.metrics.restart_clock();
        *runner = Some(LoopHandle::spawn(
            &runtime,
            Arc::downgrade(&self.inner),
            period,
        ));
        drop(runner);

        let interval_ms = u64::try_from(period.as_millis()).unwrap_or(u64::MAX);
        info!(interval_ms, "monitoring started");
        self.inner
            .emit(AppEvent::Monitor(MonitorEvent::Started { interval_ms }));
        Ok(())
    }

    /// Signal the background loop to stop
    ///
    /// The loop finishes any tick in progress and exits before the next
    /// one. Returns whether a loop was running; calling it again is a no-op.
    pub fn stop_monitoring(&self) -> bool {
        let handle = match self.inner.runner.lock() {
            Ok(mut runner) => runner.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        let Some(handle) = handle else {
            return false;
        };
        handle.signal_stop();
        info!("monitoring stopped");
        self.inner.emit(AppEvent::Monitor(MonitorEvent::Stopped));
        true
    }

    /// Stop the background loop and wait for it to exit
    pub async fn shutdown(&self) -> bool {
        let handle = match self.inner.runner.lock() {
            Ok(mut runner) => runner.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        let Some(handle) = handle else {
            return false;
        };
        handle.join().await;
        info!("monitoring stopped");
        self.inner.emit(AppEvent::Monitor(MonitorEvent::Stopped));
        true
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.inner
            .runner
            .lock()
            .is_ok_and(|runner| runner.as_ref().is_some_and(LoopHandle::is_active))
    }

    /// Period of the running loop, if any
    #[must_use]
    pub fn monitoring_interval(&self) -> Option<Duration> {
        self.inner
            .runner
            .lock()
            .ok()
            .and_then(|runner| runner.as_ref().map(LoopHandle::period))
    }

    /// Run one monitor cycle on the calling thread
    ///
    /// # Errors
    ///
    /// Fails only if the state lock is poisoned. Recovery and callback
    /// failures are recorded in the report instead.
    pub fn tick(&self) -> Result<TickReport, MonitorError> {
        self.inner.tick()
    }

    /// Run a throttled detection scan without resolving anything
    ///
    /// A found cycle is counted and added to the deadlock history.
    ///
    /// # Errors
    ///
    /// Fails only if the state lock is poisoned.
    pub fn detect_deadlock(&self) -> Result<Detection, MonitorError> {
        let detection = self.inner.mutate(|state| {
            let detection = state.detector.detect(&state.ledger);
            if let Detection::Cycle(cycle) = &detection {
                state.journal_detection(cycle);
                state.metrics.record_deadlock(cycle.clone(), None);
            }
            detection
        })?;
        if let Detection::Cycle(cycle) = &detection {
            self.inner.emit_deadlock_detected(cycle);
        }
        Ok(detection)
    }

    /// Terminate a victim of `cycle` now
    ///
    /// # Errors
    ///
    /// Fails if a cycle member is unknown or a release is refused.
    pub fn auto_resolve(&self, cycle: &DeadlockCycle) -> Result<Resolution, Error> {
        let resolution = self
            .inner
            .mutate(|state| state.recovery.auto_resolve(&mut state.ledger, cycle))??;
        if let Resolution::Resolved {
            victim, released, ..
        } = &resolution
        {
            self.inner
                .emit_deadlock_resolved(cycle, *victim, released.clone());
        }
        Ok(resolution)
    }

    /// Consistent copy of the ledger state
    ///
    /// # Errors
    ///
    /// Fails only if the state lock is poisoned.
    pub fn snapshot(&self) -> Result<SystemSnapshot, MonitorError> {
        Ok(self.inner.lock_state()?.ledger.snapshot())
    }

    /// Current counters and rates
    ///
    /// # Errors
    ///
    /// Fails only if the state lock is poisoned.
    pub fn metrics(&self) -> Result<MetricsSnapshot, MonitorError> {
        Ok(self.inner.lock_state()?.metrics.snapshot())
    }

    /// Bounded event history, deadlock history and final state
    ///
    /// # Errors
    ///
    /// Fails only if the state lock is poisoned.
    pub fn event_log(&self) -> Result<EventLog, MonitorError> {
        let session = self.session_id();
        let state = self.inner.lock_state()?;
        Ok(state.metrics.event_log(session, state.ledger.snapshot()))
    }

    /// Banker's safety check over the live state
    ///
    /// # Errors
    ///
    /// Fails if the state lock is poisoned.
    pub fn assess_safety(&self) -> Result<SafetyAssessment, Error> {
        let snapshot = self.snapshot()?;
        Ok(dlmon_safety::assess(&snapshot)?)
    }

    /// Termination and preemption estimates for `cycle`
    ///
    /// # Errors
    ///
    /// Fails only if the state lock is poisoned.
    pub fn recovery_advice(&self, cycle: &DeadlockCycle) -> Result<RecoveryAdvice, MonitorError> {
        let snapshot = self.snapshot()?;
        Ok(RecoveryAdvice {
            cycle: cycle.clone(),
            termination: termination_options(&snapshot, cycle),
            preemption: preemption_plan(&snapshot, cycle),
        })
    }

    /// Check the ledger's cross-record invariants
    ///
    /// # Errors
    ///
    /// Returns `Inconsistent` on the first violation found.
    pub fn verify(&self) -> Result<(), Error> {
        Ok(self.inner.lock_state()?.ledger.verify()?)
    }
}
