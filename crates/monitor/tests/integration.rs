//! Integration tests for the deadlock monitor

#[cfg(test)]
mod tests {
    use dlmon_config::Config;
    use dlmon_errors::{Error, LedgerError, MonitorError};
    use dlmon_events::{AppEvent, DeadlockEvent, LedgerEvent};
    use dlmon_monitor::*;
    use dlmon_types::{
        DeadlockCycle, DenialReason, EventKind, Priority, ProcessId, RequestOutcome, ResourceId,
    };
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::{Duration, Instant};

    fn config(auto_resolve: bool) -> Config {
        let mut config = Config::default();
        config.monitor.auto_resolve = auto_resolve;
        config.monitor.detection_throttle_ms = 0;
        config.monitor.tick_interval_ms = 20;
        config
    }

    /// P0..P2 each hold R_i and wait on R_(i+1); P1 is the low priority one
    fn build_ring(monitor: &DeadlockMonitor) {
        let priorities = [Priority::High, Priority::Low, Priority::High];
        for (i, priority) in (0u32..).zip(priorities) {
            monitor
                .add_process(ProcessId(i), format!("P{i}"), priority)
                .unwrap();
            monitor
                .add_resource(ResourceId(i), format!("R{i}"), 1)
                .unwrap();
        }
        for i in 0..3 {
            monitor
                .request_resource(ProcessId(i), ResourceId(i))
                .unwrap();
        }
        for i in 0..3 {
            assert_eq!(
                monitor
                    .request_resource(ProcessId(i), ResourceId((i + 1) % 3))
                    .unwrap(),
                RequestOutcome::Queued
            );
        }
    }

    #[test]
    fn test_two_party_request_is_denied() {
        let monitor = DeadlockMonitor::new(&config(true));
        for i in 0..2 {
            monitor
                .add_process(ProcessId(i), format!("P{i}"), Priority::Medium)
                .unwrap();
            monitor
                .add_resource(ResourceId(i), format!("R{i}"), 1)
                .unwrap();
        }
        monitor.request_resource(ProcessId(0), ResourceId(0)).unwrap();
        monitor.request_resource(ProcessId(1), ResourceId(1)).unwrap();
        assert!(monitor
            .request_resource(ProcessId(0), ResourceId(1))
            .unwrap()
            .is_queued());
        assert_eq!(
            monitor
                .request_resource(ProcessId(1), ResourceId(0))
                .unwrap(),
            RequestOutcome::Denied {
                reason: DenialReason::WouldDeadlock
            }
        );

        let metrics = monitor.metrics().unwrap();
        assert_eq!(metrics.requests_processed, 2);
        assert_eq!(metrics.requests_queued, 1);
        assert_eq!(metrics.requests_denied, 1);
    }

    #[test]
    fn test_unknown_and_duplicate_entities() {
        let monitor = DeadlockMonitor::default();
        monitor
            .add_process(ProcessId(0), "P0", Priority::Low)
            .unwrap();
        assert!(matches!(
            monitor.add_process(ProcessId(0), "P0", Priority::Low),
            Err(Error::Ledger(LedgerError::DuplicateEntity { .. }))
        ));
        assert!(matches!(
            monitor.request_resource(ProcessId(0), ResourceId(5)),
            Err(Error::Ledger(LedgerError::UnknownEntity { .. }))
        ));
    }

    #[test]
    fn test_tick_resolves_ring_and_serves_waiters() {
        let monitor = DeadlockMonitor::new(&config(true));
        build_ring(&monitor);
        assert!(!monitor.assess_safety().unwrap().safe);

        let report = monitor.tick().unwrap();
        assert!(report.resolved());
        assert_eq!(report.cycle.as_ref().map(DeadlockCycle::len), Some(3));
        assert_eq!(
            report.resolution.as_ref().and_then(|r| r.victim()),
            Some(ProcessId(1))
        );
        // The victim's R1 goes to P0, which was queued for it
        assert_eq!(report.auto_granted, vec![(ProcessId(0), ResourceId(1))]);
        assert_eq!(report.callbacks_invoked, 0);

        let snapshot = monitor.snapshot().unwrap();
        assert!(snapshot.process(ProcessId(1)).unwrap().held.is_empty());
        assert!(!snapshot.process(ProcessId(0)).unwrap().is_waiting());
        assert!(snapshot.process(ProcessId(2)).unwrap().is_waiting());
        monitor.verify().unwrap();
        assert!(monitor.assess_safety().unwrap().safe);

        let metrics = monitor.metrics().unwrap();
        assert_eq!(metrics.deadlocks_detected, 1);
        assert_eq!(metrics.deadlocks_resolved, 1);
        assert_eq!(metrics.auto_grants, 1);
        assert_eq!(metrics.ticks, 1);

        let log = monitor.event_log().unwrap();
        assert_eq!(log.deadlock_history.len(), 1);
        assert_eq!(log.deadlock_history[0].victim, Some(ProcessId(1)));
        let kinds: Vec<_> = log.events.iter().map(|e| e.kind).collect();
        assert!(kinds.ends_with(&[
            EventKind::DeadlockDetected,
            EventKind::Release,
            EventKind::Resolution,
            EventKind::AutoGrant
        ]));
        let detected = kinds.iter().position(|k| *k == EventKind::DeadlockDetected);
        let released = kinds.iter().position(|k| *k == EventKind::Release);
        assert!(detected < released);

        // Nothing left to do
        let report = monitor.tick().unwrap();
        assert!(report.cycle.is_none());
    }

    #[test]
    fn test_callbacks_receive_unresolved_cycles() {
        let monitor = DeadlockMonitor::new(&config(false));
        let seen: Arc<Mutex<Vec<DeadlockCycle>>> = Arc::default();
        let sink = Arc::clone(&seen);
        monitor
            .register_deadlock_callback(move |cycle| sink.lock().unwrap().push(cycle.clone()))
            .unwrap();
        build_ring(&monitor);

        let report = monitor.tick().unwrap();
        assert!(!report.resolved());
        assert_eq!(report.callbacks_invoked, 1);

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(
            seen[0].members(),
            &[ProcessId(0), ProcessId(1), ProcessId(2)]
        );
        // Nobody was terminated
        assert_eq!(monitor.snapshot().unwrap().waiting_processes().len(), 3);
        let log = monitor.event_log().unwrap();
        assert_eq!(log.deadlock_history[0].victim, None);
        assert_eq!(log.metrics.deadlocks_resolved, 0);
    }

    #[test]
    fn test_panicking_callback_is_recorded_not_fatal() {
        let monitor = DeadlockMonitor::new(&config(false));
        monitor
            .register_deadlock_callback(|_| panic!("callback failure"))
            .unwrap();
        build_ring(&monitor);

        let report = monitor.tick().unwrap();
        assert!(report.failure.is_some());
        assert_eq!(monitor.metrics().unwrap().tick_failures, 1);

        // The monitor keeps working
        let report = monitor.tick().unwrap();
        assert!(report.cycle.is_some());
        assert_eq!(monitor.metrics().unwrap().ticks, 2);
    }

    #[test]
    fn test_overlapping_tick_is_skipped() {
        let monitor = DeadlockMonitor::new(&config(false));
        let nested: Arc<Mutex<Option<TickReport>>> = Arc::default();
        let (inner_monitor, slot) = (monitor.clone(), Arc::clone(&nested));
        monitor
            .register_deadlock_callback(move |_| {
                *slot.lock().unwrap() = Some(inner_monitor.tick().unwrap());
            })
            .unwrap();
        build_ring(&monitor);

        let outer = monitor.tick().unwrap();
        assert!(!outer.skipped);
        let nested = nested.lock().unwrap().clone().unwrap();
        assert!(nested.skipped);
        assert_eq!(monitor.metrics().unwrap().ticks, 1);
    }

    #[test]
    fn test_manual_detection_is_throttled() {
        let mut config = config(true);
        config.monitor.detection_throttle_ms = 60_000;
        let monitor = DeadlockMonitor::new(&config);
        build_ring(&monitor);

        assert!(monitor.detect_deadlock().unwrap().is_cycle());
        assert!(!monitor.detect_deadlock().unwrap().is_cycle());
        assert_eq!(monitor.metrics().unwrap().deadlocks_detected, 1);

        // Explicit recovery still works while detection is throttled
        let cycle = DeadlockCycle::new(vec![ProcessId(0), ProcessId(1), ProcessId(2)]);
        let advice = monitor.recovery_advice(&cycle).unwrap();
        assert_eq!(advice.termination[0].process, ProcessId(1));
        assert_eq!(advice.preemption.len(), 3);
        assert_eq!(
            monitor.auto_resolve(&cycle).unwrap().victim(),
            Some(ProcessId(1))
        );
    }

    #[test]
    fn test_reset_clears_everything() {
        let monitor = DeadlockMonitor::new(&config(true));
        monitor.register_deadlock_callback(|_| {}).unwrap();
        build_ring(&monitor);
        monitor.tick().unwrap();
        let session = monitor.session_id();

        monitor.reset_system().unwrap();
        assert!(monitor.snapshot().unwrap().is_empty());
        let log = monitor.event_log().unwrap();
        assert!(log.events.is_empty());
        assert!(log.deadlock_history.is_empty());
        assert_eq!(log.metrics.requests_processed, 0);
        assert_ne!(log.session_id, session);
        assert_eq!(monitor.callback_count(), 0);

        // Ids can be registered again
        build_ring(&monitor);
    }

    #[test]
    fn test_reset_during_tick_stays_in_old_session() {
        let (tx, mut rx) = dlmon_events::channel();
        let monitor = DeadlockMonitor::with_events(&config(false), tx);
        let (entered_tx, entered_rx) = std::sync::mpsc::channel();
        let entered_tx = Mutex::new(entered_tx);
        monitor
            .register_deadlock_callback(move |_| {
                let _ = entered_tx.lock().unwrap().send(());
                std::thread::sleep(Duration::from_millis(200));
            })
            .unwrap();
        build_ring(&monitor);
        let old_session = monitor.session_id();

        let ticking = monitor.clone();
        let handle = std::thread::spawn(move || ticking.tick().unwrap());
        entered_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        monitor.reset_system().unwrap();
        let report = handle.join().unwrap();
        assert_eq!(report.callbacks_invoked, 1);

        let new_session = monitor.session_id();
        assert_ne!(new_session, old_session);
        let log = monitor.event_log().unwrap();
        assert_eq!(log.metrics.ticks, 0);
        assert_eq!(log.metrics.tick_failures, 0);
        assert!(log.events.is_empty());
        assert!(log.deadlock_history.is_empty());
        assert!(monitor.snapshot().unwrap().is_empty());
        monitor.verify().unwrap();

        let mut unresolved = 0;
        while let Ok(message) = rx.try_recv() {
            match message.event {
                AppEvent::Deadlock(DeadlockEvent::Unresolved { .. }) => unresolved += 1,
                AppEvent::Deadlock(_) | AppEvent::Monitor(_) => {
                    assert_eq!(message.meta.session_id, Some(old_session));
                }
                _ => {}
            }
        }
        assert_eq!(unresolved, 0);
    }

    #[test]
    fn test_start_requires_runtime() {
        let monitor = DeadlockMonitor::default();
        assert_eq!(
            monitor.start_monitoring(None),
            Err(MonitorError::NoRuntime)
        );
        assert!(!monitor.stop_monitoring());
    }

    #[tokio::test]
    async fn test_zero_interval_rejected() {
        let monitor = DeadlockMonitor::default();
        assert_eq!(
            monitor.start_monitoring(Some(Duration::ZERO)),
            Err(MonitorError::InvalidInterval { interval_ms: 0 })
        );
        assert!(!monitor.is_running());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_background_loop_resolves_deadlock() {
        let monitor = DeadlockMonitor::new(&config(true));
        monitor.start_monitoring(None).unwrap();
        assert!(monitor.is_running());
        assert_eq!(monitor.monitoring_interval(), Some(Duration::from_millis(20)));
        assert_eq!(
            monitor.start_monitoring(None),
            Err(MonitorError::AlreadyRunning)
        );

        build_ring(&monitor);

        let deadline = Instant::now() + Duration::from_secs(5);
        while monitor.metrics().unwrap().deadlocks_resolved == 0 {
            assert!(Instant::now() < deadline, "deadlock was never resolved");
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(monitor.snapshot().unwrap().process(ProcessId(1)).unwrap().held.is_empty());

        assert!(monitor.shutdown().await);
        assert!(!monitor.is_running());
        assert!(!monitor.stop_monitoring());
        monitor.verify().unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_stop_is_idempotent_and_restartable() {
        let monitor = DeadlockMonitor::new(&config(true));
        monitor.start_monitoring(Some(Duration::from_millis(5))).unwrap();
        assert!(monitor.stop_monitoring());
        assert!(!monitor.stop_monitoring());
        monitor.start_monitoring(Some(Duration::from_millis(5))).unwrap();
        assert!(monitor.shutdown().await);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_events_are_published() {
        let (tx, mut rx) = dlmon_events::channel();
        let monitor = DeadlockMonitor::with_events(&config(true), tx);
        build_ring(&monitor);
        monitor.tick().unwrap();

        let mut granted = 0;
        let mut detected = 0;
        let mut resolved = 0;
        while let Ok(message) = rx.try_recv() {
            assert_eq!(message.meta.session_id, Some(monitor.session_id()));
            match message.event {
                AppEvent::Ledger(LedgerEvent::Granted { .. }) => granted += 1,
                AppEvent::Deadlock(DeadlockEvent::Detected { .. }) => detected += 1,
                AppEvent::Deadlock(DeadlockEvent::Resolved { victim, .. }) => {
                    assert_eq!(victim, ProcessId(1));
                    resolved += 1;
                }
                _ => {}
            }
        }
        assert_eq!((granted, detected, resolved), (3, 1, 1));
    }

    #[test]
    fn test_concurrent_callers_keep_ledger_consistent() {
        let monitor = DeadlockMonitor::new(&config(true));
        for i in 0..8 {
            monitor
                .add_process(ProcessId(i), format!("P{i}"), Priority::Medium)
                .unwrap();
        }
        for i in 0..4 {
            monitor
                .add_resource(ResourceId(i), format!("R{i}"), 2)
                .unwrap();
        }

        let ticks = AtomicUsize::new(0);
        std::thread::scope(|scope| {
            for p in 0..8u32 {
                let monitor = monitor.clone();
                scope.spawn(move || {
                    for step in 0..200u32 {
                        let resource = ResourceId((p + step) % 4);
                        if step % 3 == 2 {
                            monitor.release_resource(ProcessId(p), resource).unwrap();
                        } else {
                            monitor.request_resource(ProcessId(p), resource).unwrap();
                        }
                    }
                });
            }
            scope.spawn(|| {
                for _ in 0..100 {
                    monitor.tick().unwrap();
                    ticks.fetch_add(1, Ordering::Relaxed);
                }
            });
        });

        assert_eq!(ticks.load(Ordering::Relaxed), 100);
        monitor.verify().unwrap();
        for resource in monitor.snapshot().unwrap().resources.values() {
            let held = u32::try_from(resource.holders.len()).unwrap();
            assert_eq!(resource.available + held, resource.total);
        }
    }
}
