//! Integration tests for deadlock recovery

#[cfg(test)]
mod tests {
    use dlmon_errors::RecoveryError;
    use dlmon_ledger::ResourceLedger;
    use dlmon_recovery::*;
    use dlmon_types::{
        DeadlockCycle, EventKind, Priority, ProcessId, Resolution, ResourceId, VictimPolicy,
    };

    /// Ring of three where P1 is the only low priority member
    fn ring() -> (ResourceLedger, DeadlockCycle) {
        let priorities = [Priority::High, Priority::Low, Priority::High];
        let mut ledger = ResourceLedger::new();
        for (i, priority) in (0u32..).zip(priorities) {
            ledger
                .add_process(ProcessId(i), format!("P{i}"), priority)
                .unwrap();
            ledger
                .add_resource(ResourceId(i), format!("R{i}"), 1)
                .unwrap();
        }
        for i in 0..3 {
            ledger.request_resource(ProcessId(i), ResourceId(i)).unwrap();
        }
        for i in 0..3 {
            ledger
                .request_resource(ProcessId(i), ResourceId((i + 1) % 3))
                .unwrap();
        }
        ledger.drain_events();
        let cycle = DeadlockCycle::new(vec![ProcessId(0), ProcessId(1), ProcessId(2)]);
        (ledger, cycle)
    }

    #[test]
    fn test_terminates_exactly_the_low_priority_member() {
        let (mut ledger, cycle) = ring();
        let engine = RecoveryEngine::default();

        let resolution = engine.auto_resolve(&mut ledger, &cycle).unwrap();
        assert_eq!(
            resolution,
            Resolution::Resolved {
                victim: ProcessId(1),
                released: vec![ResourceId(1)],
                cancelled_waits: vec![ResourceId(2)],
            }
        );

        let victim = ledger.process(ProcessId(1)).unwrap();
        assert!(victim.held().is_empty());
        assert!(!victim.is_waiting());

        // R1 is back in the pool; the survivors still wait
        assert_eq!(ledger.resource(ResourceId(1)).unwrap().available(), 1);
        assert!(ledger.process(ProcessId(0)).unwrap().is_waiting());
        assert!(ledger.process(ProcessId(2)).unwrap().is_waiting());
        ledger.verify().unwrap();

        let kinds: Vec<_> = ledger.drain_events().iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![EventKind::Release, EventKind::Resolution]);
    }

    #[test]
    fn test_empty_cycle_is_no_cycle() {
        let (mut ledger, _) = ring();
        let resolution = RecoveryEngine::default()
            .auto_resolve(&mut ledger, &DeadlockCycle::default())
            .unwrap();
        assert_eq!(resolution, Resolution::NoCycle);
        assert!(ledger.drain_events().is_empty());
    }

    #[test]
    fn test_unknown_member() {
        let (mut ledger, _) = ring();
        let cycle = DeadlockCycle::new(vec![ProcessId(0), ProcessId(42)]);
        let err = RecoveryEngine::default()
            .auto_resolve(&mut ledger, &cycle)
            .unwrap_err();
        assert_eq!(
            err,
            RecoveryError::UnknownVictim {
                id: "P42".to_string()
            }
        );
        // Nothing was released
        assert_eq!(ledger.resource(ResourceId(0)).unwrap().available(), 0);
    }

    #[test]
    fn test_least_resources_policy() {
        let (mut ledger, cycle) = ring();
        ledger.add_resource(ResourceId(9), "extra", 1).unwrap();
        ledger.request_resource(ProcessId(0), ResourceId(9)).unwrap();

        let engine = RecoveryEngine::new(VictimPolicy::LeastResources);
        // P1 and P2 hold one each; the lower id wins
        assert_eq!(
            engine.auto_resolve(&mut ledger, &cycle).unwrap().victim(),
            Some(ProcessId(1))
        );
    }

    #[test]
    fn test_termination_options_and_costs() {
        let (mut ledger, cycle) = ring();
        ledger.add_resource(ResourceId(9), "extra", 1).unwrap();
        ledger.request_resource(ProcessId(2), ResourceId(9)).unwrap();
        let snapshot = ledger.snapshot();

        assert_eq!(termination_cost(&snapshot, ProcessId(2)), 20);
        assert_eq!(termination_cost(&snapshot, ProcessId(1)), 10);
        assert_eq!(termination_cost(&snapshot, ProcessId(99)), 0);

        let options = termination_options(&snapshot, &cycle);
        assert_eq!(options.len(), 2);
        assert_eq!(options[0].policy, VictimPolicy::LowestPriority);
        assert_eq!(options[0].process, ProcessId(1));
        assert_eq!(options[0].cost, 10);
        assert_eq!(options[1].policy, VictimPolicy::LeastResources);
        assert_eq!(options[1].process, ProcessId(0));

        assert!(termination_options(&snapshot, &DeadlockCycle::default()).is_empty());
    }

    #[test]
    fn test_preemption_plan_weights_by_priority() {
        let (ledger, cycle) = ring();
        let plan = preemption_plan(&ledger.snapshot(), &cycle);

        assert_eq!(plan.len(), 3);
        assert_eq!(plan[0].process, ProcessId(0));
        assert_eq!(
            plan[0].resources,
            vec![PreemptableResource {
                resource: ResourceId(0),
                amount: 1,
                preemption_cost: 3,
            }]
        );
        assert_eq!(plan[1].total_cost(), 1);

        let json = serde_json::to_value(&plan[1]).unwrap();
        assert_eq!(json["process"], 1);
        assert_eq!(json["resources"][0]["preemption_cost"], 1);
    }
}
