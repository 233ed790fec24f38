//! Integration tests for types

#[cfg(test)]
mod tests {
    use dlmon_types::*;
    use proptest::prelude::*;
    use std::str::FromStr;

    #[test]
    fn test_priority_ordering() {
        assert!(Priority::Low < Priority::Medium);
        assert!(Priority::Medium < Priority::High);
        assert_eq!(
            [Priority::High, Priority::Low, Priority::Medium]
                .iter()
                .min()
                .copied(),
            Some(Priority::Low)
        );
    }

    #[test]
    fn test_priority_parse() {
        assert_eq!(Priority::from_str("HIGH").unwrap(), Priority::High);
        assert_eq!(Priority::from_str(" low ").unwrap(), Priority::Low);
        assert!(Priority::from_str("urgent").is_err());
    }

    #[test]
    fn test_id_display_and_parse() {
        assert_eq!(ProcessId(4).to_string(), "P4");
        assert_eq!(ResourceId(0).to_string(), "R0");
        assert_eq!(ProcessId::from_str("P12").unwrap(), ProcessId(12));
        assert_eq!(ProcessId::from_str("p12").unwrap(), ProcessId(12));
        assert_eq!(ResourceId::from_str("7").unwrap(), ResourceId(7));
        assert!(ResourceId::from_str("Rx").is_err());
    }

    #[test]
    fn test_cycle_display() {
        let cycle = DeadlockCycle::new(vec![ProcessId(0), ProcessId(1), ProcessId(2)]);
        assert_eq!(cycle.to_string(), "P0 -> P1 -> P2 -> P0");
        assert_eq!(DeadlockCycle::default().to_string(), "");
    }

    #[test]
    fn test_request_outcome_serialization() {
        let denied = RequestOutcome::Denied {
            reason: DenialReason::WouldDeadlock,
        };
        let json = serde_json::to_string(&denied).unwrap();
        assert_eq!(json, r#"{"outcome":"denied","reason":"would_deadlock"}"#);
        assert_eq!(denied.denial(), Some(DenialReason::WouldDeadlock));
        assert!(!denied.is_granted());
    }

    #[test]
    fn test_event_kind_serialization() {
        let json = serde_json::to_string(&EventKind::AutoGrant).unwrap();
        assert_eq!(json, r#""AUTO_GRANT""#);
    }

    #[test]
    fn test_victim_policy_parse() {
        assert_eq!(
            VictimPolicy::from_str("least-resources").unwrap(),
            VictimPolicy::LeastResources
        );
        assert_eq!(VictimPolicy::default(), VictimPolicy::LowestPriority);
    }

    #[test]
    fn test_empty_snapshot() {
        let snapshot = SystemSnapshot::empty();
        assert!(snapshot.is_empty());
        assert_eq!(snapshot.held_count(ProcessId(1)), 0);
        assert!(snapshot.waiting_processes().is_empty());
    }

    proptest! {
        #[test]
        fn process_id_display_parses_back(raw in any::<u32>()) {
            let id = ProcessId(raw);
            prop_assert_eq!(ProcessId::from_str(&id.to_string()).unwrap(), id);
        }
    }
}
