//! Built-in scenarios

use crate::cli::DemoName;
use crate::scenario::{ProcessSpec, ResourceSpec, Scenario, Step};
use dlmon_types::{Priority, ProcessId, ResourceId};

pub fn scenario(name: DemoName) -> Scenario {
    match name {
        DemoName::TwoParty => two_party(),
        DemoName::Ring => ring(),
        DemoName::Contention => contention(),
    }
}

fn process(id: u32, name: &str, priority: Priority) -> ProcessSpec {
    ProcessSpec {
        id: ProcessId(id),
        name: name.to_string(),
        priority,
    }
}

fn resource(id: u32, name: &str, instances: u32) -> ResourceSpec {
    ResourceSpec {
        id: ResourceId(id),
        name: name.to_string(),
        instances,
    }
}

fn request(process: u32, resource: u32) -> Step {
    Step::Request {
        process: ProcessId(process),
        resource: ResourceId(resource),
    }
}

fn release(process: u32, resource: u32) -> Step {
    Step::Release {
        process: ProcessId(process),
        resource: ResourceId(resource),
    }
}

/// P0 and P1 each hold one lock and ask for the other's. The second request
/// is refused up front; releasing P1's lock then lets the monitor hand it to
/// the queued P0.
pub fn two_party() -> Scenario {
    Scenario {
        name: "two-party".to_string(),
        description: Some("Two processes swapping single-instance locks".to_string()),
        settle_ticks: 3,
        processes: vec![
            process(0, "account-debit", Priority::Medium),
            process(1, "account-credit", Priority::Medium),
        ],
        resources: vec![resource(0, "ledger-a", 1), resource(1, "ledger-b", 1)],
        steps: vec![
            request(0, 0),
            request(1, 1),
            request(0, 1),
            request(1, 0),
            release(1, 1),
        ],
    }
}

/// Three processes each hold one resource and queue for the next one's.
/// Only the detection scan can see the cycle.
pub fn ring() -> Scenario {
    Scenario {
        name: "ring".to_string(),
        description: Some("Three-way circular wait broken by the monitor".to_string()),
        settle_ticks: 3,
        processes: vec![
            process(0, "compactor", Priority::High),
            process(1, "replicator", Priority::Medium),
            process(2, "indexer", Priority::Low),
        ],
        resources: vec![
            resource(0, "segment", 1),
            resource(1, "wal", 1),
            resource(2, "index", 1),
        ],
        steps: vec![
            request(0, 0),
            request(1, 1),
            request(2, 2),
            request(0, 1),
            request(1, 2),
            request(2, 0),
            Step::Tick,
        ],
    }
}

/// Four workers share two pooled resources; waiters are granted in arrival
/// order as holders finish.
pub fn contention() -> Scenario {
    Scenario {
        name: "contention".to_string(),
        description: Some("Workers competing for pooled connections and buffers".to_string()),
        settle_ticks: 3,
        processes: vec![
            process(0, "worker-0", Priority::High),
            process(1, "worker-1", Priority::Medium),
            process(2, "worker-2", Priority::Medium),
            process(3, "worker-3", Priority::Low),
        ],
        resources: vec![resource(0, "db-conn", 2), resource(1, "buffer", 2)],
        steps: vec![
            request(0, 0),
            request(1, 0),
            request(2, 0),
            request(3, 0),
            request(0, 1),
            request(1, 1),
            Step::SleepMs { ms: 20 },
            release(0, 0),
            release(0, 1),
            Step::SleepMs { ms: 20 },
            release(1, 0),
            release(1, 1),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::ValueEnum;

    #[test]
    fn every_demo_names_declared_entities() {
        for name in DemoName::value_variants() {
            let scenario = scenario(*name);
            let text = toml::to_string(&scenario).unwrap();
            let parsed = Scenario::from_toml(&text).unwrap();
            assert_eq!(parsed, scenario);
        }
    }
}
