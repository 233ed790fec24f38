//! Scenario files and the runner that drives them through a live monitor

use crate::error::CliError;
use dlmon_monitor::{DeadlockMonitor, SafetyAssessment};
use dlmon_types::{
    DeadlockCycle, DeadlockRecord, MetricsSnapshot, Priority, ProcessId, RequestOutcome,
    ResourceId, SystemSnapshot,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

const DEFAULT_SETTLE_TICKS: u32 = 3;

/// A scripted workload: what exists and what happens, in order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Monitor ticks to wait after the last step before collecting results
    #[serde(default = "default_settle_ticks")]
    pub settle_ticks: u32,
    #[serde(default, rename = "process")]
    pub processes: Vec<ProcessSpec>,
    #[serde(default, rename = "resource")]
    pub resources: Vec<ResourceSpec>,
    #[serde(default, rename = "step")]
    pub steps: Vec<Step>,
}

fn default_settle_ticks() -> u32 {
    DEFAULT_SETTLE_TICKS
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessSpec {
    pub id: ProcessId,
    pub name: String,
    #[serde(default)]
    pub priority: Priority,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceSpec {
    pub id: ResourceId,
    pub name: String,
    #[serde(default = "default_instances")]
    pub instances: u32,
}

fn default_instances() -> u32 {
    1
}

/// One scripted action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    Request {
        process: ProcessId,
        resource: ResourceId,
    },
    Release {
        process: ProcessId,
        resource: ResourceId,
    },
    SleepMs {
        ms: u64,
    },
    /// Run one monitor tick in the foreground
    Tick,
}

impl Scenario {
    /// Parse a scenario from TOML text
    ///
    /// # Errors
    ///
    /// Returns `CliError::Scenario` if the text is not a valid scenario.
    pub fn from_toml(text: &str) -> Result<Self, CliError> {
        let scenario: Self =
            toml::from_str(text).map_err(|e| CliError::Scenario(e.to_string()))?;
        scenario.check()?;
        Ok(scenario)
    }

    /// Read and parse a scenario file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub async fn load(path: &Path) -> Result<Self, CliError> {
        let text = tokio::fs::read_to_string(path).await?;
        Self::from_toml(&text)
    }

    /// Steps may only name declared processes and resources
    fn check(&self) -> Result<(), CliError> {
        let known_process = |id: ProcessId| self.processes.iter().any(|p| p.id == id);
        let known_resource = |id: ResourceId| self.resources.iter().any(|r| r.id == id);

        for (index, step) in self.steps.iter().enumerate() {
            if let Step::Request { process, resource } | Step::Release { process, resource } =
                step
            {
                if !known_process(*process) {
                    return Err(CliError::Scenario(format!(
                        "step {index} refers to undeclared process {process}"
                    )));
                }
                if !known_resource(*resource) {
                    return Err(CliError::Scenario(format!(
                        "step {index} refers to undeclared resource {resource}"
                    )));
                }
            }
        }
        Ok(())
    }
}

/// What a step produced
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum StepResult {
    Request {
        process: ProcessId,
        resource: ResourceId,
        outcome: RequestOutcome,
    },
    Release {
        process: ProcessId,
        resource: ResourceId,
        released: bool,
    },
    SleepMs {
        ms: u64,
    },
    Tick {
        skipped: bool,
        cycle: Option<DeadlockCycle>,
        victim: Option<ProcessId>,
    },
}

/// Everything collected from a finished scenario run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub scenario: String,
    pub steps: Vec<StepResult>,
    pub snapshot: SystemSnapshot,
    pub metrics: MetricsSnapshot,
    pub deadlocks: Vec<DeadlockRecord>,
    pub safety: SafetyAssessment,
}

/// Register the scenario, monitor it while the steps run, settle, stop, and
/// collect the final state
///
/// # Errors
///
/// Returns an error if registration fails, monitoring cannot start, or a
/// step names an entity the monitor rejects.
pub async fn run(monitor: &DeadlockMonitor, scenario: &Scenario) -> Result<RunReport, CliError> {
    info!(scenario = %scenario.name, steps = scenario.steps.len(), "Running scenario");

    for process in &scenario.processes {
        monitor.add_process(process.id, process.name.clone(), process.priority)?;
    }
    for resource in &scenario.resources {
        monitor.add_resource(resource.id, resource.name.clone(), resource.instances)?;
    }

    monitor.start_monitoring(None)?;
    let steps = execute_steps(monitor, &scenario.steps).await;

    let period = monitor.config().tick_interval();
    let settle = period.saturating_mul(scenario.settle_ticks) + period / 2;
    debug!(?settle, "Settling");
    tokio::time::sleep(settle).await;
    monitor.shutdown().await;
    let steps = steps?;

    let log = monitor.event_log()?;
    let safety = monitor.assess_safety()?;
    monitor.verify()?;

    Ok(RunReport {
        scenario: scenario.name.clone(),
        steps,
        snapshot: log.final_state,
        metrics: log.metrics,
        deadlocks: log.deadlock_history,
        safety,
    })
}

async fn execute_steps(
    monitor: &DeadlockMonitor,
    steps: &[Step],
) -> Result<Vec<StepResult>, CliError> {
    let mut results = Vec::with_capacity(steps.len());
    for step in steps {
        let result = match *step {
            Step::Request { process, resource } => StepResult::Request {
                process,
                resource,
                outcome: monitor.request_resource(process, resource)?,
            },
            Step::Release { process, resource } => StepResult::Release {
                process,
                resource,
                released: monitor.release_resource(process, resource)?,
            },
            Step::SleepMs { ms } => {
                tokio::time::sleep(Duration::from_millis(ms)).await;
                StepResult::SleepMs { ms }
            }
            Step::Tick => {
                let report = monitor.tick()?;
                StepResult::Tick {
                    skipped: report.skipped,
                    victim: report.resolution.as_ref().and_then(|r| r.victim()),
                    cycle: report.cycle,
                }
            }
        };
        debug!(?result, "Step finished");
        results.push(result);
    }
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dlmon_config::Config;
    use dlmon_types::DenialReason;

    const RING: &str = r#"
name = "ring"
settle_ticks = 2

[[process]]
id = 0
name = "writer"
priority = "High"

[[process]]
id = 1
name = "reader"

[[process]]
id = 2
name = "indexer"
priority = "Low"

[[resource]]
id = 0
name = "disk"

[[resource]]
id = 1
name = "net"

[[resource]]
id = 2
name = "cache"

[[step]]
action = "request"
process = 0
resource = 0

[[step]]
action = "request"
process = 1
resource = 1

[[step]]
action = "request"
process = 2
resource = 2

[[step]]
action = "request"
process = 0
resource = 1

[[step]]
action = "request"
process = 1
resource = 2

[[step]]
action = "request"
process = 2
resource = 0

[[step]]
action = "sleep_ms"
ms = 5
"#;

    fn fast_config() -> Config {
        let mut config = Config::default();
        config.monitor.tick_interval_ms = 10;
        config.monitor.detection_throttle_ms = 0;
        config
    }

    #[test]
    fn parses_steps_and_defaults() {
        let scenario = Scenario::from_toml(RING).unwrap();
        assert_eq!(scenario.name, "ring");
        assert_eq!(scenario.settle_ticks, 2);
        assert_eq!(scenario.processes.len(), 3);
        assert_eq!(scenario.processes[1].priority, Priority::Medium);
        assert_eq!(scenario.resources[0].instances, 1);
        assert_eq!(
            scenario.steps[3],
            Step::Request {
                process: ProcessId(0),
                resource: ResourceId(1)
            }
        );
        assert_eq!(scenario.steps[6], Step::SleepMs { ms: 5 });
    }

    #[test]
    fn rejects_undeclared_entities() {
        let text = r#"
name = "broken"

[[process]]
id = 0
name = "only"

[[step]]
action = "request"
process = 0
resource = 9
"#;
        let err = Scenario::from_toml(text).unwrap_err();
        assert!(matches!(err, CliError::Scenario(msg) if msg.contains("R9")));
    }

    #[test]
    fn rejects_unknown_action() {
        let text = r#"
name = "broken"

[[step]]
action = "explode"
"#;
        assert!(matches!(
            Scenario::from_toml(text),
            Err(CliError::Scenario(_))
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn ring_is_detected_and_resolved() {
        let monitor = DeadlockMonitor::new(&fast_config());
        let scenario = Scenario::from_toml(RING).unwrap();

        let report = run(&monitor, &scenario).await.unwrap();

        assert_eq!(report.steps.len(), 7);
        assert!(report.steps.iter().take(3).all(|s| matches!(
            s,
            StepResult::Request {
                outcome: RequestOutcome::Granted { already_held: false },
                ..
            }
        )));
        assert_eq!(report.deadlocks.len(), 1);
        assert_eq!(report.deadlocks[0].cycle.len(), 3);
        assert_eq!(report.deadlocks[0].victim, Some(ProcessId(2)));
        assert_eq!(report.metrics.deadlocks_resolved, 1);
        assert!(report.safety.safe);
        assert!(!monitor.is_running());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn two_party_swap_is_denied() {
        let monitor = DeadlockMonitor::new(&fast_config());
        let scenario = crate::demos::two_party();

        let report = run(&monitor, &scenario).await.unwrap();

        let denied = report.steps.iter().filter(|s| {
            matches!(
                s,
                StepResult::Request {
                    outcome: RequestOutcome::Denied {
                        reason: DenialReason::WouldDeadlock
                    },
                    ..
                }
            )
        });
        assert_eq!(denied.count(), 1);
        assert_eq!(report.metrics.requests_denied, 1);
        assert!(report.deadlocks.is_empty());
    }
}
