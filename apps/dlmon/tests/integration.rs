//! Integration tests for the dlmon CLI

use std::io::Write;
use std::process::Command;

fn dlmon() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_dlmon"));
    cmd.env_remove("RUST_LOG")
        .env_remove("DLMON_TICK_INTERVAL_MS")
        .env_remove("DLMON_DETECTION_THROTTLE_MS")
        .env_remove("DLMON_AUTO_RESOLVE")
        .env_remove("DLMON_VICTIM_POLICY")
        .env_remove("DLMON_OUTPUT");
    cmd
}

fn run_json(args: &[&str]) -> serde_json::Value {
    let output = dlmon()
        .args(args)
        .args(["--json", "--tick-ms", "20", "--throttle-ms", "0"])
        .output()
        .expect("Failed to execute dlmon");
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("stdout is not JSON")
}

#[test]
fn test_cli_version() {
    let output = dlmon()
        .arg("--version")
        .output()
        .expect("Failed to execute dlmon");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("dlmon"));
}

#[test]
fn test_cli_help() {
    let output = dlmon()
        .arg("--help")
        .output()
        .expect("Failed to execute dlmon");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Real-time deadlock monitor"));
    assert!(stdout.contains("run"));
    assert!(stdout.contains("demo"));
    assert!(stdout.contains("config"));
}

#[test]
fn test_cli_invalid_demo() {
    let output = dlmon()
        .args(["demo", "gridlock"])
        .output()
        .expect("Failed to execute dlmon");

    assert!(!output.status.success());
}

#[test]
fn test_demo_ring_resolves() {
    let report = run_json(&["demo", "ring"]);

    assert_eq!(report["scenario"], "ring");
    let deadlocks = report["deadlocks"].as_array().unwrap();
    assert_eq!(deadlocks.len(), 1);
    assert_eq!(deadlocks[0]["cycle"].as_array().unwrap().len(), 3);
    assert_eq!(deadlocks[0]["victim"], 2);
    assert_eq!(report["metrics"]["deadlocks_resolved"], 1);
    assert_eq!(report["safety"]["safe"], true);
}

#[test]
fn test_demo_two_party_denies() {
    let report = run_json(&["demo", "two-party"]);

    assert_eq!(report["metrics"]["requests_denied"], 1);
    assert!(report["deadlocks"].as_array().unwrap().is_empty());
    // P1's release lets the queued P0 take R1
    assert_eq!(report["snapshot"]["resources"]["1"]["holders"][0], 0);
}

#[test]
fn test_no_auto_resolve_leaves_cycle() {
    let report = run_json(&["demo", "ring", "--no-auto-resolve"]);

    let deadlocks = report["deadlocks"].as_array().unwrap();
    assert!(!deadlocks.is_empty());
    assert!(deadlocks.iter().all(|d| d["victim"].is_null()));
    assert_eq!(report["metrics"]["deadlocks_resolved"], 0);
    assert_eq!(report["safety"]["safe"], false);
}

#[test]
fn test_run_scenario_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
name = "handoff"

[[process]]
id = 0
name = "producer"

[[process]]
id = 1
name = "consumer"

[[resource]]
id = 0
name = "slot"

[[step]]
action = "request"
process = 0
resource = 0

[[step]]
action = "request"
process = 1
resource = 0

[[step]]
action = "release"
process = 0
resource = 0
"#
    )
    .unwrap();

    let path = file.path().to_str().unwrap();
    let report = run_json(&["run", path]);

    assert_eq!(report["scenario"], "handoff");
    assert_eq!(report["steps"][1]["outcome"]["outcome"], "queued");
    assert_eq!(report["steps"][2]["released"], true);
    assert_eq!(report["metrics"]["auto_grants"], 1);
    assert_eq!(report["snapshot"]["resources"]["0"]["holders"][0], 1);
}

#[test]
fn test_config_command_reflects_flags() {
    let output = dlmon()
        .args(["config", "--json", "--tick-ms", "250", "--victim-policy", "least-resources"])
        .output()
        .expect("Failed to execute dlmon");

    assert!(output.status.success());
    let config: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(config["monitor"]["tick_interval_ms"], 250);
    assert_eq!(config["monitor"]["victim_policy"], "least_resources");
}

#[test]
fn test_zero_tick_interval_rejected() {
    let output = dlmon()
        .args(["demo", "ring", "--tick-ms", "0"])
        .output()
        .expect("Failed to execute dlmon");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("tick_interval_ms"));
}
