//! Output rendering and formatting

use crate::scenario::{RunReport, StepResult};
use comfy_table::{presets::UTF8_FULL, Attribute, Cell, Color, ContentArrangement, Table};
use console::{Style, Term};
use dlmon_config::Config;
use dlmon_types::{DeadlockRecord, MetricsSnapshot, OutputFormat, RequestOutcome, SystemSnapshot};
use serde::Serialize;
use std::fmt::Display;
use std::io;

/// Output renderer for CLI results
#[derive(Clone)]
pub struct OutputRenderer {
    format: OutputFormat,
    term: Term,
}

impl OutputRenderer {
    /// Create new output renderer
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            term: Term::stdout(),
        }
    }

    /// Render a finished scenario run
    pub fn render_run(&self, report: &RunReport) -> io::Result<()> {
        if self.format == OutputFormat::Json {
            return render_json(report);
        }

        println!("{}", self.heading(&format!("Scenario: {}", report.scenario)));
        println!();
        self.render_steps(&report.steps);
        println!();
        self.render_snapshot(&report.snapshot);
        println!();
        self.render_metrics(&report.metrics);
        println!();
        self.render_deadlocks(&report.deadlocks);
        println!();
        if report.safety.safe {
            println!("Safe sequence: {}", join(&report.safety.sequence));
        } else {
            println!(
                "Unsafe state; cannot finish: {}",
                join(&report.safety.unfinished)
            );
        }
        Ok(())
    }

    /// Render the effective configuration
    pub fn render_config(&self, config: &Config) -> io::Result<()> {
        if self.format == OutputFormat::Json {
            return render_json(config);
        }
        let text = toml::to_string_pretty(config).map_err(io::Error::other)?;
        print!("{text}");
        Ok(())
    }

    fn render_steps(&self, steps: &[StepResult]) {
        println!("{}", self.heading("Steps"));
        let mut table = new_table(&["#", "Action", "Process", "Resource", "Result"]);
        for (index, step) in steps.iter().enumerate() {
            let row = match step {
                StepResult::Request {
                    process,
                    resource,
                    outcome,
                } => vec![
                    Cell::new(index),
                    Cell::new("request"),
                    Cell::new(process),
                    Cell::new(resource),
                    self.outcome_cell(outcome),
                ],
                StepResult::Release {
                    process,
                    resource,
                    released,
                } => vec![
                    Cell::new(index),
                    Cell::new("release"),
                    Cell::new(process),
                    Cell::new(resource),
                    Cell::new(if *released { "released" } else { "not held" }),
                ],
                StepResult::SleepMs { ms } => vec![
                    Cell::new(index),
                    Cell::new("sleep"),
                    Cell::new("-"),
                    Cell::new("-"),
                    Cell::new(format!("{ms}ms")),
                ],
                StepResult::Tick {
                    skipped,
                    cycle,
                    victim,
                } => {
                    let result = match (skipped, cycle, victim) {
                        (true, _, _) => "skipped".to_string(),
                        (false, Some(cycle), Some(victim)) => {
                            format!("{cycle}; terminated {victim}")
                        }
                        (false, Some(cycle), None) => format!("{cycle}; unresolved"),
                        (false, None, _) => "no cycle".to_string(),
                    };
                    vec![
                        Cell::new(index),
                        Cell::new("tick"),
                        Cell::new("-"),
                        Cell::new("-"),
                        Cell::new(result),
                    ]
                }
            };
            table.add_row(row);
        }
        println!("{table}");
    }

    fn render_snapshot(&self, snapshot: &SystemSnapshot) {
        println!("{}", self.heading("Processes"));
        if snapshot.processes.is_empty() {
            println!("No processes registered.");
        } else {
            let mut table = new_table(&["Id", "Name", "Priority", "Holds", "Waiting for"]);
            for process in snapshot.processes.values() {
                let waiting = if process.is_waiting() {
                    self.colored_cell(join(&process.waiting_for), Color::Yellow)
                } else {
                    Cell::new("-")
                };
                table.add_row(vec![
                    Cell::new(process.id),
                    Cell::new(&process.name),
                    Cell::new(process.priority),
                    Cell::new(join(&process.held)),
                    waiting,
                ]);
            }
            println!("{table}");
        }

        println!();
        println!("{}", self.heading("Resources"));
        if snapshot.resources.is_empty() {
            println!("No resources registered.");
        } else {
            let mut table = new_table(&["Id", "Name", "Available", "Holders", "Waiters"]);
            for resource in snapshot.resources.values() {
                table.add_row(vec![
                    Cell::new(resource.id),
                    Cell::new(&resource.name),
                    Cell::new(format!("{}/{}", resource.available, resource.total)),
                    Cell::new(join(&resource.holders)),
                    Cell::new(join(&resource.waiters)),
                ]);
            }
            println!("{table}");
        }
    }

    fn render_metrics(&self, metrics: &MetricsSnapshot) {
        println!("{}", self.heading("Metrics"));
        let mut table = new_table(&["Metric", "Value"]);
        let rows: [(&str, String); 11] = [
            ("Requests granted", metrics.requests_processed.to_string()),
            ("Requests queued", metrics.requests_queued.to_string()),
            ("Requests denied", metrics.requests_denied.to_string()),
            ("Waiters granted", metrics.auto_grants.to_string()),
            ("Releases", metrics.releases.to_string()),
            ("Deadlocks detected", metrics.deadlocks_detected.to_string()),
            ("Deadlocks resolved", metrics.deadlocks_resolved.to_string()),
            ("Ticks", metrics.ticks.to_string()),
            ("Tick failures", metrics.tick_failures.to_string()),
            (
                "Avg response time",
                format!("{:.3}ms", metrics.avg_response_time.as_secs_f64() * 1000.0),
            ),
            ("Throughput", format!("{:.2}/s", metrics.throughput)),
        ];
        for (name, value) in rows {
            table.add_row(vec![Cell::new(name), Cell::new(value)]);
        }
        println!("{table}");
    }

    fn render_deadlocks(&self, deadlocks: &[DeadlockRecord]) {
        println!("{}", self.heading("Deadlocks"));
        if deadlocks.is_empty() {
            println!("No deadlocks detected.");
            return;
        }
        let mut table = new_table(&["Time", "Cycle", "Victim"]);
        for record in deadlocks {
            let victim = match record.victim {
                Some(victim) => Cell::new(victim),
                None => self.colored_cell("unresolved", Color::Red),
            };
            table.add_row(vec![
                Cell::new(record.timestamp.format("%H:%M:%S%.3f")),
                Cell::new(&record.cycle),
                victim,
            ]);
        }
        println!("{table}");
    }

    fn outcome_cell(&self, outcome: &RequestOutcome) -> Cell {
        match outcome {
            RequestOutcome::Granted { .. } => self.colored_cell(outcome, Color::Green),
            RequestOutcome::Queued => self.colored_cell(outcome, Color::Yellow),
            RequestOutcome::Denied { .. } => self.colored_cell(outcome, Color::Red),
        }
    }

    fn colored_cell(&self, content: impl Display, color: Color) -> Cell {
        let cell = Cell::new(content);
        if self.supports_color() {
            cell.fg(color)
        } else {
            cell
        }
    }

    fn heading(&self, text: &str) -> String {
        if self.supports_color() {
            Style::new().bold().apply_to(text).to_string()
        } else {
            text.to_string()
        }
    }

    fn supports_color(&self) -> bool {
        self.term.features().colors_supported()
    }
}

fn render_json<T: Serialize + ?Sized>(value: &T) -> io::Result<()> {
    let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
    println!("{json}");
    Ok(())
}

fn new_table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(
            headers
                .iter()
                .map(|h| Cell::new(h).add_attribute(Attribute::Bold))
                .collect::<Vec<_>>(),
        );
    table
}

fn join<T: Display>(items: &[T]) -> String {
    if items.is_empty() {
        return "-".to_string();
    }
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
