//! Plain-text renderer: a fixed-width table on stdout, with optional
//! ANSI colors. Used for `--once` snapshots and for terminals where
//! the alternate-screen TUI is unwelcome.

use std::io::IsTerminal;
use std::sync::Arc;

use tokio::sync::mpsc;

use stackmon_core::backend::StackBackend;
use stackmon_core::classify::{
    Severity, errors_severity, health_severity, ports_severity, state_severity,
};
use stackmon_core::context::MonitorConfig;
use stackmon_core::model::{GroupedRow, TableModel};
use stackmon_core::refresh::{ModelSink, RefreshSignal, run_refresh_loop};
use stackmon_core::snapshot::SnapshotBuilder;

const CID_W: usize = 13;
const STATE_W: usize = 14;
const HEALTH_W: usize = 12;
const ERR_W: usize = 12;
const PORT_W: usize = 16;

fn paint(text: &str, severity: Option<Severity>, color: bool) -> String {
    if !color {
        return text.to_string();
    }
    let code = match severity {
        Some(Severity::Normal) => "32",
        Some(Severity::Warn) => "33",
        Some(Severity::Critical) => "31",
        None => return text.to_string(),
    };
    format!("\x1b[{}m{}\x1b[0m", code, text)
}

fn pad(text: &str, width: usize) -> String {
    format!("{:<width$}", text, width = width)
}

/// Render one model as display lines. Column widths are fixed except
/// the service column, which tracks the longest name within bounds.
pub fn render(model: &TableModel, color: bool) -> Vec<String> {
    let svc_w = model
        .rows
        .iter()
        .filter_map(|r| match r {
            GroupedRow::Service(row) => Some(row.service.len()),
            GroupedRow::Header { .. } => None,
        })
        .max()
        .map(|longest| (longest + 2).clamp(12, 28))
        .unwrap_or(12);

    let mut lines = model.header.lines();
    lines.push(String::new());
    lines.push(format!(
        "{}{}{}{}{}{}",
        pad("CONTAINER", CID_W),
        pad("SERVICE", svc_w),
        pad("STATE", STATE_W),
        pad("HEALTH", HEALTH_W),
        pad("ERRORS", ERR_W),
        pad("PORTS", PORT_W),
    ));

    for row in &model.rows {
        match row {
            GroupedRow::Header { profile } => {
                lines.push(paint(&format!("[{}]", profile), None, color));
            }
            GroupedRow::Service(row) => {
                let errors = row.errors.to_string();
                let ports = row.ports.to_string();
                lines.push(format!(
                    "{}{}{}{}{}{}",
                    pad(row.short_id(), CID_W),
                    pad(&row.service, svc_w),
                    paint(&pad(&row.state, STATE_W), state_severity(&row.state), color),
                    paint(
                        &pad(&row.health, HEALTH_W),
                        health_severity(&row.health),
                        color,
                    ),
                    paint(&pad(&errors, ERR_W), errors_severity(&errors), color),
                    paint(&pad(&ports, PORT_W), ports_severity(&ports), color),
                ));
            }
        }
    }
    lines
}

/// Sink that repaints the whole screen on each publish.
struct PlainSink {
    color: bool,
    clear_screen: bool,
}

impl ModelSink for PlainSink {
    fn publish(&mut self, model: TableModel) {
        if self.clear_screen {
            print!("\x1b[2J\x1b[H");
        }
        for line in render(&model, self.color) {
            println!("{}", line);
        }
    }
}

fn stdout_color() -> bool {
    std::io::stdout().is_terminal()
}

/// Print a single snapshot and return.
pub async fn run_once(config: Arc<MonitorConfig>, backend: Arc<dyn StackBackend>) {
    let mut builder = SnapshotBuilder::new();
    let model = builder.build(&config, backend.as_ref(), 0.0).await;
    for line in render(&model, stdout_color()) {
        println!("{}", line);
    }
}

/// Repaint on every refresh until Ctrl-C.
pub async fn run_loop(config: Arc<MonitorConfig>, backend: Arc<dyn StackBackend>) {
    let (control_tx, control_rx) = mpsc::channel(8);
    let sink = PlainSink {
        color: stdout_color(),
        clear_screen: stdout_color(),
    };
    let loop_handle = tokio::spawn(run_refresh_loop(
        config,
        backend,
        Box::new(sink),
        control_rx,
    ));

    if tokio::signal::ctrl_c().await.is_ok() {
        let _ = control_tx.send(RefreshSignal::Shutdown).await;
    }
    let _ = loop_handle.await;
}
