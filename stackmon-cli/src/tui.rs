//! Full-screen TUI renderer. The refresh loop runs in a background
//! task and publishes models through a watch channel; the draw loop
//! always paints the latest one.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use crossterm::{
    event::{self, Event as CEvent, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    style::Style,
    text::Line,
    widgets::{Block, Borders, Cell, Paragraph, Row, Table},
};
use tokio::sync::{mpsc, watch};

use stackmon_core::backend::StackBackend;
use stackmon_core::classify::{
    errors_severity, health_severity, ports_severity, state_severity,
};
use stackmon_core::context::MonitorConfig;
use stackmon_core::model::{GroupedRow, TableModel};
use stackmon_core::refresh::{ModelSink, RefreshSignal, run_refresh_loop};

use crate::theme::Palette;

struct WatchSink(watch::Sender<Option<TableModel>>);

impl ModelSink for WatchSink {
    fn publish(&mut self, model: TableModel) {
        let _ = self.0.send(Some(model));
    }
}

fn setup_terminal() -> io::Result<Terminal<CrosstermBackend<io::Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend)
}

fn restore_terminal(mut terminal: Terminal<CrosstermBackend<io::Stdout>>) -> io::Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

pub async fn run(config: Arc<MonitorConfig>, backend: Arc<dyn StackBackend>) -> io::Result<()> {
    let (model_tx, model_rx) = watch::channel(None);
    let (control_tx, control_rx) = mpsc::channel(8);
    let loop_handle = tokio::spawn(run_refresh_loop(
        config,
        backend,
        Box::new(WatchSink(model_tx)),
        control_rx,
    ));

    let mut terminal = setup_terminal()?;
    let res = tui_loop(&mut terminal, model_rx, &control_tx).await;
    restore_terminal(terminal)?;

    let _ = control_tx.send(RefreshSignal::Shutdown).await;
    let _ = loop_handle.await;
    res
}

async fn tui_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    model_rx: watch::Receiver<Option<TableModel>>,
    control_tx: &mpsc::Sender<RefreshSignal>,
) -> io::Result<()> {
    let palette = Palette::default();
    loop {
        let model = model_rx.borrow().clone();
        terminal.draw(|f| draw(f, model.as_ref(), &palette))?;

        if event::poll(Duration::from_millis(100))? {
            if let CEvent::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                match key.code {
                    KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
                    KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                        return Ok(());
                    }
                    KeyCode::Char('r') => {
                        // Dropped when the loop is mid-build; the next
                        // cycle covers it.
                        let _ = control_tx.try_send(RefreshSignal::Refresh);
                    }
                    _ => {}
                }
            }
        }
    }
}

fn draw(f: &mut ratatui::Frame, model: Option<&TableModel>, palette: &Palette) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(7), Constraint::Min(3)])
        .split(f.area());

    let Some(model) = model else {
        let waiting = Paragraph::new("querying stack...")
            .style(Style::default().fg(palette.text_dim))
            .block(Block::default().borders(Borders::ALL));
        f.render_widget(waiting, chunks[0]);
        return;
    };

    let mut header_lines: Vec<Line> = model
        .header
        .lines()
        .into_iter()
        .map(|l| Line::styled(l, Style::default().fg(palette.text)))
        .collect();
    header_lines.push(Line::styled(
        "q quit | r refresh",
        Style::default().fg(palette.key_hint),
    ));
    let header = Paragraph::new(header_lines).block(Block::default().borders(Borders::ALL));
    f.render_widget(header, chunks[0]);

    let rows: Vec<Row> = model
        .rows
        .iter()
        .map(|row| match row {
            GroupedRow::Header { profile } => Row::new(vec![
                Cell::from(format!("[{}]", profile)).style(palette.group_header()),
            ]),
            GroupedRow::Service(row) => {
                let errors = row.errors.to_string();
                let ports = row.ports.to_string();
                Row::new(vec![
                    Cell::from(row.short_id().to_string())
                        .style(Style::default().fg(palette.text_dim)),
                    Cell::from(row.service.clone()).style(Style::default().fg(palette.text)),
                    Cell::from(row.state.clone())
                        .style(palette.severity_style(state_severity(&row.state))),
                    Cell::from(row.health.clone())
                        .style(palette.severity_style(health_severity(&row.health))),
                    Cell::from(errors.clone())
                        .style(palette.severity_style(errors_severity(&errors))),
                    Cell::from(ports.clone())
                        .style(palette.severity_style(ports_severity(&ports))),
                ])
            }
        })
        .collect();

    let widths = [
        Constraint::Length(13),
        Constraint::Min(12),
        Constraint::Length(14),
        Constraint::Length(12),
        Constraint::Length(12),
        Constraint::Length(16),
    ];
    let table = Table::new(rows, widths)
        .header(
            Row::new(vec!["CONTAINER", "SERVICE", "STATE", "HEALTH", "ERRORS", "PORTS"])
                .style(Style::default().fg(palette.text_dim)),
        )
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(table, chunks[1]);
}
