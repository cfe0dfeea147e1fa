//! UI rendering functions
//!
//! Two-tab layout mirroring a classic task manager:
//! - Processes: 6-column table (PID, Name, Status, CPU %, Mem %, Threads)
//! - Memory: RAM usage over time
//!
//! Color thresholds:
//! - OK (Green): 0-50%
//! - CAREFUL (Cyan): 50-70%
//! - WARNING (Yellow): 70-90%
//! - CRITICAL (Red): 90-100%

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols,
    text::{Line, Span},
    widgets::{Axis, Block, Borders, Chart, Dataset, Gauge, GraphType, Paragraph, Row, Table, Tabs},
    Frame,
};

use super::app::App;

/// Get color based on percentage threshold
fn threshold_color(percent: f32) -> Color {
    match percent {
        p if p >= 90.0 => Color::Red,
        p if p >= 70.0 => Color::Yellow,
        p if p >= 50.0 => Color::Cyan,
        _ => Color::Green,
    }
}

/// Main drawing function
pub fn draw(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Tab bar
            Constraint::Min(0),    // Tab content
            Constraint::Length(3), // Footer
        ])
        .split(f.area());

    draw_tab_bar(f, app, chunks[0]);

    match app.selected_tab {
        0 => draw_processes_tab(f, app, chunks[1]),
        1 => draw_memory_tab(f, app, chunks[1]),
        _ => {}
    }

    draw_footer(f, app, chunks[2]);
}

fn draw_tab_bar(f: &mut Frame, app: &App, area: Rect) {
    let titles: Vec<Line> = app.tabs.iter().map(|t| Line::from(*t)).collect();
    let tabs = Tabs::new(titles)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(" taskmon — {} processes ", app.snapshot.len())),
        )
        .select(app.selected_tab)
        .highlight_style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        );
    f.render_widget(tabs, area);
}

fn draw_processes_tab(f: &mut Frame, app: &App, area: Rect) {
    if let Some(reason) = &app.scan_error {
        let banner = Paragraph::new(format!("process table unavailable: {}", reason))
            .style(Style::default().fg(Color::Red))
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL).title(" Processes "));
        f.render_widget(banner, area);
        return;
    }

    let header = Row::new(vec!["PID", "Name", "Status", "CPU %", "Mem %", "Threads"])
        .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
        .bottom_margin(1);

    // Window the rows so the selection stays visible
    let visible_rows = area.height.saturating_sub(4) as usize;
    let offset = if app.selected >= visible_rows {
        app.selected + 1 - visible_rows
    } else {
        0
    };

    let rows: Vec<Row> = app
        .snapshot
        .iter()
        .enumerate()
        .skip(offset)
        .take(visible_rows)
        .map(|(i, r)| {
            let style = if i == app.selected {
                Style::default()
                    .bg(Color::DarkGray)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(threshold_color(r.cpu_percent))
            };
            Row::new(vec![
                r.pid.to_string(),
                r.name.clone(),
                r.status.to_string(),
                format!("{:.1}", r.cpu_percent),
                format!("{:.1}", r.memory_percent),
                r.thread_count.to_string(),
            ])
            .style(style)
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Length(8),
            Constraint::Min(20),
            Constraint::Length(13),
            Constraint::Length(7),
            Constraint::Length(7),
            Constraint::Length(8),
        ],
    )
    .header(header)
    .block(Block::default().borders(Borders::ALL).title(" Processes "));

    f.render_widget(table, area);
}

fn draw_memory_tab(f: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0)])
        .split(area);

    let current = app.memory.last().map(|s| s.percent).unwrap_or(0.0);
    let gauge = Gauge::default()
        .block(Block::default().borders(Borders::ALL).title(" RAM in use "))
        .gauge_style(Style::default().fg(threshold_color(current)))
        .percent(current.clamp(0.0, 100.0) as u16)
        .label(format!("{:.1}%", current));
    f.render_widget(gauge, chunks[0]);

    let points: Vec<(f64, f64)> = app
        .memory
        .iter()
        .map(|s| (s.elapsed_secs, s.percent as f64))
        .collect();

    let x_min = points.first().map(|p| p.0).unwrap_or(0.0);
    let x_max = points.last().map(|p| p.0).unwrap_or(1.0).max(x_min + 1.0);

    let dataset = Dataset::default()
        .name("RAM %")
        .marker(symbols::Marker::Braille)
        .graph_type(GraphType::Line)
        .style(Style::default().fg(Color::Cyan))
        .data(&points);

    let chart = Chart::new(vec![dataset])
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" RAM Usage (%) over time "),
        )
        .x_axis(
            Axis::default()
                .title("Time (s)")
                .style(Style::default().fg(Color::DarkGray))
                .bounds([x_min, x_max])
                .labels(vec![
                    Span::from(format!("{:.0}", x_min)),
                    Span::from(format!("{:.0}", x_max)),
                ]),
        )
        .y_axis(
            Axis::default()
                .title("Memory %")
                .style(Style::default().fg(Color::DarkGray))
                .bounds([0.0, 100.0])
                .labels(vec![
                    Span::from("0"),
                    Span::from("50"),
                    Span::from("100"),
                ]),
        );

    f.render_widget(chart, chunks[1]);
}

fn draw_footer(f: &mut Frame, app: &App, area: Rect) {
    let text = match app.get_status_message() {
        Some(msg) => Line::from(Span::styled(
            msg.to_string(),
            Style::default().fg(Color::Yellow),
        )),
        None => Line::from(vec![
            Span::styled("q", Style::default().fg(Color::Cyan)),
            Span::raw(" quit  "),
            Span::styled("tab", Style::default().fg(Color::Cyan)),
            Span::raw(" switch view  "),
            Span::styled("↑/↓", Style::default().fg(Color::Cyan)),
            Span::raw(" select  "),
            Span::styled("e", Style::default().fg(Color::Cyan)),
            Span::raw(format!(
                " end task  (refresh every {:.0?})",
                app.tick_interval
            )),
        ]),
    };
    let footer = Paragraph::new(text)
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(footer, area);
}
