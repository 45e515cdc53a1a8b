//! UI rendering for the TUI.

use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Gauge, List, ListItem, Paragraph, Wrap},
};

use super::app::{Focus, Modal, TuiApp};

pub fn render(frame: &mut Frame, app: &TuiApp) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(0),    // Content
            Constraint::Length(3), // Progress
            Constraint::Length(3), // Footer/help
        ])
        .split(frame.area());

    render_header(frame, app, chunks[0]);
    render_content(frame, app, chunks[1]);
    render_progress(frame, app, chunks[2]);
    render_footer(frame, app, chunks[3]);

    if let Some(modal) = &app.modal {
        render_modal(frame, modal);
    }
}

fn render_header(frame: &mut Frame, app: &TuiApp, area: Rect) {
    let mode = if app.session.busy() { "  [WRITING]" } else { "" };
    let block = Block::default()
        .title(format!("USB Mate — usb-creator front-end{mode}"))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));
    frame.render_widget(block, area);
}

fn render_content(frame: &mut Frame, app: &TuiApp, area: Rect) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(32), Constraint::Min(0)])
        .split(area);

    render_devices(frame, app, columns[0]);

    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(6), // Device summary + flags
            Constraint::Length(3), // ISO path field
            Constraint::Min(0),    // ISOs on the device
        ])
        .split(columns[1]);

    render_device_summary(frame, app, right[0]);
    render_iso_field(frame, app, right[1]);
    render_iso_table(frame, app, right[2]);
}

fn render_devices(frame: &mut Frame, app: &TuiApp, area: Rect) {
    let focused = app.focus == Focus::Devices;
    let block = Block::default()
        .title("Devices")
        .borders(Borders::ALL)
        .border_style(border_style(focused));

    if app.session.devices.is_empty() {
        let text = Paragraph::new("  No removable devices")
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        frame.render_widget(text, area);
        return;
    }

    let items: Vec<ListItem> = app
        .session
        .devices
        .iter()
        .enumerate()
        .map(|(i, path)| {
            let is_selected = i == app.device_index;
            let style = if is_selected {
                Style::default()
                    .bg(Color::DarkGray)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            let line = Line::from(vec![
                Span::raw(if is_selected { "> " } else { "  " }),
                Span::raw(path.clone()),
            ]);
            ListItem::new(line).style(style)
        })
        .collect();

    frame.render_widget(List::new(items).block(block), area);
}

fn render_device_summary(frame: &mut Frame, app: &TuiApp, area: Rect) {
    let block = Block::default()
        .title("Device")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    let Some(device) = &app.session.current else {
        let text = Paragraph::new("  Select a device")
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        frame.render_widget(text, area);
        return;
    };

    let mount = device
        .mount_point
        .as_ref()
        .map(|m| m.display().to_string())
        .unwrap_or_else(|| "not mounted".to_string());

    let format_label = if app.session.format_locked {
        "[x] Format (no partition)"
    } else if app.session.format_device {
        "[x] Format"
    } else {
        "[ ] Format"
    };
    let repair_label = if app.session.repair_device {
        "[x] Repair"
    } else {
        "[ ] Repair"
    };

    let lines = vec![
        Line::from(vec![
            Span::styled("  Size:      ", Style::default().fg(Color::Cyan)),
            Span::raw(format!("{} MB", device.size_kb / 1024)),
            Span::styled("    Mount: ", Style::default().fg(Color::Cyan)),
            Span::raw(mount),
        ]),
        Line::from(vec![
            Span::styled("  Available: ", Style::default().fg(Color::Cyan)),
            Span::raw(format!("{} MB", app.session.available_kb() / 1024)),
            Span::styled("    Required: ", Style::default().fg(Color::Cyan)),
            Span::raw(format!("{} MB", app.session.required_kb() / 1024)),
        ]),
        Line::from(""),
        Line::from(vec![
            Span::raw("  "),
            Span::styled(format_label, Style::default().fg(Color::Yellow)),
            Span::raw("   "),
            Span::styled(repair_label, Style::default().fg(Color::Yellow)),
        ]),
    ];

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_iso_field(frame: &mut Frame, app: &TuiApp, area: Rect) {
    let (text, style, title) = if app.editing {
        (
            format!("{}▏", app.edit_buffer),
            Style::default().fg(Color::Yellow),
            "ISO — editing (Enter to set, Esc to cancel)",
        )
    } else {
        (
            app.session.iso_text.clone(),
            Style::default(),
            "ISO (file or directory of ISOs)",
        )
    };

    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(if app.editing {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default().fg(Color::Cyan)
        });

    frame.render_widget(Paragraph::new(text).style(style).block(block), area);
}

fn render_iso_table(frame: &mut Frame, app: &TuiApp, area: Rect) {
    let focused = app.focus == Focus::IsoTable;
    let block = Block::default()
        .title("ISOs on device")
        .borders(Borders::ALL)
        .border_style(border_style(focused));

    if app.session.isos.is_empty() {
        let text = Paragraph::new("  No ISOs found")
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        frame.render_widget(text, area);
        return;
    }

    let items: Vec<ListItem> = app
        .session
        .isos
        .iter()
        .enumerate()
        .map(|(i, iso)| {
            let is_cursor = focused && i == app.iso_index;
            let style = if is_cursor {
                Style::default()
                    .bg(Color::DarkGray)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            let check = if iso.selected { "[x]" } else { "[ ]" };
            let line = Line::from(vec![
                Span::raw(if is_cursor { "> " } else { "  " }),
                Span::raw(format!("{check} {:<40}  {:>9}  ", iso.name, iso.size_display())),
                Span::styled(iso.logo, Style::default().fg(Color::DarkGray)),
            ]);
            ListItem::new(line).style(style)
        })
        .collect();

    frame.render_widget(List::new(items).block(block), area);
}

fn render_progress(frame: &mut Frame, app: &TuiApp, area: Rect) {
    let block = Block::default()
        .title("Progress")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray));

    let progress = &app.session.progress;
    if app.session.busy() && progress.indeterminate {
        let width = area.width.saturating_sub(4) as usize;
        let bar = pulse_bar(progress.pulse, width);
        let text = Paragraph::new(format!(" {bar}"))
            .style(Style::default().fg(Color::Green))
            .block(block);
        frame.render_widget(text, area);
        return;
    }

    let gauge = Gauge::default()
        .block(block)
        .gauge_style(Style::default().fg(Color::Green))
        .ratio(progress.fraction.clamp(0.0, 1.0))
        .label(format!("{:.0}%", progress.fraction * 100.0));
    frame.render_widget(gauge, area);
}

fn render_footer(frame: &mut Frame, app: &TuiApp, area: Rect) {
    let help = if app.editing {
        "[Enter] Set  [Esc] Cancel".to_string()
    } else if app.modal.is_some() {
        "[Enter] OK  [Esc] Close".to_string()
    } else if app.session.busy() {
        "writing — controls disabled  [q] Quit".to_string()
    } else {
        "[Tab] Panel  [↑↓] Move  [Space] Select  [i] ISO  [f/p] Flags  [e] Execute  [d] Delete  [u] Unmount  [r] Refresh  [q] Quit"
            .to_string()
    };

    let spans = vec![
        Span::raw(format!("  {}  ", app.session.status)),
        Span::styled(help, Style::default().fg(Color::DarkGray)),
    ];

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray));
    frame.render_widget(Paragraph::new(Line::from(spans)).block(block), area);
}

fn render_modal(frame: &mut Frame, modal: &Modal) {
    let area = centered_rect(60, 30, frame.area());
    frame.render_widget(Clear, area);

    let (title, body, color, hint) = match modal {
        Modal::Message { title, body } => (title.as_str(), body.clone(), Color::Cyan, "[Enter] OK"),
        Modal::Error { title, body } => (title.as_str(), body.clone(), Color::Red, "[Enter] OK"),
        Modal::ConfirmDelete { count } => (
            "Delete",
            format!(
                "Are you sure you want to remove {count} selected ISO(s) from the device?"
            ),
            Color::Yellow,
            "[y] Yes  [n] No",
        ),
    };

    let block = Block::default()
        .title(title.to_string())
        .borders(Borders::ALL)
        .border_style(Style::default().fg(color));

    let mut lines: Vec<Line> = body.lines().map(|l| Line::from(l.to_string())).collect();
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        hint,
        Style::default().fg(Color::DarkGray),
    )));

    let paragraph = Paragraph::new(lines).wrap(Wrap { trim: true }).block(block);
    frame.render_widget(paragraph, area);
}

fn border_style(focused: bool) -> Style {
    if focused {
        Style::default().fg(Color::Green)
    } else {
        Style::default().fg(Color::Cyan)
    }
}

/// Bouncing block for phases with no fixed completion percentage.
fn pulse_bar(pulse: usize, width: usize) -> String {
    let block = 6.min(width);
    let span = width.saturating_sub(block);
    if span == 0 {
        return "█".repeat(width);
    }
    let phase = pulse % (2 * span);
    let position = if phase <= span { phase } else { 2 * span - phase };
    format!(
        "{}{}{}",
        "░".repeat(position),
        "█".repeat(block),
        "░".repeat(width - position - block)
    )
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1]);

    horizontal[1]
}
