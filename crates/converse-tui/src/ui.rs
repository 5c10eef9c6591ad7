use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, List, ListItem, Paragraph, Sparkline, Tabs};
use ratatui::Frame;

use converse_core::SessionPhase;

use crate::app::{App, Tab};

pub fn draw(frame: &mut Frame, app: &App) {
    let [tabs_area, main_area] =
        Layout::vertical([Constraint::Length(3), Constraint::Fill(1)]).areas(frame.area());

    draw_tabs(frame, app, tabs_area);

    match app.tab {
        Tab::Characters => draw_characters(frame, app, main_area),
        Tab::Session => draw_session(frame, app, main_area),
        Tab::Logs => draw_logs(frame, app, main_area),
    }
}

fn draw_tabs(frame: &mut Frame, app: &App, area: Rect) {
    let titles = vec!["1:Characters", "2:Session", "3:Logs"];
    let selected = match app.tab {
        Tab::Characters => 0,
        Tab::Session => 1,
        Tab::Logs => 2,
    };
    let tabs = Tabs::new(titles)
        .block(Block::default().borders(Borders::ALL).title("converse"))
        .select(selected)
        .highlight_style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD));
    frame.render_widget(tabs, area);
}

fn draw_characters(frame: &mut Frame, app: &App, area: Rect) {
    if app.state.characters.is_empty() {
        let block = Block::default()
            .borders(Borders::ALL)
            .title("Characters (R=refresh)");
        let para = Paragraph::new("No characters loaded — press R to refresh").block(block);
        frame.render_widget(para, area);
        return;
    }

    let items: Vec<ListItem> = app
        .state
        .characters
        .iter()
        .enumerate()
        .map(|(i, character)| {
            let marker = if i == app.selected_character { ">" } else { " " };
            let name_style = if i == app.selected_character {
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            let prompt = truncated(&character.prompt, 60);
            let line = Line::from(vec![
                Span::raw(format!("{} ", marker)),
                Span::styled(character.name.clone(), name_style),
                Span::styled(format!("  {}", prompt), Style::default().fg(Color::DarkGray)),
            ]);
            ListItem::new(line)
        })
        .collect();

    let list = List::new(items).block(
        Block::default()
            .borders(Borders::ALL)
            .title("Characters (Up/Down=select, Enter=chat, R=refresh)"),
    );
    frame.render_widget(list, area);
}

fn draw_session(frame: &mut Frame, app: &App, area: Rect) {
    let [header_area, status_area, wave_area, error_area, hint_area] = Layout::vertical([
        Constraint::Length(4),
        Constraint::Length(3),
        Constraint::Fill(1),
        Constraint::Length(3),
        Constraint::Length(1),
    ])
    .areas(area);

    draw_session_header(frame, app, header_area);
    draw_session_status(frame, app, status_area);
    draw_session_waveform(frame, app, wave_area);
    draw_session_error(frame, app, error_area);

    let hint = match app.state.phase {
        SessionPhase::Idle if app.state.response_bytes > 0 => {
            "r=record  p=replay  s=save  q=quit"
        }
        SessionPhase::Idle => "r=record  q=quit",
        SessionPhase::Recording => "r=stop and send",
        SessionPhase::Processing => "waiting for the reply…",
        SessionPhase::Playing => "p=stop playback",
    };
    frame.render_widget(
        Paragraph::new(hint).style(Style::default().fg(Color::DarkGray)),
        hint_area,
    );
}

fn draw_session_header(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default().borders(Borders::ALL).title("Character");
    let text = match &app.state.active_character {
        Some(character) => format!(
            "{}\n{}",
            character.name,
            truncated(&character.prompt, area.width.saturating_sub(2) as usize),
        ),
        None => "No character selected — pick one on the Characters tab".to_string(),
    };
    frame.render_widget(Paragraph::new(text).block(block), area);
}

fn draw_session_status(frame: &mut Frame, app: &App, area: Rect) {
    let (text, color) = match app.state.phase {
        SessionPhase::Idle if app.state.response_bytes > 0 => (
            format!(
                "idle — reply ready ({:.1} KiB)",
                app.state.response_bytes as f64 / 1024.0,
            ),
            Color::Reset,
        ),
        SessionPhase::Idle => ("idle".to_string(), Color::Reset),
        SessionPhase::Recording => (
            format!("recording {}", format_time(app.state.record_secs)),
            Color::Red,
        ),
        SessionPhase::Processing => ("processing…".to_string(), Color::Yellow),
        SessionPhase::Playing => ("playing reply".to_string(), Color::Green),
    };
    let block = Block::default().borders(Borders::ALL).title("Status");
    frame.render_widget(
        Paragraph::new(text).style(Style::default().fg(color)).block(block),
        area,
    );
}

fn draw_session_waveform(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default().borders(Borders::ALL).title("Reply");
    if app.state.waveform.is_empty() {
        frame.render_widget(Paragraph::new("").block(block), area);
        return;
    }

    let data: Vec<u64> = app
        .state
        .waveform
        .iter()
        .map(|&v| (v.clamp(0.0, 1.0) * 100.0) as u64)
        .collect();
    let color = if app.state.phase == SessionPhase::Playing {
        Color::Green
    } else {
        Color::Blue
    };
    let sparkline = Sparkline::default()
        .block(block)
        .style(Style::default().fg(color))
        .max(100)
        .data(&data);
    frame.render_widget(sparkline, area);
}

fn draw_session_error(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default().borders(Borders::ALL).title("Errors");
    let (text, style) = match &app.state.last_error {
        Some(message) => (message.clone(), Style::default().fg(Color::Red)),
        None => (String::new(), Style::default()),
    };
    frame.render_widget(Paragraph::new(text).style(style).block(block), area);
}

fn draw_logs(frame: &mut Frame, app: &App, area: Rect) {
    let logs = app.logs.lock().unwrap();
    let total = logs.len();

    let visible_height = area.height.saturating_sub(2) as usize; // account for borders
    let scroll = app.log_scroll.min(total.saturating_sub(visible_height));
    let end = total.saturating_sub(scroll);
    let start = end.saturating_sub(visible_height);

    let items: Vec<ListItem> = logs
        .iter()
        .skip(start)
        .take(end - start)
        .map(|s| ListItem::new(s.as_str()))
        .collect();

    let title = if app.log_auto_scroll {
        "Logs (auto-scroll)"
    } else {
        "Logs (Up/Down=scroll, G=bottom)"
    };
    let list = List::new(items).block(Block::default().borders(Borders::ALL).title(title));
    frame.render_widget(list, area);
}

fn format_time(secs: u64) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

fn truncated(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let cut: String = text.chars().take(max.saturating_sub(1)).collect();
    format!("{}…", cut)
}
