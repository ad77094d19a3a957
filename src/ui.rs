use ratatui::prelude::*;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Borders, Gauge, Paragraph, Tabs, Wrap};

use crate::session::{Session, SessionState};
use crate::theme::Theme;

const APP_TITLE: &str = "Turbo Optimizer";
const TAB_TITLES: [&str; 4] = ["Selection", "Confirm", "Running", "Summary"];
const TITLE_HEIGHT: u16 = 2;
const TABS_HEIGHT: u16 = 2;
const FOOTER_HEIGHT: u16 = 1;
const RECENT_LOG_LINES: usize = 6;
const SELECTION_HELP: &str = "Up/Down navigate | SPACE select | TAB continue";
const EXIT_WARNING: &str = "Exit? Press ESC again.";
const FOOTER_TEXT: &str = "q / Ctrl+C to quit immediately";
const RUNNING_HINT: &str = "Parallel execution active. Do not close the window.";
const SPINNER_FRAMES: [&str; 8] = ["⣾", "⣽", "⣻", "⢿", "⡿", "⣟", "⣯", "⣷"];
const TICKS_PER_SPINNER_FRAME: u64 = 6;

pub fn render(frame: &mut Frame, session: &Session, theme: &Theme) {
    let [title, tabs, body, footer] = Layout::vertical([
        Constraint::Length(TITLE_HEIGHT),
        Constraint::Length(TABS_HEIGHT),
        Constraint::Min(0),
        Constraint::Length(FOOTER_HEIGHT),
    ])
    .areas(frame.area());

    frame.render_widget(
        Paragraph::new(APP_TITLE)
            .style(Style::default().fg(theme.primary).add_modifier(Modifier::BOLD))
            .block(
                Block::default()
                    .borders(Borders::BOTTOM)
                    .border_type(BorderType::Rounded)
                    .border_style(Style::default().fg(theme.muted)),
            ),
        title,
    );
    render_tabs(frame, tabs, session.state(), theme);

    match session.state() {
        SessionState::Selection => render_selection(frame, body, session, theme),
        SessionState::Confirmation => render_confirmation(frame, body, session, theme),
        SessionState::Running => render_running(frame, body, session, theme),
        SessionState::Summary => render_summary(frame, body, session, theme),
    }

    frame.render_widget(
        Paragraph::new(FOOTER_TEXT).style(
            Style::default()
                .fg(theme.muted)
                .add_modifier(Modifier::ITALIC),
        ),
        footer,
    );
}

fn render_tabs(frame: &mut Frame, area: Rect, state: SessionState, theme: &Theme) {
    let tabs = Tabs::new(TAB_TITLES)
        .select(state.tab_index())
        .style(Style::default().fg(theme.muted))
        .highlight_style(
            Style::default()
                .fg(theme.primary)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
        )
        .divider(" ");
    frame.render_widget(tabs, area);
}

fn render_selection(frame: &mut Frame, area: Rect, session: &Session, theme: &Theme) {
    let mut lines = Vec::with_capacity(session.tasks().len() + 3);
    lines.push(if session.exit_confirm() {
        Line::styled(
            EXIT_WARNING,
            Style::default().fg(theme.error).add_modifier(Modifier::BOLD),
        )
    } else {
        Line::styled(SELECTION_HELP, Style::default().fg(theme.text))
    });
    lines.push(Line::default());

    for (idx, task) in session.tasks().iter().enumerate() {
        let under_cursor = idx == session.cursor();
        let marker = if under_cursor { "> " } else { "  " };
        let checkbox = if task.selected { "[x]" } else { "[ ]" };
        let text = format!("  {marker}{checkbox} {}", task.name);
        let style = if !task.selected {
            Style::default()
                .fg(theme.muted)
                .add_modifier(Modifier::CROSSED_OUT)
        } else if under_cursor {
            Style::default()
                .fg(theme.secondary)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(theme.text)
        };
        lines.push(Line::styled(text, style));
        if under_cursor && task.selected {
            lines.push(detail_line(&task.description, theme));
        }
    }

    frame.render_widget(Paragraph::new(lines), area);
}

fn render_confirmation(frame: &mut Frame, area: Rect, session: &Session, theme: &Theme) {
    let mut lines = vec![
        Line::from(vec![
            badge("[WARN]", theme.warning),
            Span::raw(" Run turbo optimization?"),
        ]),
        Line::default(),
    ];
    for task in session.tasks().iter().filter(|task| task.selected) {
        let (icon, style) = if task.critical {
            ("!", Style::default().fg(theme.warning))
        } else {
            ("•", Style::default().fg(theme.text))
        };
        lines.push(Line::styled(format!("  {icon} {}", task.name), style));
    }
    lines.push(Line::default());
    lines.push(action_bar(" ENTER: START ", " ESC: Back ", theme));

    frame.render_widget(Paragraph::new(lines), area);
}

fn render_running(frame: &mut Frame, area: Rect, session: &Session, theme: &Theme) {
    let [status, _gap, gauge, _gap2, logs, hint] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Length(1),
        Constraint::Length(1),
        Constraint::Length(1),
        Constraint::Min(3),
        Constraint::Length(1),
    ])
    .areas(area);

    frame.render_widget(
        Paragraph::new(Line::from(vec![
            Span::styled(
                spinner_frame(session.ticks),
                Style::default().fg(theme.primary),
            ),
            Span::raw(format!(
                " Processing {} tasks in parallel...",
                session.active_count()
            )),
        ])),
        status,
    );

    let ratio = session.progress().clamp(0.0, 1.0);
    frame.render_widget(
        Gauge::default()
            .gauge_style(Style::default().fg(theme.primary))
            .ratio(ratio)
            .label(progress_label(session)),
        gauge,
    );

    let recent = session.recent_logs(RECENT_LOG_LINES);
    let log_lines: Vec<Line> = if recent.is_empty() {
        vec![Line::raw("Starting engines...")]
    } else {
        recent.iter().map(|line| Line::raw(line.as_str())).collect()
    };
    frame.render_widget(
        Paragraph::new(log_lines)
            .style(Style::default().fg(theme.text))
            .wrap(Wrap { trim: true })
            .block(
                Block::bordered()
                    .border_type(BorderType::Rounded)
                    .border_style(Style::default().fg(theme.muted)),
            ),
        logs,
    );

    frame.render_widget(
        Paragraph::new(RUNNING_HINT).style(
            Style::default()
                .fg(theme.muted)
                .add_modifier(Modifier::ITALIC),
        ),
        hint,
    );
}

fn render_summary(frame: &mut Frame, area: Rect, session: &Session, theme: &Theme) {
    let mut lines = vec![
        Line::styled(
            "Turbo optimization complete!",
            Style::default().fg(theme.primary).add_modifier(Modifier::BOLD),
        ),
        Line::default(),
    ];
    for task in session
        .tasks()
        .iter()
        .filter(|task| task.selected && task.done)
    {
        let marker = if task.success {
            badge("[OK]", theme.primary)
        } else {
            badge("[ERR]", theme.error)
        };
        lines.push(Line::from(vec![marker, Span::raw(format!(" {}", task.name))]));
        if !task.log.is_empty() {
            lines.push(detail_line(&task.log, theme));
        }
    }
    lines.push(Line::default());

    let (ok, failed) = session.summary_counts();
    lines.push(if failed == 0 {
        Line::styled(
            format!("All {ok} tasks succeeded."),
            Style::default().fg(theme.primary),
        )
    } else {
        Line::from(vec![
            badge("[WARN]", theme.warning),
            Span::raw(format!(" {ok} OK, {failed} warnings.")),
        ])
    });
    lines.push(Line::default());
    lines.push(action_bar(" ENTER: New run ", " ESC: Menu ", theme));

    frame.render_widget(Paragraph::new(lines), area);
}

fn progress_label(session: &Session) -> String {
    format!(
        "{:.0}% ({}/{})",
        session.progress() * 100.0,
        session.completed(),
        session.total_tasks()
    )
}

fn spinner_frame(ticks: u64) -> &'static str {
    let idx = (ticks / TICKS_PER_SPINNER_FRAME) as usize % SPINNER_FRAMES.len();
    SPINNER_FRAMES[idx]
}

fn badge(text: &'static str, color: Color) -> Span<'static> {
    Span::styled(text, Style::default().fg(color).add_modifier(Modifier::BOLD))
}

fn detail_line(text: &str, theme: &Theme) -> Line<'static> {
    Line::styled(
        format!("     └─ {text}"),
        Style::default()
            .fg(theme.muted)
            .add_modifier(Modifier::ITALIC),
    )
}

fn action_bar(primary: &'static str, secondary: &'static str, theme: &Theme) -> Line<'static> {
    Line::from(vec![
        Span::styled(
            primary,
            Style::default()
                .bg(theme.primary)
                .fg(Color::Black)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(" "),
        Span::styled(
            secondary,
            Style::default()
                .bg(theme.muted)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        ),
    ])
}

#[cfg(test)]
#[path = "../tests/unit/ui_tests.rs"]
mod tests;
