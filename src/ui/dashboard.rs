use std::collections::BTreeMap;

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode};
use tui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Span, Spans},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use crate::models::Dashboard;

pub struct DashboardState {
    pub dashboard: Option<Dashboard>,
}

impl DashboardState {
    pub fn new(dashboard: Option<Dashboard>) -> Self {
        Self { dashboard }
    }
}

#[derive(Debug, PartialEq)]
pub enum DashboardAction {
    Quit,
    Refresh,
    Projects,
    Bugs,
}

fn count_line<'a>(label: &'a str, counts: &BTreeMap<String, i64>) -> Spans<'a> {
    let body = counts
        .iter()
        .map(|(key, n)| format!("{key} {n}"))
        .collect::<Vec<_>>()
        .join("  ");
    Spans::from(vec![
        Span::styled(format!("{label:<20}"), Style::default().fg(Color::Yellow)),
        Span::raw(body),
    ])
}

fn summary_lines(dashboard: &Dashboard) -> Vec<Spans<'_>> {
    let pass_rate = dashboard
        .uat
        .pass_rate
        .map(|rate| format!("{:.0}% pass", rate * 100.0))
        .unwrap_or_else(|| "not run".to_string());

    let mut lines = vec![
        Spans::from(vec![
            Span::styled("Projects            ", Style::default().fg(Color::Yellow)),
            Span::styled(
                dashboard.total_projects.to_string(),
                Style::default().add_modifier(Modifier::BOLD),
            ),
            Span::raw(format!("   active clients {}", dashboard.active_clients)),
        ]),
        count_line("  by stage", &dashboard.projects_by_stage),
        count_line("  by status", &dashboard.projects_by_status),
        Spans::from(""),
        count_line("Bugs", &dashboard.bugs_by_status),
        count_line("  open by severity", &dashboard.open_bugs_by_severity),
        Spans::from(""),
        Spans::from(vec![
            Span::styled("UAT                 ", Style::default().fg(Color::Yellow)),
            Span::raw(format!("{} cases, {}", dashboard.uat.total, pass_rate)),
        ]),
        Spans::from(vec![
            Span::styled("Hours (30 days)     ", Style::default().fg(Color::Yellow)),
            Span::raw(format!("{:.1}", dashboard.hours_last_30_days)),
        ]),
    ];

    for project in &dashboard.hours_by_project {
        lines.push(Spans::from(format!(
            "    {:<30} {:>8.1}",
            project.project_name, project.hours
        )));
    }

    lines.push(Spans::from(""));
    lines.push(Spans::from(Span::styled(
        "Recent deployments",
        Style::default().fg(Color::Yellow),
    )));
    for deployment in &dashboard.recent_deployments {
        lines.push(Spans::from(format!(
            "    project {} {} {} ({})",
            deployment.project_id,
            deployment.environment.as_str(),
            deployment.version,
            deployment.status.as_str()
        )));
    }
    lines
}

pub fn render_dashboard<B: Backend>(frame: &mut Frame<B>, area: Rect, state: &DashboardState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(3)].as_ref())
        .split(area);

    let lines = match &state.dashboard {
        Some(dashboard) => summary_lines(dashboard),
        None => vec![Spans::from("No data loaded. Press <R> to refresh.")],
    };

    let body = Paragraph::new(lines)
        .block(Block::default().title("Dashboard").borders(Borders::ALL))
        .wrap(Wrap { trim: false });
    frame.render_widget(body, chunks[0]);

    let buttons = Paragraph::new("<P> Projects | <B> Bugs | <R> Refresh | <Q> Quit")
        .block(Block::default().borders(Borders::TOP))
        .style(Style::default().fg(Color::White));
    frame.render_widget(buttons, chunks[1]);
}

pub fn handle_key(key: KeyCode) -> Option<DashboardAction> {
    match key {
        KeyCode::Char('q') | KeyCode::Esc => Some(DashboardAction::Quit),
        KeyCode::Char('r') => Some(DashboardAction::Refresh),
        KeyCode::Char('p') => Some(DashboardAction::Projects),
        KeyCode::Char('b') => Some(DashboardAction::Bugs),
        _ => None,
    }
}

pub fn handle_input() -> Result<Option<DashboardAction>> {
    if let Event::Key(key) = event::read()? {
        return Ok(handle_key(key.code));
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_map_to_screens() {
        assert_eq!(handle_key(KeyCode::Char('p')), Some(DashboardAction::Projects));
        assert_eq!(handle_key(KeyCode::Esc), Some(DashboardAction::Quit));
        assert_eq!(handle_key(KeyCode::Char('x')), None);
    }

    #[test]
    fn count_line_lists_every_key() {
        let counts: BTreeMap<String, i64> =
            [("open".to_string(), 2), ("closed".to_string(), 0)].into_iter().collect();
        let line = count_line("Bugs", &counts);
        let text: String = line.0.iter().map(|span| span.content.as_ref()).collect();
        assert!(text.ends_with("closed 0  open 2"), "{text}");
    }
}
