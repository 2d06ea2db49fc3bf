use anyhow::Result;
use crossterm::event::{self, Event, KeyCode};
use tui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Span, Spans},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
    Frame,
};

use crate::models::{Bug, BugFilter, BugSeverity, BugStatus};

pub struct BugsState {
    bugs: Vec<Bug>,
    list_state: ListState,
    /// Project the screen was opened from, if any.
    project_id: Option<i64>,
    /// When false, the list shows bugs across every project.
    scoped: bool,
}

impl BugsState {
    pub fn new(project_id: Option<i64>, bugs: Vec<Bug>) -> Self {
        let mut state = Self {
            bugs: Vec::new(),
            list_state: ListState::default(),
            project_id,
            scoped: project_id.is_some(),
        };
        state.set_bugs(bugs);
        state
    }

    pub fn set_bugs(&mut self, bugs: Vec<Bug>) {
        let selected = self.list_state.selected().unwrap_or(0);
        self.bugs = bugs;
        if self.bugs.is_empty() {
            self.list_state.select(None);
        } else {
            self.list_state.select(Some(selected.min(self.bugs.len() - 1)));
        }
    }

    pub fn filter(&self) -> BugFilter {
        BugFilter {
            project_id: if self.scoped { self.project_id } else { None },
            ..BugFilter::default()
        }
    }

    pub fn next(&mut self) {
        if self.bugs.is_empty() {
            return;
        }
        let i = match self.list_state.selected() {
            Some(i) if i + 1 < self.bugs.len() => i + 1,
            _ => 0,
        };
        self.list_state.select(Some(i));
    }

    pub fn previous(&mut self) {
        if self.bugs.is_empty() {
            return;
        }
        let i = match self.list_state.selected() {
            Some(0) | None => self.bugs.len() - 1,
            Some(i) => i - 1,
        };
        self.list_state.select(Some(i));
    }

    pub fn selected_bug(&self) -> Option<&Bug> {
        self.list_state.selected().and_then(|i| self.bugs.get(i))
    }

    pub fn replace(&mut self, bug: Bug) {
        if let Some(slot) = self.bugs.iter_mut().find(|b| b.id == bug.id) {
            *slot = bug;
        }
    }
}

#[derive(Debug, PartialEq)]
pub enum BugAction {
    Back,
    Reload,
    SetStatus(i64, BugStatus),
}

fn severity_color(severity: BugSeverity) -> Color {
    match severity {
        BugSeverity::Low => Color::Gray,
        BugSeverity::Medium => Color::White,
        BugSeverity::High => Color::Yellow,
        BugSeverity::Critical => Color::Red,
    }
}

pub fn render_bugs<B: Backend>(frame: &mut Frame<B>, area: Rect, state: &mut BugsState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(3)].as_ref())
        .split(area);

    let items: Vec<ListItem> = state
        .bugs
        .iter()
        .map(|bug| {
            ListItem::new(Spans::from(vec![
                Span::styled(
                    format!("{:<9}", bug.severity.as_str()),
                    Style::default().fg(severity_color(bug.severity)),
                ),
                Span::raw(format!("{:<12}", bug.status.as_str())),
                Span::raw(format!("#{} {}", bug.id, bug.title)),
            ]))
        })
        .collect();

    let title = match (state.scoped, state.project_id) {
        (true, Some(id)) => format!("Bugs (project {id}, {})", state.bugs.len()),
        _ => format!("Bugs (all projects, {})", state.bugs.len()),
    };

    let list = List::new(items)
        .block(Block::default().title(title).borders(Borders::ALL))
        .highlight_style(
            Style::default()
                .bg(Color::Blue)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        );
    frame.render_stateful_widget(list, chunks[0], &mut state.list_state);

    let help = if state.project_id.is_some() {
        "<S> Cycle status | <P> Toggle project filter | <R> Refresh | <Esc> Back"
    } else {
        "<S> Cycle status | <R> Refresh | <Esc> Back"
    };
    let buttons = Paragraph::new(help)
        .block(Block::default().borders(Borders::TOP))
        .style(Style::default().fg(Color::White));
    frame.render_widget(buttons, chunks[1]);
}

pub fn handle_key(state: &mut BugsState, key: KeyCode) -> Option<BugAction> {
    match key {
        KeyCode::Char('q') | KeyCode::Esc => Some(BugAction::Back),
        KeyCode::Char('r') => Some(BugAction::Reload),
        KeyCode::Char('s') => state
            .selected_bug()
            .map(|bug| BugAction::SetStatus(bug.id, bug.status.cycle())),
        KeyCode::Char('p') if state.project_id.is_some() => {
            state.scoped = !state.scoped;
            state.list_state.select(None);
            Some(BugAction::Reload)
        }
        KeyCode::Down => {
            state.next();
            None
        }
        KeyCode::Up => {
            state.previous();
            None
        }
        _ => None,
    }
}

pub fn handle_input(state: &mut BugsState) -> Result<Option<BugAction>> {
    if let Event::Key(key) = event::read()? {
        return Ok(handle_key(state, key.code));
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn bug(id: i64, status: BugStatus) -> Bug {
        Bug {
            id,
            project_id: 1,
            title: format!("bug {id}"),
            description: String::new(),
            severity: BugSeverity::Medium,
            status,
            reported_by: 1,
            assigned_to: None,
            resolved_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn status_key_cycles_selected_bug() {
        let mut state = BugsState::new(Some(1), vec![bug(4, BugStatus::Open)]);
        assert_eq!(
            handle_key(&mut state, KeyCode::Char('s')),
            Some(BugAction::SetStatus(4, BugStatus::InProgress))
        );
    }

    #[test]
    fn project_filter_toggles() {
        let mut state = BugsState::new(Some(3), vec![]);
        assert_eq!(state.filter().project_id, Some(3));
        assert_eq!(state.filter().per_page, None);
        assert_eq!(handle_key(&mut state, KeyCode::Char('p')), Some(BugAction::Reload));
        assert_eq!(state.filter().project_id, None);
    }

    #[test]
    fn unscoped_screen_ignores_filter_key() {
        let mut state = BugsState::new(None, vec![]);
        assert_eq!(handle_key(&mut state, KeyCode::Char('p')), None);
    }

    #[test]
    fn reload_keeps_selection_in_range() {
        let mut state = BugsState::new(None, vec![bug(1, BugStatus::Open), bug(2, BugStatus::Open)]);
        state.next();
        state.set_bugs(vec![bug(1, BugStatus::Closed)]);
        assert_eq!(state.selected_bug().map(|b| b.id), Some(1));
    }
}
