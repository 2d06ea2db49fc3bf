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

use super::centered_rect;
use crate::models::{Project, Stage};

// Represents the state of the project list screen
pub struct ProjectsState {
    projects: Vec<Project>,
    list_state: ListState,
    show_delete_confirmation: bool,
}

impl ProjectsState {
    pub fn new(projects: Vec<Project>) -> Self {
        let mut list_state = ListState::default();
        if !projects.is_empty() {
            list_state.select(Some(0));
        }

        Self {
            projects,
            list_state,
            show_delete_confirmation: false,
        }
    }

    pub fn next(&mut self) {
        if self.projects.is_empty() {
            return;
        }
        let i = match self.list_state.selected() {
            Some(i) if i + 1 < self.projects.len() => i + 1,
            _ => 0,
        };
        self.list_state.select(Some(i));
    }

    pub fn previous(&mut self) {
        if self.projects.is_empty() {
            return;
        }
        let i = match self.list_state.selected() {
            Some(0) | None => self.projects.len() - 1,
            Some(i) => i - 1,
        };
        self.list_state.select(Some(i));
    }

    pub fn toggle_delete_confirmation(&mut self) {
        self.show_delete_confirmation = !self.show_delete_confirmation;
    }

    pub fn selected_project(&self) -> Option<&Project> {
        self.list_state.selected().and_then(|i| self.projects.get(i))
    }

    pub fn selected_project_id(&self) -> Option<i64> {
        self.selected_project().map(|p| p.id)
    }

    /// Swap in a refreshed copy of one project, keeping the selection.
    pub fn replace(&mut self, project: Project) {
        if let Some(slot) = self.projects.iter_mut().find(|p| p.id == project.id) {
            *slot = project;
        }
    }
}

#[derive(Debug, PartialEq)]
pub enum ProjectAction {
    Back,
    NewProject,
    EditProject(i64),
    DeleteProject(i64),
    AdvanceStage(i64),
    ViewBugs(i64),
}

fn stage_color(stage: Stage) -> Color {
    match stage {
        Stage::Design => Color::Magenta,
        Stage::Development => Color::Blue,
        Stage::Testing => Color::Yellow,
        Stage::Deployment => Color::Green,
    }
}

pub fn render_projects<B: Backend>(frame: &mut Frame<B>, area: Rect, state: &mut ProjectsState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(3)].as_ref())
        .split(area);

    let items: Vec<ListItem> = state
        .projects
        .iter()
        .map(|project| {
            let due = project
                .due_date
                .map(|d| format!("due {}", d.format("%Y-%m-%d")))
                .unwrap_or_else(|| "no due date".to_string());

            ListItem::new(Spans::from(vec![
                Span::styled(
                    format!("{:<12}", project.stage.as_str()),
                    Style::default().fg(stage_color(project.stage)),
                ),
                Span::raw(&project.name),
                Span::raw(format!(" ({}, {})", project.status.as_str(), due)),
            ]))
        })
        .collect();

    let projects_list = List::new(items)
        .block(Block::default().title("Projects").borders(Borders::ALL))
        .highlight_style(
            Style::default()
                .bg(Color::Blue)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        );

    frame.render_stateful_widget(projects_list, chunks[0], &mut state.list_state);

    let buttons_text = if state.selected_project().is_some() {
        "<N> New | <E> Edit | <A> Advance stage | <B> Bugs | <D> Delete | <Esc> Back"
    } else {
        "<N> New Project | <Esc> Back"
    };

    let buttons = Paragraph::new(buttons_text)
        .block(Block::default().borders(Borders::TOP))
        .style(Style::default().fg(Color::White));

    frame.render_widget(buttons, chunks[1]);

    if state.show_delete_confirmation {
        render_delete_confirmation(frame, area);
    }
}

fn render_delete_confirmation<B: Backend>(frame: &mut Frame<B>, size: Rect) {
    let popup_area = centered_rect(50, 20, size);

    let popup = Paragraph::new(vec![
        Spans::from(""),
        Spans::from("Are you sure you want to delete this project?"),
        Spans::from(""),
        Spans::from("It will disappear from every list and report."),
        Spans::from(""),
        Spans::from("<Y> Yes  <N> No"),
    ])
    .block(Block::default().title("Confirm Delete").borders(Borders::ALL))
    .style(Style::default().fg(Color::White).bg(Color::Black));

    frame.render_widget(popup, popup_area);
}

pub fn handle_key(state: &mut ProjectsState, key: KeyCode) -> Option<ProjectAction> {
    if state.show_delete_confirmation {
        match key {
            KeyCode::Char('y') => {
                state.toggle_delete_confirmation();
                return state.selected_project_id().map(ProjectAction::DeleteProject);
            }
            KeyCode::Char('n') | KeyCode::Char('q') | KeyCode::Esc => {
                state.toggle_delete_confirmation();
            }
            _ => {}
        }
        return None;
    }

    match key {
        KeyCode::Char('q') | KeyCode::Esc => Some(ProjectAction::Back),
        KeyCode::Char('n') => Some(ProjectAction::NewProject),
        KeyCode::Char('e') => state.selected_project_id().map(ProjectAction::EditProject),
        KeyCode::Char('a') => state.selected_project_id().map(ProjectAction::AdvanceStage),
        KeyCode::Char('b') | KeyCode::Enter => {
            state.selected_project_id().map(ProjectAction::ViewBugs)
        }
        KeyCode::Char('d') => {
            if state.selected_project().is_some() {
                state.toggle_delete_confirmation();
            }
            None
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

pub fn handle_input(state: &mut ProjectsState) -> Result<Option<ProjectAction>> {
    if let Event::Key(key) = event::read()? {
        return Ok(handle_key(state, key.code));
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ProjectStatus;
    use chrono::Utc;

    fn project(id: i64, name: &str) -> Project {
        Project {
            id,
            client_id: 1,
            name: name.into(),
            description: None,
            stage: Stage::Design,
            status: ProjectStatus::Active,
            start_date: None,
            due_date: None,
            budget_hours: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn selection_wraps_both_ways() {
        let mut state = ProjectsState::new(vec![project(1, "a"), project(2, "b")]);
        state.previous();
        assert_eq!(state.selected_project_id(), Some(2));
        state.next();
        assert_eq!(state.selected_project_id(), Some(1));
    }

    #[test]
    fn delete_needs_confirmation() {
        let mut state = ProjectsState::new(vec![project(7, "site")]);
        assert_eq!(handle_key(&mut state, KeyCode::Char('d')), None);
        assert!(state.show_delete_confirmation);
        assert_eq!(
            handle_key(&mut state, KeyCode::Char('y')),
            Some(ProjectAction::DeleteProject(7))
        );
        assert!(!state.show_delete_confirmation);
    }

    #[test]
    fn escape_cancels_confirmation_before_leaving() {
        let mut state = ProjectsState::new(vec![project(7, "site")]);
        handle_key(&mut state, KeyCode::Char('d'));
        assert_eq!(handle_key(&mut state, KeyCode::Esc), None);
        assert_eq!(handle_key(&mut state, KeyCode::Esc), Some(ProjectAction::Back));
    }

    #[test]
    fn advance_targets_selected_project() {
        let mut state = ProjectsState::new(vec![project(3, "app")]);
        assert_eq!(
            handle_key(&mut state, KeyCode::Char('a')),
            Some(ProjectAction::AdvanceStage(3))
        );
    }
}
