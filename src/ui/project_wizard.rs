use anyhow::Result;
use chrono::NaiveDate;
use crossterm::event::{self, Event, KeyCode};
use tui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Span, Spans},
    widgets::{Block, Borders, List, ListItem, Paragraph},
    Frame,
};

use crate::models::{NewProject, Project, ProjectUpdate};
use crate::ui::components::date_input::DateInputState;

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectDraft {
    pub client_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub budget_hours: Option<f64>,
}

impl ProjectDraft {
    pub fn into_new_project(self) -> NewProject {
        NewProject {
            description: self.description,
            start_date: self.start_date,
            due_date: self.due_date,
            budget_hours: self.budget_hours,
            ..NewProject::new(self.client_id, self.name)
        }
    }

    /// Full overwrite of the editable fields; blank text clears.
    pub fn into_update(self) -> ProjectUpdate {
        ProjectUpdate {
            client_id: Some(self.client_id),
            name: Some(self.name),
            description: Some(self.description),
            status: None,
            start_date: Some(self.start_date),
            due_date: Some(self.due_date),
            budget_hours: Some(self.budget_hours),
        }
    }
}

#[derive(Debug, PartialEq)]
pub enum ProjectWizardAction {
    Cancel,
    Create(ProjectDraft),
    Update(i64, ProjectDraft),
}

#[derive(Debug, Clone, PartialEq, Copy)]
pub enum ProjectField {
    Name,
    ClientId,
    Description,
    StartDate,
    DueDate,
    BudgetHours,
}

impl ProjectField {
    const ORDER: [ProjectField; 6] = [
        ProjectField::Name,
        ProjectField::ClientId,
        ProjectField::Description,
        ProjectField::StartDate,
        ProjectField::DueDate,
        ProjectField::BudgetHours,
    ];

    fn index(self) -> usize {
        Self::ORDER.iter().position(|f| *f == self).unwrap_or(0)
    }
}

pub struct ProjectWizardState {
    project_id: Option<i64>,
    pub name: String,
    pub client_id: String,
    pub description: String,
    pub budget_hours: String,
    pub current_field: ProjectField,
    pub editing: bool,
    pub start_date_state: DateInputState,
    pub due_date_state: DateInputState,
    pub error: Option<String>,
}

impl ProjectWizardState {
    pub fn new(client_id: Option<i64>) -> Self {
        let today = chrono::Local::now().date_naive();

        Self {
            project_id: None,
            name: String::new(),
            client_id: client_id.map(|id| id.to_string()).unwrap_or_default(),
            description: String::new(),
            budget_hours: String::new(),
            current_field: ProjectField::Name,
            editing: false,
            start_date_state: DateInputState::new(Some(today), today),
            due_date_state: DateInputState::new(None, today),
            error: None,
        }
    }

    pub fn from_existing(project: &Project) -> Self {
        let today = chrono::Local::now().date_naive();
        let fallback = project.start_date.unwrap_or(today);

        Self {
            project_id: Some(project.id),
            name: project.name.clone(),
            client_id: project.client_id.to_string(),
            description: project.description.clone().unwrap_or_default(),
            budget_hours: project
                .budget_hours
                .map(|h| h.to_string())
                .unwrap_or_default(),
            current_field: ProjectField::Name,
            editing: false,
            start_date_state: DateInputState::new(project.start_date, today),
            due_date_state: DateInputState::new(project.due_date, fallback),
            error: None,
        }
    }

    pub fn is_new(&self) -> bool {
        self.project_id.is_none()
    }

    pub fn toggle_editing(&mut self) {
        self.editing = !self.editing;
        if self.editing {
            match self.current_field {
                ProjectField::StartDate => self.start_date_state.toggle_editing(),
                ProjectField::DueDate => self.due_date_state.toggle_editing(),
                _ => {}
            }
        } else {
            self.start_date_state.editing = false;
            self.due_date_state.editing = false;
        }
    }

    pub fn next_field(&mut self) {
        let i = (self.current_field.index() + 1) % ProjectField::ORDER.len();
        self.current_field = ProjectField::ORDER[i];
    }

    pub fn previous_field(&mut self) {
        let len = ProjectField::ORDER.len();
        let i = (self.current_field.index() + len - 1) % len;
        self.current_field = ProjectField::ORDER[i];
    }

    pub fn edit_current_field(&mut self, key: KeyCode) {
        if !self.editing {
            return;
        }

        let text = match self.current_field {
            ProjectField::StartDate => {
                self.start_date_state.handle_input(key);
                return;
            }
            ProjectField::DueDate => {
                self.due_date_state.handle_input(key);
                return;
            }
            ProjectField::Name => &mut self.name,
            ProjectField::Description => &mut self.description,
            ProjectField::ClientId => &mut self.client_id,
            ProjectField::BudgetHours => &mut self.budget_hours,
        };
        match key {
            KeyCode::Char(c) => text.push(c),
            KeyCode::Backspace => {
                text.pop();
            }
            _ => {}
        }
    }

    /// Parse the form into a draft, or explain what is wrong with it.
    pub fn draft(&self) -> Result<ProjectDraft, String> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err("Name is required".into());
        }
        let client_id = self
            .client_id
            .trim()
            .parse::<i64>()
            .map_err(|_| "Client ID must be a number".to_string())?;
        let budget_hours = match self.budget_hours.trim() {
            "" => None,
            raw => Some(
                raw.parse::<f64>()
                    .ok()
                    .filter(|h| h.is_finite() && *h >= 0.0)
                    .ok_or_else(|| "Budget hours must be a non-negative number".to_string())?,
            ),
        };
        let start_date = self.start_date_state.date;
        let due_date = self.due_date_state.date;
        if let (Some(start), Some(due)) = (start_date, due_date) {
            if due < start {
                return Err("Due date must not precede the start date".into());
            }
        }
        let description = match self.description.trim() {
            "" => None,
            text => Some(text.to_string()),
        };

        Ok(ProjectDraft {
            client_id,
            name: name.to_string(),
            description,
            start_date,
            due_date,
            budget_hours,
        })
    }

    fn save(&mut self) -> Option<ProjectWizardAction> {
        match self.draft() {
            Ok(draft) => {
                self.error = None;
                Some(match self.project_id {
                    Some(id) => ProjectWizardAction::Update(id, draft),
                    None => ProjectWizardAction::Create(draft),
                })
            }
            Err(message) => {
                self.error = Some(message);
                None
            }
        }
    }
}

pub fn render_project_wizard<B: Backend>(
    f: &mut Frame<B>,
    area: Rect,
    state: &mut ProjectWizardState,
) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints(
            [
                Constraint::Length(3),
                Constraint::Min(8),
                Constraint::Length(3),
            ]
            .as_ref(),
        )
        .split(area);

    let title_text = if state.is_new() {
        "New Project"
    } else {
        "Edit Project"
    };

    let title = Paragraph::new(title_text)
        .style(Style::default().fg(Color::Cyan))
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(title, chunks[0]);

    render_form(f, state, chunks[1]);

    let help_text = match (&state.error, state.editing) {
        (Some(error), false) => error.clone(),
        (_, true) => match state.current_field {
            ProjectField::StartDate | ProjectField::DueDate => {
                "Enter - Done | Left/Right - Switch date part | Del - Clear date".to_string()
            }
            _ => "Enter - Done | Esc - Stop editing".to_string(),
        },
        (None, false) => {
            "Enter - Edit field | Up/Down - Navigate | S - Save | Esc - Cancel".to_string()
        }
    };
    let help_style = if state.error.is_some() && !state.editing {
        Style::default().fg(Color::Red)
    } else {
        Style::default().fg(Color::Gray)
    };

    let help = Paragraph::new(help_text)
        .style(help_style)
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(help, chunks[2]);
}

fn render_form<B: Backend>(f: &mut Frame<B>, state: &ProjectWizardState, area: Rect) {
    let field_names = [
        "Name",
        "Client ID",
        "Description",
        "Start Date",
        "Due Date",
        "Budget Hours",
    ];

    let field_values = [
        state.name.clone(),
        state.client_id.clone(),
        state.description.clone(),
        state.start_date_state.get_display_string(),
        state.due_date_state.get_display_string(),
        state.budget_hours.clone(),
    ];

    let current = state.current_field.index();
    let items: Vec<ListItem> = field_names
        .iter()
        .zip(field_values.iter())
        .enumerate()
        .map(|(i, (name, value))| {
            let content = if i == current && state.editing {
                let is_date = matches!(
                    state.current_field,
                    ProjectField::StartDate | ProjectField::DueDate
                );
                let shown = if is_date {
                    value.clone()
                } else {
                    format!("{value}|")
                };
                Spans::from(vec![
                    Span::styled(format!("{name}: "), Style::default().fg(Color::Yellow)),
                    Span::styled(shown, Style::default().add_modifier(Modifier::BOLD)),
                ])
            } else {
                let style = if i == current {
                    Style::default().fg(Color::Yellow)
                } else {
                    Style::default()
                };
                Spans::from(vec![
                    Span::styled(format!("{name}: "), style),
                    Span::raw(value.as_str()),
                ])
            };

            ListItem::new(content)
        })
        .collect();

    let form_list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title("Project Details"));

    f.render_widget(form_list, area);
}

pub fn handle_key(state: &mut ProjectWizardState, key: KeyCode) -> Option<ProjectWizardAction> {
    match key {
        KeyCode::Esc => {
            if state.editing {
                state.toggle_editing();
            } else {
                return Some(ProjectWizardAction::Cancel);
            }
        }
        KeyCode::Enter => state.toggle_editing(),
        KeyCode::Up if !state.editing => state.previous_field(),
        KeyCode::Down | KeyCode::Tab if !state.editing => state.next_field(),
        KeyCode::Char('s') if !state.editing => return state.save(),
        _ if state.editing => state.edit_current_field(key),
        _ => {}
    }
    None
}

pub fn handle_input(state: &mut ProjectWizardState) -> Result<Option<ProjectWizardAction>> {
    if let Event::Key(key) = event::read()? {
        return Ok(handle_key(state, key.code));
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn type_text(state: &mut ProjectWizardState, text: &str) {
        handle_key(state, KeyCode::Enter);
        for c in text.chars() {
            handle_key(state, KeyCode::Char(c));
        }
        handle_key(state, KeyCode::Enter);
    }

    #[test]
    fn create_requires_name_and_client() {
        let mut state = ProjectWizardState::new(None);
        assert_eq!(handle_key(&mut state, KeyCode::Char('s')), None);
        assert_eq!(state.error.as_deref(), Some("Name is required"));

        type_text(&mut state, "Storefront");
        assert_eq!(handle_key(&mut state, KeyCode::Char('s')), None);
        assert_eq!(state.error.as_deref(), Some("Client ID must be a number"));

        state.next_field();
        type_text(&mut state, "4");
        match handle_key(&mut state, KeyCode::Char('s')) {
            Some(ProjectWizardAction::Create(draft)) => {
                assert_eq!(draft.client_id, 4);
                assert_eq!(draft.name, "Storefront");
                assert_eq!(draft.due_date, None);
            }
            other => panic!("expected create, got {other:?}"),
        }
    }

    #[test]
    fn budget_must_be_non_negative() {
        let mut state = ProjectWizardState::new(Some(1));
        state.name = "Portal".into();
        state.budget_hours = "-5".into();
        assert!(state.draft().is_err());
        state.budget_hours = "120.5".into();
        assert_eq!(state.draft().unwrap().budget_hours, Some(120.5));
    }

    #[test]
    fn due_before_start_is_rejected() {
        let mut state = ProjectWizardState::new(Some(1));
        state.name = "Portal".into();
        state.start_date_state.date = NaiveDate::from_ymd_opt(2024, 5, 1);
        state.due_date_state.date = NaiveDate::from_ymd_opt(2024, 4, 1);
        assert!(state.draft().is_err());
    }

    #[test]
    fn editing_existing_project_yields_update() {
        let project = Project {
            id: 9,
            client_id: 2,
            name: "Intranet".into(),
            description: Some("phase two".into()),
            stage: crate::models::Stage::Development,
            status: crate::models::ProjectStatus::Active,
            start_date: None,
            due_date: None,
            budget_hours: Some(40.0),
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        };
        let mut state = ProjectWizardState::from_existing(&project);
        state.description.clear();
        match handle_key(&mut state, KeyCode::Char('s')) {
            Some(ProjectWizardAction::Update(9, draft)) => {
                let update = draft.into_update();
                assert_eq!(update.description, Some(None));
                assert_eq!(update.budget_hours, Some(Some(40.0)));
            }
            other => panic!("expected update, got {other:?}"),
        }
    }

    #[test]
    fn fields_wrap_around() {
        let mut state = ProjectWizardState::new(None);
        state.previous_field();
        assert_eq!(state.current_field, ProjectField::BudgetHours);
        state.next_field();
        assert_eq!(state.current_field, ProjectField::Name);
    }
}
