//! Terminal front end. Every screen talks to the server through
//! [`ApiClient`]; failed calls land in the status line instead of ending
//! the session.

use std::io;

use anyhow::Result;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{self, EnterAlternateScreen, LeaveAlternateScreen},
};
use tui::{
    backend::{Backend, CrosstermBackend},
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    widgets::Paragraph,
    Terminal,
};

use crate::api_client::{ApiClient, ClientResult};
use crate::models::ProjectFilter;

pub mod bugs;
pub mod components;
pub mod dashboard;
pub mod project_wizard;
pub mod projects;

use self::bugs::{BugAction, BugsState};
use self::dashboard::{DashboardAction, DashboardState};
use self::project_wizard::{ProjectWizardAction, ProjectWizardState};
use self::projects::{ProjectAction, ProjectsState};

enum Screen {
    Dashboard,
    Projects,
    ProjectWizard,
    Bugs,
}

struct App {
    client: ApiClient,
    screen: Screen,
    dashboard_state: DashboardState,
    projects_state: Option<ProjectsState>,
    project_wizard_state: Option<ProjectWizardState>,
    bugs_state: Option<BugsState>,
    status: Option<(String, bool)>,
    quit: bool,
}

impl App {
    fn new(client: ApiClient) -> Self {
        Self {
            client,
            screen: Screen::Dashboard,
            dashboard_state: DashboardState::new(None),
            projects_state: None,
            project_wizard_state: None,
            bugs_state: None,
            status: None,
            quit: false,
        }
    }

    fn info(&mut self, message: impl Into<String>) {
        self.status = Some((message.into(), false));
    }

    /// Keep the session alive on API failures and show what went wrong.
    fn report<T>(&mut self, result: ClientResult<T>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(err) => {
                tracing::debug!(error = %err, "api call failed");
                self.status = Some((err.to_string(), true));
                None
            }
        }
    }

    async fn load_dashboard(&mut self) {
        let result = self.client.dashboard().await;
        if let Some(dashboard) = self.report(result) {
            self.dashboard_state.dashboard = Some(dashboard);
        }
        self.screen = Screen::Dashboard;
    }

    async fn load_projects(&mut self) {
        let result = self.client.all_projects(&ProjectFilter::default()).await;
        if let Some(projects) = self.report(result) {
            self.projects_state = Some(ProjectsState::new(projects));
            self.screen = Screen::Projects;
        }
    }

    async fn load_bugs(&mut self, project_id: Option<i64>) {
        let mut state = BugsState::new(project_id, Vec::new());
        let result = self.client.all_bugs(&state.filter()).await;
        if let Some(bugs) = self.report(result) {
            state.set_bugs(bugs);
            self.bugs_state = Some(state);
            self.screen = Screen::Bugs;
        }
    }

    async fn reload_bugs(&mut self) {
        let Some(filter) = self.bugs_state.as_ref().map(BugsState::filter) else {
            return;
        };
        let result = self.client.all_bugs(&filter).await;
        if let Some(bugs) = self.report(result) {
            if let Some(state) = &mut self.bugs_state {
                state.set_bugs(bugs);
            }
        }
    }

    async fn on_dashboard(&mut self, action: DashboardAction) {
        match action {
            DashboardAction::Quit => self.quit = true,
            DashboardAction::Refresh => self.load_dashboard().await,
            DashboardAction::Projects => self.load_projects().await,
            DashboardAction::Bugs => self.load_bugs(None).await,
        }
    }

    async fn on_projects(&mut self, action: ProjectAction) {
        match action {
            ProjectAction::Back => self.load_dashboard().await,
            ProjectAction::NewProject => {
                self.project_wizard_state = Some(ProjectWizardState::new(None));
                self.screen = Screen::ProjectWizard;
            }
            ProjectAction::EditProject(id) => {
                let result = self.client.get_project(id).await;
                if let Some(project) = self.report(result) {
                    self.project_wizard_state = Some(ProjectWizardState::from_existing(&project));
                    self.screen = Screen::ProjectWizard;
                }
            }
            ProjectAction::DeleteProject(id) => {
                let result = self.client.delete_project(id).await;
                if self.report(result).is_some() {
                    self.load_projects().await;
                    self.info(format!("Deleted project {id}"));
                }
            }
            ProjectAction::AdvanceStage(id) => {
                let result = self.client.advance_stage(id, None).await;
                if let Some(project) = self.report(result) {
                    self.info(format!("{} moved to {}", project.name, project.stage.as_str()));
                    if let Some(state) = &mut self.projects_state {
                        state.replace(project);
                    }
                }
            }
            ProjectAction::ViewBugs(id) => self.load_bugs(Some(id)).await,
        }
    }

    async fn on_wizard(&mut self, action: ProjectWizardAction) {
        let result = match action {
            ProjectWizardAction::Cancel => {
                self.screen = Screen::Projects;
                return;
            }
            ProjectWizardAction::Create(draft) => {
                self.client.create_project(&draft.into_new_project()).await
            }
            ProjectWizardAction::Update(id, draft) => {
                self.client.update_project(id, &draft.into_update()).await
            }
        };
        if let Some(project) = self.report(result) {
            self.project_wizard_state = None;
            self.load_projects().await;
            self.info(format!("Saved {}", project.name));
        }
    }

    async fn on_bugs(&mut self, action: BugAction) {
        match action {
            BugAction::Back => {
                self.bugs_state = None;
                if self.projects_state.is_some() {
                    self.screen = Screen::Projects;
                } else {
                    self.load_dashboard().await;
                }
            }
            BugAction::Reload => self.reload_bugs().await,
            BugAction::SetStatus(id, status) => {
                let result = self.client.set_bug_status(id, status).await;
                if let Some(bug) = self.report(result) {
                    self.info(format!("Bug #{} is now {}", bug.id, bug.status.as_str()));
                    if let Some(state) = &mut self.bugs_state {
                        state.replace(bug);
                    }
                }
            }
        }
    }

    async fn handle_event(&mut self) -> Result<()> {
        match self.screen {
            Screen::Dashboard => {
                if let Some(action) = dashboard::handle_input()? {
                    self.status = None;
                    self.on_dashboard(action).await;
                }
            }
            Screen::Projects => {
                let action = match &mut self.projects_state {
                    Some(state) => projects::handle_input(state)?,
                    None => Some(ProjectAction::Back),
                };
                if let Some(action) = action {
                    self.status = None;
                    self.on_projects(action).await;
                }
            }
            Screen::ProjectWizard => {
                let action = match &mut self.project_wizard_state {
                    Some(state) => project_wizard::handle_input(state)?,
                    None => Some(ProjectWizardAction::Cancel),
                };
                if let Some(action) = action {
                    self.on_wizard(action).await;
                }
            }
            Screen::Bugs => {
                let action = match &mut self.bugs_state {
                    Some(state) => bugs::handle_input(state)?,
                    None => Some(BugAction::Back),
                };
                if let Some(action) = action {
                    self.status = None;
                    self.on_bugs(action).await;
                }
            }
        }
        Ok(())
    }
}

// Helper function to create a centered rect
pub(crate) fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

/// Take over the terminal until the user quits.
pub async fn run(client: ApiClient) -> Result<()> {
    terminal::enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(client);
    app.load_dashboard().await;

    let result = run_app(&mut terminal, &mut app).await;

    terminal::disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}

async fn run_app<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()> {
    while !app.quit {
        terminal.draw(|f| {
            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Min(1), Constraint::Length(1)].as_ref())
                .split(f.size());

            match app.screen {
                Screen::Dashboard => dashboard::render_dashboard(f, chunks[0], &app.dashboard_state),
                Screen::Projects => {
                    if let Some(state) = &mut app.projects_state {
                        projects::render_projects(f, chunks[0], state);
                    }
                }
                Screen::ProjectWizard => {
                    if let Some(state) = &mut app.project_wizard_state {
                        project_wizard::render_project_wizard(f, chunks[0], state);
                    }
                }
                Screen::Bugs => {
                    if let Some(state) = &mut app.bugs_state {
                        bugs::render_bugs(f, chunks[0], state);
                    }
                }
            }

            if let Some((message, is_error)) = &app.status {
                let color = if *is_error { Color::Red } else { Color::Green };
                let line = Paragraph::new(message.as_str()).style(Style::default().fg(color));
                f.render_widget(line, chunks[1]);
            }
        })?;

        app.handle_event().await?;
    }
    Ok(())
}
