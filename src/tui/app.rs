use anyhow::Result;
use ratatui::crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::future::Future;
use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

use grovr::aggregate;
use grovr::backend::dto::{AppSettings, ProjectConfig};
use grovr::backend::{Api, Backend};
use grovr::clipboard;
use grovr::config::Config;
use grovr::deep_link::{self, DeepLinkRequest};
use grovr::ide::{resolve_ide, IdePreset};
use grovr::model::{ProjectView, ViewModel, Worktree};
use grovr::quick_select::{Direction, QuickSelect};
use grovr::reorder::{self, PendingReorder};
use grovr::state::{reduce, Action, AppState, Page, StatusLine};
use grovr::use_cases::{
    self, CreateWorktreePrefill, CreateWorktreeRequest, DeepLinkTarget, DEFAULT_BASE_BRANCH,
    DEFAULT_WORKTREE_TEMPLATE,
};

use super::form::{Form, FormEvent};
use super::ui;

pub const F_ISSUE: &str = "Issue";
pub const F_DESCRIPTION: &str = "Description";
pub const F_BRANCH: &str = "Branch";
pub const F_BASE: &str = "Base branch";
pub const F_DEFAULT_BASE: &str = "Default base branch (blank to detect)";
pub const F_PATH: &str = "Path";
pub const F_FETCH: &str = "Fetch first";
pub const F_OPEN_IDE: &str = "Open in IDE";
pub const F_NAME: &str = "Name";
pub const F_REPO_PATH: &str = "Repository path";
pub const F_IDE: &str = "IDE";
pub const F_CUSTOM_COMMAND: &str = "Custom command";
pub const F_TEMPLATE: &str = "Path template";
pub const F_COPY_PATHS: &str = "Copy on create";
pub const F_PATTERNS: &str = "Clipboard patterns";
pub const F_REFRESH: &str = "Auto refresh (min)";

const STATUS_TTL: Duration = Duration::from_secs(3);
const ERROR_STATUS_TTL: Duration = Duration::from_secs(6);

pub enum Dialog {
    DeleteWorktree {
        repo_path: String,
        worktree: Worktree,
        delete_branch: bool,
        /// Second stage, offered after a normal removal failed.
        force: bool,
        last_error: Option<String>,
    },
    RemoveProject {
        repo_path: String,
        name: String,
    },
    Error {
        title: String,
        message: String,
    },
}

/// Results of background work, drained by the UI loop every tick.
enum Message {
    ViewModel {
        generation: u64,
        result: Result<ViewModel, String>,
    },
    Settings(Result<AppSettings, String>),
    /// A user action finished; close any form and reload.
    Done {
        status: String,
        select: Option<String>,
    },
    SettingsSaved(AppSettings),
    Failed {
        title: &'static str,
        error: String,
    },
    DeleteFailed {
        repo_path: String,
        worktree: Worktree,
        delete_branch: bool,
        force: bool,
        can_force: bool,
        worktree_removed: bool,
        error: String,
    },
    ReorderSaved {
        seq: u64,
    },
    ReorderFailed {
        seq: u64,
        pending: PendingReorder,
        error: String,
    },
    Info(String),
}

pub struct App {
    pub config: Config,
    api: Api,
    pub state: AppState,
    pub settings: AppSettings,
    settings_loaded: bool,
    pub quick: QuickSelect,
    pub focused_project: Option<String>,
    pub form: Option<Form>,
    create_prev_issue: String,
    create_path_edited: bool,
    pub dialog: Option<Dialog>,
    status_set_at: Option<Instant>,
    pub should_quit: bool,
    pending_link: Option<DeepLinkRequest>,
    last_refresh: Instant,
    tx: mpsc::UnboundedSender<Message>,
    rx: mpsc::UnboundedReceiver<Message>,
}

impl App {
    pub fn new(config: Config, api: Api, pending_link: Option<DeepLinkRequest>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            config,
            api,
            state: AppState::default(),
            settings: AppSettings::default(),
            settings_loaded: false,
            quick: QuickSelect::default(),
            focused_project: None,
            form: None,
            create_prev_issue: String::new(),
            create_path_edited: false,
            dialog: None,
            status_set_at: None,
            should_quit: false,
            pending_link,
            last_refresh: Instant::now(),
            tx,
            rx,
        }
    }

    fn dispatch(&mut self, action: Action) {
        let before = self.state.status.clone();
        self.state = reduce(std::mem::take(&mut self.state), action);
        if self.state.status.is_some() && self.state.status != before {
            self.status_set_at = Some(Instant::now());
        }
    }

    pub fn set_status(&mut self, message: impl Into<String>) {
        self.dispatch(Action::SetStatus(StatusLine::info(message)));
    }

    fn set_error_status(&mut self, message: impl Into<String>) {
        self.dispatch(Action::SetStatus(StatusLine::error(message)));
    }

    pub fn clear_old_status(&mut self) {
        let (Some(status), Some(set_at)) = (&self.state.status, self.status_set_at) else {
            return;
        };
        let ttl = if status.is_error {
            ERROR_STATUS_TTL
        } else {
            STATUS_TTL
        };
        if set_at.elapsed() > ttl {
            self.dispatch(Action::ClearStatus);
            self.status_set_at = None;
        }
    }

    fn spawn<F>(&self, work: F)
    where
        F: Future<Output = Message> + Send + 'static,
    {
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let _ = tx.send(work.await);
        });
    }

    fn show_error(&mut self, title: &str, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(title, error = %message, "action failed");
        self.dispatch(Action::SetStatus(StatusLine::error(format!("{} failed", title))));
        self.dialog = Some(Dialog::Error {
            title: title.to_string(),
            message,
        });
    }

    // ---- loading ----

    pub fn start_refresh(&mut self) {
        self.dispatch(Action::RefreshStarted);
        self.last_refresh = Instant::now();
        let generation = self.state.generation;
        let api = self.api.clone();
        tracing::debug!(generation, "refresh started");
        self.spawn(async move {
            let result = aggregate::refresh(&api).await.map_err(|e| e.to_string());
            Message::ViewModel { generation, result }
        });
    }

    pub fn load_settings(&self) {
        let api = self.api.clone();
        self.spawn(async move { Message::Settings(api.get_settings().await.map_err(|e| e.to_string())) });
    }

    pub fn drain_messages(&mut self) {
        while let Ok(message) = self.rx.try_recv() {
            self.handle_message(message);
        }
    }

    fn handle_message(&mut self, message: Message) {
        match message {
            Message::ViewModel { generation, result } => match result {
                Ok(view_model) => {
                    self.dispatch(Action::ViewModelLoaded {
                        generation,
                        view_model,
                    });
                    self.quick.reconcile(&self.state.nav_entries());
                    self.ensure_focused_project();
                    self.apply_pending_link();
                }
                Err(error) => self.dispatch(Action::RefreshFailed { generation, error }),
            },
            Message::Settings(result) => {
                match result {
                    Ok(settings) => self.settings = settings,
                    Err(e) => {
                        tracing::warn!(error = %e, "failed to load settings");
                        self.set_error_status(format!("Could not load settings: {}", e));
                    }
                }
                self.settings_loaded = true;
                self.apply_pending_link();
            }
            Message::Done { status, select } => {
                self.finish_action(status, select);
            }
            Message::SettingsSaved(settings) => {
                self.settings = settings;
                self.finish_action("Settings saved".to_string(), None);
            }
            Message::Failed { title, error } => {
                if let Some(form) = &mut self.form {
                    form.busy = false;
                    form.error = Some(error);
                } else {
                    self.show_error(title, error);
                }
            }
            Message::DeleteFailed {
                repo_path,
                worktree,
                delete_branch,
                force,
                can_force,
                worktree_removed,
                error,
            } => {
                if worktree_removed {
                    self.show_error("Delete branch", error);
                    self.start_refresh();
                } else if force || !can_force {
                    self.show_error(if force { "Force delete" } else { "Delete" }, error);
                } else {
                    tracing::info!(path = %worktree.path, "removal failed, offering force delete");
                    self.dialog = Some(Dialog::DeleteWorktree {
                        repo_path,
                        worktree,
                        delete_branch,
                        force: true,
                        last_error: Some(error),
                    });
                }
            }
            Message::ReorderSaved { seq } => {
                self.dispatch(Action::ReorderSaved { seq });
                self.set_status("Project order saved");
            }
            Message::ReorderFailed {
                seq,
                pending,
                error,
            } => {
                tracing::warn!(error = %error, seq, "project reorder not saved");
                self.dispatch(Action::ReorderFailed {
                    seq,
                    pending,
                    error,
                });
            }
            Message::Info(status) => self.set_status(status),
        }
    }

    fn finish_action(&mut self, status: String, select: Option<String>) {
        self.form = None;
        self.dialog = None;
        self.dispatch(Action::Navigate(Page::Worktrees));
        self.set_status(status);
        if let Some(path) = select {
            self.quick.select(path, Instant::now());
        }
        self.load_settings();
        self.start_refresh();
    }

    /// Deep links wait until both projects and settings have loaded once.
    fn apply_pending_link(&mut self) {
        if !self.state.loaded_once || !self.settings_loaded {
            return;
        }
        let Some(request) = self.pending_link.take() else {
            return;
        };
        let projects: Vec<ProjectView> = self.state.ordered_projects().into_iter().cloned().collect();
        match use_cases::resolve_deep_link(&request, &projects) {
            Ok(DeepLinkTarget::Settings) => self.open_settings_form(),
            Ok(DeepLinkTarget::CreateWorktree { prefill, notice }) => {
                if let Some(notice) = notice {
                    self.set_status(notice);
                }
                self.open_create_form(Some(prefill));
            }
            Err(e) => self.show_error("Deep link", e.to_string()),
        }
    }

    pub fn tick(&mut self) {
        let now = Instant::now();
        self.quick.tick(now);
        self.clear_old_status();

        let minutes = self.settings.refresh_interval_minutes;
        if minutes > 0
            && !self.state.loading
            && self.state.page == Page::Worktrees
            && self.dialog.is_none()
            && self.last_refresh.elapsed() >= Duration::from_secs(u64::from(minutes) * 60)
        {
            tracing::debug!(minutes, "auto refresh");
            self.start_refresh();
        }
    }

    // ---- selection ----

    pub fn selected_worktree(&self) -> Option<(&ProjectView, &Worktree)> {
        self.quick
            .selected()
            .and_then(|path| self.state.view_model.worktree(path))
    }

    pub fn focused_project(&self) -> Option<&ProjectView> {
        let ordered = self.state.ordered_projects();
        self.focused_project
            .as_deref()
            .and_then(|repo| ordered.iter().copied().find(|p| p.repo_path == repo))
            .or_else(|| ordered.first().copied())
    }

    fn ensure_focused_project(&mut self) {
        let still_there = self
            .focused_project
            .as_deref()
            .is_some_and(|repo| self.state.view_model.project(repo).is_some());
        if !still_there {
            self.focused_project = self.focused_project().map(|p| p.repo_path.clone());
        }
    }

    fn sync_focus_to_selection(&mut self) {
        if let Some(repo) = self.selected_worktree().map(|(p, _)| p.repo_path.clone()) {
            self.focused_project = Some(repo);
        }
    }

    fn cycle_focused_project(&mut self, forward: bool) {
        let order = &self.state.order;
        if order.is_empty() {
            return;
        }
        let current = self
            .focused_project()
            .and_then(|p| order.iter().position(|r| *r == p.repo_path))
            .unwrap_or(0);
        let next = if forward {
            (current + 1) % order.len()
        } else {
            (current + order.len() - 1) % order.len()
        };
        self.focused_project = Some(order[next].clone());
    }

    fn move_focused_project(&mut self, down: bool) {
        let Some(repo) = self.focused_project().map(|p| p.repo_path.clone()) else {
            return;
        };
        let Some(from) = self.state.order.iter().position(|r| *r == repo) else {
            return;
        };
        let to = if down {
            from + 1
        } else if from > 0 {
            from - 1
        } else {
            return;
        };

        let mut order = self.state.order.clone();
        let Some(pending) = reorder::begin_reorder(&mut order, from, to) else {
            return;
        };
        self.dispatch(Action::ReorderApplied {
            order: order.clone(),
        });
        let seq = self.state.reorder_seq;

        let api = self.api.clone();
        self.spawn(async move {
            match reorder::persist_reorder(&api, &order).await {
                Ok(()) => Message::ReorderSaved { seq },
                Err(e) => Message::ReorderFailed {
                    seq,
                    pending,
                    error: e.to_string(),
                },
            }
        });
    }

    // ---- events ----

    pub fn handle_event(&mut self, event: Event) -> Result<()> {
        let Event::Key(key) = event else {
            return Ok(());
        };
        if key.kind != KeyEventKind::Press {
            return Ok(());
        }
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return Ok(());
        }

        if self.dialog.is_some() {
            self.handle_dialog_key(key);
            return Ok(());
        }

        match self.state.page.clone() {
            Page::Worktrees => self.handle_worktrees_key(key),
            page => self.handle_form_key(page, key),
        }
        Ok(())
    }

    fn handle_worktrees_key(&mut self, key: KeyEvent) {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        let alt = key.modifiers.contains(KeyModifiers::ALT);
        let now = Instant::now();

        match key.code {
            KeyCode::Up if alt => self.move_focused_project(false),
            KeyCode::Down if alt => self.move_focused_project(true),
            KeyCode::Up => {
                self.quick
                    .navigate(Direction::Previous, &self.state.nav_entries(), now);
                self.sync_focus_to_selection();
            }
            KeyCode::Down => {
                self.quick.navigate(Direction::Next, &self.state.nav_entries(), now);
                self.sync_focus_to_selection();
            }
            KeyCode::Left | KeyCode::Right => {
                if let Some(repo) = self.focused_project().map(|p| p.repo_path.clone()) {
                    let expanded = self.state.is_expanded(&repo);
                    if expanded == (key.code == KeyCode::Left) {
                        self.dispatch(Action::ToggleExpanded(repo));
                        self.quick.reconcile(&self.state.nav_entries());
                    }
                }
            }
            KeyCode::Tab => self.cycle_focused_project(true),
            KeyCode::BackTab => self.cycle_focused_project(false),
            KeyCode::Enter => self.open_selected_in_ide(),
            KeyCode::Esc => self.quick.escape(),
            KeyCode::Backspace => {
                self.quick.pop_char(&self.state.nav_entries(), now);
                self.sync_focus_to_selection();
            }
            KeyCode::Char(c) if ctrl => match c {
                'q' => self.should_quit = true,
                'n' => self.open_create_form(None),
                'e' => self.open_edit_form(),
                'd' => self.open_delete_dialog(),
                't' => self.open_terminal(),
                'o' => self.open_file_browser(),
                'l' => self.pull_selected(),
                'r' => {
                    self.load_settings();
                    self.start_refresh();
                    self.set_status("Refreshing...");
                }
                's' => self.open_settings_form(),
                'p' => self.open_project_form(),
                'a' => self.open_add_project_form(),
                'g' => self.fetch_focused_project(),
                'x' => self.prune_focused_project(),
                'y' => self.copy_project_link(),
                _ => {}
            },
            KeyCode::Char(c) if !alt => {
                self.quick.push_char(c, &self.state.nav_entries(), now);
                self.sync_focus_to_selection();
            }
            _ => {}
        }
    }

    fn handle_dialog_key(&mut self, key: KeyEvent) {
        let Some(dialog) = self.dialog.take() else {
            return;
        };
        match dialog {
            Dialog::DeleteWorktree {
                repo_path,
                worktree,
                mut delete_branch,
                force,
                last_error,
            } => match key.code {
                KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                    self.delete_worktree(repo_path, worktree, delete_branch, force);
                }
                KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {}
                KeyCode::Char('b') | KeyCode::Char(' ') => {
                    delete_branch = !delete_branch;
                    self.dialog = Some(Dialog::DeleteWorktree {
                        repo_path,
                        worktree,
                        delete_branch,
                        force,
                        last_error,
                    });
                }
                _ => {
                    self.dialog = Some(Dialog::DeleteWorktree {
                        repo_path,
                        worktree,
                        delete_branch,
                        force,
                        last_error,
                    });
                }
            },
            Dialog::RemoveProject { repo_path, name } => match key.code {
                KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                    self.close_form();
                    let api = self.api.clone();
                    self.spawn(async move {
                        match use_cases::remove_project(&api, &repo_path).await {
                            Ok(()) => Message::Done {
                                status: format!("Removed project {}", name),
                                select: None,
                            },
                            Err(e) => Message::Failed {
                                title: "Remove project",
                                error: format!("{:#}", e),
                            },
                        }
                    });
                }
                KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {}
                _ => self.dialog = Some(Dialog::RemoveProject { repo_path, name }),
            },
            Dialog::Error { title, message } => match key.code {
                KeyCode::Enter | KeyCode::Esc | KeyCode::Char('q') => {}
                _ => self.dialog = Some(Dialog::Error { title, message }),
            },
        }
    }

    fn handle_form_key(&mut self, page: Page, key: KeyEvent) {
        if let Page::ProjectSettings(repo_path) = &page {
            if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('d') {
                let name = self
                    .state
                    .view_model
                    .project(repo_path)
                    .map(|p| p.name.clone())
                    .unwrap_or_else(|| repo_path.clone());
                self.dialog = Some(Dialog::RemoveProject {
                    repo_path: repo_path.clone(),
                    name,
                });
                return;
            }
        }

        let Some(form) = &mut self.form else {
            self.dispatch(Action::Navigate(Page::Worktrees));
            return;
        };
        if form.busy {
            if key.code == KeyCode::Esc {
                self.close_form();
            }
            return;
        }
        form.error = None;

        match form.handle_key(key) {
            FormEvent::None => {}
            FormEvent::Cancel => self.close_form(),
            FormEvent::Changed(label) => {
                if let Page::CreateWorktree(repo_path) = &page {
                    self.on_create_field_changed(repo_path, label);
                }
            }
            FormEvent::Submit => match page {
                Page::CreateWorktree(repo_path) => self.submit_create(repo_path),
                Page::EditWorktree(path) => self.submit_edit(path),
                Page::Settings => self.submit_settings(),
                Page::ProjectSettings(repo_path) => self.submit_project(repo_path),
                Page::AddProject => self.submit_add_project(),
                Page::Worktrees => {}
            },
        }
    }

    fn close_form(&mut self) {
        self.form = None;
        self.dispatch(Action::Navigate(Page::Worktrees));
    }

    // ---- create ----

    fn open_create_form(&mut self, prefill: Option<CreateWorktreePrefill>) {
        let from_link = prefill.is_some();
        let prefill = match prefill {
            Some(prefill) => prefill,
            None => {
                let Some(project) = self.focused_project() else {
                    self.set_error_status("Add a project first (Ctrl+A)");
                    return;
                };
                let mut prefill = CreateWorktreePrefill {
                    repo_path: project.repo_path.clone(),
                    ..Default::default()
                };
                let patterns = self.settings.clipboard_parse_patterns();
                if !patterns.is_empty() {
                    let parsed = clipboard::read_system_clipboard()
                        .and_then(|text| clipboard::parse_clipboard(&text, patterns));
                    if let Some(parsed) = parsed {
                        tracing::debug!(issue = %parsed.issue, "prefilled from clipboard");
                        prefill.branch = parsed.issue.clone();
                        prefill.issue = parsed.issue;
                        prefill.description = parsed.description.unwrap_or_default();
                    }
                }
                prefill
            }
        };

        let Some(project) = self.state.view_model.project(&prefill.repo_path) else {
            self.set_error_status("Project not found");
            return;
        };
        let base = project
            .default_base_branch
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_BRANCH.to_string());
        let path = use_cases::expand_worktree_path(
            self.settings.default_worktree_template.as_deref(),
            &project.repo_path,
            &prefill.branch,
            &prefill.description,
        );
        let form = Form::new(format!(" New worktree in {} ", project.name))
            .with_text(F_ISSUE, &prefill.issue)
            .with_text(F_DESCRIPTION, &prefill.description)
            .with_text(F_BRANCH, &prefill.branch)
            .with_text(F_BASE, &base)
            .with_text(F_PATH, &path)
            .with_toggle(F_FETCH, self.settings.fetch_before_create())
            .with_toggle(F_OPEN_IDE, true);

        tracing::debug!(repo = %prefill.repo_path, from_link, "opening create form");
        self.create_prev_issue = prefill.issue;
        self.create_path_edited = false;
        self.form = Some(form);
        self.dispatch(Action::Navigate(Page::CreateWorktree(prefill.repo_path)));
    }

    fn on_create_field_changed(&mut self, repo_path: &str, label: &'static str) {
        let template = self.settings.default_worktree_template.clone();
        let Some(form) = &mut self.form else {
            return;
        };
        match label {
            F_ISSUE => {
                let issue = form.text(F_ISSUE);
                let branch = form.text(F_BRANCH);
                let next = use_cases::branch_after_issue_edit(&branch, &self.create_prev_issue, &issue);
                if next != branch {
                    form.set_text(F_BRANCH, &next);
                }
                self.create_prev_issue = issue;
            }
            F_PATH => {
                self.create_path_edited = true;
                return;
            }
            F_BRANCH | F_DESCRIPTION => {}
            _ => return,
        }
        if !self.create_path_edited {
            let path = use_cases::expand_worktree_path(
                template.as_deref(),
                repo_path,
                &form.text(F_BRANCH),
                &form.text(F_DESCRIPTION),
            );
            form.set_text(F_PATH, &path);
        }
    }

    fn submit_create(&mut self, repo_path: String) {
        let Some(project) = self.state.view_model.project(&repo_path).cloned() else {
            self.close_form();
            return;
        };
        let Some(form) = &mut self.form else {
            return;
        };
        let request = CreateWorktreeRequest {
            branch: form.text(F_BRANCH),
            worktree_path: form.text(F_PATH),
            base_branch: Some(form.text(F_BASE)),
            description: form.text(F_DESCRIPTION),
            issue_key: form.text(F_ISSUE),
            open_ide: form.flag(F_OPEN_IDE),
        };
        if request.branch.trim().is_empty() || request.worktree_path.trim().is_empty() {
            form.error = Some("Branch name and worktree path are required".to_string());
            return;
        }
        let mut settings = self.settings.clone();
        settings.fetch_before_create = Some(form.flag(F_FETCH));
        form.busy = true;

        let api = self.api.clone();
        self.spawn(async move {
            match use_cases::create_worktree(&api, &settings, &project, &request).await {
                Ok(path) => Message::Done {
                    status: format!("Created worktree {}", request.branch.trim()),
                    select: Some(path),
                },
                Err(e) => Message::Failed {
                    title: "Create worktree",
                    error: format!("{:#}", e),
                },
            }
        });
    }

    // ---- edit / delete ----

    fn open_edit_form(&mut self) {
        let Some((_, worktree)) = self.selected_worktree() else {
            self.set_error_status("Select a worktree first");
            return;
        };
        let mut form = Form::new(format!(" Edit {} ", worktree.branch));
        if !worktree.is_main {
            form = form.with_text(F_BRANCH, &worktree.branch);
        }
        let form = form
            .with_text(F_DESCRIPTION, worktree.description.as_deref().unwrap_or(""))
            .with_text(F_ISSUE, worktree.issue_key.as_deref().unwrap_or(""));
        let path = worktree.path.clone();
        self.form = Some(form);
        self.dispatch(Action::Navigate(Page::EditWorktree(path)));
    }

    fn submit_edit(&mut self, path: String) {
        let Some((project, worktree)) = self.state.view_model.worktree(&path) else {
            self.close_form();
            return;
        };
        let repo_path = project.repo_path.clone();
        let worktree = worktree.clone();
        let Some(form) = &mut self.form else {
            return;
        };
        let branch = if worktree.is_main {
            worktree.branch.clone()
        } else {
            form.text(F_BRANCH)
        };
        let description = form.text(F_DESCRIPTION);
        let issue = form.text(F_ISSUE);
        form.busy = true;

        let api = self.api.clone();
        self.spawn(async move {
            match use_cases::edit_worktree(&api, &repo_path, &worktree, &branch, &description, &issue).await {
                Ok(()) => Message::Done {
                    status: "Worktree updated".to_string(),
                    select: Some(worktree.path),
                },
                Err(e) => Message::Failed {
                    title: "Edit worktree",
                    error: format!("{:#}", e),
                },
            }
        });
    }

    fn open_delete_dialog(&mut self) {
        let Some((project, worktree)) = self.selected_worktree() else {
            self.set_error_status("Select a worktree first");
            return;
        };
        if worktree.is_main {
            self.set_error_status("The main worktree cannot be deleted");
            return;
        }
        self.dialog = Some(Dialog::DeleteWorktree {
            repo_path: project.repo_path.clone(),
            worktree: worktree.clone(),
            delete_branch: false,
            force: false,
            last_error: None,
        });
    }

    fn delete_worktree(&mut self, repo_path: String, worktree: Worktree, delete_branch: bool, force: bool) {
        self.set_status(format!("Deleting {}...", worktree.branch));
        let api = self.api.clone();
        self.spawn(async move {
            match use_cases::delete_worktree(&api, &repo_path, &worktree, force, delete_branch).await {
                Ok(()) => Message::Done {
                    status: format!("Deleted worktree {}", worktree.branch),
                    select: None,
                },
                Err(e) => Message::DeleteFailed {
                    repo_path,
                    worktree,
                    delete_branch,
                    force,
                    can_force: e.can_force(),
                    worktree_removed: e.worktree_removed(),
                    error: e.to_string(),
                },
            }
        });
    }

    // ---- open / sync ----

    fn open_selected_in_ide(&mut self) {
        let Some(path) = self.quick.confirm().map(str::to_string) else {
            return;
        };
        let project_ide = self
            .state
            .view_model
            .worktree(&path)
            .and_then(|(p, _)| p.ide.clone());
        let settings = self.settings.clone();
        let (preset, _) = resolve_ide(project_ide.as_ref(), settings.ide.as_ref());
        let api = self.api.clone();
        self.spawn(async move {
            match use_cases::open_in_ide(&api, &settings, project_ide.as_ref(), &path).await {
                Ok(()) => Message::Info(format!("Opened in {}", preset.display_name())),
                Err(e) => Message::Failed {
                    title: "Open IDE",
                    error: format!("{:#}", e),
                },
            }
        });
    }

    fn open_terminal(&mut self) {
        let Some(path) = self.quick.selected().map(str::to_string) else {
            self.set_error_status("Select a worktree first");
            return;
        };
        let api = self.api.clone();
        self.spawn(async move {
            match use_cases::open_terminal(&api, &path).await {
                Ok(()) => Message::Info("Opened terminal".to_string()),
                Err(e) => Message::Failed {
                    title: "Open terminal",
                    error: format!("{:#}", e),
                },
            }
        });
    }

    fn open_file_browser(&mut self) {
        let Some(path) = self.quick.selected().map(str::to_string) else {
            self.set_error_status("Select a worktree first");
            return;
        };
        let api = self.api.clone();
        self.spawn(async move {
            match use_cases::open_in_file_browser(&api, &path).await {
                Ok(()) => Message::Info("Opened file browser".to_string()),
                Err(e) => Message::Failed {
                    title: "Open file browser",
                    error: format!("{:#}", e),
                },
            }
        });
    }

    fn pull_selected(&mut self) {
        let Some(path) = self.quick.selected().map(str::to_string) else {
            self.set_error_status("Select a worktree first");
            return;
        };
        self.set_status("Pulling...");
        let api = self.api.clone();
        self.spawn(async move {
            match use_cases::pull_worktree(&api, &path).await {
                Ok(()) => Message::Done {
                    status: "Pulled".to_string(),
                    select: Some(path),
                },
                Err(e) => Message::Failed {
                    title: "Pull",
                    error: format!("{:#}", e),
                },
            }
        });
    }

    fn fetch_focused_project(&mut self) {
        let Some(project) = self.focused_project() else {
            return;
        };
        let (repo_path, name) = (project.repo_path.clone(), project.name.clone());
        self.set_status(format!("Fetching {}...", name));
        let api = self.api.clone();
        self.spawn(async move {
            match use_cases::fetch_project(&api, &repo_path).await {
                Ok(()) => Message::Done {
                    status: format!("Fetched {}", name),
                    select: None,
                },
                Err(e) => Message::Failed {
                    title: "Fetch",
                    error: format!("{:#}", e),
                },
            }
        });
    }

    fn prune_focused_project(&mut self) {
        let Some(project) = self.focused_project() else {
            return;
        };
        let (repo_path, name) = (project.repo_path.clone(), project.name.clone());
        let api = self.api.clone();
        self.spawn(async move {
            match use_cases::prune_project(&api, &repo_path).await {
                Ok(()) => Message::Done {
                    status: format!("Pruned stale worktrees in {}", name),
                    select: None,
                },
                Err(e) => Message::Failed {
                    title: "Prune",
                    error: format!("{:#}", e),
                },
            }
        });
    }

    fn copy_project_link(&mut self) {
        let Some(project) = self.focused_project() else {
            return;
        };
        let link = deep_link::generate_create_worktree_link(Some(&project.name), None, None, None);
        match clipboard::write_system_clipboard(&link) {
            Ok(()) => self.set_status(format!("Copied {}", link)),
            Err(e) => {
                tracing::warn!(error = %e, "clipboard write failed");
                self.set_error_status(format!("Could not copy link: {}", e));
            }
        }
    }

    // ---- settings / projects ----

    fn open_settings_form(&mut self) {
        let settings = &self.settings;
        let (preset, custom) = resolve_ide(None, settings.ide.as_ref());
        let preset_index = IdePreset::ALL.iter().position(|p| *p == preset).unwrap_or(0);
        let form = Form::new(" Settings ")
            .with_choice(F_IDE, ide_options(), preset_index)
            .with_text(F_CUSTOM_COMMAND, custom.as_deref().unwrap_or(""))
            .with_text(
                F_TEMPLATE,
                settings
                    .default_worktree_template
                    .as_deref()
                    .unwrap_or(DEFAULT_WORKTREE_TEMPLATE),
            )
            .with_lines(F_COPY_PATHS, settings.copy_paths())
            .with_toggle(F_FETCH, settings.fetch_before_create())
            .with_lines(F_PATTERNS, settings.clipboard_parse_patterns())
            .with_text(F_REFRESH, &settings.refresh_interval_minutes.to_string());
        self.form = Some(form);
        self.dispatch(Action::Navigate(Page::Settings));
    }

    fn submit_settings(&mut self) {
        let current = self.settings.clone();
        let Some(form) = &mut self.form else {
            return;
        };
        let minutes = match form.text(F_REFRESH).trim().parse::<u32>() {
            Ok(minutes) => minutes,
            Err(_) => {
                form.error = Some("Auto refresh must be a whole number of minutes".to_string());
                return;
            }
        };

        let mut updated = current.clone();
        let preset = IdePreset::ALL
            .get(form.choice(F_IDE))
            .copied()
            .unwrap_or(IdePreset::Code);
        updated.ide = Some(preset.to_config(&form.text(F_CUSTOM_COMMAND)));
        let template = form.text(F_TEMPLATE);
        updated.default_worktree_template = (!template.trim().is_empty()).then(|| template.trim().to_string());
        updated.copy_paths = Some(form.lines(F_COPY_PATHS));
        updated.fetch_before_create = Some(form.flag(F_FETCH));
        updated.clipboard_parse_patterns = Some(form.lines(F_PATTERNS));
        updated.refresh_interval_minutes = minutes;

        if let Err(invalid) = clipboard::validate_patterns(updated.clipboard_parse_patterns()) {
            let first = &invalid[0];
            form.error = Some(format!("Invalid pattern {}: {}", first.pattern, first.error));
            return;
        }
        form.busy = true;

        let api = self.api.clone();
        self.spawn(async move {
            match use_cases::save_settings(&api, &current, &updated).await {
                Ok(()) => Message::SettingsSaved(updated),
                Err(e) => Message::Failed {
                    title: "Save settings",
                    error: format!("{:#}", e),
                },
            }
        });
    }

    fn open_project_form(&mut self) {
        let Some(project) = self.focused_project() else {
            self.set_error_status("Add a project first (Ctrl+A)");
            return;
        };
        let ide_index = match project
            .ide
            .as_ref()
            .filter(|c| c.preset.is_some() || c.custom_command.is_some())
        {
            Some(config) => {
                let (preset, _) = resolve_ide(Some(config), None);
                IdePreset::ALL.iter().position(|p| *p == preset).unwrap_or(0) + 1
            }
            None => 0,
        };
        let mut options = vec!["Global default".to_string()];
        options.extend(ide_options());

        let form = Form::new(format!(" {} ", project.repo_path))
            .with_text(F_NAME, &project.name)
            .with_text(
                F_BASE,
                project.default_base_branch.as_deref().unwrap_or(""),
            )
            .with_choice(F_IDE, options, ide_index)
            .with_text(
                F_CUSTOM_COMMAND,
                project
                    .ide
                    .as_ref()
                    .and_then(|c| c.custom_command.as_deref())
                    .unwrap_or(""),
            );
        let repo_path = project.repo_path.clone();
        self.form = Some(form);
        self.dispatch(Action::Navigate(Page::ProjectSettings(repo_path)));
    }

    fn submit_project(&mut self, repo_path: String) {
        let emoji = self
            .settings
            .projects
            .iter()
            .find(|p| p.repo_path == repo_path)
            .and_then(|p| p.emoji.clone());
        let Some(form) = &mut self.form else {
            return;
        };
        let base = form.text(F_BASE);
        let ide = match form.choice(F_IDE) {
            0 => None,
            i => IdePreset::ALL
                .get(i - 1)
                .map(|p| p.to_config(&form.text(F_CUSTOM_COMMAND))),
        };
        let project = ProjectConfig {
            name: form.text(F_NAME).trim().to_string(),
            repo_path: repo_path.clone(),
            default_base_branch: (!base.trim().is_empty()).then(|| base.trim().to_string()),
            ide,
            emoji,
        };
        form.busy = true;

        let api = self.api.clone();
        self.spawn(async move {
            match use_cases::update_project(&api, &repo_path, &project).await {
                Ok(()) => Message::Done {
                    status: format!("Saved {}", project.name),
                    select: None,
                },
                Err(e) => Message::Failed {
                    title: "Save project",
                    error: format!("{:#}", e),
                },
            }
        });
    }

    fn open_add_project_form(&mut self) {
        let form = Form::new(" Add project ")
            .with_text(F_REPO_PATH, "")
            .with_text(F_NAME, "")
            .with_text(F_DEFAULT_BASE, "");
        self.form = Some(form);
        self.dispatch(Action::Navigate(Page::AddProject));
    }

    fn submit_add_project(&mut self) {
        let Some(form) = &mut self.form else {
            return;
        };
        let repo_path = form.text(F_REPO_PATH);
        let name = form.text(F_NAME);
        let base = form.text(F_DEFAULT_BASE);
        form.busy = true;

        let api = self.api.clone();
        self.spawn(async move {
            match use_cases::add_project(&api, &repo_path, &name, &base).await {
                Ok(project) => Message::Done {
                    status: format!("Added project {}", project.name),
                    select: None,
                },
                Err(e) => Message::Failed {
                    title: "Add project",
                    error: format!("{:#}", e),
                },
            }
        });
    }
}

fn ide_options() -> Vec<String> {
    IdePreset::ALL
        .iter()
        .map(|p| p.display_name().to_string())
        .collect()
}

pub fn run_tui(
    config: Config,
    backend: Arc<dyn Backend>,
    pending_link: Option<DeepLinkRequest>,
) -> Result<()> {
    let mut app = App::new(config, Api::new(backend), pending_link);
    app.load_settings();
    app.start_refresh();

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_loop(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    tracing::info!("ui closed");
    result
}

fn run_loop(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>, app: &mut App) -> Result<()> {
    loop {
        terminal.draw(|f| ui::draw(f, app))?;

        if event::poll(Duration::from_millis(100))? {
            let event = event::read()?;
            app.handle_event(event)?;
        }

        app.drain_messages();
        app.tick();

        if app.should_quit {
            return Ok(());
        }
    }
}
