//! Application state as a plain snapshot plus a reducer.
//!
//! The UI loop is the only owner. Async work reports back as [`Action`]s and
//! the loop folds them in with [`reduce`].

use std::collections::HashSet;

use crate::model::{ProjectView, ViewModel};
use crate::quick_select::NavEntry;
use crate::reorder::{self, PendingReorder};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Page {
    Worktrees,
    Settings,
    /// Settings of one project, by repository path.
    ProjectSettings(String),
    /// Create-worktree form for a project, by repository path.
    CreateWorktree(String),
    /// Edit form for a worktree, by worktree path.
    EditWorktree(String),
    AddProject,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLine {
    pub text: String,
    pub is_error: bool,
}

impl StatusLine {
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: false,
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppState {
    pub page: Page,
    pub view_model: ViewModel,
    /// Bumped on every refresh; responses tagged with an older value are stale.
    pub generation: u64,
    pub loading: bool,
    pub loaded_once: bool,
    /// Display order of projects by repository path.
    pub order: Vec<String>,
    pub expanded: HashSet<String>,
    known_projects: HashSet<String>,
    pub status: Option<StatusLine>,
    /// Sequence number of the latest optimistic reorder.
    pub reorder_seq: u64,
    reorders_in_flight: usize,
    /// Refresh generation current when the order was last moved locally.
    /// Refreshes up to this generation may carry the order from before the move.
    order_moved_at: u64,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            page: Page::Worktrees,
            view_model: ViewModel::empty(),
            generation: 0,
            loading: false,
            loaded_once: false,
            order: Vec::new(),
            expanded: HashSet::new(),
            known_projects: HashSet::new(),
            status: None,
            reorder_seq: 0,
            reorders_in_flight: 0,
            order_moved_at: 0,
        }
    }
}

#[derive(Debug, Clone)]
pub enum Action {
    RefreshStarted,
    ViewModelLoaded { generation: u64, view_model: ViewModel },
    RefreshFailed { generation: u64, error: String },
    Navigate(Page),
    ToggleExpanded(String),
    /// The optimistic order, already computed with [`reorder::begin_reorder`].
    /// Tags the move with the next [`AppState::reorder_seq`].
    ReorderApplied { order: Vec<String> },
    ReorderSaved { seq: u64 },
    ReorderFailed {
        seq: u64,
        pending: PendingReorder,
        error: String,
    },
    SetStatus(StatusLine),
    ClearStatus,
}

pub fn reduce(mut state: AppState, action: Action) -> AppState {
    match action {
        Action::RefreshStarted => {
            state.generation += 1;
            state.loading = true;
        }
        Action::ViewModelLoaded {
            generation,
            view_model,
        } => {
            if generation != state.generation {
                tracing::debug!(generation, current = state.generation, "discarding stale view model");
                return state;
            }
            for project in &view_model.projects {
                // Projects start expanded the first time they are seen
                if state.known_projects.insert(project.repo_path.clone()) {
                    state.expanded.insert(project.repo_path.clone());
                }
            }
            let incoming: Vec<String> = view_model
                .projects
                .iter()
                .map(|p| p.repo_path.clone())
                .collect();
            if state.reorders_in_flight > 0 || generation <= state.order_moved_at {
                // Loaded order may predate a local move; keep ours
                state.order = reorder::merge_order(&state.order, &incoming);
            } else {
                state.order = incoming;
            }
            state.view_model = view_model;
            state.loading = false;
            state.loaded_once = true;
        }
        Action::RefreshFailed { generation, error } => {
            if generation != state.generation {
                return state;
            }
            state.loading = false;
            state.loaded_once = true;
            state.status = Some(StatusLine::error(format!("Refresh failed: {}", error)));
        }
        Action::Navigate(page) => {
            state.page = page;
        }
        Action::ToggleExpanded(repo_path) => {
            if !state.expanded.remove(&repo_path) {
                state.expanded.insert(repo_path);
            }
        }
        Action::ReorderApplied { order } => {
            state.order = order;
            state.reorder_seq += 1;
            state.reorders_in_flight += 1;
            state.order_moved_at = state.generation;
        }
        Action::ReorderSaved { seq } => {
            state.reorders_in_flight = state.reorders_in_flight.saturating_sub(1);
            tracing::debug!(seq, "project order saved");
        }
        Action::ReorderFailed {
            seq,
            pending,
            error,
        } => {
            state.reorders_in_flight = state.reorders_in_flight.saturating_sub(1);
            if seq != state.reorder_seq {
                // A later move rewrote the whole order; its save decides what is stored
                tracing::debug!(seq, latest = state.reorder_seq, "superseded reorder failed");
                return state;
            }
            pending.rollback(&mut state.order);
            state.status = Some(StatusLine::error(format!(
                "Could not save project order: {}",
                error
            )));
        }
        Action::SetStatus(status) => {
            state.status = Some(status);
        }
        Action::ClearStatus => {
            state.status = None;
        }
    }
    state
}

impl AppState {
    /// Projects in display order.
    pub fn ordered_projects(&self) -> Vec<&ProjectView> {
        let mut projects: Vec<&ProjectView> = self.view_model.projects.iter().collect();
        reorder::apply_order(&mut projects, &self.order, |p| p.repo_path.as_str());
        projects
    }

    pub fn is_expanded(&self, repo_path: &str) -> bool {
        self.expanded.contains(repo_path)
    }

    /// The flattened list the quick-select navigator walks: worktrees of
    /// expanded projects, in display order.
    pub fn nav_entries(&self) -> Vec<NavEntry> {
        self.ordered_projects()
            .into_iter()
            .filter(|p| self.is_expanded(&p.repo_path))
            .flat_map(|project| {
                project.worktrees.iter().map(move |w| {
                    NavEntry::new(
                        w.path.clone(),
                        &[
                            w.branch.as_str(),
                            w.description.as_deref().unwrap_or(""),
                            w.issue_key.as_deref().unwrap_or(""),
                            project.name.as_str(),
                        ],
                    )
                })
            })
            .collect()
    }
}
