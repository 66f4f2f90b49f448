//! Renderable view-model: projects, their worktrees, and the integration
//! annotations attached for the duration of one load.

use chrono::{DateTime, Local};

use crate::backend::dto::{IdeConfig, JiraIssueInfo, PullRequestInfo};
use crate::project_match::Named;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Worktree {
    pub path: String,
    pub branch: String,
    pub is_main: bool,
    pub description: Option<String>,
    pub issue_key: Option<String>,
    pub pull_request: Option<PullRequestInfo>,
    pub issue: Option<JiraIssueInfo>,
}

impl Worktree {
    pub fn new(path: impl Into<String>, branch: impl Into<String>, is_main: bool) -> Self {
        Self {
            path: path.into(),
            branch: branch.into(),
            is_main,
            description: None,
            issue_key: None,
            pull_request: None,
            issue: None,
        }
    }

    pub fn has_description(&self) -> bool {
        self.description.as_deref().is_some_and(|d| !d.trim().is_empty())
    }

    pub fn has_issue_data(&self) -> bool {
        self.issue.is_some() || self.issue_key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectView {
    pub name: String,
    pub repo_path: String,
    pub default_base_branch: Option<String>,
    pub ide: Option<IdeConfig>,
    pub worktrees: Vec<Worktree>,
    /// Set when the worktree enumeration for this project failed.
    pub error: Option<String>,
}

impl ProjectView {
    pub fn main_worktree(&self) -> Option<&Worktree> {
        self.worktrees.iter().find(|w| w.is_main)
    }
}

impl Named for ProjectView {
    fn name(&self) -> &str {
        &self.name
    }
}

/// Which optional columns have data anywhere in the list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ColumnVisibility {
    pub description: bool,
    pub code_hosting: bool,
    pub issue_tracker: bool,
}

impl ColumnVisibility {
    pub fn from_projects(projects: &[ProjectView]) -> Self {
        let mut columns = ColumnVisibility::default();
        for worktree in projects.iter().flat_map(|p| p.worktrees.iter()) {
            columns.description |= worktree.has_description();
            columns.code_hosting |= worktree.pull_request.is_some();
            columns.issue_tracker |= worktree.has_issue_data();
        }
        columns
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewModel {
    pub projects: Vec<ProjectView>,
    pub columns: ColumnVisibility,
    pub loaded_at: DateTime<Local>,
}

impl ViewModel {
    pub fn new(projects: Vec<ProjectView>) -> Self {
        let columns = ColumnVisibility::from_projects(&projects);
        Self {
            projects,
            columns,
            loaded_at: Local::now(),
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn project(&self, repo_path: &str) -> Option<&ProjectView> {
        self.projects.iter().find(|p| p.repo_path == repo_path)
    }

    /// Find a worktree and its owning project by worktree path.
    pub fn worktree(&self, path: &str) -> Option<(&ProjectView, &Worktree)> {
        self.projects.iter().find_map(|project| {
            project
                .worktrees
                .iter()
                .find(|w| w.path == path)
                .map(|w| (project, w))
        })
    }
}

/// Main worktree first, then the rest ordered by branch name.
pub fn sort_worktrees(worktrees: &mut [Worktree]) {
    worktrees.sort_by(|a, b| b.is_main.cmp(&a.is_main).then_with(|| a.branch.cmp(&b.branch)));
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrStatus {
    Merged,
    Closed,
    Draft,
    ChecksFailed,
    ChangesRequested,
    Approved,
    Open,
}

impl PrStatus {
    pub fn label(&self) -> &'static str {
        match self {
            PrStatus::Merged => "Merged",
            PrStatus::Closed => "Closed",
            PrStatus::Draft => "Draft",
            PrStatus::ChecksFailed => "Checks Failed",
            PrStatus::ChangesRequested => "Changes Requested",
            PrStatus::Approved => "Approved",
            PrStatus::Open => "Open",
        }
    }
}

pub fn pr_status(pr: &PullRequestInfo) -> PrStatus {
    if pr.merged {
        PrStatus::Merged
    } else if pr.state == "closed" {
        PrStatus::Closed
    } else if pr.draft {
        PrStatus::Draft
    } else if pr.checks_status.as_deref() == Some("failure") {
        PrStatus::ChecksFailed
    } else if pr.review_decision.as_deref() == Some("CHANGES_REQUESTED") {
        PrStatus::ChangesRequested
    } else if pr.review_decision.as_deref() == Some("APPROVED") {
        PrStatus::Approved
    } else {
        PrStatus::Open
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueCategory {
    ToDo,
    InProgress,
    Done,
}

pub fn issue_category(issue: &JiraIssueInfo) -> IssueCategory {
    match issue.status_category.as_str() {
        "done" => IssueCategory::Done,
        // Jira reports in-progress work as "indeterminate"
        "indeterminate" | "inprogress" => IssueCategory::InProgress,
        _ => IssueCategory::ToDo,
    }
}
