//! Builds the [`ViewModel`] from project configuration, live worktree
//! enumeration, saved memos and optional integration lookups.
//!
//! Every project and every worktree loads independently and concurrently.
//! Within one worktree the memo, issue and pull-request steps run in order
//! because the issue lookup needs the memo's issue key. Enrichment failures
//! are logged and degrade to "no data"; they never fail a sibling.

use std::path::Path;

use futures::future::join_all;

use crate::backend::dto::{BackendWorktree, ProjectConfig, WorktreeMemo};
use crate::backend::{Api, BackendResult};
use crate::model::{sort_worktrees, ProjectView, ViewModel, Worktree};

/// Which optional integrations are configured on the backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Integrations {
    pub code_hosting: bool,
    pub issue_tracker: bool,
}

/// A failed config lookup counts as "not configured".
pub async fn detect_integrations(api: &Api) -> Integrations {
    let (github, jira) = futures::join!(api.get_github_config(), api.get_jira_config());

    let code_hosting = match github {
        Ok(config) => config.is_some(),
        Err(e) => {
            tracing::warn!(error = %e, "failed to read code-hosting config");
            false
        }
    };
    let issue_tracker = match jira {
        Ok(config) => config.is_some_and(|c| c.has_token.unwrap_or(false)),
        Err(e) => {
            tracing::warn!(error = %e, "failed to read issue-tracker config");
            false
        }
    };

    Integrations {
        code_hosting,
        issue_tracker,
    }
}

/// Full reload: project list, integration detection, then aggregation.
pub async fn refresh(api: &Api) -> BackendResult<ViewModel> {
    let (projects, integrations) = futures::join!(api.get_projects(), detect_integrations(api));
    let projects = projects?;
    tracing::debug!(
        projects = projects.len(),
        code_hosting = integrations.code_hosting,
        issue_tracker = integrations.issue_tracker,
        "refreshing view model"
    );
    Ok(load_view_model(api, &projects, integrations).await)
}

pub async fn load_view_model(
    api: &Api,
    projects: &[ProjectConfig],
    integrations: Integrations,
) -> ViewModel {
    let views = join_all(
        projects
            .iter()
            .map(|project| load_project(api, project, integrations)),
    )
    .await;
    ViewModel::new(views)
}

async fn load_project(api: &Api, project: &ProjectConfig, integrations: Integrations) -> ProjectView {
    let mut view = ProjectView {
        name: project.name.clone(),
        repo_path: project.repo_path.clone(),
        default_base_branch: project.default_base_branch.clone(),
        ide: project.ide.clone(),
        worktrees: Vec::new(),
        error: None,
    };

    let listed = match api.get_worktrees(&project.repo_path).await {
        Ok(listed) => listed,
        Err(e) => {
            tracing::warn!(repo = %project.repo_path, error = %e, "failed to list worktrees");
            view.error = Some(e.to_string());
            return view;
        }
    };

    let owner_repo = owner_repo_from_path(&project.repo_path);
    let mut worktrees = join_all(
        listed
            .into_iter()
            // A bare main entry stays so the project keeps its main worktree
            .filter(|w| !w.is_bare || w.is_main)
            .map(|w| load_worktree(api, w, owner_repo.as_ref(), integrations)),
    )
    .await;
    sort_worktrees(&mut worktrees);
    view.worktrees = worktrees;
    view
}

async fn load_worktree(
    api: &Api,
    listed: BackendWorktree,
    owner_repo: Option<&(String, String)>,
    integrations: Integrations,
) -> Worktree {
    let mut worktree = Worktree::new(listed.path, listed.branch, listed.is_main);

    let memo = match api.get_worktree_memo(&worktree.path).await {
        Ok(memo) => memo,
        Err(e) => {
            tracing::warn!(path = %worktree.path, error = %e, "failed to load worktree memo");
            WorktreeMemo::default()
        }
    };
    worktree.description = memo.description.filter(|d| !d.trim().is_empty());
    worktree.issue_key = memo.issue_number.filter(|k| !k.trim().is_empty());

    if integrations.issue_tracker {
        if let Some(key) = worktree.issue_key.clone() {
            match api.fetch_jira_issue(&key).await {
                Ok(issue) => worktree.issue = issue,
                Err(e) => {
                    tracing::warn!(issue = %key, error = %e, "issue lookup failed");
                }
            }
        }
    }

    if integrations.code_hosting && !worktree.is_main {
        if let Some((owner, repo)) = owner_repo {
            match api.fetch_pull_requests(owner, repo, &worktree.branch).await {
                Ok(prs) => worktree.pull_request = prs.into_iter().next(),
                Err(e) => {
                    tracing::warn!(
                        owner = %owner,
                        repo = %repo,
                        branch = %worktree.branch,
                        error = %e,
                        "pull request lookup failed"
                    );
                }
            }
        }
    }

    worktree
}

/// `/home/me/src/acme/widgets` → `("acme", "widgets")`.
pub fn owner_repo_from_path(path: &str) -> Option<(String, String)> {
    let mut segments = Path::new(path)
        .components()
        .filter_map(|c| match c {
            std::path::Component::Normal(s) => s.to_str(),
            _ => None,
        })
        .rev();
    let repo = segments.next()?;
    let owner = segments.next()?;
    Some((owner.to_string(), repo.to_string()))
}
