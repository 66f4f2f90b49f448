use anyhow::{bail, Context, Result};
use thiserror::Error;

use crate::backend::dto::{
    AppSettings, GitHubConfig, GitHubConfigType, IdeConfig, JiraConfig, ProjectConfig,
    WorktreeMemo,
};
use crate::backend::{Api, BackendError};
use crate::clipboard;
use crate::deep_link::{DeepLinkRequest, DeepLinkRoute};
use crate::ide::resolve_ide;
use crate::model::{ProjectView, Worktree};
use crate::project_match::find_best_matching_project;

pub const DEFAULT_WORKTREE_TEMPLATE: &str = "{project}.worktrees/{branch}-{description}";
pub const DEFAULT_BASE_BRANCH: &str = "origin/main";

const SLUG_REPLACED: &[char] = &[
    '/', ':', '*', '?', '"', '<', '>', '|', '\\', '&', ';', '\'', '`', '$', '#', '%', '!', '(',
    ')', '[', ']', '{', '}',
];

/// Make a description safe to use as part of a path.
pub fn slugify(description: &str) -> String {
    let replaced: String = description
        .trim()
        .chars()
        .map(|c| if SLUG_REPLACED.contains(&c) { '_' } else { c })
        .collect();
    replaced.split_whitespace().collect::<Vec<_>>().join("-")
}

/// Expand a worktree path template. `{project}` is the repository path.
pub fn expand_worktree_path(
    template: Option<&str>,
    repo_path: &str,
    branch: &str,
    description: &str,
) -> String {
    let branch = branch.trim();
    if branch.is_empty() {
        return String::new();
    }
    let template = template
        .filter(|t| !t.trim().is_empty())
        .unwrap_or(DEFAULT_WORKTREE_TEMPLATE);
    let path = template
        .replacen("{project}", repo_path.trim_end_matches('/'), 1)
        .replacen("{branch}", branch, 1)
        .replacen("{description}", &slugify(description), 1);
    path.strip_suffix('-').map(str::to_string).unwrap_or(path)
}

/// The branch name after the issue key changed from `previous_issue` to
/// `new_issue`. The branch keeps following the issue key while the user has
/// not typed a branch of their own.
pub fn branch_after_issue_edit(branch: &str, previous_issue: &str, new_issue: &str) -> String {
    if branch.is_empty() || branch == previous_issue {
        new_issue.to_string()
    } else {
        branch.to_string()
    }
}

/// Everything needed to create a worktree from the create form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateWorktreeRequest {
    pub branch: String,
    pub worktree_path: String,
    /// Falls back to the project default base branch, then `origin/main`.
    pub base_branch: Option<String>,
    pub description: String,
    pub issue_key: String,
    pub open_ide: bool,
}

/// Create a worktree and apply the follow-up steps: memo, copied paths,
/// last-used project and optionally opening the IDE.
///
/// Returns the path of the new worktree.
pub async fn create_worktree(
    api: &Api,
    settings: &AppSettings,
    project: &ProjectView,
    request: &CreateWorktreeRequest,
) -> Result<String> {
    let branch = request.branch.trim();
    let worktree_path = request.worktree_path.trim();
    if branch.is_empty() || worktree_path.is_empty() {
        bail!("Branch name and worktree path are required");
    }
    let base_branch = request
        .base_branch
        .as_deref()
        .map(str::trim)
        .filter(|b| !b.is_empty())
        .or(project.default_base_branch.as_deref())
        .unwrap_or(DEFAULT_BASE_BRANCH);

    tracing::info!(
        repo = %project.repo_path,
        branch,
        base = base_branch,
        path = worktree_path,
        "creating worktree"
    );

    if settings.fetch_before_create() && base_branch.starts_with("origin/") {
        api.git_fetch(&project.repo_path)
            .await
            .context("Fetch before create failed")?;
    }

    if local_branch_exists(api, &project.repo_path, branch).await {
        api.create_worktree_existing_branch(&project.repo_path, worktree_path, branch)
            .await?;
    } else {
        api.create_worktree(&project.repo_path, worktree_path, branch, base_branch)
            .await?;
    }

    let memo = WorktreeMemo {
        description: non_empty(&request.description),
        issue_number: non_empty(&request.issue_key),
    };
    if !memo.is_empty() {
        api.set_worktree_memo(worktree_path, &memo)
            .await
            .context("Worktree created but saving its description failed")?;
    }

    let copy_paths = settings.copy_paths();
    if !copy_paths.is_empty() {
        copy_paths_from_main(api, &project.repo_path, worktree_path, copy_paths).await?;
    }

    if let Err(e) = api.set_last_used_project(&project.repo_path).await {
        tracing::warn!(error = %e, "failed to remember last used project");
    }

    if request.open_ide {
        open_in_ide(api, settings, project.ide.as_ref(), worktree_path).await?;
    }

    Ok(worktree_path.to_string())
}

async fn local_branch_exists(api: &Api, repo_path: &str, branch: &str) -> bool {
    match api.get_branches(repo_path, false).await {
        Ok(branches) => branches.iter().any(|b| !b.is_remote && b.name == branch),
        Err(e) => {
            tracing::warn!(repo = %repo_path, error = %e, "failed to list branches");
            false
        }
    }
}

async fn copy_paths_from_main(
    api: &Api,
    repo_path: &str,
    worktree_path: &str,
    paths: &[String],
) -> Result<()> {
    let worktrees = api.get_worktrees(repo_path).await?;
    let Some(main) = worktrees.iter().find(|w| w.is_main) else {
        tracing::warn!(repo = %repo_path, "no main worktree to copy paths from");
        return Ok(());
    };
    tracing::debug!(from = %main.path, to = worktree_path, count = paths.len(), "copying paths");
    api.copy_paths_to_worktree(&main.path, worktree_path, paths)
        .await
        .context("Worktree created but copying paths failed")?;
    Ok(())
}

/// Save the memo and rename the branch if it changed.
pub async fn edit_worktree(
    api: &Api,
    repo_path: &str,
    worktree: &Worktree,
    new_branch: &str,
    description: &str,
    issue_key: &str,
) -> Result<()> {
    let memo = WorktreeMemo {
        description: non_empty(description),
        issue_number: non_empty(issue_key),
    };
    api.set_worktree_memo(&worktree.path, &memo).await?;

    let new_branch = new_branch.trim();
    if new_branch.is_empty() || new_branch == worktree.branch {
        return Ok(());
    }
    if worktree.is_main {
        bail!("The main worktree's branch cannot be renamed here");
    }
    tracing::info!(from = %worktree.branch, to = new_branch, "renaming branch");
    api.rename_branch(repo_path, &worktree.branch, new_branch)
        .await?;
    Ok(())
}

#[derive(Debug, Error)]
pub enum DeleteWorktreeError {
    #[error("The main worktree cannot be deleted")]
    MainWorktree,
    /// The worktree is still there; a forced retry may succeed.
    #[error("{0}")]
    Remove(BackendError),
    /// The worktree is gone, only its branch is left behind.
    #[error("Worktree removed but deleting branch {branch} failed: {source}")]
    DeleteBranch { branch: String, source: BackendError },
}

impl DeleteWorktreeError {
    /// Whether retrying with `force` makes sense.
    pub fn can_force(&self) -> bool {
        matches!(self, DeleteWorktreeError::Remove(_))
    }

    pub fn worktree_removed(&self) -> bool {
        matches!(self, DeleteWorktreeError::DeleteBranch { .. })
    }
}

/// Remove a worktree, optionally deleting its branch afterwards.
///
/// The caller retries with `force` after the user confirms, but only for
/// [`DeleteWorktreeError::Remove`].
pub async fn delete_worktree(
    api: &Api,
    repo_path: &str,
    worktree: &Worktree,
    force: bool,
    delete_branch: bool,
) -> Result<(), DeleteWorktreeError> {
    if worktree.is_main {
        return Err(DeleteWorktreeError::MainWorktree);
    }
    tracing::info!(path = %worktree.path, force, delete_branch, "removing worktree");
    api.remove_worktree(repo_path, &worktree.path, force)
        .await
        .map_err(DeleteWorktreeError::Remove)?;

    if delete_branch && !worktree.branch.is_empty() {
        api.delete_branch(repo_path, &worktree.branch, force)
            .await
            .map_err(|source| DeleteWorktreeError::DeleteBranch {
                branch: worktree.branch.clone(),
                source,
            })?;
    }
    Ok(())
}

/// Last path segment, used when a project is added without a name.
pub fn project_name_from_path(repo_path: &str) -> String {
    repo_path
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(repo_path)
        .to_string()
}

/// Add a project. A blank base branch is looked up from the repository;
/// if that fails the project is added without one.
pub async fn add_project(
    api: &Api,
    repo_path: &str,
    name: &str,
    default_base_branch: &str,
) -> Result<ProjectConfig> {
    let repo_path = repo_path.trim().trim_end_matches('/');
    if repo_path.is_empty() {
        bail!("Repository path is required");
    }
    let name = match name.trim() {
        "" => project_name_from_path(repo_path),
        name => name.to_string(),
    };
    let default_base_branch = match default_base_branch.trim() {
        "" => match api.get_default_branch(repo_path).await {
            Ok(branch) if !branch.trim().is_empty() => Some(branch.trim().to_string()),
            Ok(_) => None,
            Err(e) => {
                tracing::debug!(repo = %repo_path, error = %e, "no default branch detected");
                None
            }
        },
        branch => Some(branch.to_string()),
    };
    let project = ProjectConfig {
        name,
        repo_path: repo_path.to_string(),
        default_base_branch,
        ide: None,
        emoji: None,
    };
    tracing::info!(name = %project.name, repo = %project.repo_path, "adding project");
    api.add_project(&project).await?;
    Ok(project)
}

pub async fn update_project(api: &Api, repo_path: &str, project: &ProjectConfig) -> Result<()> {
    if project.name.trim().is_empty() {
        bail!("Project name is required");
    }
    api.update_project(repo_path, project).await?;
    Ok(())
}

/// Forget a project. The repository on disk is left alone.
pub async fn remove_project(api: &Api, repo_path: &str) -> Result<()> {
    tracing::info!(repo = %repo_path, "removing project");
    api.remove_project(repo_path).await?;
    Ok(())
}

pub async fn fetch_project(api: &Api, repo_path: &str) -> Result<()> {
    api.git_fetch(repo_path)
        .await
        .with_context(|| format!("Fetch failed for {}", repo_path))
}

pub async fn prune_project(api: &Api, repo_path: &str) -> Result<()> {
    api.prune_worktrees(repo_path)
        .await
        .with_context(|| format!("Prune failed for {}", repo_path))
}

pub async fn pull_worktree(api: &Api, worktree_path: &str) -> Result<()> {
    api.git_pull(worktree_path)
        .await
        .with_context(|| format!("Pull failed for {}", worktree_path))
}

pub async fn open_in_ide(
    api: &Api,
    settings: &AppSettings,
    project_ide: Option<&IdeConfig>,
    path: &str,
) -> Result<()> {
    let (preset, custom_command) = resolve_ide(project_ide, settings.ide.as_ref());
    tracing::info!(path, ide = preset.id(), "opening IDE");
    api.open_ide(path, preset.id(), custom_command.as_deref())
        .await?;
    Ok(())
}

pub async fn open_in_file_browser(api: &Api, path: &str) -> Result<()> {
    api.open_in_finder(path).await?;
    Ok(())
}

pub async fn open_terminal(api: &Api, path: &str) -> Result<()> {
    api.open_terminal(path).await?;
    Ok(())
}

/// Write every global setting that differs between `current` and `updated`.
/// Clipboard patterns are checked before anything is written.
pub async fn save_settings(api: &Api, current: &AppSettings, updated: &AppSettings) -> Result<()> {
    if let Err(invalid) = clipboard::validate_patterns(updated.clipboard_parse_patterns()) {
        let details: Vec<String> = invalid
            .iter()
            .map(|p| format!("{}: {}", p.pattern, p.error))
            .collect();
        bail!("Invalid clipboard pattern(s): {}", details.join("; "));
    }

    if updated.ide != current.ide {
        if let Some(ide) = &updated.ide {
            api.set_ide(ide).await?;
        }
    }
    if updated.default_worktree_template != current.default_worktree_template {
        let template = updated
            .default_worktree_template
            .as_deref()
            .unwrap_or(DEFAULT_WORKTREE_TEMPLATE);
        api.set_default_worktree_template(template).await?;
    }
    if updated.copy_paths() != current.copy_paths() {
        api.set_copy_paths(updated.copy_paths()).await?;
    }
    if updated.fetch_before_create() != current.fetch_before_create() {
        api.set_fetch_before_create(updated.fetch_before_create())
            .await?;
    }
    if updated.clipboard_parse_patterns() != current.clipboard_parse_patterns() {
        api.set_clipboard_parse_patterns(updated.clipboard_parse_patterns())
            .await?;
    }
    if updated.refresh_interval_minutes != current.refresh_interval_minutes {
        api.set_refresh_interval_minutes(updated.refresh_interval_minutes)
            .await?;
    }
    tracing::info!("settings saved");
    Ok(())
}

/// Values a create-worktree form starts out with.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateWorktreePrefill {
    pub repo_path: String,
    pub issue: String,
    pub description: String,
    pub branch: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeepLinkTarget {
    CreateWorktree {
        prefill: CreateWorktreePrefill,
        /// Set when the requested project was not found and another was used.
        notice: Option<String>,
    },
    Settings,
}

/// Decide where an incoming deep link lands in the loaded project list.
pub fn resolve_deep_link(request: &DeepLinkRequest, projects: &[ProjectView]) -> Result<DeepLinkTarget> {
    match request.route {
        DeepLinkRoute::Settings => Ok(DeepLinkTarget::Settings),
        DeepLinkRoute::CreateWorktree => {
            let Some(first) = projects.first() else {
                bail!("No projects configured");
            };
            let hint = request.project.as_deref().unwrap_or("");
            let (project, notice) = match find_best_matching_project(hint, projects) {
                Some(project) => (project, None),
                None if hint.is_empty() => (first, None),
                None => (
                    first,
                    Some(format!("Project \"{}\" not found, using {}", hint, first.name)),
                ),
            };

            let issue = request.issue.clone().unwrap_or_default();
            let branch = request
                .branch
                .clone()
                .filter(|b| !b.is_empty())
                .unwrap_or_else(|| issue.clone());
            Ok(DeepLinkTarget::CreateWorktree {
                prefill: CreateWorktreePrefill {
                    repo_path: project.repo_path.clone(),
                    issue,
                    description: request.description.clone().unwrap_or_default(),
                    branch,
                },
                notice,
            })
        }
    }
}

/// Validate a code-hosting token through the backend, then store it.
/// Returns the username the token belongs to, if reported.
pub async fn configure_github(
    api: &Api,
    name: &str,
    token: &str,
    enterprise_host: Option<&str>,
) -> Result<Option<String>> {
    if token.trim().is_empty() {
        bail!("Token is required");
    }
    let host = enterprise_host
        .map(str::trim)
        .filter(|h| !h.is_empty())
        .map(str::to_string);
    let mut config = GitHubConfig {
        id: uuid::Uuid::new_v4().to_string(),
        name: match name.trim() {
            "" => "GitHub".to_string(),
            name => name.to_string(),
        },
        config_type: if host.is_some() {
            GitHubConfigType::Enterprise
        } else {
            GitHubConfigType::Personal
        },
        token: token.trim().to_string(),
        host,
        username: None,
    };

    let result = api.validate_github_token(&config).await?;
    if !result.valid {
        bail!(
            "Token validation failed: {}",
            result.error.as_deref().unwrap_or("invalid token")
        );
    }
    config.username = result.username.clone();
    api.set_github_config(&config).await?;
    tracing::info!(name = %config.name, "code-hosting integration configured");
    Ok(result.username)
}

pub async fn remove_github(api: &Api) -> Result<()> {
    api.remove_github_config().await?;
    Ok(())
}

/// Validate issue-tracker credentials through the backend, then store them.
/// Returns the display name reported for the account.
pub async fn configure_jira(
    api: &Api,
    host: &str,
    email: &str,
    api_token: &str,
) -> Result<Option<String>> {
    let host = host.trim().trim_end_matches('/');
    if host.is_empty() || email.trim().is_empty() || api_token.trim().is_empty() {
        bail!("Host, email and API token are required");
    }
    let mut config = JiraConfig {
        host: host.to_string(),
        email: Some(email.trim().to_string()),
        api_token: Some(api_token.trim().to_string()),
        display_name: None,
    };

    let result = api.validate_jira_credentials(&config).await?;
    if !result.valid {
        bail!(
            "Credential validation failed: {}",
            result.error.as_deref().unwrap_or("invalid credentials")
        );
    }
    config.display_name = result.username.clone();
    api.set_jira_config(&config).await?;
    tracing::info!(host = %config.host, "issue-tracker integration configured");
    Ok(result.username)
}

pub async fn remove_jira(api: &Api) -> Result<()> {
    api.remove_jira_config().await?;
    Ok(())
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}
