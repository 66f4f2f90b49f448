use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use super::dto::{
    AppSettings, BackendBranch, BackendWorktree, GitHubConfig, GitHubConfigMeta, IdeConfig,
    JiraConfig, JiraConfigMeta, JiraIssueInfo, ProjectConfig, PullRequestInfo, ValidateResult,
    WorktreeMemo,
};
use super::{Backend, BackendError, BackendResult};

/// Typed access to the named backend commands.
///
/// Argument objects use the backend's camelCase parameter names; results are
/// decoded into the snake_case DTOs in [`super::dto`].
#[derive(Clone)]
pub struct Api {
    backend: Arc<dyn Backend>,
}

impl Api {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }

    async fn call<T: DeserializeOwned>(&self, command: &str, args: Value) -> BackendResult<T> {
        let value = self.backend.invoke(command, args).await?;
        serde_json::from_value(value).map_err(|e| BackendError::Decode {
            command: command.to_string(),
            message: e.to_string(),
        })
    }

    // ---- settings ----

    pub async fn get_settings(&self) -> BackendResult<AppSettings> {
        self.call("get_settings", json!({})).await
    }

    pub async fn set_ide(&self, ide: &IdeConfig) -> BackendResult<()> {
        self.call("set_ide", json!({ "ide": ide })).await
    }

    pub async fn set_default_worktree_template(&self, template: &str) -> BackendResult<()> {
        self.call("set_default_worktree_template", json!({ "template": template }))
            .await
    }

    pub async fn set_copy_paths(&self, paths: &[String]) -> BackendResult<()> {
        self.call("set_copy_paths", json!({ "paths": paths })).await
    }

    pub async fn set_fetch_before_create(&self, enabled: bool) -> BackendResult<()> {
        self.call("set_fetch_before_create", json!({ "enabled": enabled }))
            .await
    }

    pub async fn set_clipboard_parse_patterns(&self, patterns: &[String]) -> BackendResult<()> {
        self.call("set_clipboard_parse_patterns", json!({ "patterns": patterns }))
            .await
    }

    pub async fn set_last_used_project(&self, project: &str) -> BackendResult<()> {
        self.call("set_last_used_project", json!({ "project": project }))
            .await
    }

    pub async fn set_refresh_interval_minutes(&self, minutes: u32) -> BackendResult<()> {
        self.call("set_refresh_interval_minutes", json!({ "minutes": minutes }))
            .await
    }

    // ---- projects ----

    pub async fn get_projects(&self) -> BackendResult<Vec<ProjectConfig>> {
        self.call("get_projects", json!({})).await
    }

    pub async fn add_project(&self, project: &ProjectConfig) -> BackendResult<()> {
        self.call("add_project", json!({ "project": project })).await
    }

    pub async fn update_project(&self, repo_path: &str, project: &ProjectConfig) -> BackendResult<()> {
        self.call(
            "update_project",
            json!({ "repoPath": repo_path, "project": project }),
        )
        .await
    }

    pub async fn remove_project(&self, repo_path: &str) -> BackendResult<()> {
        self.call("remove_project", json!({ "repoPath": repo_path }))
            .await
    }

    pub async fn reorder_projects(&self, repo_paths: &[String]) -> BackendResult<()> {
        self.call("reorder_projects", json!({ "repoPaths": repo_paths }))
            .await
    }

    // ---- worktrees ----

    pub async fn get_worktrees(&self, repo_path: &str) -> BackendResult<Vec<BackendWorktree>> {
        self.call("get_worktrees", json!({ "repoPath": repo_path }))
            .await
    }

    pub async fn create_worktree(
        &self,
        repo_path: &str,
        worktree_path: &str,
        branch_name: &str,
        base_branch: &str,
    ) -> BackendResult<()> {
        self.call(
            "create_worktree",
            json!({
                "repoPath": repo_path,
                "worktreePath": worktree_path,
                "branchName": branch_name,
                "baseBranch": base_branch,
            }),
        )
        .await
    }

    pub async fn create_worktree_existing_branch(
        &self,
        repo_path: &str,
        worktree_path: &str,
        branch_name: &str,
    ) -> BackendResult<()> {
        self.call(
            "create_worktree_existing_branch",
            json!({
                "repoPath": repo_path,
                "worktreePath": worktree_path,
                "branchName": branch_name,
            }),
        )
        .await
    }

    pub async fn remove_worktree(
        &self,
        repo_path: &str,
        worktree_path: &str,
        force: bool,
    ) -> BackendResult<()> {
        self.call(
            "remove_worktree",
            json!({ "repoPath": repo_path, "worktreePath": worktree_path, "force": force }),
        )
        .await
    }

    pub async fn prune_worktrees(&self, repo_path: &str) -> BackendResult<()> {
        self.call("prune_worktrees", json!({ "repoPath": repo_path }))
            .await
    }

    // ---- branches ----

    pub async fn get_branches(
        &self,
        repo_path: &str,
        include_remote: bool,
    ) -> BackendResult<Vec<BackendBranch>> {
        self.call(
            "get_branches",
            json!({ "repoPath": repo_path, "includeRemote": include_remote }),
        )
        .await
    }

    /// The branch new worktrees should start from, e.g. `origin/main`.
    pub async fn get_default_branch(&self, repo_path: &str) -> BackendResult<String> {
        self.call("get_default_branch", json!({ "repoPath": repo_path }))
            .await
    }

    pub async fn delete_branch(&self, repo_path: &str, branch_name: &str, force: bool) -> BackendResult<()> {
        self.call(
            "delete_branch",
            json!({ "repoPath": repo_path, "branchName": branch_name, "force": force }),
        )
        .await
    }

    pub async fn rename_branch(&self, repo_path: &str, old_name: &str, new_name: &str) -> BackendResult<()> {
        self.call(
            "rename_branch",
            json!({ "repoPath": repo_path, "oldName": old_name, "newName": new_name }),
        )
        .await
    }

    pub async fn git_fetch(&self, repo_path: &str) -> BackendResult<()> {
        self.call("git_fetch", json!({ "repoPath": repo_path })).await
    }

    pub async fn git_pull(&self, worktree_path: &str) -> BackendResult<()> {
        self.call("git_pull", json!({ "worktreePath": worktree_path }))
            .await
    }

    // ---- launching ----

    pub async fn open_ide(
        &self,
        path: &str,
        ide_preset: &str,
        custom_command: Option<&str>,
    ) -> BackendResult<()> {
        self.call(
            "open_ide",
            json!({ "path": path, "idePreset": ide_preset, "customCommand": custom_command }),
        )
        .await
    }

    pub async fn open_in_finder(&self, path: &str) -> BackendResult<()> {
        self.call("open_in_finder", json!({ "path": path })).await
    }

    pub async fn open_terminal(&self, path: &str) -> BackendResult<()> {
        self.call("open_terminal", json!({ "path": path })).await
    }

    pub async fn copy_paths_to_worktree(
        &self,
        source_path: &str,
        target_path: &str,
        paths: &[String],
    ) -> BackendResult<()> {
        self.call(
            "copy_paths_to_worktree",
            json!({ "sourcePath": source_path, "targetPath": target_path, "paths": paths }),
        )
        .await
    }

    // ---- worktree memo ----

    pub async fn get_worktree_memo(&self, path: &str) -> BackendResult<WorktreeMemo> {
        // A worktree without a memo may come back as null
        let memo: Option<WorktreeMemo> = self
            .call("get_worktree_memo", json!({ "path": path }))
            .await?;
        Ok(memo.unwrap_or_default())
    }

    pub async fn set_worktree_memo(&self, path: &str, memo: &WorktreeMemo) -> BackendResult<()> {
        self.call("set_worktree_memo", json!({ "path": path, "memo": memo }))
            .await
    }

    // ---- code hosting ----

    pub async fn get_github_config(&self) -> BackendResult<Option<GitHubConfigMeta>> {
        self.call("get_github_config", json!({})).await
    }

    pub async fn set_github_config(&self, config: &GitHubConfig) -> BackendResult<()> {
        self.call("set_github_config", json!({ "config": config }))
            .await
    }

    pub async fn remove_github_config(&self) -> BackendResult<()> {
        self.call("remove_github_config", json!({})).await
    }

    pub async fn validate_github_token(&self, config: &GitHubConfig) -> BackendResult<ValidateResult> {
        self.call("validate_github_token", json!({ "config": config }))
            .await
    }

    pub async fn fetch_pull_requests(
        &self,
        owner: &str,
        repo: &str,
        branch: &str,
    ) -> BackendResult<Vec<PullRequestInfo>> {
        self.call(
            "fetch_pull_requests",
            json!({ "owner": owner, "repo": repo, "branch": branch }),
        )
        .await
    }

    // ---- issue tracker ----

    pub async fn get_jira_config(&self) -> BackendResult<Option<JiraConfigMeta>> {
        self.call("get_jira_config", json!({})).await
    }

    pub async fn set_jira_config(&self, config: &JiraConfig) -> BackendResult<()> {
        self.call("set_jira_config", json!({ "config": config })).await
    }

    pub async fn remove_jira_config(&self) -> BackendResult<()> {
        self.call("remove_jira_config", json!({})).await
    }

    pub async fn validate_jira_credentials(&self, config: &JiraConfig) -> BackendResult<ValidateResult> {
        self.call("validate_jira_credentials", json!({ "config": config }))
            .await
    }

    pub async fn fetch_jira_issue(&self, issue_key: &str) -> BackendResult<Option<JiraIssueInfo>> {
        self.call("fetch_jira_issue", json!({ "issueKey": issue_key }))
            .await
    }
}
