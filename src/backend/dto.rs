//! Wire shapes of the command boundary. Field names follow the backend's
//! snake_case JSON exactly; every field the backend may omit is optional.

use serde::{Deserialize, Serialize};

use crate::project_match::Named;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendWorktree {
    pub path: String,
    pub branch: String,
    pub is_main: bool,
    #[serde(default)]
    pub is_bare: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendBranch {
    pub name: String,
    #[serde(default)]
    pub is_remote: bool,
    #[serde(default)]
    pub is_head: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdeConfig {
    #[serde(rename = "type")]
    pub ide_type: String,
    #[serde(default)]
    pub preset: Option<String>,
    #[serde(default)]
    pub custom_command: Option<String>,
}

impl IdeConfig {
    pub fn preset(preset: &str) -> Self {
        Self {
            ide_type: "preset".to_string(),
            preset: Some(preset.to_string()),
            custom_command: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub name: String,
    pub repo_path: String,
    #[serde(default)]
    pub default_base_branch: Option<String>,
    #[serde(default)]
    pub ide: Option<IdeConfig>,
    #[serde(default)]
    pub emoji: Option<String>,
}

impl Named for ProjectConfig {
    fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppSettings {
    #[serde(default)]
    pub ide: Option<IdeConfig>,
    #[serde(default)]
    pub theme: Option<String>,
    #[serde(default)]
    pub default_worktree_template: Option<String>,
    #[serde(default)]
    pub copy_paths: Option<Vec<String>>,
    #[serde(default)]
    pub fetch_before_create: Option<bool>,
    #[serde(default)]
    pub clipboard_parse_patterns: Option<Vec<String>>,
    #[serde(default)]
    pub last_used_project: Option<String>,
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_minutes: u32,
    #[serde(default)]
    pub projects: Vec<ProjectConfig>,
}

fn default_refresh_interval() -> u32 {
    5
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            ide: None,
            theme: None,
            default_worktree_template: None,
            copy_paths: None,
            fetch_before_create: None,
            clipboard_parse_patterns: None,
            last_used_project: None,
            refresh_interval_minutes: default_refresh_interval(),
            projects: Vec::new(),
        }
    }
}

impl AppSettings {
    pub fn fetch_before_create(&self) -> bool {
        self.fetch_before_create.unwrap_or(true)
    }

    pub fn copy_paths(&self) -> &[String] {
        self.copy_paths.as_deref().unwrap_or_default()
    }

    pub fn clipboard_parse_patterns(&self) -> &[String] {
        self.clipboard_parse_patterns.as_deref().unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorktreeMemo {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub issue_number: Option<String>,
}

impl WorktreeMemo {
    pub fn is_empty(&self) -> bool {
        self.description.as_deref().map_or(true, |d| d.trim().is_empty())
            && self.issue_number.as_deref().map_or(true, |i| i.trim().is_empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GitHubConfigType {
    Personal,
    Enterprise,
}

/// Full code-hosting config, token included. Only ever sent, never received.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitHubConfig {
    pub id: String,
    pub name: String,
    pub config_type: GitHubConfigType,
    pub token: String,
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
}

/// Code-hosting config metadata as returned by the backend (no token).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitHubConfigMeta {
    pub id: String,
    pub name: String,
    pub config_type: GitHubConfigType,
    #[serde(default)]
    pub host: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JiraConfig {
    pub host: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub api_token: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JiraConfigMeta {
    pub host: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub has_token: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidateResult {
    pub valid: bool,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestInfo {
    pub number: u64,
    pub title: String,
    pub state: String,
    #[serde(default)]
    pub merged: bool,
    #[serde(default)]
    pub draft: bool,
    pub url: String,
    #[serde(default)]
    pub review_decision: Option<String>,
    #[serde(default)]
    pub checks_status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JiraIssueInfo {
    pub key: String,
    pub summary: String,
    pub status: String,
    pub status_category: String,
    pub url: String,
}
