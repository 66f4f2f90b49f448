//! `grovr://` deep links.
//!
//! A deep link names a route and carries optional hints that pre-fill the
//! target view, e.g. `grovr://create-worktree?project=web&issue=ABC-123`.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;
use url::Url;

pub const SCHEME: &str = "grovr";
const SCHEME_PREFIX: &str = "grovr://";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeepLinkRoute {
    CreateWorktree,
    Settings,
}

impl DeepLinkRoute {
    pub const ALL: [DeepLinkRoute; 2] = [DeepLinkRoute::CreateWorktree, DeepLinkRoute::Settings];

    pub fn as_str(&self) -> &'static str {
        match self {
            DeepLinkRoute::CreateWorktree => "create-worktree",
            DeepLinkRoute::Settings => "settings",
        }
    }
}

impl fmt::Display for DeepLinkRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeepLinkRoute {
    type Err = DeepLinkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|route| route.as_str() == s)
            .ok_or_else(|| DeepLinkError::UnknownRoute(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeepLinkError {
    #[error("Invalid scheme - expected grovr://")]
    InvalidScheme,
    #[error("Unknown route: {0}")]
    UnknownRoute(String),
    #[error("Failed to parse URL: {0}")]
    Malformed(String),
}

/// A parsed deep link. Consumed once by the UI, then dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeepLinkRequest {
    pub route: DeepLinkRoute,
    /// Project name hint, resolved with the fuzzy project matcher.
    pub project: Option<String>,
    pub issue: Option<String>,
    pub description: Option<String>,
    pub branch: Option<String>,
}

impl DeepLinkRequest {
    pub fn new(route: DeepLinkRoute) -> Self {
        Self {
            route,
            project: None,
            issue: None,
            description: None,
            branch: None,
        }
    }
}

pub fn parse_deep_link(input: &str) -> Result<DeepLinkRequest, DeepLinkError> {
    // `grovr:settings` is accepted as well as `grovr://settings`
    let scheme_matches = input
        .split_once(':')
        .is_some_and(|(scheme, _)| scheme == SCHEME);
    if !scheme_matches {
        return Err(DeepLinkError::InvalidScheme);
    }

    let parsed = Url::parse(input).map_err(|e| DeepLinkError::Malformed(e.to_string()))?;
    if parsed.scheme() != SCHEME {
        return Err(DeepLinkError::InvalidScheme);
    }

    // grovr://create-worktree puts the route in the host; grovr:///settings and grovr:settings in the path
    let route = match parsed.host_str() {
        Some(host) if !host.is_empty() => host.to_string(),
        _ => parsed.path().trim_start_matches('/').to_string(),
    };
    let route: DeepLinkRoute = route.parse()?;

    let mut request = DeepLinkRequest::new(route);
    for (key, value) in parsed.query_pairs() {
        let slot = match key.as_ref() {
            "project" => &mut request.project,
            "issue" => &mut request.issue,
            "description" => &mut request.description,
            "branch" => &mut request.branch,
            _ => continue,
        };
        if slot.is_none() {
            *slot = Some(value.into_owned());
        }
    }

    tracing::debug!(route = %request.route, project = ?request.project, issue = ?request.issue, "parsed deep link");
    Ok(request)
}

pub fn generate_deep_link(request: &DeepLinkRequest) -> String {
    let mut query = url::form_urlencoded::Serializer::new(String::new());
    let params = [
        ("project", &request.project),
        ("issue", &request.issue),
        ("description", &request.description),
        ("branch", &request.branch),
    ];
    let mut any = false;
    for (key, value) in params {
        if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
            query.append_pair(key, value);
            any = true;
        }
    }

    let mut link = format!("{}{}", SCHEME_PREFIX, request.route.as_str());
    if any {
        link.push('?');
        link.push_str(&query.finish());
    }
    link
}

/// Link that opens the create-worktree form with the given hints.
pub fn generate_create_worktree_link(
    project: Option<&str>,
    issue: Option<&str>,
    description: Option<&str>,
    branch: Option<&str>,
) -> String {
    generate_deep_link(&DeepLinkRequest {
        route: DeepLinkRoute::CreateWorktree,
        project: project.map(str::to_string),
        issue: issue.map(str::to_string),
        description: description.map(str::to_string),
        branch: branch.map(str::to_string),
    })
}
