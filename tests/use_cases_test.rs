mod helpers;

use grovr::backend::dto::{AppSettings, IdeConfig, ProjectConfig};
use grovr::deep_link::{DeepLinkRequest, DeepLinkRoute};
use grovr::model::{ProjectView, Worktree};
use grovr::use_cases::{
    self, CreateWorktreePrefill, CreateWorktreeRequest, DeepLinkTarget, DeleteWorktreeError,
};
use helpers::*;
use serde_json::json;

const REPO: &str = "/src/web";
const WT: &str = "/src/web.worktrees/feat-login";

fn project_view(name: &str, repo_path: &str) -> ProjectView {
    ProjectView {
        name: name.to_string(),
        repo_path: repo_path.to_string(),
        default_base_branch: None,
        ide: None,
        worktrees: vec![Worktree::new(repo_path, "main", true)],
        error: None,
    }
}

fn create_request() -> CreateWorktreeRequest {
    CreateWorktreeRequest {
        branch: "feat-login".into(),
        worktree_path: WT.into(),
        base_branch: None,
        description: "Login page".into(),
        issue_key: "ABC-1".into(),
        open_ide: false,
    }
}

// ---------------------------------------------------------------------------
// Path templates
// ---------------------------------------------------------------------------

#[test]
fn slugify_replaces_unsafe_characters_and_whitespace() {
    assert_eq!(use_cases::slugify("  Fix: a/b  c "), "Fix_-a_b-c");
    assert_eq!(use_cases::slugify("Login page"), "Login-page");
    assert_eq!(use_cases::slugify(""), "");
}

#[test]
fn default_template_expansion() {
    assert_eq!(
        use_cases::expand_worktree_path(None, REPO, "feat-x", "Fix login page"),
        "/src/web.worktrees/feat-x-Fix-login-page"
    );
    assert_eq!(
        use_cases::expand_worktree_path(None, "/src/web/", "feat-x", ""),
        "/src/web.worktrees/feat-x"
    );
    assert_eq!(
        use_cases::expand_worktree_path(Some("   "), REPO, "feat-x", ""),
        "/src/web.worktrees/feat-x"
    );
}

#[test]
fn custom_template_expansion() {
    assert_eq!(
        use_cases::expand_worktree_path(Some("/tmp/wt/{branch}"), REPO, "feat-x", "ignored"),
        "/tmp/wt/feat-x"
    );
}

#[test]
fn no_branch_means_no_path() {
    assert_eq!(use_cases::expand_worktree_path(None, REPO, "  ", "desc"), "");
}

#[test]
fn branch_follows_issue_until_edited() {
    assert_eq!(use_cases::branch_after_issue_edit("", "", "A"), "A");
    assert_eq!(use_cases::branch_after_issue_edit("A", "A", "AB"), "AB");
    assert_eq!(use_cases::branch_after_issue_edit("my-branch", "AB", "ABC"), "my-branch");
}

// ---------------------------------------------------------------------------
// Create worktree
// ---------------------------------------------------------------------------

#[tokio::test]
async fn create_requires_branch_and_path() {
    let backend = FakeBackend::new();
    let mut request = create_request();
    request.branch = " ".into();
    let err = use_cases::create_worktree(
        &api_for(&backend),
        &AppSettings::default(),
        &project_view("web", REPO),
        &request,
    )
    .await
    .unwrap_err();
    assert_eq!(err.to_string(), "Branch name and worktree path are required");
    assert!(backend.calls().is_empty());
}

#[tokio::test]
async fn create_runs_every_step_in_order() {
    let backend = FakeBackend::new();
    backend.respond("get_branches", json!([{ "name": "main" }]));
    backend.respond("get_worktrees", json!([worktree_json(REPO, "main", true)]));
    let settings = AppSettings {
        copy_paths: Some(vec![".env".into()]),
        ide: Some(IdeConfig::preset("cursor")),
        ..AppSettings::default()
    };
    let mut request = create_request();
    request.open_ide = true;

    let path = use_cases::create_worktree(
        &api_for(&backend),
        &settings,
        &project_view("web", REPO),
        &request,
    )
    .await
    .unwrap();
    assert_eq!(path, WT);

    assert_eq!(
        backend.command_names(),
        [
            "git_fetch",
            "get_branches",
            "create_worktree",
            "set_worktree_memo",
            "get_worktrees",
            "copy_paths_to_worktree",
            "set_last_used_project",
            "open_ide",
        ]
    );
    assert_eq!(
        backend.calls_to("create_worktree")[0],
        json!({
            "repoPath": REPO,
            "worktreePath": WT,
            "branchName": "feat-login",
            "baseBranch": "origin/main",
        })
    );
    assert_eq!(
        backend.calls_to("set_worktree_memo")[0]["memo"],
        json!({ "description": "Login page", "issue_number": "ABC-1" })
    );
    assert_eq!(
        backend.calls_to("copy_paths_to_worktree")[0],
        json!({ "sourcePath": REPO, "targetPath": WT, "paths": [".env"] })
    );
    assert_eq!(backend.calls_to("open_ide")[0]["idePreset"], "cursor");
}

#[tokio::test]
async fn create_reuses_existing_local_branch() {
    let backend = FakeBackend::new();
    backend.respond(
        "get_branches",
        json!([{ "name": "main" }, { "name": "feat-login" }]),
    );
    let mut request = create_request();
    request.description.clear();
    request.issue_key.clear();

    use_cases::create_worktree(
        &api_for(&backend),
        &AppSettings::default(),
        &project_view("web", REPO),
        &request,
    )
    .await
    .unwrap();
    assert!(!backend.was_called("create_worktree"));
    assert_eq!(
        backend.calls_to("create_worktree_existing_branch")[0],
        json!({ "repoPath": REPO, "worktreePath": WT, "branchName": "feat-login" })
    );
    // Empty memo is not written, no copy paths configured
    assert!(!backend.was_called("set_worktree_memo"));
    assert!(!backend.was_called("copy_paths_to_worktree"));
}

#[tokio::test]
async fn local_base_branch_skips_fetch_and_project_default_applies() {
    let backend = FakeBackend::new();
    let mut project = project_view("web", REPO);
    project.default_base_branch = Some("develop".into());

    use_cases::create_worktree(
        &api_for(&backend),
        &AppSettings::default(),
        &project,
        &create_request(),
    )
    .await
    .unwrap();
    assert!(!backend.was_called("git_fetch"));
    assert_eq!(backend.calls_to("create_worktree")[0]["baseBranch"], "develop");
}

#[tokio::test]
async fn fetch_can_be_disabled() {
    let backend = FakeBackend::new();
    let settings = AppSettings {
        fetch_before_create: Some(false),
        ..AppSettings::default()
    };
    let mut request = create_request();
    request.base_branch = Some("origin/release".into());

    use_cases::create_worktree(&api_for(&backend), &settings, &project_view("web", REPO), &request)
        .await
        .unwrap();
    assert!(!backend.was_called("git_fetch"));
    assert_eq!(
        backend.calls_to("create_worktree")[0]["baseBranch"],
        "origin/release"
    );
}

#[tokio::test]
async fn fetch_failure_aborts_before_creating() {
    let backend = FakeBackend::new();
    backend.fail("git_fetch", "could not resolve host");
    let err = use_cases::create_worktree(
        &api_for(&backend),
        &AppSettings::default(),
        &project_view("web", REPO),
        &create_request(),
    )
    .await
    .unwrap_err();
    assert!(format!("{:#}", err).contains("could not resolve host"));
    assert!(!backend.was_called("create_worktree"));
}

#[tokio::test]
async fn create_failure_is_reported_verbatim() {
    let backend = FakeBackend::new();
    backend.fail("create_worktree", "fatal: 'feat-login' is already checked out");
    let err = use_cases::create_worktree(
        &api_for(&backend),
        &AppSettings::default(),
        &project_view("web", REPO),
        &create_request(),
    )
    .await
    .unwrap_err();
    assert_eq!(err.to_string(), "fatal: 'feat-login' is already checked out");
    assert!(!backend.was_called("set_worktree_memo"));
}

#[tokio::test]
async fn last_used_project_failure_is_not_fatal() {
    let backend = FakeBackend::new();
    backend.fail("set_last_used_project", "read-only store");
    let result = use_cases::create_worktree(
        &api_for(&backend),
        &AppSettings::default(),
        &project_view("web", REPO),
        &create_request(),
    )
    .await;
    assert!(result.is_ok());
}

// ---------------------------------------------------------------------------
// Edit and delete
// ---------------------------------------------------------------------------

#[tokio::test]
async fn edit_saves_memo_and_renames_branch() {
    let backend = FakeBackend::new();
    let worktree = Worktree::new(WT, "feat-login", false);
    use_cases::edit_worktree(
        &api_for(&backend),
        REPO,
        &worktree,
        "feat-signin",
        "Sign-in page",
        "",
    )
    .await
    .unwrap();

    assert_eq!(
        backend.calls_to("set_worktree_memo")[0],
        json!({ "path": WT, "memo": { "description": "Sign-in page", "issue_number": null } })
    );
    assert_eq!(
        backend.calls_to("rename_branch")[0],
        json!({ "repoPath": REPO, "oldName": "feat-login", "newName": "feat-signin" })
    );
}

#[tokio::test]
async fn edit_without_branch_change_does_not_rename() {
    let backend = FakeBackend::new();
    let worktree = Worktree::new(WT, "feat-login", false);
    use_cases::edit_worktree(&api_for(&backend), REPO, &worktree, "feat-login", "x", "A-1")
        .await
        .unwrap();
    assert!(!backend.was_called("rename_branch"));
}

#[tokio::test]
async fn main_branch_is_never_renamed() {
    let backend = FakeBackend::new();
    let main = Worktree::new(REPO, "main", true);
    let err = use_cases::edit_worktree(&api_for(&backend), REPO, &main, "trunk", "", "")
        .await
        .unwrap_err();
    assert!(err.to_string().contains("cannot be renamed"));
    assert!(!backend.was_called("rename_branch"));
}

#[tokio::test]
async fn delete_refuses_main_worktree() {
    let backend = FakeBackend::new();
    let main = Worktree::new(REPO, "main", true);
    let err = use_cases::delete_worktree(&api_for(&backend), REPO, &main, true, true)
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "The main worktree cannot be deleted");
    assert!(backend.calls().is_empty());
}

#[tokio::test]
async fn delete_removes_worktree_then_branch() {
    let backend = FakeBackend::new();
    let worktree = Worktree::new(WT, "feat-login", false);
    use_cases::delete_worktree(&api_for(&backend), REPO, &worktree, false, true)
        .await
        .unwrap();
    assert_eq!(backend.command_names(), ["remove_worktree", "delete_branch"]);
    assert_eq!(
        backend.calls_to("remove_worktree")[0],
        json!({ "repoPath": REPO, "worktreePath": WT, "force": false })
    );
}

#[tokio::test]
async fn delete_keeps_branch_unless_asked() {
    let backend = FakeBackend::new();
    let worktree = Worktree::new(WT, "feat-login", false);
    use_cases::delete_worktree(&api_for(&backend), REPO, &worktree, true, false)
        .await
        .unwrap();
    assert_eq!(backend.command_names(), ["remove_worktree"]);
    assert_eq!(backend.calls_to("remove_worktree")[0]["force"], true);
}

#[tokio::test]
async fn dirty_worktree_error_is_surfaced_for_force_retry() {
    let backend = FakeBackend::new();
    backend.fail("remove_worktree", "contains modified or untracked files");
    let worktree = Worktree::new(WT, "feat-login", false);
    let err = use_cases::delete_worktree(&api_for(&backend), REPO, &worktree, false, true)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("untracked files"));
    assert!(err.can_force());
    assert!(!err.worktree_removed());
    assert!(!backend.was_called("delete_branch"));
}

#[tokio::test]
async fn branch_delete_failure_does_not_offer_force_retry() {
    let backend = FakeBackend::new();
    backend.fail("delete_branch", "not fully merged");
    let worktree = Worktree::new(WT, "feat-login", false);
    let err = use_cases::delete_worktree(&api_for(&backend), REPO, &worktree, false, true)
        .await
        .unwrap_err();
    assert!(matches!(err, DeleteWorktreeError::DeleteBranch { ref branch, .. } if branch == "feat-login"));
    assert!(!err.can_force());
    assert!(err.worktree_removed());
    let message = err.to_string();
    assert!(message.contains("deleting branch feat-login failed"), "{message}");
    assert!(message.contains("not fully merged"), "{message}");
    assert_eq!(backend.command_names(), ["remove_worktree", "delete_branch"]);
}

#[tokio::test]
async fn main_worktree_refusal_is_not_retryable() {
    let backend = FakeBackend::new();
    let main = Worktree::new(REPO, "main", true);
    let err = use_cases::delete_worktree(&api_for(&backend), REPO, &main, false, false)
        .await
        .unwrap_err();
    assert!(!err.can_force());
    assert!(!err.worktree_removed());
}

// ---------------------------------------------------------------------------
// Projects and sync
// ---------------------------------------------------------------------------

#[tokio::test]
async fn add_project_defaults_name_from_path() {
    let backend = FakeBackend::new();
    let project = use_cases::add_project(&api_for(&backend), "/src/acme/widgets/", "", "")
        .await
        .unwrap();
    assert_eq!(project.name, "widgets");
    assert_eq!(project.repo_path, "/src/acme/widgets");
    let sent = &backend.calls_to("add_project")[0]["project"];
    assert_eq!(sent["name"], "widgets");
    assert_eq!(sent["repo_path"], "/src/acme/widgets");
}

#[tokio::test]
async fn add_project_detects_default_branch() {
    let backend = FakeBackend::new();
    backend.respond("get_default_branch", json!("origin/develop"));
    let project = use_cases::add_project(&api_for(&backend), "/src/acme/widgets", "", "")
        .await
        .unwrap();
    assert_eq!(project.default_base_branch.as_deref(), Some("origin/develop"));
    assert_eq!(
        backend.calls_to("get_default_branch"),
        vec![json!({ "repoPath": "/src/acme/widgets" })]
    );
    assert_eq!(
        backend.calls_to("add_project")[0]["project"]["default_base_branch"],
        "origin/develop"
    );
}

#[tokio::test]
async fn add_project_without_detectable_branch_still_adds() {
    let backend = FakeBackend::new();
    backend.fail("get_default_branch", "not a git repository");
    let project = use_cases::add_project(&api_for(&backend), "/src/acme/widgets", "w", "")
        .await
        .unwrap();
    assert_eq!(project.default_base_branch, None);
    assert!(backend.was_called("add_project"));
}

#[tokio::test]
async fn add_project_keeps_given_base_branch() {
    let backend = FakeBackend::new();
    let project = use_cases::add_project(&api_for(&backend), "/src/acme/widgets", "", " origin/main ")
        .await
        .unwrap();
    assert_eq!(project.default_base_branch.as_deref(), Some("origin/main"));
    assert!(!backend.was_called("get_default_branch"));
}

#[tokio::test]
async fn add_project_requires_path() {
    let backend = FakeBackend::new();
    assert!(use_cases::add_project(&api_for(&backend), "  ", "web", "")
        .await
        .is_err());
    assert!(backend.calls().is_empty());
}

#[tokio::test]
async fn update_project_requires_name() {
    let backend = FakeBackend::new();
    let project = ProjectConfig {
        name: " ".into(),
        repo_path: REPO.into(),
        default_base_branch: None,
        ide: None,
        emoji: None,
    };
    let err = use_cases::update_project(&api_for(&backend), REPO, &project)
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Project name is required");
}

#[tokio::test]
async fn sync_failures_carry_context() {
    let backend = FakeBackend::new();
    backend.fail("git_pull", "merge conflict");
    let err = use_cases::pull_worktree(&api_for(&backend), WT)
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), format!("Pull failed for {}", WT));
    assert!(format!("{:#}", err).contains("merge conflict"));

    use_cases::fetch_project(&api_for(&backend), REPO).await.unwrap();
    use_cases::prune_project(&api_for(&backend), REPO).await.unwrap();
    assert_eq!(backend.calls_to("prune_worktrees")[0], json!({ "repoPath": REPO }));
}

#[tokio::test]
async fn project_ide_wins_when_opening() {
    let backend = FakeBackend::new();
    let settings = AppSettings {
        ide: Some(IdeConfig::preset("cursor")),
        ..AppSettings::default()
    };
    let project_ide = IdeConfig::preset("goland");
    use_cases::open_in_ide(&api_for(&backend), &settings, Some(&project_ide), WT)
        .await
        .unwrap();
    assert_eq!(
        backend.calls_to("open_ide")[0],
        json!({ "path": WT, "idePreset": "goland", "customCommand": null })
    );
}

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

#[tokio::test]
async fn save_settings_writes_only_changes() {
    let backend = FakeBackend::new();
    let current = AppSettings::default();
    let updated = AppSettings {
        copy_paths: Some(vec![".env".into()]),
        refresh_interval_minutes: 10,
        ..AppSettings::default()
    };
    use_cases::save_settings(&api_for(&backend), &current, &updated)
        .await
        .unwrap();
    assert_eq!(
        backend.command_names(),
        ["set_copy_paths", "set_refresh_interval_minutes"]
    );
    assert_eq!(
        backend.calls_to("set_refresh_interval_minutes")[0],
        json!({ "minutes": 10 })
    );
}

#[tokio::test]
async fn invalid_patterns_block_the_whole_save() {
    let backend = FakeBackend::new();
    let updated = AppSettings {
        clipboard_parse_patterns: Some(vec!["([A-Z".into()]),
        fetch_before_create: Some(false),
        ..AppSettings::default()
    };
    let err = use_cases::save_settings(&api_for(&backend), &AppSettings::default(), &updated)
        .await
        .unwrap_err();
    assert!(err.to_string().starts_with("Invalid clipboard pattern(s): ([A-Z"));
    assert!(backend.calls().is_empty());
}

#[tokio::test]
async fn unset_and_explicit_default_fetch_flag_are_equal() {
    let backend = FakeBackend::new();
    let updated = AppSettings {
        fetch_before_create: Some(true),
        ..AppSettings::default()
    };
    use_cases::save_settings(&api_for(&backend), &AppSettings::default(), &updated)
        .await
        .unwrap();
    assert!(backend.calls().is_empty());
}

// ---------------------------------------------------------------------------
// Deep link resolution
// ---------------------------------------------------------------------------

fn link(project: Option<&str>, issue: Option<&str>) -> DeepLinkRequest {
    DeepLinkRequest {
        route: DeepLinkRoute::CreateWorktree,
        project: project.map(str::to_string),
        issue: issue.map(str::to_string),
        description: Some("Login".into()),
        branch: None,
    }
}

#[test]
fn deep_link_matches_project_and_prefills() {
    let projects = [project_view("web", "/src/web"), project_view("api", "/src/api")];
    let target = use_cases::resolve_deep_link(&link(Some("API"), Some("ABC-1")), &projects).unwrap();
    assert_eq!(
        target,
        DeepLinkTarget::CreateWorktree {
            prefill: CreateWorktreePrefill {
                repo_path: "/src/api".into(),
                issue: "ABC-1".into(),
                description: "Login".into(),
                branch: "ABC-1".into(),
            },
            notice: None,
        }
    );
}

#[test]
fn deep_link_falls_back_to_first_project_with_notice() {
    let projects = [project_view("web", "/src/web"), project_view("api", "/src/api")];
    let DeepLinkTarget::CreateWorktree { prefill, notice } =
        use_cases::resolve_deep_link(&link(Some("mobile"), None), &projects).unwrap()
    else {
        panic!("expected create-worktree target");
    };
    assert_eq!(prefill.repo_path, "/src/web");
    assert_eq!(notice.as_deref(), Some("Project \"mobile\" not found, using web"));

    let DeepLinkTarget::CreateWorktree { notice, .. } =
        use_cases::resolve_deep_link(&link(None, None), &projects).unwrap()
    else {
        panic!("expected create-worktree target");
    };
    assert_eq!(notice, None);
}

#[test]
fn deep_link_explicit_branch_wins_over_issue() {
    let projects = [project_view("web", "/src/web")];
    let mut request = link(None, Some("ABC-1"));
    request.branch = Some("hotfix".into());
    let DeepLinkTarget::CreateWorktree { prefill, .. } =
        use_cases::resolve_deep_link(&request, &projects).unwrap()
    else {
        panic!("expected create-worktree target");
    };
    assert_eq!(prefill.branch, "hotfix");
}

#[test]
fn deep_link_without_projects_fails() {
    let err = use_cases::resolve_deep_link(&link(Some("web"), None), &[]).unwrap_err();
    assert_eq!(err.to_string(), "No projects configured");

    let settings = DeepLinkRequest::new(DeepLinkRoute::Settings);
    assert_eq!(
        use_cases::resolve_deep_link(&settings, &[]).unwrap(),
        DeepLinkTarget::Settings
    );
}

// ---------------------------------------------------------------------------
// Integrations
// ---------------------------------------------------------------------------

#[tokio::test]
async fn github_token_is_validated_before_saving() {
    let backend = FakeBackend::new();
    backend.respond(
        "validate_github_token",
        json!({ "valid": false, "error": "Bad credentials" }),
    );
    let err = use_cases::configure_github(&api_for(&backend), "", "ghp_x", None)
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Token validation failed: Bad credentials");
    assert!(!backend.was_called("set_github_config"));
}

#[tokio::test]
async fn github_enterprise_config_is_saved_with_username() {
    let backend = FakeBackend::new();
    backend.respond(
        "validate_github_token",
        json!({ "valid": true, "username": "octo" }),
    );
    let username = use_cases::configure_github(
        &api_for(&backend),
        "Work",
        " ghp_x ",
        Some("github.acme.com"),
    )
    .await
    .unwrap();
    assert_eq!(username.as_deref(), Some("octo"));

    let saved = &backend.calls_to("set_github_config")[0]["config"];
    assert_eq!(saved["name"], "Work");
    assert_eq!(saved["config_type"], "enterprise");
    assert_eq!(saved["host"], "github.acme.com");
    assert_eq!(saved["token"], "ghp_x");
    assert_eq!(saved["username"], "octo");
    assert!(!saved["id"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn github_personal_config_defaults_name() {
    let backend = FakeBackend::new();
    backend.respond("validate_github_token", json!({ "valid": true }));
    use_cases::configure_github(&api_for(&backend), " ", "ghp_x", Some(" "))
        .await
        .unwrap();
    let saved = &backend.calls_to("set_github_config")[0]["config"];
    assert_eq!(saved["name"], "GitHub");
    assert_eq!(saved["config_type"], "personal");
    assert!(saved["host"].is_null());
}

#[tokio::test]
async fn jira_requires_all_fields_and_valid_credentials() {
    let backend = FakeBackend::new();
    assert!(use_cases::configure_jira(&api_for(&backend), "acme.atlassian.net", "", "t")
        .await
        .is_err());
    assert!(backend.calls().is_empty());

    backend.respond(
        "validate_jira_credentials",
        json!({ "valid": true, "username": "Ada" }),
    );
    let name = use_cases::configure_jira(
        &api_for(&backend),
        "https://acme.atlassian.net/",
        "ada@acme.com",
        "tok",
    )
    .await
    .unwrap();
    assert_eq!(name.as_deref(), Some("Ada"));
    let saved = &backend.calls_to("set_jira_config")[0]["config"];
    assert_eq!(saved["host"], "https://acme.atlassian.net");
    assert_eq!(saved["display_name"], "Ada");

    use_cases::remove_jira(&api_for(&backend)).await.unwrap();
    use_cases::remove_github(&api_for(&backend)).await.unwrap();
    assert!(backend.was_called("remove_jira_config"));
    assert!(backend.was_called("remove_github_config"));
}
