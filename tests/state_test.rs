use grovr::model::{ProjectView, ViewModel, Worktree};
use grovr::state::{reduce, Action, AppState, Page, StatusLine};

fn project(name: &str, worktrees: &[(&str, &str, bool)]) -> ProjectView {
    ProjectView {
        name: name.to_string(),
        repo_path: format!("/src/{}", name),
        default_base_branch: None,
        ide: None,
        worktrees: worktrees
            .iter()
            .map(|(path, branch, is_main)| Worktree::new(*path, *branch, *is_main))
            .collect(),
        error: None,
    }
}

fn loaded(state: AppState, projects: Vec<ProjectView>) -> AppState {
    let state = reduce(state, Action::RefreshStarted);
    let generation = state.generation;
    reduce(
        state,
        Action::ViewModelLoaded {
            generation,
            view_model: ViewModel::new(projects),
        },
    )
}

#[test]
fn refresh_lifecycle() {
    let state = reduce(AppState::default(), Action::RefreshStarted);
    assert!(state.loading);
    assert!(!state.loaded_once);

    let state = loaded(state, vec![project("web", &[("/src/web", "main", true)])]);
    assert!(!state.loading);
    assert!(state.loaded_once);
    assert_eq!(state.order, vec!["/src/web".to_string()]);
}

#[test]
fn stale_view_model_is_discarded() {
    let state = reduce(AppState::default(), Action::RefreshStarted);
    let old = state.generation;
    let state = reduce(state, Action::RefreshStarted);

    let state = reduce(
        state,
        Action::ViewModelLoaded {
            generation: old,
            view_model: ViewModel::new(vec![project("stale", &[])]),
        },
    );
    assert!(state.view_model.projects.is_empty());
    assert!(state.loading);

    let state = reduce(
        state,
        Action::RefreshFailed {
            generation: old,
            error: "late failure".into(),
        },
    );
    assert!(state.status.is_none());
    assert!(state.loading);
}

#[test]
fn current_failure_sets_error_status() {
    let state = reduce(AppState::default(), Action::RefreshStarted);
    let generation = state.generation;
    let state = reduce(
        state,
        Action::RefreshFailed {
            generation,
            error: "backend gone".into(),
        },
    );
    assert!(!state.loading);
    let status = state.status.unwrap();
    assert!(status.is_error);
    assert_eq!(status.text, "Refresh failed: backend gone");
}

#[test]
fn new_projects_start_expanded_but_collapse_sticks() {
    let state = loaded(AppState::default(), vec![project("web", &[])]);
    assert!(state.is_expanded("/src/web"));

    let state = reduce(state, Action::ToggleExpanded("/src/web".into()));
    assert!(!state.is_expanded("/src/web"));

    let state = loaded(state, vec![project("web", &[]), project("api", &[])]);
    assert!(!state.is_expanded("/src/web"));
    assert!(state.is_expanded("/src/api"));
}

#[test]
fn nav_entries_skip_collapsed_projects() {
    let state = loaded(
        AppState::default(),
        vec![
            project("web", &[("/src/web", "main", true), ("/w/a", "feat-a", false)]),
            project("api", &[("/src/api", "main", true)]),
        ],
    );
    let paths: Vec<String> = state.nav_entries().into_iter().map(|e| e.path).collect();
    assert_eq!(paths, ["/src/web", "/w/a", "/src/api"]);

    let state = reduce(state, Action::ToggleExpanded("/src/web".into()));
    let paths: Vec<String> = state.nav_entries().into_iter().map(|e| e.path).collect();
    assert_eq!(paths, ["/src/api"]);
}

#[test]
fn nav_entries_follow_display_order() {
    let state = loaded(
        AppState::default(),
        vec![
            project("web", &[("/src/web", "main", true)]),
            project("api", &[("/src/api", "main", true)]),
        ],
    );
    let state = reduce(
        state,
        Action::ReorderApplied {
            order: vec!["/src/api".into(), "/src/web".into()],
        },
    );
    let paths: Vec<String> = state.nav_entries().into_iter().map(|e| e.path).collect();
    assert_eq!(paths, ["/src/api", "/src/web"]);
}

#[test]
fn navigation_and_status() {
    let state = reduce(AppState::default(), Action::Navigate(Page::Settings));
    assert_eq!(state.page, Page::Settings);

    let state = reduce(state, Action::SetStatus(StatusLine::info("Pulled")));
    assert_eq!(state.status, Some(StatusLine::info("Pulled")));

    let state = reduce(state, Action::ClearStatus);
    assert_eq!(state.status, None);
}
