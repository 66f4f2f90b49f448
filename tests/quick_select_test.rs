use std::time::{Duration, Instant};

use grovr::quick_select::{Direction, NavEntry, NavState, QuickSelect};

fn entries() -> Vec<NavEntry> {
    vec![
        NavEntry::new("/w/main", &["main", "", "", "web"]),
        NavEntry::new("/w/login", &["feat-login", "Login page", "ABC-1", "web"]),
        NavEntry::new("/w/billing", &["feat-billing", "Invoices", "ABC-2", "web"]),
    ]
}

#[test]
fn starts_idle() {
    let qs = QuickSelect::default();
    assert_eq!(qs.state(), NavState::Idle);
    assert_eq!(qs.confirm(), None);
}

#[test]
fn next_cycles_and_wraps() {
    let e = entries();
    let now = Instant::now();
    let mut qs = QuickSelect::default();

    let mut seen = Vec::new();
    for _ in 0..4 {
        qs.navigate(Direction::Next, &e, now);
        seen.push(qs.selected().unwrap().to_string());
    }
    assert_eq!(seen, ["/w/main", "/w/login", "/w/billing", "/w/main"]);
    assert_eq!(qs.state(), NavState::Selecting);
}

#[test]
fn previous_from_nothing_picks_last() {
    let e = entries();
    let mut qs = QuickSelect::default();
    qs.navigate(Direction::Previous, &e, Instant::now());
    assert_eq!(qs.selected(), Some("/w/billing"));
    qs.navigate(Direction::Previous, &e, Instant::now());
    assert_eq!(qs.selected(), Some("/w/login"));
}

#[test]
fn navigating_an_empty_list_selects_nothing() {
    let mut qs = QuickSelect::default();
    qs.navigate(Direction::Next, &[], Instant::now());
    assert_eq!(qs.selected(), None);
    assert_eq!(qs.state(), NavState::Idle);
}

// ---------------------------------------------------------------------------
// Filtering
// ---------------------------------------------------------------------------

#[test]
fn typing_filters_and_snaps_to_first_match() {
    let e = entries();
    let now = Instant::now();
    let mut qs = QuickSelect::default();
    for c in "inv".chars() {
        qs.push_char(c, &e, now);
    }
    assert_eq!(qs.state(), NavState::Filtering);
    assert_eq!(qs.filter(), "inv");
    assert_eq!(qs.selected(), Some("/w/billing"));
    let visible: Vec<&str> = qs.visible(&e).iter().map(|n| n.path.as_str()).collect();
    assert_eq!(visible, ["/w/billing"]);
}

#[test]
fn filter_is_case_insensitive_and_matches_issue_keys() {
    let e = entries();
    let mut qs = QuickSelect::default();
    for c in "abc-1".chars() {
        qs.push_char(c, &e, Instant::now());
    }
    assert_eq!(qs.selected(), Some("/w/login"));
}

#[test]
fn highlight_snaps_when_filtered_out() {
    let e = entries();
    let now = Instant::now();
    let mut qs = QuickSelect::default();
    qs.select("/w/main", now);
    qs.push_char('f', &e, now);
    qs.push_char('e', &e, now);
    assert_eq!(qs.selected(), Some("/w/login"));

    // Still visible: keep it
    qs.navigate(Direction::Next, &e, now);
    assert_eq!(qs.selected(), Some("/w/billing"));
    qs.push_char('a', &e, now);
    assert_eq!(qs.selected(), Some("/w/billing"));
}

#[test]
fn no_match_clears_selection_and_backspace_restores() {
    let e = entries();
    let now = Instant::now();
    let mut qs = QuickSelect::default();
    qs.push_char('z', &e, now);
    qs.push_char('z', &e, now);
    assert_eq!(qs.selected(), None);
    assert!(qs.visible(&e).is_empty());

    qs.pop_char(&e, now);
    qs.pop_char(&e, now);
    assert_eq!(qs.filter(), "");
    assert_eq!(qs.visible(&e).len(), 3);
}

#[test]
fn escape_clears_filter_and_highlight() {
    let e = entries();
    let mut qs = QuickSelect::default();
    qs.push_char('l', &e, Instant::now());
    qs.escape();
    assert_eq!(qs.state(), NavState::Idle);
    assert_eq!(qs.filter(), "");
    assert_eq!(qs.selected(), None);
}

#[test]
fn list_changes_are_reconciled() {
    let mut qs = QuickSelect::default();
    let now = Instant::now();
    qs.select("/w/login", now);
    let shrunk = vec![NavEntry::new("/w/main", &["main"])];
    qs.reconcile(&shrunk);
    assert_eq!(qs.selected(), Some("/w/main"));

    qs.reconcile(&[]);
    assert_eq!(qs.selected(), None);
}

// ---------------------------------------------------------------------------
// Idle timeout
// ---------------------------------------------------------------------------

#[test]
fn highlight_expires_after_idle_timeout() {
    let e = entries();
    let start = Instant::now();
    let mut qs = QuickSelect::new(Duration::from_secs(3));
    qs.navigate(Direction::Next, &e, start);

    qs.tick(start + Duration::from_secs(2));
    assert_eq!(qs.selected(), Some("/w/main"));

    qs.tick(start + Duration::from_secs(3));
    assert_eq!(qs.selected(), None);
    assert_eq!(qs.state(), NavState::Idle);
}

#[test]
fn input_resets_the_idle_clock() {
    let e = entries();
    let start = Instant::now();
    let mut qs = QuickSelect::new(Duration::from_secs(3));
    qs.navigate(Direction::Next, &e, start);
    qs.navigate(Direction::Next, &e, start + Duration::from_secs(2));
    qs.tick(start + Duration::from_secs(4));
    assert_eq!(qs.selected(), Some("/w/login"));
}

#[test]
fn active_filter_is_never_timed_out() {
    let e = entries();
    let start = Instant::now();
    let mut qs = QuickSelect::new(Duration::from_secs(3));
    qs.push_char('l', &e, start);
    qs.tick(start + Duration::from_secs(60));
    assert_eq!(qs.selected(), Some("/w/login"));
    assert_eq!(qs.state(), NavState::Filtering);
}
