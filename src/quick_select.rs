//! Keyboard-driven highlight and type-to-filter over the visible worktrees.
//!
//! Purely client-side and never persisted. The caller passes the current
//! flattened list on every call, so the list may change freely between calls.

use std::time::{Duration, Instant};

pub const IDLE_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavEntry {
    /// Worktree path, the stable identity of a row.
    pub path: String,
    /// Text the filter matches against.
    pub haystack: String,
}

impl NavEntry {
    pub fn new(path: impl Into<String>, parts: &[&str]) -> Self {
        Self {
            path: path.into(),
            haystack: parts.join(" ").to_lowercase(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavState {
    Idle,
    Selecting,
    Filtering,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Next,
    Previous,
}

#[derive(Debug, Clone)]
pub struct QuickSelect {
    selected: Option<String>,
    filter: String,
    last_input: Option<Instant>,
    idle_timeout: Duration,
}

impl Default for QuickSelect {
    fn default() -> Self {
        Self::new(IDLE_TIMEOUT)
    }
}

impl QuickSelect {
    pub fn new(idle_timeout: Duration) -> Self {
        Self {
            selected: None,
            filter: String::new(),
            last_input: None,
            idle_timeout,
        }
    }

    pub fn state(&self) -> NavState {
        if !self.filter.is_empty() {
            NavState::Filtering
        } else if self.selected.is_some() {
            NavState::Selecting
        } else {
            NavState::Idle
        }
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn filter(&self) -> &str {
        &self.filter
    }

    pub fn matches(&self, entry: &NavEntry) -> bool {
        self.filter.is_empty() || entry.haystack.contains(&self.filter.to_lowercase())
    }

    pub fn visible<'a>(&self, entries: &'a [NavEntry]) -> Vec<&'a NavEntry> {
        entries.iter().filter(|e| self.matches(e)).collect()
    }

    /// Move the highlight, wrapping at both ends. With nothing highlighted,
    /// Next picks the first visible entry and Previous the last.
    pub fn navigate(&mut self, direction: Direction, entries: &[NavEntry], now: Instant) {
        self.last_input = Some(now);
        let visible = self.visible(entries);
        if visible.is_empty() {
            self.selected = None;
            return;
        }

        let current = self
            .selected
            .as_deref()
            .and_then(|path| visible.iter().position(|e| e.path == path));
        let len = visible.len();
        let next = match (current, direction) {
            (None, Direction::Next) => 0,
            (None, Direction::Previous) => len - 1,
            (Some(i), Direction::Next) => (i + 1) % len,
            (Some(i), Direction::Previous) => (i + len - 1) % len,
        };
        self.selected = Some(visible[next].path.clone());
    }

    /// Select a specific entry, e.g. after creating a worktree.
    pub fn select(&mut self, path: impl Into<String>, now: Instant) {
        self.selected = Some(path.into());
        self.last_input = Some(now);
    }

    /// The highlighted entry to open, if any. Does not change state.
    pub fn confirm(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn escape(&mut self) {
        self.filter.clear();
        self.selected = None;
        self.last_input = None;
    }

    pub fn push_char(&mut self, c: char, entries: &[NavEntry], now: Instant) {
        self.filter.push(c);
        self.last_input = Some(now);
        self.reconcile(entries);
    }

    pub fn pop_char(&mut self, entries: &[NavEntry], now: Instant) {
        self.filter.pop();
        self.last_input = Some(now);
        self.reconcile(entries);
    }

    /// Keep the highlight inside the visible set: snap to the first visible
    /// entry when it was filtered out, clear it when nothing is visible.
    pub fn reconcile(&mut self, entries: &[NavEntry]) {
        let visible = self.visible(entries);
        if visible.is_empty() {
            self.selected = None;
            return;
        }
        let still_visible = self
            .selected
            .as_deref()
            .is_some_and(|path| visible.iter().any(|e| e.path == path));
        if still_visible {
            return;
        }
        if self.selected.is_some() || !self.filter.is_empty() {
            self.selected = Some(visible[0].path.clone());
        }
    }

    /// Drop the highlight once the user has been idle long enough,
    /// unless a filter is active.
    pub fn tick(&mut self, now: Instant) {
        if !self.filter.is_empty() || self.selected.is_none() {
            return;
        }
        if let Some(last) = self.last_input {
            if now.saturating_duration_since(last) >= self.idle_timeout {
                tracing::debug!("quick-select idle timeout, clearing selection");
                self.selected = None;
                self.last_input = None;
            }
        }
    }
}
