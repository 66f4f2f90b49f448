use std::collections::HashSet;

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use grovr::model::{issue_category, pr_status, IssueCategory, PrStatus, ProjectView, Worktree};
use grovr::quick_select::NavState;
use grovr::state::Page;

use super::app::{App, Dialog};
use super::form::{FieldValue, Form};

const COL_GAP: &str = "  ";
const LABEL_WIDTH: u16 = 20;
const PR_WIDTH: usize = 26;
const ISSUE_WIDTH: usize = 30;
const SELECTED_BG: Color = Color::Rgb(40, 40, 50);

pub fn draw(f: &mut Frame, app: &App) {
    let filter_height = if app.quick.state() == NavState::Filtering {
        1
    } else {
        0
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(5),
            Constraint::Length(filter_height),
            Constraint::Length(3),
        ])
        .split(f.area());

    draw_worktree_list(f, app, chunks[0]);
    if filter_height > 0 {
        draw_filter_line(f, app, chunks[1]);
    }

    if let Some(form) = &app.form {
        if app.state.page != Page::Worktrees {
            draw_form(f, form);
        }
    }

    match &app.dialog {
        Some(Dialog::DeleteWorktree {
            worktree,
            delete_branch,
            force,
            last_error,
            ..
        }) => draw_delete_confirm(f, worktree, *delete_branch, *force, last_error.as_deref()),
        Some(Dialog::RemoveProject { name, .. }) => draw_remove_project(f, name),
        Some(Dialog::Error { title, message }) => draw_error(f, app, title, message),
        None => {}
    }

    draw_status_bar(f, app, chunks[2]);
}

fn draw_worktree_list(f: &mut Frame, app: &App, area: Rect) {
    let projects = app.state.ordered_projects();
    let worktree_count: usize = projects.iter().map(|p| p.worktrees.len()).sum();

    let mut title = vec![
        Span::styled(
            " grovr ",
            Style::default()
                .fg(Color::LightCyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!("({} projects, {} worktrees) ", projects.len(), worktree_count),
            Style::default().fg(Color::DarkGray),
        ),
    ];
    if app.state.loading {
        title.push(Span::styled("refreshing… ", Style::default().fg(Color::LightYellow)));
    } else if app.state.loaded_once {
        title.push(Span::styled(
            format!("updated {} ", app.state.view_model.loaded_at.format("%H:%M:%S")),
            Style::default().fg(Color::DarkGray),
        ));
    }

    let block = Block::default()
        .title(Line::from(title))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::LightCyan));
    let inner = block.inner(area);
    f.render_widget(block, area);

    if projects.is_empty() {
        let message = if app.state.loaded_once {
            "No projects yet. Press Ctrl+A to add one."
        } else {
            "Loading projects..."
        };
        f.render_widget(
            Paragraph::new(Line::from(Span::styled(
                message,
                Style::default().fg(Color::DarkGray),
            ))),
            inner,
        );
        return;
    }

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(0)])
        .split(inner);

    let columns = app.state.view_model.columns;
    let entries = app.state.nav_entries();
    let visible: HashSet<&str> = app
        .quick
        .visible(&entries)
        .into_iter()
        .map(|e| e.path.as_str())
        .collect();
    let filtering = app.quick.state() == NavState::Filtering;

    let branch_width = projects
        .iter()
        .flat_map(|p| p.worktrees.iter())
        .map(|w| w.branch.width())
        .max()
        .unwrap_or(6)
        .clamp(6, 40);
    let mut fixed = 4 + branch_width;
    if columns.code_hosting {
        fixed += COL_GAP.len() + PR_WIDTH;
    }
    if columns.issue_tracker {
        fixed += COL_GAP.len() + ISSUE_WIDTH;
    }
    let description_width = (inner.width as usize).saturating_sub(fixed + COL_GAP.len()).max(10);

    let header_style = Style::default()
        .fg(Color::White)
        .add_modifier(Modifier::BOLD);
    let mut header = vec![
        Span::raw("    "),
        Span::styled(pad("BRANCH", branch_width), header_style),
    ];
    if columns.description {
        header.push(Span::raw(COL_GAP));
        header.push(Span::styled(pad("DESCRIPTION", description_width), header_style));
    }
    if columns.code_hosting {
        header.push(Span::raw(COL_GAP));
        header.push(Span::styled(pad("PULL REQUEST", PR_WIDTH), header_style));
    }
    if columns.issue_tracker {
        header.push(Span::raw(COL_GAP));
        header.push(Span::styled("ISSUE", header_style));
    }
    f.render_widget(Paragraph::new(Line::from(header)), chunks[0]);

    let focused = app.focused_project().map(|p| p.repo_path.as_str());
    let selected = app.quick.selected();
    let mut items: Vec<ListItem> = Vec::new();
    let mut selected_row = None;

    for project in projects {
        let expanded = app.state.is_expanded(&project.repo_path);
        let rows: Vec<&Worktree> = if expanded {
            project
                .worktrees
                .iter()
                .filter(|w| visible.contains(w.path.as_str()))
                .collect()
        } else {
            Vec::new()
        };
        if filtering && rows.is_empty() {
            continue;
        }

        items.push(project_header(
            project,
            expanded,
            focused == Some(project.repo_path.as_str()),
            inner.width as usize,
        ));
        if let Some(error) = &project.error {
            items.push(ListItem::new(Line::from(Span::styled(
                format!("    {}", truncate(error, inner.width.saturating_sub(4) as usize)),
                Style::default().fg(Color::LightRed),
            ))));
        }

        for worktree in rows {
            let is_selected = selected == Some(worktree.path.as_str());
            if is_selected {
                selected_row = Some(items.len());
            }
            let mut spans = vec![
                if worktree.is_main {
                    Span::styled("  ● ", Style::default().fg(Color::LightGreen))
                } else {
                    Span::raw("    ")
                },
                Span::styled(
                    pad(&truncate(&worktree.branch, branch_width), branch_width),
                    if is_selected {
                        Style::default()
                            .fg(Color::White)
                            .add_modifier(Modifier::BOLD)
                    } else {
                        Style::default().fg(Color::Gray)
                    },
                ),
            ];
            if columns.description {
                spans.push(Span::raw(COL_GAP));
                let description = worktree.description.as_deref().unwrap_or("");
                spans.push(Span::styled(
                    pad(&truncate(description, description_width), description_width),
                    Style::default().fg(Color::Rgb(170, 170, 170)),
                ));
            }
            if columns.code_hosting {
                spans.push(Span::raw(COL_GAP));
                spans.push(pull_request_span(worktree));
            }
            if columns.issue_tracker {
                spans.push(Span::raw(COL_GAP));
                spans.extend(issue_spans(worktree));
            }

            let style = if is_selected {
                Style::default().bg(SELECTED_BG)
            } else {
                Style::default()
            };
            items.push(ListItem::new(Line::from(spans)).style(style));
        }
    }

    let mut list_state = ListState::default();
    list_state.select(selected_row);
    f.render_stateful_widget(List::new(items), chunks[1], &mut list_state);
}

fn project_header(project: &ProjectView, expanded: bool, focused: bool, width: usize) -> ListItem<'static> {
    let arrow = if expanded { "▾ " } else { "▸ " };
    let label = format!("{}{} ({}) ", arrow, project.name, project.worktrees.len());
    let fill = width.saturating_sub(label.width() + 1);
    let color = if focused { Color::LightCyan } else { Color::White };
    ListItem::new(Line::from(vec![
        Span::styled(
            label,
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        ),
        Span::styled("─".repeat(fill), Style::default().fg(Color::Rgb(60, 60, 60))),
    ]))
}

fn pull_request_span(worktree: &Worktree) -> Span<'static> {
    let Some(pr) = &worktree.pull_request else {
        return Span::raw(pad("", PR_WIDTH));
    };
    let status = pr_status(pr);
    let color = match status {
        PrStatus::Merged => Color::LightMagenta,
        PrStatus::Closed => Color::DarkGray,
        PrStatus::Draft => Color::Gray,
        PrStatus::ChecksFailed | PrStatus::ChangesRequested => Color::LightRed,
        PrStatus::Approved => Color::LightGreen,
        PrStatus::Open => Color::LightBlue,
    };
    let text = format!("#{} {}", pr.number, status.label());
    Span::styled(pad(&truncate(&text, PR_WIDTH), PR_WIDTH), Style::default().fg(color))
}

fn issue_spans(worktree: &Worktree) -> Vec<Span<'static>> {
    match (&worktree.issue, worktree.issue_key.as_deref()) {
        (Some(issue), _) => {
            let (icon, color) = match issue_category(issue) {
                IssueCategory::ToDo => ("○", Color::Gray),
                IssueCategory::InProgress => ("◐", Color::LightYellow),
                IssueCategory::Done => ("●", Color::LightGreen),
            };
            vec![
                Span::styled(format!("{} ", icon), Style::default().fg(color)),
                Span::styled(
                    truncate(&format!("{} {}", issue.key, issue.status), ISSUE_WIDTH - 2),
                    Style::default().fg(color),
                ),
            ]
        }
        (None, Some(key)) => vec![Span::styled(
            format!("  {}", truncate(key, ISSUE_WIDTH - 2)),
            Style::default().fg(Color::DarkGray),
        )],
        (None, None) => Vec::new(),
    }
}

fn draw_filter_line(f: &mut Frame, app: &App, area: Rect) {
    let entries = app.state.nav_entries();
    let count = app.quick.visible(&entries).len();
    let line = Line::from(vec![
        Span::styled(" / ", Style::default().fg(Color::LightYellow)),
        Span::styled(
            app.quick.filter().to_string(),
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!("  {} match{}", count, if count == 1 { "" } else { "es" }),
            Style::default().fg(Color::DarkGray),
        ),
    ]);
    f.render_widget(Paragraph::new(line), area);
}

fn draw_form(f: &mut Frame, form: &Form) {
    let field_heights: Vec<u16> = form
        .fields
        .iter()
        .map(|field| match &field.value {
            FieldValue::Text { multiline: true, .. } => 4,
            _ => 1,
        })
        .collect();
    let error_height = if form.error.is_some() { 2 } else { 0 };
    let height = field_heights.iter().sum::<u16>() + field_heights.len() as u16 + error_height + 3;
    let area = centered_rect_height(70, height, f.area());

    f.render_widget(Clear, area);
    let title_style = Style::default()
        .fg(Color::LightCyan)
        .add_modifier(Modifier::BOLD);
    let mut block = Block::default()
        .title(Span::styled(form.title.clone(), title_style))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::LightCyan));
    if form.busy {
        block = block.title_bottom(Span::styled(" working… ", Style::default().fg(Color::LightYellow)));
    }
    let inner = block.inner(area);
    f.render_widget(block, area);

    let mut constraints: Vec<Constraint> = Vec::new();
    for h in &field_heights {
        constraints.push(Constraint::Length(*h));
        constraints.push(Constraint::Length(1));
    }
    constraints.push(Constraint::Min(0));
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints(constraints)
        .split(inner);

    for (i, field) in form.fields.iter().enumerate() {
        let row = rows[i * 2];
        let cols = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(LABEL_WIDTH), Constraint::Min(0)])
            .split(row);
        let is_focused = i == form.focused;
        let label_style = if is_focused {
            Style::default()
                .fg(Color::LightCyan)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        f.render_widget(Paragraph::new(Span::styled(field.label, label_style)), cols[0]);

        match &field.value {
            FieldValue::Text { editor, .. } => f.render_widget(editor, cols[1]),
            FieldValue::Toggle(on) => {
                let text = if *on { "[x]" } else { "[ ]" };
                let style = if is_focused {
                    Style::default().fg(Color::White).bg(SELECTED_BG)
                } else {
                    Style::default().fg(Color::Gray)
                };
                f.render_widget(Paragraph::new(Span::styled(text, style)), cols[1]);
            }
            FieldValue::Choice { options, selected } => {
                let value = options.get(*selected).map(String::as_str).unwrap_or("");
                let style = if is_focused {
                    Style::default().fg(Color::White).bg(SELECTED_BG)
                } else {
                    Style::default().fg(Color::Gray)
                };
                f.render_widget(
                    Paragraph::new(Span::styled(format!("◂ {} ▸", value), style)),
                    cols[1],
                );
            }
        }
    }

    if let Some(error) = &form.error {
        if let Some(area) = rows.last() {
            f.render_widget(
                Paragraph::new(Span::styled(error.as_str(), Style::default().fg(Color::LightRed)))
                    .wrap(Wrap { trim: true }),
                *area,
            );
        }
    }
}

fn draw_delete_confirm(
    f: &mut Frame,
    worktree: &Worktree,
    delete_branch: bool,
    force: bool,
    last_error: Option<&str>,
) {
    let area = centered_rect(60, 45, f.area());
    f.render_widget(Clear, area);

    let accent = if force { Color::LightRed } else { Color::LightYellow };
    let mut text = vec![
        Line::from(""),
        Line::from(Span::styled(
            if force {
                format!("  Force delete '{}'?", worktree.branch)
            } else {
                format!("  Delete worktree '{}'?", worktree.branch)
            },
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            format!("  {}", worktree.path),
            Style::default().fg(Color::DarkGray),
        )),
        Line::from(""),
    ];
    if let Some(error) = last_error {
        text.push(Line::from(Span::styled(
            "  Removal failed:",
            Style::default().fg(Color::LightRed),
        )));
        text.push(Line::from(Span::styled(
            format!("  {}", error),
            Style::default().fg(Color::LightRed),
        )));
        text.push(Line::from(Span::styled(
            "  Uncommitted changes in this worktree will be lost.",
            Style::default().fg(Color::LightRed),
        )));
        text.push(Line::from(""));
    }
    text.push(Line::from(vec![
        Span::styled(
            if delete_branch { "  [x] " } else { "  [ ] " },
            Style::default().fg(accent),
        ),
        Span::styled("Also delete the branch", Style::default().fg(Color::Gray)),
    ]));

    let popup = Paragraph::new(text)
        .wrap(Wrap { trim: false })
        .block(
            Block::default()
                .title(Span::styled(
                    if force { " Force Delete " } else { " Delete Worktree " },
                    Style::default().fg(accent).add_modifier(Modifier::BOLD),
                ))
                .borders(Borders::ALL)
                .border_style(Style::default().fg(accent)),
        );
    f.render_widget(popup, area);
}

fn draw_remove_project(f: &mut Frame, name: &str) {
    let area = centered_rect(50, 25, f.area());
    f.render_widget(Clear, area);
    let text = vec![
        Line::from(""),
        Line::from(Span::styled(
            format!("  Remove project '{}'?", name),
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            "  The repository and its worktrees stay on disk.",
            Style::default().fg(Color::DarkGray),
        )),
    ];
    let popup = Paragraph::new(text).block(
        Block::default()
            .title(Span::styled(
                " Remove Project ",
                Style::default()
                    .fg(Color::LightRed)
                    .add_modifier(Modifier::BOLD),
            ))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::LightRed)),
    );
    f.render_widget(popup, area);
}

fn draw_error(f: &mut Frame, app: &App, title: &str, message: &str) {
    let area = centered_rect(60, 35, f.area());
    f.render_widget(Clear, area);
    let text = vec![
        Line::from(""),
        Line::from(Span::styled(
            format!("  {}", message),
            Style::default().fg(Color::White),
        )),
        Line::from(""),
        Line::from(Span::styled(
            format!("  Details in {}", app.config.log_path.display()),
            Style::default().fg(Color::DarkGray),
        )),
    ];
    let popup = Paragraph::new(text).wrap(Wrap { trim: false }).block(
        Block::default()
            .title(Span::styled(
                format!(" {} ", title),
                Style::default()
                    .fg(Color::LightRed)
                    .add_modifier(Modifier::BOLD),
            ))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::LightRed)),
    );
    f.render_widget(popup, area);
}

fn hint(key: &'static str, label: &'static str, color: Color) -> [Span<'static>; 2] {
    [
        Span::styled(key, Style::default().fg(color)),
        Span::styled(label, Style::default().fg(Color::DarkGray)),
    ]
}

fn draw_status_bar(f: &mut Frame, app: &App, area: Rect) {
    let hints: Vec<[Span<'static>; 2]> = match (&app.dialog, &app.state.page) {
        (Some(Dialog::DeleteWorktree { .. }), _) => vec![
            hint("b", " branch  ", Color::LightCyan),
            hint("y/Enter", " delete  ", Color::LightRed),
            hint("n/Esc", " cancel", Color::LightCyan),
        ],
        (Some(Dialog::RemoveProject { .. }), _) => vec![
            hint("y/Enter", " remove  ", Color::LightRed),
            hint("n/Esc", " cancel", Color::LightCyan),
        ],
        (Some(Dialog::Error { .. }), _) => vec![hint("Enter/Esc", " close", Color::LightCyan)],
        (None, Page::Worktrees) => vec![
            hint("↑/↓", " nav  ", Color::LightCyan),
            hint("type", " filter  ", Color::LightCyan),
            hint("Enter", " IDE  ", Color::LightGreen),
            hint("^N", " new  ", Color::LightGreen),
            hint("^E", " edit  ", Color::LightMagenta),
            hint("^D", " del  ", Color::LightRed),
            hint("^T", " term  ", Color::LightMagenta),
            hint("^O", " files  ", Color::LightMagenta),
            hint("^L", " pull  ", Color::LightMagenta),
            hint("^G", " fetch  ", Color::LightMagenta),
            hint("^R", " refresh  ", Color::LightCyan),
            hint("^P", " project  ", Color::LightCyan),
            hint("^S", " settings  ", Color::LightCyan),
            hint("^Q", " quit", Color::LightCyan),
        ],
        (None, Page::ProjectSettings(_)) => vec![
            hint("Tab", " field  ", Color::LightCyan),
            hint("^S", " save  ", Color::LightGreen),
            hint("^D", " remove project  ", Color::LightRed),
            hint("Esc", " cancel", Color::LightRed),
        ],
        (None, _) => vec![
            hint("Tab", " field  ", Color::LightCyan),
            hint("Space", " toggle  ", Color::LightCyan),
            hint("^S/Enter", " save  ", Color::LightGreen),
            hint("Esc", " cancel", Color::LightRed),
        ],
    };

    let mut line_spans: Vec<Span> = hints.into_iter().flatten().collect();

    if let Some(status) = &app.state.status {
        let color = if status.is_error {
            Color::LightRed
        } else {
            Color::LightYellow
        };
        line_spans.push(Span::styled(" │ ", Style::default().fg(Color::DarkGray)));
        line_spans.push(Span::styled(status.text.as_str(), Style::default().fg(color)));
    }

    let status = Paragraph::new(Line::from(line_spans)).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray)),
    );

    f.render_widget(status, area);
}

/// Cut `s` to at most `width` terminal columns, marking the cut with `…`.
fn truncate(s: &str, width: usize) -> String {
    if s.width() <= width {
        return s.to_string();
    }
    let mut out = String::new();
    let mut used = 0;
    for c in s.chars() {
        let w = c.width().unwrap_or(0);
        if used + w + 1 > width {
            break;
        }
        out.push(c);
        used += w;
    }
    out.push('…');
    out
}

fn pad(s: &str, width: usize) -> String {
    let fill = width.saturating_sub(s.width());
    format!("{}{}", s, " ".repeat(fill))
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

fn centered_rect_height(percent_x: u16, height: u16, r: Rect) -> Rect {
    let height = height.min(r.height);
    let top = r.y + (r.height - height) / 2;
    let rect = Rect::new(r.x, top, r.width, height);
    centered_rect(percent_x, 100, rect)
}
