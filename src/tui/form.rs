use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::style::{Modifier, Style};
use tui_textarea::{Input, Key, TextArea};

pub enum FieldValue {
    Text {
        editor: TextArea<'static>,
        multiline: bool,
    },
    Toggle(bool),
    Choice {
        options: Vec<String>,
        selected: usize,
    },
}

pub struct Field {
    pub label: &'static str,
    pub value: FieldValue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormEvent {
    None,
    Submit,
    Cancel,
    /// The value of the named field changed.
    Changed(&'static str),
}

/// A popup of labelled fields. Tab moves between fields, Ctrl+S submits.
pub struct Form {
    pub title: String,
    pub fields: Vec<Field>,
    pub focused: usize,
    pub error: Option<String>,
    pub busy: bool,
}

impl Form {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            fields: Vec::new(),
            focused: 0,
            error: None,
            busy: false,
        }
    }

    pub fn with_text(self, label: &'static str, initial: &str) -> Self {
        self.push_text(label, initial, false)
    }

    /// One entry per line.
    pub fn with_lines(self, label: &'static str, lines: &[String]) -> Self {
        self.push_text(label, &lines.join("\n"), true)
    }

    pub fn with_toggle(mut self, label: &'static str, value: bool) -> Self {
        self.fields.push(Field {
            label,
            value: FieldValue::Toggle(value),
        });
        self
    }

    pub fn with_choice(mut self, label: &'static str, options: Vec<String>, selected: usize) -> Self {
        let selected = selected.min(options.len().saturating_sub(1));
        self.fields.push(Field {
            label,
            value: FieldValue::Choice { options, selected },
        });
        self
    }

    fn push_text(mut self, label: &'static str, initial: &str, multiline: bool) -> Self {
        let lines: Vec<String> = if initial.is_empty() {
            vec![String::new()]
        } else {
            initial.lines().map(str::to_string).collect()
        };
        let mut editor = TextArea::new(lines);
        editor.set_cursor_line_style(Style::default());
        editor.move_cursor(tui_textarea::CursorMove::Bottom);
        editor.move_cursor(tui_textarea::CursorMove::End);
        self.fields.push(Field {
            label,
            value: FieldValue::Text { editor, multiline },
        });
        self.refresh_cursors();
        self
    }

    fn field(&self, label: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.label == label)
    }

    /// Raw text of a field, lines joined with `\n`.
    pub fn text(&self, label: &str) -> String {
        match self.field(label).map(|f| &f.value) {
            Some(FieldValue::Text { editor, .. }) => editor.lines().join("\n"),
            _ => String::new(),
        }
    }

    /// Non-empty trimmed lines of a field.
    pub fn lines(&self, label: &str) -> Vec<String> {
        self.text(label)
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect()
    }

    pub fn flag(&self, label: &str) -> bool {
        matches!(
            self.field(label).map(|f| &f.value),
            Some(FieldValue::Toggle(true))
        )
    }

    pub fn choice(&self, label: &str) -> usize {
        match self.field(label).map(|f| &f.value) {
            Some(FieldValue::Choice { selected, .. }) => *selected,
            _ => 0,
        }
    }

    pub fn set_text(&mut self, label: &str, value: &str) {
        if let Some(Field {
            value: FieldValue::Text { editor, .. },
            ..
        }) = self.fields.iter_mut().find(|f| f.label == label)
        {
            let mut replacement = TextArea::new(value.lines().map(str::to_string).collect());
            replacement.set_cursor_line_style(Style::default());
            replacement.move_cursor(tui_textarea::CursorMove::End);
            *editor = replacement;
        }
        self.refresh_cursors();
    }

    pub fn focus_next(&mut self) {
        if !self.fields.is_empty() {
            self.focused = (self.focused + 1) % self.fields.len();
            self.refresh_cursors();
        }
    }

    pub fn focus_previous(&mut self) {
        if !self.fields.is_empty() {
            self.focused = (self.focused + self.fields.len() - 1) % self.fields.len();
            self.refresh_cursors();
        }
    }

    /// Only the focused field shows a cursor.
    fn refresh_cursors(&mut self) {
        for (i, field) in self.fields.iter_mut().enumerate() {
            if let FieldValue::Text { editor, .. } = &mut field.value {
                let style = if i == self.focused {
                    Style::default().add_modifier(Modifier::REVERSED)
                } else {
                    Style::default()
                };
                editor.set_cursor_style(style);
            }
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> FormEvent {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Esc => return FormEvent::Cancel,
            KeyCode::Char('s') if ctrl => return FormEvent::Submit,
            KeyCode::Tab => {
                self.focus_next();
                return FormEvent::None;
            }
            KeyCode::BackTab => {
                self.focus_previous();
                return FormEvent::None;
            }
            _ => {}
        }

        let multiline = matches!(
            self.fields.get(self.focused).map(|f| &f.value),
            Some(FieldValue::Text { multiline: true, .. })
        );
        match key.code {
            KeyCode::Up if !multiline => {
                self.focus_previous();
                return FormEvent::None;
            }
            KeyCode::Down if !multiline => {
                self.focus_next();
                return FormEvent::None;
            }
            _ => {}
        }

        let Some(field) = self.fields.get_mut(self.focused) else {
            return FormEvent::None;
        };
        let label = field.label;
        match &mut field.value {
            FieldValue::Text { editor, multiline } => {
                if key.code == KeyCode::Enter && !*multiline {
                    FormEvent::Submit
                } else if editor.input(to_input(key)) {
                    FormEvent::Changed(label)
                } else {
                    FormEvent::None
                }
            }
            FieldValue::Toggle(value) => match key.code {
                KeyCode::Char(' ') => {
                    *value = !*value;
                    FormEvent::Changed(label)
                }
                KeyCode::Enter => FormEvent::Submit,
                _ => FormEvent::None,
            },
            FieldValue::Choice { options, selected } => match key.code {
                KeyCode::Left if !options.is_empty() => {
                    *selected = (*selected + options.len() - 1) % options.len();
                    FormEvent::Changed(label)
                }
                KeyCode::Right | KeyCode::Char(' ') if !options.is_empty() => {
                    *selected = (*selected + 1) % options.len();
                    FormEvent::Changed(label)
                }
                KeyCode::Enter => FormEvent::Submit,
                _ => FormEvent::None,
            },
        }
    }
}

/// Translate a terminal key event into textarea input.
pub fn to_input(key: KeyEvent) -> Input {
    let mapped = match key.code {
        KeyCode::Char(c) => Key::Char(c),
        KeyCode::Backspace => Key::Backspace,
        KeyCode::Enter => Key::Enter,
        KeyCode::Left => Key::Left,
        KeyCode::Right => Key::Right,
        KeyCode::Up => Key::Up,
        KeyCode::Down => Key::Down,
        KeyCode::Tab => Key::Tab,
        KeyCode::Delete => Key::Delete,
        KeyCode::Home => Key::Home,
        KeyCode::End => Key::End,
        KeyCode::PageUp => Key::PageUp,
        KeyCode::PageDown => Key::PageDown,
        KeyCode::Esc => Key::Esc,
        KeyCode::F(n) => Key::F(n),
        _ => Key::Null,
    };
    Input {
        key: mapped,
        ctrl: key.modifiers.contains(KeyModifiers::CONTROL),
        alt: key.modifiers.contains(KeyModifiers::ALT),
        shift: key.modifiers.contains(KeyModifiers::SHIFT),
    }
}
