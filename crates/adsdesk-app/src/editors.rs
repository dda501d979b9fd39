// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde_json::{Number, Value};

use crate::{ColumnDef, ColumnKind, display_value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorInput {
    Char(char),
    Backspace,
    Newline,
    NextOption,
    PrevOption,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CellEditor {
    Text {
        field: &'static str,
        original: Value,
        buffer: String,
        multiline: bool,
    },
    Select {
        field: &'static str,
        original: Value,
        options: &'static [&'static str],
        index: Option<usize>,
    },
    Image {
        field: &'static str,
        original: Value,
        path: String,
    },
}

impl CellEditor {
    pub fn open(column: &ColumnDef, current: &Value) -> Option<Self> {
        if !column.editable {
            return None;
        }
        let original = current.clone();
        let editor = match column.kind {
            ColumnKind::Text | ColumnKind::Textarea => Self::Text {
                field: column.field,
                buffer: display_value(current),
                original,
                multiline: column.kind == ColumnKind::Textarea,
            },
            ColumnKind::Select => Self::Select {
                field: column.field,
                index: current
                    .as_str()
                    .and_then(|value| column.options.iter().position(|option| *option == value)),
                original,
                options: column.options,
            },
            ColumnKind::Image => Self::Image {
                field: column.field,
                path: display_value(current),
                original,
            },
        };
        Some(editor)
    }

    pub fn field(&self) -> &'static str {
        match self {
            Self::Text { field, .. } | Self::Select { field, .. } | Self::Image { field, .. } => {
                *field
            }
        }
    }

    pub fn original(&self) -> &Value {
        match self {
            Self::Text { original, .. }
            | Self::Select { original, .. }
            | Self::Image { original, .. } => original,
        }
    }

    pub fn apply(&mut self, input: EditorInput) {
        match self {
            Self::Text {
                buffer, multiline, ..
            } => match input {
                EditorInput::Char(ch) => buffer.push(ch),
                EditorInput::Backspace => {
                    buffer.pop();
                }
                EditorInput::Newline if *multiline => buffer.push('\n'),
                _ => {}
            },
            Self::Select { options, index, .. } => {
                if options.is_empty() {
                    return;
                }
                let len = options.len();
                *index = match (input, *index) {
                    (EditorInput::NextOption, Some(current)) => Some((current + 1) % len),
                    (EditorInput::NextOption, None) => Some(0),
                    (EditorInput::PrevOption, Some(current)) => Some((current + len - 1) % len),
                    (EditorInput::PrevOption, None) => Some(len - 1),
                    (EditorInput::Char(ch), current) => ch
                        .to_digit(10)
                        .and_then(|digit| usize::try_from(digit).ok())
                        .filter(|digit| (1..=len).contains(digit))
                        .map(|digit| digit - 1)
                        .or(current),
                    (_, current) => current,
                };
            }
            Self::Image { path, .. } => match input {
                EditorInput::Char(ch) => path.push(ch),
                EditorInput::Backspace => {
                    path.pop();
                }
                _ => {}
            },
        }
    }

    pub fn draft(&self) -> Value {
        match self {
            Self::Text {
                original, buffer, ..
            } => text_value(original, buffer),
            Self::Select {
                original,
                options,
                index,
                ..
            } => match index.and_then(|index| options.get(index)) {
                Some(option) => Value::String((*option).to_owned()),
                None => original.clone(),
            },
            Self::Image { original, path, .. } => text_value(original, path.trim()),
        }
    }

    pub fn display(&self) -> String {
        match self {
            Self::Select { options, index, .. } => options
                .iter()
                .enumerate()
                .map(|(position, option)| {
                    if Some(position) == *index {
                        format!("[{}:{option}]", position + 1)
                    } else {
                        format!(" {}:{option} ", position + 1)
                    }
                })
                .collect::<Vec<_>>()
                .join(" "),
            Self::Text { buffer, .. } => format!("{buffer}_"),
            Self::Image { path, .. } => format!("{path}_"),
        }
    }

    /// Storage path to preview while an image cell is being edited.
    pub fn preview_path(&self) -> Option<&str> {
        match self {
            Self::Image { path, .. } if !path.trim().is_empty() => Some(path.trim()),
            _ => None,
        }
    }

    /// Discards the draft and hands back the value the cell keeps.
    pub fn cancel(self) -> Value {
        match self {
            Self::Text { original, .. }
            | Self::Select { original, .. }
            | Self::Image { original, .. } => original,
        }
    }

    /// The committed value, or `None` when nothing changed.
    pub fn commit(self) -> Option<Value> {
        let draft = self.draft();
        if &draft == self.original() {
            None
        } else {
            Some(draft)
        }
    }
}

// Empty input on a null cell stays null instead of becoming "". Numeric and
// boolean cells keep their JSON type when the text still reads as one.
fn text_value(original: &Value, text: &str) -> Value {
    if text.is_empty() && original.is_null() {
        return Value::Null;
    }
    if !original.is_string() && text == display_value(original) {
        return original.clone();
    }
    match original {
        Value::Number(_) => text
            .trim()
            .parse::<Number>()
            .map_or_else(|_| Value::String(text.to_owned()), Value::Number),
        Value::Bool(_) => match text.trim() {
            "yes" | "true" => Value::Bool(true),
            "no" | "false" => Value::Bool(false),
            _ => Value::String(text.to_owned()),
        },
        _ => Value::String(text.to_owned()),
    }
}
