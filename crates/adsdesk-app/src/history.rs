// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::VecDeque;

use crate::{Record, RowId, TableName};

pub const MAX_HISTORY_ENTRIES: usize = 100;

/// One reversible edit. Deletions carry the full row in `old_data` so they can
/// be restored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeHistoryEntry {
    pub row_id: RowId,
    pub field: String,
    pub old_value: Value,
    pub new_value: Value,
    pub table: TableName,
    #[serde(default)]
    pub is_delete: bool,
    #[serde(default)]
    pub old_data: Option<Record>,
}

impl ChangeHistoryEntry {
    pub fn field_change(
        table: TableName,
        row_id: RowId,
        field: impl Into<String>,
        old_value: Value,
        new_value: Value,
    ) -> Self {
        Self {
            row_id,
            field: field.into(),
            old_value,
            new_value,
            table,
            is_delete: false,
            old_data: None,
        }
    }

    pub fn deletion(table: TableName, row_id: RowId, old_data: Record) -> Self {
        Self {
            row_id,
            field: String::new(),
            old_value: Value::Null,
            new_value: Value::Null,
            table,
            is_delete: true,
            old_data: Some(old_data),
        }
    }
}

/// Linear undo log. `applied` counts the entries at or before the cursor, so
/// `applied == 0` means everything has been undone and `applied == len` means
/// nothing is left to redo.
#[derive(Debug, Clone, PartialEq)]
pub struct History {
    entries: VecDeque<ChangeHistoryEntry>,
    applied: usize,
    capacity: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}

impl History {
    pub fn new() -> Self {
        Self::with_capacity(MAX_HISTORY_ENTRIES)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            applied: 0,
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = &ChangeHistoryEntry> {
        self.entries.iter()
    }

    pub fn push(&mut self, entry: ChangeHistoryEntry) {
        self.entries.truncate(self.applied);
        self.entries.push_back(entry);
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
        self.applied = self.entries.len();
    }

    pub fn current_index(&self) -> Option<usize> {
        self.applied.checked_sub(1)
    }

    /// Moves the cursor directly. `None` parks it before the first entry;
    /// indexes past the tail clamp to the tail.
    pub fn set_current_index(&mut self, index: Option<usize>) {
        self.applied = match index {
            None => 0,
            Some(index) => index.saturating_add(1).min(self.entries.len()),
        };
    }

    pub fn can_undo(&self) -> bool {
        self.applied > 0
    }

    pub fn can_redo(&self) -> bool {
        self.applied < self.entries.len()
    }

    pub fn entry_to_undo(&self) -> Option<&ChangeHistoryEntry> {
        self.current_index()
            .and_then(|index| self.entries.get(index))
    }

    pub fn entry_to_redo(&self) -> Option<&ChangeHistoryEntry> {
        self.entries.get(self.applied)
    }

    pub fn mark_undone(&mut self) -> bool {
        if !self.can_undo() {
            return false;
        }
        self.applied -= 1;
        true
    }

    pub fn mark_redone(&mut self) -> bool {
        if !self.can_redo() {
            return false;
        }
        self.applied += 1;
        true
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.applied = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::{ChangeHistoryEntry, History, MAX_HISTORY_ENTRIES};
    use crate::{Record, RowId, TableName};
    use serde_json::json;

    fn edit(label: &str) -> ChangeHistoryEntry {
        ChangeHistoryEntry::field_change(
            TableName::Campaigns,
            RowId::new("c-1"),
            "name",
            json!(format!("before {label}")),
            json!(label),
        )
    }

    fn labels(history: &History) -> Vec<String> {
        history
            .entries()
            .map(|entry| entry.new_value.as_str().unwrap_or_default().to_owned())
            .collect()
    }

    #[test]
    fn length_is_min_of_edits_and_cap() {
        for count in [0usize, 1, 42, 99, 100, 101, 250] {
            let mut history = History::new();
            for index in 0..count {
                history.push(edit(&index.to_string()));
                assert!(history.len() <= MAX_HISTORY_ENTRIES);
            }
            assert_eq!(history.len(), count.min(MAX_HISTORY_ENTRIES));
        }
    }

    #[test]
    fn cap_evicts_oldest_entries_first() {
        let mut history = History::new();
        for index in 0..105 {
            history.push(edit(&index.to_string()));
        }
        let kept = labels(&history);
        assert_eq!(kept.first().map(String::as_str), Some("5"));
        assert_eq!(kept.last().map(String::as_str), Some("104"));
        assert_eq!(history.current_index(), Some(MAX_HISTORY_ENTRIES - 1));
        assert!(!history.can_redo());
    }

    #[test]
    fn new_edit_after_undo_discards_redo_branch() {
        let mut history = History::new();
        history.push(edit("A"));
        history.push(edit("B"));
        history.push(edit("C"));
        assert_eq!(history.current_index(), Some(2));

        assert!(history.mark_undone());
        assert_eq!(history.current_index(), Some(1));
        assert!(history.can_redo());

        history.push(edit("D"));
        assert_eq!(labels(&history), vec!["A", "B", "D"]);
        assert_eq!(history.current_index(), Some(2));
        assert!(!history.can_redo());
        assert!(history.entry_to_redo().is_none());
    }

    #[test]
    fn undo_then_redo_returns_to_the_same_cursor() {
        let mut history = History::new();
        for label in ["A", "B", "C", "D"] {
            history.push(edit(label));
        }
        let before = history.clone();

        for _ in 0..3 {
            assert!(history.mark_undone());
        }
        assert_eq!(history.current_index(), Some(0));
        for _ in 0..3 {
            assert!(history.mark_redone());
        }
        assert_eq!(history, before);
    }

    #[test]
    fn undo_and_redo_stop_at_the_ends() {
        let mut history = History::new();
        assert!(!history.mark_undone());
        assert!(!history.mark_redone());

        history.push(edit("A"));
        assert!(history.mark_undone());
        assert_eq!(history.current_index(), None);
        assert!(history.entry_to_undo().is_none());
        assert!(!history.mark_undone());

        assert_eq!(
            history.entry_to_redo().map(|entry| entry.new_value.clone()),
            Some(json!("A"))
        );
    }

    #[test]
    fn set_current_index_clamps_to_tail() {
        let mut history = History::new();
        history.push(edit("A"));
        history.push(edit("B"));

        history.set_current_index(Some(10));
        assert_eq!(history.current_index(), Some(1));

        history.set_current_index(None);
        assert_eq!(history.current_index(), None);
        assert!(history.can_redo());

        history.set_current_index(Some(0));
        assert_eq!(history.current_index(), Some(0));
    }

    #[test]
    fn deletion_entries_keep_the_old_row() {
        let mut row = Record::new();
        row.insert("id".to_owned(), json!("p-1"));
        row.insert("name".to_owned(), json!("Nora"));
        let entry = ChangeHistoryEntry::deletion(TableName::Personas, RowId::new("p-1"), row.clone());
        assert!(entry.is_delete);
        assert_eq!(entry.old_data, Some(row));
    }

    #[test]
    fn tiny_capacity_still_keeps_the_latest_entry() {
        let mut history = History::with_capacity(0);
        assert_eq!(history.capacity(), 1);
        history.push(edit("A"));
        history.push(edit("B"));
        assert_eq!(labels(&history), vec!["B"]);
    }
}
