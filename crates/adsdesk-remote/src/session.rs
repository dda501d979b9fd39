// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use adsdesk_app::{
    Backend, ChangeHistoryEntry, History, Record, RowId, TableName, field_value,
};
use serde_json::Value;
use tracing::debug;

use crate::mutations::{MutationError, Mutations};

/// Committed cell edits and deletions, recorded so they can be walked back
/// and forward through the same mutation layer.
pub struct EditSession<B> {
    mutations: Mutations<B>,
    history: History,
}

impl<B: Backend> EditSession<B> {
    pub fn new(mutations: Mutations<B>) -> Self {
        Self::with_history(mutations, History::new())
    }

    pub fn with_history(mutations: Mutations<B>, history: History) -> Self {
        Self { mutations, history }
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn mutations(&self) -> &Mutations<B> {
        &self.mutations
    }

    pub fn mutations_mut(&mut self) -> &mut Mutations<B> {
        &mut self.mutations
    }

    /// Returns `Ok(false)` when the value matches what is already cached.
    pub fn commit(
        &mut self,
        table: TableName,
        row_id: &RowId,
        field: &str,
        value: Value,
    ) -> Result<bool, MutationError> {
        let Some(row) = self.mutations.row(table, row_id) else {
            return Err(MutationError::UnknownRow {
                table,
                row_id: row_id.clone(),
            });
        };
        if field_value(row, field) == value {
            return Ok(false);
        }

        let old = self
            .mutations
            .table(table)
            .update(row_id, field, value.clone())?;
        self.history.push(ChangeHistoryEntry::field_change(
            table,
            row_id.clone(),
            field,
            old,
            value,
        ));
        Ok(true)
    }

    pub fn create(&mut self, table: TableName, record: &Record) -> Result<Record, MutationError> {
        self.mutations.table(table).create(record)
    }

    pub fn delete(&mut self, table: TableName, row_id: &RowId) -> Result<(), MutationError> {
        let removed = self.mutations.table(table).delete(row_id)?;
        self.history
            .push(ChangeHistoryEntry::deletion(table, row_id.clone(), removed));
        Ok(())
    }

    /// Reverts the entry at the cursor. The cursor only moves once the
    /// backend accepted the inverse write.
    pub fn undo(&mut self) -> Result<bool, MutationError> {
        let Some(entry) = self.history.entry_to_undo().cloned() else {
            return Ok(false);
        };
        let mut table = self.mutations.table(entry.table);
        match (&entry.old_data, entry.is_delete) {
            (Some(old_data), true) => {
                table.restore(old_data)?;
            }
            _ => {
                table.update(&entry.row_id, &entry.field, entry.old_value.clone())?;
            }
        }
        self.history.mark_undone();
        debug!(cursor = ?self.history.current_index(), "undo applied");
        Ok(true)
    }

    pub fn redo(&mut self) -> Result<bool, MutationError> {
        let Some(entry) = self.history.entry_to_redo().cloned() else {
            return Ok(false);
        };
        let mut table = self.mutations.table(entry.table);
        if entry.is_delete {
            table.delete(&entry.row_id)?;
        } else {
            table.update(&entry.row_id, &entry.field, entry.new_value.clone())?;
        }
        self.history.mark_redone();
        debug!(cursor = ?self.history.current_index(), "redo applied");
        Ok(true)
    }
}
