// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use adsdesk_app::{Backend, Notification, Record, RowId, TableName, field_value, record_id};
use serde_json::{Value, json};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionNames {
    pub folder_provisioning: String,
    pub image_generation: String,
}

impl Default for FunctionNames {
    fn default() -> Self {
        Self {
            folder_provisioning: "create-organization-folder".to_owned(),
            image_generation: "generate-image".to_owned(),
        }
    }
}

#[derive(Debug, Error)]
pub enum MutationError {
    /// The backend refused the write; `message` is its own wording.
    #[error("{message}")]
    Remote { table: TableName, message: String },
    /// The row was written but the follow-up function failed.
    #[error("{table} row {row_id} was saved, but {function} failed: {message}")]
    SideEffect {
        table: TableName,
        row_id: RowId,
        function: String,
        message: String,
        record: Record,
    },
    #[error("{table} row {row_id} is not loaded -- refresh and retry")]
    UnknownRow { table: TableName, row_id: RowId },
    #[error("{table} insert returned no row with an id")]
    MissingRow { table: TableName },
}

impl MutationError {
    /// The record that exists remotely despite the error, if any.
    pub fn persisted_record(&self) -> Option<&Record> {
        match self {
            Self::SideEffect { record, .. } => Some(record),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
struct CachedTable {
    rows: Vec<Record>,
    loaded: bool,
    stale: bool,
    // Where deleted rows sat, so a restore puts them back in place.
    deleted_at: BTreeMap<RowId, usize>,
}

impl CachedTable {
    fn position(&self, row_id: &RowId) -> Option<usize> {
        self.rows
            .iter()
            .position(|row| record_id(row).as_ref() == Some(row_id))
    }
}

/// Cached table views over a [`Backend`], written optimistically. Outcomes
/// queue up as notifications for the UI to drain.
pub struct Mutations<B> {
    backend: B,
    functions: FunctionNames,
    cache: BTreeMap<TableName, CachedTable>,
    notifications: Vec<Notification>,
}

impl<B: Backend> Mutations<B> {
    pub fn new(backend: B, functions: FunctionNames) -> Self {
        Self {
            backend,
            functions,
            cache: BTreeMap::new(),
            notifications: Vec::new(),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn functions(&self) -> &FunctionNames {
        &self.functions
    }

    pub fn table(&mut self, table: TableName) -> TableMutations<'_, B> {
        TableMutations { layer: self, table }
    }

    pub fn rows(&self, table: TableName) -> &[Record] {
        self.cache
            .get(&table)
            .map(|cached| cached.rows.as_slice())
            .unwrap_or_default()
    }

    pub fn row(&self, table: TableName, row_id: &RowId) -> Option<&Record> {
        let cached = self.cache.get(&table)?;
        cached.position(row_id).map(|index| &cached.rows[index])
    }

    /// True until the table is loaded, and again after any write to it or to
    /// a table it depends on.
    pub fn is_stale(&self, table: TableName) -> bool {
        self.cache
            .get(&table)
            .is_none_or(|cached| !cached.loaded || cached.stale)
    }

    pub fn invalidate(&mut self, table: TableName) {
        for name in std::iter::once(table).chain(table.dependents().iter().copied()) {
            self.cache.entry(name).or_default().stale = true;
        }
    }

    pub fn take_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications)
    }

    fn cached_mut(&mut self, table: TableName) -> &mut CachedTable {
        self.cache.entry(table).or_default()
    }

    fn notify(&mut self, notification: Notification) {
        self.notifications.push(notification);
    }
}

/// Writes against one table of a [`Mutations`] layer.
pub struct TableMutations<'a, B> {
    layer: &'a mut Mutations<B>,
    table: TableName,
}

impl<B: Backend> TableMutations<'_, B> {
    pub fn load(&mut self) -> Result<usize, MutationError> {
        let rows = match self.layer.backend.select(self.table) {
            Ok(rows) => rows,
            Err(error) => return Err(self.remote_failure("load", &error)),
        };
        let cached = self.layer.cached_mut(self.table);
        cached.rows = rows;
        cached.loaded = true;
        cached.stale = false;
        Ok(cached.rows.len())
    }

    pub fn create(&mut self, record: &Record) -> Result<Record, MutationError> {
        let table = self.table;
        let rows = match self.layer.backend.insert(table, record) {
            Ok(rows) => rows,
            Err(error) => return Err(self.remote_failure("create", &error)),
        };
        let Some((created, row_id)) = rows
            .into_iter()
            .next()
            .and_then(|row| record_id(&row).map(|id| (row, id)))
        else {
            self.layer.invalidate(table);
            let error = MutationError::MissingRow { table };
            self.layer.notify(Notification::error(error.to_string()));
            return Err(error);
        };
        info!(%table, row = %row_id, "created row");
        self.layer.cached_mut(table).rows.push(created.clone());

        if table.provisions_folder() {
            let function = self.layer.functions.folder_provisioning.clone();
            let body = json!({ "organization_id": row_id.as_str() });
            if let Err(error) = self.layer.backend.invoke(&function, &body) {
                let message = error.to_string();
                warn!(%table, row = %row_id, %function, %message, "folder provisioning failed");
                self.layer.invalidate(table);
                self.layer.notify(Notification::warning(format!(
                    "{row_id} was saved, but its folder could not be created: {message}"
                )));
                return Err(MutationError::SideEffect {
                    table,
                    row_id,
                    function,
                    message,
                    record: created,
                });
            }
        }

        self.layer.invalidate(table);
        self.layer
            .notify(Notification::success(format!("created {table} row {row_id}")));
        Ok(created)
    }

    /// Writes one field and returns the value it replaced. The cached row
    /// shows the new value immediately and reverts if the write fails.
    pub fn update(
        &mut self,
        row_id: &RowId,
        field: &str,
        value: Value,
    ) -> Result<Value, MutationError> {
        let table = self.table;
        let old = {
            let cached = self.layer.cached_mut(table);
            let Some(index) = cached.position(row_id) else {
                return Err(MutationError::UnknownRow {
                    table,
                    row_id: row_id.clone(),
                });
            };
            let row = &mut cached.rows[index];
            let old = field_value(row, field);
            row.insert(field.to_owned(), value.clone());
            old
        };

        let mut patch = Record::new();
        patch.insert(field.to_owned(), value);
        match self.layer.backend.update(table, row_id, &patch) {
            Ok(rows) => {
                if let Some(updated) = rows.into_iter().next() {
                    let cached = self.layer.cached_mut(table);
                    if let Some(index) = cached.position(row_id) {
                        cached.rows[index] = updated;
                    }
                }
                info!(%table, row = %row_id, field, "updated field");
                self.layer.invalidate(table);
                self.layer.notify(Notification::success(format!("saved {field}")));
                Ok(old)
            }
            Err(error) => {
                let cached = self.layer.cached_mut(table);
                if let Some(index) = cached.position(row_id) {
                    cached.rows[index].insert(field.to_owned(), old);
                }
                Err(self.remote_failure("update", &error))
            }
        }
    }

    /// Deletes a row and hands back its last cached state.
    pub fn delete(&mut self, row_id: &RowId) -> Result<Record, MutationError> {
        let table = self.table;
        let (index, removed) = {
            let cached = self.layer.cached_mut(table);
            let Some(index) = cached.position(row_id) else {
                return Err(MutationError::UnknownRow {
                    table,
                    row_id: row_id.clone(),
                });
            };
            (index, cached.rows.remove(index))
        };

        match self.layer.backend.delete(table, row_id) {
            Ok(()) => {
                info!(%table, row = %row_id, "deleted row");
                self.layer
                    .cached_mut(table)
                    .deleted_at
                    .insert(row_id.clone(), index);
                self.layer.invalidate(table);
                self.layer
                    .notify(Notification::success(format!("deleted {table} row {row_id}")));
                Ok(removed)
            }
            Err(error) => {
                let cached = self.layer.cached_mut(table);
                let index = index.min(cached.rows.len());
                cached.rows.insert(index, removed);
                Err(self.remote_failure("delete", &error))
            }
        }
    }

    /// Re-inserts a deleted row under its original id. Creation side effects
    /// are not repeated.
    pub fn restore(&mut self, record: &Record) -> Result<Record, MutationError> {
        let table = self.table;
        let Some(row_id) = record_id(record) else {
            return Err(MutationError::MissingRow { table });
        };
        let rows = match self.layer.backend.insert(table, record) {
            Ok(rows) => rows,
            Err(error) => return Err(self.remote_failure("restore", &error)),
        };
        let restored = rows.into_iter().next().unwrap_or_else(|| record.clone());

        let cached = self.layer.cached_mut(table);
        let index = cached.deleted_at.remove(&row_id);
        if cached.position(&row_id).is_none() {
            let index = index.unwrap_or(cached.rows.len()).min(cached.rows.len());
            cached.rows.insert(index, restored.clone());
        }
        info!(%table, row = %row_id, "restored row");
        self.layer.invalidate(table);
        self.layer
            .notify(Notification::success(format!("restored {table} row {row_id}")));
        Ok(restored)
    }

    fn remote_failure(&mut self, action: &str, error: &anyhow::Error) -> MutationError {
        let message = error.to_string();
        warn!(table = %self.table, action, %message, "remote write failed");
        self.layer.invalidate(self.table);
        self.layer.notify(Notification::error(message.clone()));
        MutationError::Remote {
            table: self.table,
            message,
        }
    }
}
