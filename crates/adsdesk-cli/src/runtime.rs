// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use adsdesk_app::{Backend, ColumnKind, NewRowInput, Notification, Record, RowId, TableName};
use adsdesk_remote::persona::{IMAGE_FIELD, build_persona_prompt, generate_image};
use adsdesk_remote::{EditSession, FunctionNames, Mutations, storage};
use anyhow::{Result, anyhow};
use serde_json::Value;
use std::path::Path;

/// Wires the terminal app to an edit session over any [`Backend`].
pub struct RemoteRuntime<B> {
    session: EditSession<B>,
    bucket: String,
}

impl<B: Backend> RemoteRuntime<B> {
    pub fn new(backend: B, functions: FunctionNames, bucket: impl Into<String>) -> Self {
        Self {
            session: EditSession::new(Mutations::new(backend, functions)),
            bucket: bucket.into(),
        }
    }

    #[cfg(test)]
    fn session(&self) -> &EditSession<B> {
        &self.session
    }
}

impl<B: Backend> adsdesk_tui::AppRuntime for RemoteRuntime<B> {
    fn load_table(&mut self, table: TableName) -> Result<Vec<Record>> {
        let mutations = self.session.mutations_mut();
        if mutations.is_stale(table) {
            mutations.table(table).load()?;
        }
        Ok(mutations.rows(table).to_vec())
    }

    fn commit_edit(
        &mut self,
        table: TableName,
        row_id: &RowId,
        field: &str,
        value: Value,
    ) -> Result<bool> {
        let value = match value {
            Value::String(text)
                if table.column(field).is_some_and(|column| column.kind == ColumnKind::Image)
                    && storage::is_local_image(&text) =>
            {
                let backend = self.session.mutations_mut().backend_mut();
                let path = storage::upload_local_image(
                    backend,
                    &self.bucket,
                    table,
                    row_id,
                    Path::new(text.trim()),
                )?;
                Value::String(path)
            }
            other => other,
        };
        Ok(self.session.commit(table, row_id, field, value)?)
    }

    fn create_row(&mut self, input: &NewRowInput) -> Result<Record> {
        input.validate()?;
        Ok(self.session.create(input.table, &input.to_record())?)
    }

    fn delete_row(&mut self, table: TableName, row_id: &RowId) -> Result<()> {
        Ok(self.session.delete(table, row_id)?)
    }

    fn undo_last_edit(&mut self) -> Result<bool> {
        Ok(self.session.undo()?)
    }

    fn redo_last_edit(&mut self) -> Result<bool> {
        Ok(self.session.redo()?)
    }

    // The new path goes through the session so it can be undone like any edit.
    fn generate_persona_image(&mut self, row_id: &RowId) -> Result<String> {
        let persona = self
            .session
            .mutations()
            .row(TableName::Personas, row_id)
            .cloned()
            .ok_or_else(|| anyhow!("persona {row_id} is not loaded -- press r to reload"))?;
        let prompt = build_persona_prompt(&persona);
        let function = self.session.mutations().functions().image_generation.clone();

        let path = generate_image(
            self.session.mutations_mut().backend_mut(),
            &function,
            &self.bucket,
            row_id,
            &prompt,
        )?;
        self.session.commit(
            TableName::Personas,
            row_id,
            IMAGE_FIELD,
            Value::String(path.clone()),
        )?;
        Ok(path)
    }

    fn public_url(&self, path: &str) -> String {
        self.session
            .mutations()
            .backend()
            .public_url(&self.bucket, path)
    }

    fn take_notifications(&mut self) -> Vec<Notification> {
        self.session.mutations_mut().take_notifications()
    }
}
