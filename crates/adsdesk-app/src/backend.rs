// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::Result;
use serde_json::Value;

use crate::{Record, RowId, TableName};

/// The hosted database, function runtime and object store, seen as plain
/// request/response calls. Errors carry the backend's message verbatim.
pub trait Backend {
    fn select(&mut self, table: TableName) -> Result<Vec<Record>>;
    fn insert(&mut self, table: TableName, record: &Record) -> Result<Vec<Record>>;
    fn update(&mut self, table: TableName, id: &RowId, patch: &Record) -> Result<Vec<Record>>;
    fn delete(&mut self, table: TableName, id: &RowId) -> Result<()>;
    fn invoke(&mut self, function: &str, body: &Value) -> Result<Value>;
    fn upload(&mut self, bucket: &str, path: &str, bytes: &[u8], content_type: &str)
    -> Result<()>;
    fn public_url(&self, bucket: &str, path: &str) -> String;
}
