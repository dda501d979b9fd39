// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use adsdesk_app::{
    AGE_RANGES, ASSET_KINDS, Backend, CAMPAIGN_STATUSES, ID_FIELD, INDUSTRIES, Record, RowId,
    TableName, record_id,
};
use anyhow::{Result, bail};
use serde_json::{Value, json};
use std::collections::BTreeMap;

const ORG_ADJECTIVES: [&str; 10] = [
    "Northwind", "Bluebird", "Summit", "Harbor", "Copper", "Evergreen", "Lumen", "Atlas",
    "Juniper", "Meridian",
];
const ORG_NOUNS: [&str; 8] = [
    "Outfitters",
    "Bakery",
    "Clinic",
    "Labs",
    "Hotels",
    "Market",
    "Studio",
    "Partners",
];
const CAMPAIGN_THEMES: [&str; 8] = [
    "Spring launch",
    "Summer sale",
    "Back to school",
    "Holiday push",
    "Brand awareness",
    "Retargeting",
    "New store opening",
    "Loyalty rewards",
];
const COUNTRY_CODES: [&str; 10] = ["FR", "DE", "US", "GB", "ES", "IT", "JP", "BR", "CA", "AU"];
const FIRST_NAMES: [&str; 12] = [
    "Avery", "Jordan", "Taylor", "Riley", "Morgan", "Casey", "Quinn", "Parker", "Kai", "Robin",
    "Hayden", "Rowan",
];
const OCCUPATIONS: [&str; 8] = [
    "nurse",
    "software engineer",
    "teacher",
    "chef",
    "architect",
    "student",
    "shop owner",
    "retired pilot",
];
const BIO_HOOKS: [&str; 8] = [
    "Shops mostly on a phone during the commute.",
    "Compares prices across three sites before buying.",
    "Follows local businesses on social media.",
    "Books travel months ahead.",
    "Prefers brands with clear sustainability claims.",
    "Reads reviews before every purchase.",
    "Responds well to limited-time offers.",
    "Buys gifts for a large family.",
];
const ASSET_SUBJECTS: [&str; 6] = [
    "Hero banner",
    "Square promo",
    "Story teaser",
    "Product close-up",
    "Team photo",
    "Seasonal header",
];

/// Builds a record from field/value pairs.
pub fn record(fields: &[(&str, Value)]) -> Record {
    fields
        .iter()
        .map(|(field, value)| ((*field).to_owned(), value.clone()))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    pub bucket: String,
    pub path: String,
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// A [`Backend`] held entirely in memory. Writes and function calls can be
/// made to fail with a chosen message; every function call is recorded.
#[derive(Debug, Clone)]
pub struct MemoryBackend {
    tables: BTreeMap<TableName, Vec<Record>>,
    next_id: u64,
    failing_writes: BTreeMap<TableName, String>,
    failing_functions: BTreeMap<String, String>,
    responses: BTreeMap<String, Value>,
    invocations: Vec<(String, Value)>,
    uploads: Vec<Upload>,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self {
            tables: BTreeMap::new(),
            next_id: 1,
            failing_writes: BTreeMap::new(),
            failing_functions: BTreeMap::new(),
            responses: BTreeMap::new(),
            invocations: Vec::new(),
            uploads: Vec::new(),
        }
    }

    /// Next generated id suffix, e.g. `42` makes the next organization `org-42`.
    pub fn set_next_id(&mut self, next_id: u64) {
        self.next_id = next_id;
    }

    pub fn insert_rows(&mut self, table: TableName, rows: Vec<Record>) {
        self.tables.entry(table).or_default().extend(rows);
    }

    pub fn rows(&self, table: TableName) -> &[Record] {
        self.tables
            .get(&table)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn fail_writes(&mut self, table: TableName, message: &str) {
        self.failing_writes.insert(table, message.to_owned());
    }

    pub fn heal_writes(&mut self, table: TableName) {
        self.failing_writes.remove(&table);
    }

    pub fn fail_function(&mut self, function: &str, message: &str) {
        self.failing_functions
            .insert(function.to_owned(), message.to_owned());
    }

    pub fn respond_to(&mut self, function: &str, response: Value) {
        self.responses.insert(function.to_owned(), response);
    }

    pub fn invocations(&self) -> &[(String, Value)] {
        &self.invocations
    }

    pub fn uploads(&self) -> &[Upload] {
        &self.uploads
    }

    fn check_writable(&self, table: TableName) -> Result<()> {
        if let Some(message) = self.failing_writes.get(&table) {
            bail!("{message}");
        }
        Ok(())
    }

    fn generate_id(&mut self, table: TableName) -> String {
        let id = format!("{}-{}", id_prefix(table), self.next_id);
        self.next_id += 1;
        id
    }
}

impl Backend for MemoryBackend {
    fn select(&mut self, table: TableName) -> Result<Vec<Record>> {
        Ok(self.rows(table).to_vec())
    }

    fn insert(&mut self, table: TableName, record: &Record) -> Result<Vec<Record>> {
        self.check_writable(table)?;
        let mut row = record.clone();
        let id = match record_id(&row) {
            Some(id) => id,
            None => {
                let id = self.generate_id(table);
                row.insert(ID_FIELD.to_owned(), Value::String(id.clone()));
                RowId::new(id)
            }
        };
        let rows = self.tables.entry(table).or_default();
        if rows.iter().any(|existing| record_id(existing).as_ref() == Some(&id)) {
            bail!("duplicate key value violates unique constraint \"{table}_pkey\"");
        }
        rows.push(row.clone());
        Ok(vec![row])
    }

    fn update(&mut self, table: TableName, id: &RowId, patch: &Record) -> Result<Vec<Record>> {
        self.check_writable(table)?;
        let rows = self.tables.entry(table).or_default();
        let Some(row) = rows
            .iter_mut()
            .find(|row| record_id(row).as_ref() == Some(id))
        else {
            return Ok(Vec::new());
        };
        for (field, value) in patch {
            row.insert(field.clone(), value.clone());
        }
        Ok(vec![row.clone()])
    }

    fn delete(&mut self, table: TableName, id: &RowId) -> Result<()> {
        self.check_writable(table)?;
        self.tables
            .entry(table)
            .or_default()
            .retain(|row| record_id(row).as_ref() != Some(id));
        Ok(())
    }

    fn invoke(&mut self, function: &str, body: &Value) -> Result<Value> {
        self.invocations.push((function.to_owned(), body.clone()));
        if let Some(message) = self.failing_functions.get(function) {
            bail!("{message}");
        }
        Ok(self.responses.get(function).cloned().unwrap_or(Value::Null))
    }

    fn upload(
        &mut self,
        bucket: &str,
        path: &str,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<()> {
        self.uploads.push(Upload {
            bucket: bucket.to_owned(),
            path: path.to_owned(),
            bytes: bytes.to_vec(),
            content_type: content_type.to_owned(),
        });
        Ok(())
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        format!("memory://{bucket}/{}", path.trim_start_matches('/'))
    }
}

const fn id_prefix(table: TableName) -> &'static str {
    match table {
        TableName::Organizations => "org",
        TableName::Campaigns => "cmp",
        TableName::Personas => "per",
        TableName::Assets => "ast",
    }
}

#[derive(Debug, Clone)]
struct DeterministicRng {
    state: u64,
}

impl DeterministicRng {
    fn new(seed: u64) -> Self {
        let mut state = seed ^ 0x9E37_79B9_7F4A_7C15;
        if state == 0 {
            state = 0xA409_3822_299F_31D0;
        }
        Self { state }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);

        let mut x = self.state;
        x ^= x >> 13;
        x ^= x << 7;
        x ^= x >> 17;
        x
    }

    fn int_n(&mut self, n: usize) -> usize {
        if n <= 1 {
            return 0;
        }
        (self.next_u64() % (n as u64)) as usize
    }
}

/// Seeded generator for plausible advertising rows.
#[derive(Debug, Clone)]
pub struct AdFaker {
    rng: DeterministicRng,
}

impl AdFaker {
    pub fn new(seed: u64) -> Self {
        let normalized = if seed == 0 { 1 } else { seed };
        Self {
            rng: DeterministicRng::new(normalized),
        }
    }

    pub fn organization(&mut self, id: &str) -> Record {
        let name = format!("{} {}", self.pick(&ORG_ADJECTIVES), self.pick(&ORG_NOUNS));
        let slug = name.to_ascii_lowercase().replace(' ', "");
        record(&[
            (ID_FIELD, json!(id)),
            ("name", json!(name)),
            ("industry", json!(self.pick(&INDUSTRIES))),
            ("website", json!(format!("https://{slug}.example"))),
            ("notes", Value::Null),
        ])
    }

    pub fn campaign(&mut self, id: &str, organization_id: &str) -> Record {
        let budget = (self.rng.int_n(40) + 1) * 25;
        record(&[
            (ID_FIELD, json!(id)),
            ("name", json!(self.pick(&CAMPAIGN_THEMES))),
            ("organization_id", json!(organization_id)),
            ("status", json!(self.pick(&CAMPAIGN_STATUSES))),
            ("target_country", json!(self.pick(&COUNTRY_CODES))),
            ("daily_budget", json!(budget.to_string())),
            ("notes", Value::Null),
        ])
    }

    pub fn persona(&mut self, id: &str) -> Record {
        record(&[
            (ID_FIELD, json!(id)),
            ("name", json!(self.pick(&FIRST_NAMES))),
            ("age_range", json!(self.pick(&AGE_RANGES))),
            ("occupation", json!(self.pick(&OCCUPATIONS))),
            ("bio", json!(self.pick(&BIO_HOOKS))),
            ("image_path", Value::Null),
        ])
    }

    pub fn asset(&mut self, id: &str, campaign_id: &str) -> Record {
        record(&[
            (ID_FIELD, json!(id)),
            ("title", json!(self.pick(&ASSET_SUBJECTS))),
            ("campaign_id", json!(campaign_id)),
            ("kind", json!(self.pick(&ASSET_KINDS))),
            ("image_path", Value::Null),
            ("notes", Value::Null),
        ])
    }

    fn pick<'a>(&mut self, values: &[&'a str]) -> &'a str {
        values[self.rng.int_n(values.len())]
    }
}

/// An in-memory backend seeded with a small related data set.
pub fn demo_backend(seed: u64) -> MemoryBackend {
    let mut faker = AdFaker::new(seed);
    let mut backend = MemoryBackend::new();

    let organizations: Vec<Record> = (1..=4)
        .map(|index| faker.organization(&format!("org-{index}")))
        .collect();
    let campaigns: Vec<Record> = (1..=8)
        .map(|index| faker.campaign(&format!("cmp-{index}"), &format!("org-{}", (index - 1) % 4 + 1)))
        .collect();
    let personas: Vec<Record> = (1..=5)
        .map(|index| faker.persona(&format!("per-{index}")))
        .collect();
    let assets: Vec<Record> = (1..=6)
        .map(|index| faker.asset(&format!("ast-{index}"), &format!("cmp-{index}")))
        .collect();

    backend.insert_rows(TableName::Organizations, organizations);
    backend.insert_rows(TableName::Campaigns, campaigns);
    backend.insert_rows(TableName::Personas, personas);
    backend.insert_rows(TableName::Assets, assets);
    backend.set_next_id(100);
    backend
}
