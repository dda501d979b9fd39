// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::ids::RowId;

pub type Record = serde_json::Map<String, Value>;

pub const ID_FIELD: &str = "id";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableName {
    Organizations,
    Campaigns,
    Personas,
    Assets,
}

impl TableName {
    pub const ALL: [Self; 4] = [
        Self::Organizations,
        Self::Campaigns,
        Self::Personas,
        Self::Assets,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Organizations => "organizations",
            Self::Campaigns => "campaigns",
            Self::Personas => "personas",
            Self::Assets => "assets",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "organizations" => Some(Self::Organizations),
            "campaigns" => Some(Self::Campaigns),
            "personas" => Some(Self::Personas),
            "assets" => Some(Self::Assets),
            _ => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Organizations => "orgs",
            Self::Campaigns => "campaigns",
            Self::Personas => "personas",
            Self::Assets => "assets",
        }
    }

    /// Tables whose new rows get a storage folder provisioned server-side.
    pub const fn provisions_folder(self) -> bool {
        matches!(self, Self::Organizations)
    }

    pub const fn title_field(self) -> &'static str {
        match self {
            Self::Organizations | Self::Campaigns | Self::Personas => "name",
            Self::Assets => "title",
        }
    }

    pub fn columns(self) -> &'static [ColumnDef] {
        match self {
            Self::Organizations => &ORGANIZATION_COLUMNS,
            Self::Campaigns => &CAMPAIGN_COLUMNS,
            Self::Personas => &PERSONA_COLUMNS,
            Self::Assets => &ASSET_COLUMNS,
        }
    }

    pub fn column(self, field: &str) -> Option<&'static ColumnDef> {
        self.columns().iter().find(|column| column.field == field)
    }

    /// Views that embed rows of this table and go stale when it changes.
    pub const fn dependents(self) -> &'static [Self] {
        match self {
            Self::Organizations => &[Self::Campaigns],
            Self::Campaigns => &[Self::Assets],
            Self::Personas | Self::Assets => &[],
        }
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnKind {
    Text,
    Select,
    Textarea,
    Image,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnDef {
    pub field: &'static str,
    pub label: &'static str,
    pub kind: ColumnKind,
    pub editable: bool,
    pub options: &'static [&'static str],
}

impl ColumnDef {
    const fn read_only(field: &'static str, label: &'static str) -> Self {
        Self {
            field,
            label,
            kind: ColumnKind::Text,
            editable: false,
            options: &[],
        }
    }

    const fn text(field: &'static str, label: &'static str) -> Self {
        Self {
            field,
            label,
            kind: ColumnKind::Text,
            editable: true,
            options: &[],
        }
    }

    const fn textarea(field: &'static str, label: &'static str) -> Self {
        Self {
            field,
            label,
            kind: ColumnKind::Textarea,
            editable: true,
            options: &[],
        }
    }

    const fn select(
        field: &'static str,
        label: &'static str,
        options: &'static [&'static str],
    ) -> Self {
        Self {
            field,
            label,
            kind: ColumnKind::Select,
            editable: true,
            options,
        }
    }

    const fn image(field: &'static str, label: &'static str) -> Self {
        Self {
            field,
            label,
            kind: ColumnKind::Image,
            editable: true,
            options: &[],
        }
    }
}

pub const INDUSTRIES: [&str; 6] = [
    "retail",
    "finance",
    "health",
    "technology",
    "hospitality",
    "other",
];
pub const CAMPAIGN_STATUSES: [&str; 4] = ["draft", "active", "paused", "archived"];
pub const AGE_RANGES: [&str; 6] = ["18-24", "25-34", "35-44", "45-54", "55-64", "65+"];
pub const ASSET_KINDS: [&str; 3] = ["image", "banner", "video"];

static ORGANIZATION_COLUMNS: [ColumnDef; 5] = [
    ColumnDef::read_only(ID_FIELD, "id"),
    ColumnDef::text("name", "name"),
    ColumnDef::select("industry", "industry", &INDUSTRIES),
    ColumnDef::text("website", "website"),
    ColumnDef::textarea("notes", "notes"),
];

static CAMPAIGN_COLUMNS: [ColumnDef; 7] = [
    ColumnDef::read_only(ID_FIELD, "id"),
    ColumnDef::text("name", "name"),
    ColumnDef::text("organization_id", "org"),
    ColumnDef::select("status", "status", &CAMPAIGN_STATUSES),
    ColumnDef::text("target_country", "country"),
    ColumnDef::text("daily_budget", "budget/day"),
    ColumnDef::textarea("notes", "notes"),
];

static PERSONA_COLUMNS: [ColumnDef; 6] = [
    ColumnDef::read_only(ID_FIELD, "id"),
    ColumnDef::text("name", "name"),
    ColumnDef::select("age_range", "age", &AGE_RANGES),
    ColumnDef::text("occupation", "occupation"),
    ColumnDef::textarea("bio", "bio"),
    ColumnDef::image("image_path", "image"),
];

static ASSET_COLUMNS: [ColumnDef; 6] = [
    ColumnDef::read_only(ID_FIELD, "id"),
    ColumnDef::text("title", "title"),
    ColumnDef::text("campaign_id", "campaign"),
    ColumnDef::select("kind", "kind", &ASSET_KINDS),
    ColumnDef::image("image_path", "image"),
    ColumnDef::textarea("notes", "notes"),
];

pub fn record_id(record: &Record) -> Option<RowId> {
    match record.get(ID_FIELD)? {
        Value::String(value) if !value.is_empty() => Some(RowId::new(value.clone())),
        Value::Number(value) => Some(RowId::new(value.to_string())),
        _ => None,
    }
}

pub fn field_value(record: &Record, field: &str) -> Value {
    record.get(field).cloned().unwrap_or(Value::Null)
}

pub fn display_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        Value::Number(number) => number.to_string(),
        Value::Bool(true) => "yes".to_owned(),
        Value::Bool(false) => "no".to_owned(),
        other => other.to_string(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotificationLevel {
    Success,
    Warning,
    Error,
}

impl NotificationLevel {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "ok",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
}

impl Notification {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Success,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Error,
            message: message.into(),
        }
    }

    pub fn status_text(&self) -> String {
        match self.level {
            NotificationLevel::Success => self.message.clone(),
            level => format!("{}: {}", level.as_str(), self.message),
        }
    }
}
