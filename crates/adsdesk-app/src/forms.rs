// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, bail};
use serde_json::Value;

use crate::{ColumnKind, Record, TableName, display_value};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRowInput {
    pub table: TableName,
    pub title: String,
}

impl NewRowInput {
    pub fn new(table: TableName, title: impl Into<String>) -> Self {
        Self {
            table,
            title: title.into(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            bail!(
                "{} {} is required -- enter a value and retry",
                singular(self.table),
                self.table.title_field()
            );
        }
        Ok(())
    }

    pub fn to_record(&self) -> Record {
        let mut record = Record::new();
        record.insert(
            self.table.title_field().to_owned(),
            Value::String(self.title.trim().to_owned()),
        );
        if self.table == TableName::Campaigns {
            record.insert("status".to_owned(), Value::String("draft".to_owned()));
        }
        record
    }
}

pub fn validate_field(table: TableName, field: &str, value: &Value) -> Result<()> {
    let Some(column) = table.column(field) else {
        bail!("{} has no column {field:?}", table.as_str());
    };
    if !column.editable {
        bail!("{field} is read-only");
    }

    let text = display_value(value);
    let text = text.as_str();
    if field == table.title_field() && text.trim().is_empty() {
        bail!(
            "{} {field} cannot be empty -- enter a value and retry",
            singular(table)
        );
    }

    if column.kind == ColumnKind::Select && !value.is_null() && !column.options.contains(&text) {
        bail!(
            "{field} must be one of: {}",
            column.options.join(", ")
        );
    }

    match field {
        "website" if !text.is_empty() => {
            if !(text.starts_with("http://") || text.starts_with("https://")) {
                bail!("website must start with http:// or https://");
            }
        }
        "daily_budget" if !text.is_empty() => match text.parse::<f64>() {
            Ok(amount) if amount >= 0.0 => {}
            _ => bail!("daily budget must be a non-negative number"),
        },
        "target_country" if !text.is_empty() => {
            if text.len() != 2 || !text.chars().all(|ch| ch.is_ascii_uppercase()) {
                bail!("target country must be a two-letter code like FR");
            }
        }
        _ => {}
    }
    Ok(())
}

const fn singular(table: TableName) -> &'static str {
    match table {
        TableName::Organizations => "organization",
        TableName::Campaigns => "campaign",
        TableName::Personas => "persona",
        TableName::Assets => "asset",
    }
}

#[cfg(test)]
mod tests {
    use super::{NewRowInput, validate_field};
    use crate::TableName;
    use serde_json::{Value, json};

    #[test]
    fn new_row_requires_title() {
        let error = NewRowInput::new(TableName::Organizations, "  ")
            .validate()
            .expect_err("blank title should fail");
        assert!(error.to_string().contains("organization name is required"));
    }

    #[test]
    fn new_campaign_defaults_to_draft() {
        let record = NewRowInput::new(TableName::Campaigns, " Spring push ").to_record();
        assert_eq!(record.get("name"), Some(&json!("Spring push")));
        assert_eq!(record.get("status"), Some(&json!("draft")));
    }

    #[test]
    fn new_asset_uses_title_field() {
        let record = NewRowInput::new(TableName::Assets, "Hero banner").to_record();
        assert_eq!(record.get("title"), Some(&json!("Hero banner")));
        assert!(record.get("status").is_none());
    }

    #[test]
    fn select_fields_reject_unknown_options() {
        assert!(validate_field(TableName::Campaigns, "status", &json!("paused")).is_ok());
        let error = validate_field(TableName::Campaigns, "status", &json!("live"))
            .expect_err("unknown option should fail");
        assert!(error.to_string().contains("draft, active, paused, archived"));
    }

    #[test]
    fn read_only_and_unknown_fields_are_rejected() {
        assert!(validate_field(TableName::Personas, "id", &json!("p-1")).is_err());
        assert!(validate_field(TableName::Personas, "shoe_size", &json!("42")).is_err());
    }

    #[test]
    fn field_formats_are_checked() {
        assert!(validate_field(TableName::Organizations, "website", &json!("acme.io")).is_err());
        assert!(
            validate_field(TableName::Organizations, "website", &json!("https://acme.io")).is_ok()
        );
        assert!(validate_field(TableName::Campaigns, "daily_budget", &json!("-3")).is_err());
        assert!(validate_field(TableName::Campaigns, "daily_budget", &json!("12.50")).is_ok());
        assert!(validate_field(TableName::Campaigns, "daily_budget", &json!(-3)).is_err());
        assert!(validate_field(TableName::Campaigns, "daily_budget", &json!(250)).is_ok());
        assert!(validate_field(TableName::Campaigns, "target_country", &json!("fr")).is_err());
        assert!(validate_field(TableName::Campaigns, "target_country", &json!("FR")).is_ok());
        assert!(validate_field(TableName::Organizations, "notes", &Value::Null).is_ok());
    }

    #[test]
    fn title_field_cannot_be_cleared() {
        assert!(validate_field(TableName::Assets, "title", &json!("")).is_err());
    }
}
