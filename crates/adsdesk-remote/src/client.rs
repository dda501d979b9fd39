// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use adsdesk_app::{Backend, Record, RowId, TableName};
use anyhow::{Context, Result, anyhow, bail};
use reqwest::StatusCode;
use reqwest::blocking::{Client as HttpClient, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Blocking client for the hosted database, function runtime and object
/// store. Every request carries the project API key.
#[derive(Debug, Clone)]
pub struct Client {
    base_url: String,
    api_key: String,
    timeout: Duration,
    http: HttpClient,
}

impl Client {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self> {
        let base_url = base_url.trim_end_matches('/').to_owned();
        if base_url.is_empty() {
            bail!("backend.url must not be empty");
        }
        Url::parse(&base_url)
            .with_context(|| format!("backend.url {base_url:?} is not a valid URL"))?;
        if api_key.trim().is_empty() {
            bail!("backend.api_key must not be empty -- set ADSDESK_API_KEY and retry");
        }

        let http = HttpClient::builder()
            .timeout(timeout)
            .build()
            .context("build HTTP client")?;

        Ok(Self {
            base_url,
            api_key: api_key.trim().to_owned(),
            timeout,
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Cheapest authenticated round trip: one id from the first table.
    pub fn ping(&self) -> Result<()> {
        let mut url = self.rest_url(TableName::Organizations, None)?;
        url.query_pairs_mut()
            .clear()
            .append_pair("select", "id")
            .append_pair("limit", "1");
        self.send(self.http.get(url))?;
        Ok(())
    }

    fn rest_url(&self, table: TableName, id: Option<&RowId>) -> Result<Url> {
        let mut url = Url::parse(&format!("{}/rest/v1/{}", self.base_url, table.as_str()))
            .with_context(|| format!("build URL for table {table}"))?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("select", "*");
            if let Some(id) = id {
                query.append_pair("id", &format!("eq.{id}"));
            }
        }
        Ok(url)
    }

    fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = request
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .send()
            .map_err(|error| connection_error(&self.base_url, error))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            debug!(status = status.as_u16(), "backend rejected request");
            return Err(clean_error_response(status, &body));
        }
        Ok(response)
    }
}

impl Backend for Client {
    fn select(&mut self, table: TableName) -> Result<Vec<Record>> {
        let url = self.rest_url(table, None)?;
        let response = self.send(self.http.get(url))?;
        response
            .json()
            .with_context(|| format!("decode {table} rows"))
    }

    fn insert(&mut self, table: TableName, record: &Record) -> Result<Vec<Record>> {
        let url = self.rest_url(table, None)?;
        let response = self.send(
            self.http
                .post(url)
                .header("Prefer", "return=representation")
                .json(record),
        )?;
        response
            .json()
            .with_context(|| format!("decode inserted {table} row"))
    }

    fn update(&mut self, table: TableName, id: &RowId, patch: &Record) -> Result<Vec<Record>> {
        let url = self.rest_url(table, Some(id))?;
        let response = self.send(
            self.http
                .patch(url)
                .header("Prefer", "return=representation")
                .json(patch),
        )?;
        response
            .json()
            .with_context(|| format!("decode updated {table} row"))
    }

    fn delete(&mut self, table: TableName, id: &RowId) -> Result<()> {
        let url = self.rest_url(table, Some(id))?;
        self.send(self.http.delete(url).header("Prefer", "return=minimal"))?;
        Ok(())
    }

    fn invoke(&mut self, function: &str, body: &Value) -> Result<Value> {
        let response = self.send(
            self.http
                .post(format!("{}/functions/v1/{function}", self.base_url))
                .json(body),
        )?;
        let text = response
            .text()
            .with_context(|| format!("read {function} response"))?;
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text).unwrap_or(Value::String(text)))
    }

    fn upload(
        &mut self,
        bucket: &str,
        path: &str,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<()> {
        let path = path.trim_start_matches('/');
        self.send(
            self.http
                .post(format!("{}/storage/v1/object/{bucket}/{path}", self.base_url))
                .header("Content-Type", content_type)
                .header("x-upsert", "true")
                .body(bytes.to_vec()),
        )?;
        Ok(())
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_owned();
        }
        format!(
            "{}/storage/v1/object/public/{bucket}/{}",
            self.base_url,
            path.trim_start_matches('/')
        )
    }
}

fn connection_error(base_url: &str, error: reqwest::Error) -> anyhow::Error {
    anyhow!(
        "cannot reach {} -- check backend.url and your network ({})",
        base_url,
        error
    )
}

// The backend's own message is what the user sees, unprefixed.
fn clean_error_response(status: StatusCode, body: &str) -> anyhow::Error {
    if let Ok(parsed) = serde_json::from_str::<ErrorEnvelope>(body)
        && let Some(message) = parsed.message()
    {
        return anyhow!("{message}");
    }

    if !body.trim().is_empty() && body.len() < 100 && !body.contains('{') {
        return anyhow!("{}", body.trim());
    }

    anyhow!("server returned {}", status.as_u16())
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    message: Option<String>,
    error: Option<Value>,
    error_description: Option<String>,
    msg: Option<String>,
}

impl ErrorEnvelope {
    fn message(self) -> Option<String> {
        let nested = match self.error {
            Some(Value::String(text)) => Some(text),
            Some(Value::Object(fields)) => fields
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_owned),
            _ => None,
        };
        [self.message, self.error_description, nested, self.msg]
            .into_iter()
            .flatten()
            .find(|message| !message.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::{Client, clean_error_response};
    use adsdesk_app::Backend;
    use reqwest::StatusCode;
    use std::time::Duration;

    #[test]
    fn error_bodies_surface_backend_message_verbatim() {
        let error = clean_error_response(
            StatusCode::BAD_REQUEST,
            r#"{"code":"23505","message":"duplicate key value violates unique constraint"}"#,
        );
        assert_eq!(
            error.to_string(),
            "duplicate key value violates unique constraint"
        );

        let error = clean_error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            r#"{"error":"bucket not found"}"#,
        );
        assert_eq!(error.to_string(), "bucket not found");

        let error = clean_error_response(StatusCode::UNAUTHORIZED, r#"{"error":{"message":"bad jwt"}}"#);
        assert_eq!(error.to_string(), "bad jwt");
    }

    #[test]
    fn unstructured_error_bodies_fall_back_to_status() {
        assert_eq!(
            clean_error_response(StatusCode::BAD_GATEWAY, "upstream down").to_string(),
            "upstream down"
        );
        assert_eq!(
            clean_error_response(StatusCode::BAD_GATEWAY, "").to_string(),
            "server returned 502"
        );
    }

    #[test]
    fn new_rejects_missing_url_and_key() {
        let error = Client::new("", "key", Duration::from_secs(1)).expect_err("empty url");
        assert!(error.to_string().contains("backend.url"));

        let error =
            Client::new("https://db.example.test", " ", Duration::from_secs(1)).expect_err("no key");
        assert!(error.to_string().contains("ADSDESK_API_KEY"));
    }

    #[test]
    fn public_url_points_into_public_bucket() {
        let client = Client::new("https://db.example.test/", "key", Duration::from_secs(1))
            .expect("client should initialize");
        assert_eq!(
            client.public_url("assets", "/personas/p-1/abc.png"),
            "https://db.example.test/storage/v1/object/public/assets/personas/p-1/abc.png"
        );
        assert_eq!(
            client.public_url("assets", "https://cdn.example.test/x.png"),
            "https://cdn.example.test/x.png"
        );
    }
}
