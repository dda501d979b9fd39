// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use url::Url;

/// What the OAuth popup hands back to the window that opened it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum OAuthCallbackMessage {
    #[serde(rename = "GOOGLE_ADS_OAUTH_SUCCESS")]
    Success { code: String },
    #[serde(rename = "GOOGLE_ADS_OAUTH_ERROR")]
    Error { error: String },
}

impl OAuthCallbackMessage {
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).context("encode oauth callback message")
    }
}

/// Reads the provider redirect. A provider `error` wins over a `code`.
pub fn parse_callback(callback: &str) -> Result<OAuthCallbackMessage> {
    let url = parse_url(callback)?;

    let mut code = None;
    let mut error = None;
    let mut description = None;
    for (key, value) in url.query_pairs() {
        let value = value.trim().to_owned();
        if value.is_empty() {
            continue;
        }
        match key.as_ref() {
            "code" => code = Some(value),
            "error" => error = Some(value),
            "error_description" => description = Some(value),
            _ => {}
        }
    }

    let message = match (error, code) {
        (Some(error), _) => OAuthCallbackMessage::Error {
            error: match description {
                Some(description) => format!("{error}: {description}"),
                None => error,
            },
        },
        (None, Some(code)) => OAuthCallbackMessage::Success { code },
        (None, None) => OAuthCallbackMessage::Error {
            error: "missing authorization code".to_owned(),
        },
    };
    Ok(message)
}

/// Origin the message may be posted to: the callback page's own.
pub fn target_origin(callback: &str) -> Result<String> {
    let url = parse_url(callback)?;
    let origin = url.origin();
    if !origin.is_tuple() {
        bail!("callback URL {callback:?} has no web origin");
    }
    Ok(origin.ascii_serialization())
}

fn parse_url(callback: &str) -> Result<Url> {
    Url::parse(callback.trim())
        .with_context(|| format!("callback URL {callback:?} is not a valid URL"))
}
