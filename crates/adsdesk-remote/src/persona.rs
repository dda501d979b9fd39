// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use adsdesk_app::{Backend, Record, RowId, display_value, field_value};
use anyhow::{Result, bail};
use serde::Deserialize;
use serde_json::{Value, json};
use sha2::{Digest, Sha256};
use tracing::info;

pub const IMAGE_FIELD: &str = "image_path";

pub fn build_persona_prompt(persona: &Record) -> String {
    let text = |field: &str| {
        let value = display_value(&field_value(persona, field));
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_owned())
    };

    let mut subject = match text("name") {
        Some(name) => format!("Portrait photo of {name}"),
        None => "Portrait photo of a person".to_owned(),
    };
    if let Some(age) = text("age_range") {
        subject.push_str(&format!(", aged {age}"));
    }
    if let Some(occupation) = text("occupation") {
        subject.push_str(&format!(", who works as {occupation}"));
    }
    subject.push('.');

    let mut prompt = vec![subject];
    if let Some(bio) = text("bio") {
        let bio = bio.split_whitespace().collect::<Vec<_>>().join(" ");
        prompt.push(if bio.ends_with('.') { bio } else { format!("{bio}.") });
    }
    prompt.push(
        "Head and shoulders, natural light, neutral background, photorealistic.".to_owned(),
    );
    prompt.join(" ")
}

/// Storage path for a generated portrait. The same prompt always lands on the
/// same object, so regenerating an unchanged persona overwrites in place.
pub fn image_object_path(persona_id: &RowId, prompt: &str) -> String {
    let digest = Sha256::digest(prompt.as_bytes());
    let short: String = digest
        .iter()
        .take(8)
        .map(|byte| format!("{byte:02x}"))
        .collect();
    format!("personas/{persona_id}/{short}.png")
}

/// Asks the image function to render `prompt` into the bucket and returns the
/// path (or URL) it reports.
pub fn generate_image<B: Backend>(
    backend: &mut B,
    function: &str,
    bucket: &str,
    persona_id: &RowId,
    prompt: &str,
) -> Result<String> {
    if prompt.trim().is_empty() {
        bail!("persona {persona_id} has nothing to describe -- fill in a name or bio and retry");
    }
    let path = image_object_path(persona_id, prompt);
    let response = backend.invoke(
        function,
        &json!({ "prompt": prompt, "bucket": bucket, "path": path }),
    )?;

    let stored = match response {
        Value::Null => path,
        Value::String(text) if !text.trim().is_empty() => text.trim().to_owned(),
        other => match serde_json::from_value::<ImageResponse>(other)?.location() {
            Some(location) => location,
            None => bail!("{function} returned no image path"),
        },
    };
    info!(persona = %persona_id, path = %stored, "generated persona image");
    Ok(stored)
}

#[derive(Debug, Deserialize)]
struct ImageResponse {
    path: Option<String>,
    url: Option<String>,
    image_url: Option<String>,
}

impl ImageResponse {
    fn location(self) -> Option<String> {
        [self.path, self.url, self.image_url]
            .into_iter()
            .flatten()
            .find(|value| !value.trim().is_empty())
    }
}
