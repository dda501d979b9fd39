// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use adsdesk_app::{Backend, RowId, TableName};
use anyhow::{Context, Result, anyhow, bail};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;
use tracing::info;

const IMAGE_TYPES: [(&str, &str); 5] = [
    ("png", "image/png"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("webp", "image/webp"),
    ("gif", "image/gif"),
];

/// Whether an image cell's text names a file on this machine rather than an
/// object already in the bucket.
pub fn is_local_image(text: &str) -> bool {
    let text = text.trim();
    (text.starts_with('/') || text.starts_with("./") || text.starts_with("../"))
        && Path::new(text).is_file()
}

/// Uploads a local image into `bucket` and returns its object path. The path
/// is keyed on the file's content, so uploading the same bytes twice is a no-op
/// overwrite.
pub fn upload_local_image<B: Backend>(
    backend: &mut B,
    bucket: &str,
    table: TableName,
    row_id: &RowId,
    local: &Path,
) -> Result<String> {
    let extension = local
        .extension()
        .and_then(|extension| extension.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    let Some((extension, content_type)) = IMAGE_TYPES
        .iter()
        .find(|(known, _)| *known == extension)
        .copied()
    else {
        bail!(
            "{} is not an image -- use one of: {}",
            local.display(),
            IMAGE_TYPES.map(|(known, _)| known).join(", ")
        );
    };

    let bytes = fs::read(local).with_context(|| format!("read {}", local.display()))?;
    if bytes.is_empty() {
        return Err(anyhow!("{} is empty", local.display()));
    }
    let short: String = Sha256::digest(&bytes)
        .iter()
        .take(8)
        .map(|byte| format!("{byte:02x}"))
        .collect();
    let path = format!("{}/{row_id}/{short}.{extension}", table.as_str());

    backend.upload(bucket, &path, &bytes, content_type)?;
    info!(table = table.as_str(), row = %row_id, path = %path, "uploaded image");
    Ok(path)
}
