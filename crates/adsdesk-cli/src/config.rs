// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use adsdesk_remote::FunctionNames;
use anyhow::{Context, Result, anyhow, bail};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const APP_NAME: &str = "adsdesk";
pub const API_KEY_ENV: &str = "ADSDESK_API_KEY";
const CONFIG_PATH_ENV: &str = "ADSDESK_CONFIG_PATH";
const CONFIG_VERSION: i64 = 1;
const DEFAULT_TIMEOUT: &str = "10s";
const DEFAULT_BUCKET: &str = "assets";
const DEFAULT_LOG_LEVEL: &str = "info";
const LOG_LEVELS: [&str; 6] = ["trace", "debug", "info", "warn", "error", "off"];

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub version: i64,
    #[serde(default)]
    pub backend: BackendSection,
    #[serde(default)]
    pub storage: Storage,
    #[serde(default)]
    pub functions: Functions,
    #[serde(default)]
    pub log: Log,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            backend: BackendSection::default(),
            storage: Storage::default(),
            functions: Functions::default(),
            log: Log::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BackendSection {
    pub url: Option<String>,
    pub api_key: Option<String>,
    pub timeout: Option<String>,
}

impl Default for BackendSection {
    fn default() -> Self {
        Self {
            url: None,
            api_key: None,
            timeout: Some(DEFAULT_TIMEOUT.to_owned()),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Storage {
    pub bucket: Option<String>,
}

impl Default for Storage {
    fn default() -> Self {
        Self {
            bucket: Some(DEFAULT_BUCKET.to_owned()),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Functions {
    pub folder_provisioning: Option<String>,
    pub image_generation: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Log {
    pub level: Option<String>,
    pub file: Option<String>,
}

impl Default for Log {
    fn default() -> Self {
        Self {
            level: Some(DEFAULT_LOG_LEVEL.to_owned()),
            file: None,
        }
    }
}

impl Config {
    pub fn default_path() -> Result<PathBuf> {
        if let Some(path) = env::var_os(CONFIG_PATH_ENV) {
            return Ok(PathBuf::from(path));
        }

        let config_root = dirs::config_dir().ok_or_else(|| {
            anyhow!("cannot resolve config directory; set {CONFIG_PATH_ENV} to the config file")
        })?;
        Ok(config_root.join(APP_NAME).join("config.toml"))
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(path)
            .with_context(|| format!("read config file {}", path.display()))?;
        let value: toml::Value = toml::from_str(&raw)
            .with_context(|| format!("parse TOML config {}", path.display()))?;

        let version = value
            .get("version")
            .and_then(toml::Value::as_integer)
            .ok_or_else(|| {
                anyhow!(
                    "config file {} has no version. Add `version = 1` and put values under [backend], [storage], [functions], and [log]",
                    path.display()
                )
            })?;

        if version != CONFIG_VERSION {
            bail!(
                "unsupported config version {} in {}; expected version = 1",
                version,
                path.display()
            );
        }

        let config: Config = value
            .try_into()
            .with_context(|| format!("decode config {}", path.display()))?;
        config.validate(path)?;
        Ok(config)
    }

    fn validate(&self, path: &Path) -> Result<()> {
        if let Some(url) = &self.backend.url {
            let trimmed = url.trim();
            if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
                bail!(
                    "backend.url in {} must start with http:// or https://, got {:?}",
                    path.display(),
                    url
                );
            }
        }

        if let Some(timeout) = &self.backend.timeout {
            let parsed = parse_duration(timeout)?;
            if parsed <= Duration::ZERO {
                bail!(
                    "backend.timeout in {} must be positive, got {}",
                    path.display(),
                    timeout
                );
            }
        }

        if let Some(bucket) = &self.storage.bucket
            && bucket.trim().is_empty()
        {
            bail!("storage.bucket in {} must not be empty", path.display());
        }

        for (key, value) in [
            ("folder_provisioning", &self.functions.folder_provisioning),
            ("image_generation", &self.functions.image_generation),
        ] {
            if let Some(name) = value
                && name.trim().is_empty()
            {
                bail!("functions.{key} in {} must not be empty", path.display());
            }
        }

        if let Some(level) = &self.log.level
            && !LOG_LEVELS.contains(&level.trim().to_ascii_lowercase().as_str())
        {
            bail!(
                "log.level in {} must be one of {}, got {:?}",
                path.display(),
                LOG_LEVELS.join(", "),
                level
            );
        }

        Ok(())
    }

    pub fn backend_url(&self) -> Result<&str> {
        match self.backend.url.as_deref().map(str::trim) {
            Some(url) if !url.is_empty() => Ok(url.trim_end_matches('/')),
            _ => bail!(
                "backend.url is not set -- add it under [backend] or run with --demo to use sample data"
            ),
        }
    }

    /// The API key, with the environment taking precedence over the file.
    pub fn api_key(&self) -> Result<String> {
        if let Ok(key) = env::var(API_KEY_ENV)
            && !key.trim().is_empty()
        {
            return Ok(key.trim().to_owned());
        }
        match self.backend.api_key.as_deref().map(str::trim) {
            Some(key) if !key.is_empty() => Ok(key.to_owned()),
            _ => bail!("backend.api_key is not set -- set {API_KEY_ENV} and retry"),
        }
    }

    pub fn backend_timeout(&self) -> Result<Duration> {
        parse_duration(self.backend.timeout.as_deref().unwrap_or(DEFAULT_TIMEOUT))
    }

    pub fn bucket(&self) -> &str {
        self.storage
            .bucket
            .as_deref()
            .map(str::trim)
            .unwrap_or(DEFAULT_BUCKET)
    }

    pub fn function_names(&self) -> FunctionNames {
        let defaults = FunctionNames::default();
        FunctionNames {
            folder_provisioning: self
                .functions
                .folder_provisioning
                .clone()
                .unwrap_or(defaults.folder_provisioning),
            image_generation: self
                .functions
                .image_generation
                .clone()
                .unwrap_or(defaults.image_generation),
        }
    }

    pub fn log_level(&self) -> String {
        self.log
            .level
            .as_deref()
            .unwrap_or(DEFAULT_LOG_LEVEL)
            .trim()
            .to_ascii_lowercase()
    }

    pub fn log_file(&self) -> Result<PathBuf> {
        if let Some(file) = &self.log.file {
            return Ok(PathBuf::from(file));
        }
        let root = dirs::state_dir()
            .or_else(dirs::data_local_dir)
            .ok_or_else(|| anyhow!("cannot resolve a log directory; set log.file in the config"))?;
        Ok(root.join(APP_NAME).join("adsdesk.log"))
    }

    pub fn example_config(path: &Path) -> String {
        let functions = FunctionNames::default();
        format!(
            "# adsdesk config\n# Place this file at: {}\n\nversion = 1\n\n[backend]\nurl = \"https://your-project.supabase.co\"\n# Prefer the {} environment variable over storing the key here.\n# api_key = \"\"\ntimeout = \"{}\"\n\n[storage]\nbucket = \"{}\"\n\n[functions]\nfolder_provisioning = \"{}\"\nimage_generation = \"{}\"\n\n[log]\nlevel = \"{}\"\n# file = \"/absolute/path/to/adsdesk.log\"\n",
            path.display(),
            API_KEY_ENV,
            DEFAULT_TIMEOUT,
            DEFAULT_BUCKET,
            functions.folder_provisioning,
            functions.image_generation,
            DEFAULT_LOG_LEVEL,
        )
    }
}

fn parse_duration(raw: &str) -> Result<Duration> {
    if let Some(value) = raw.strip_suffix("ms") {
        let millis: u64 = value
            .parse()
            .with_context(|| format!("invalid timeout duration {raw:?}"))?;
        return Ok(Duration::from_millis(millis));
    }
    if let Some(value) = raw.strip_suffix('s') {
        let secs: u64 = value
            .parse()
            .with_context(|| format!("invalid timeout duration {raw:?}"))?;
        return Ok(Duration::from_secs(secs));
    }
    if let Some(value) = raw.strip_suffix('m') {
        let mins: u64 = value
            .parse()
            .with_context(|| format!("invalid timeout duration {raw:?}"))?;
        let secs = mins.checked_mul(60).ok_or_else(|| {
            anyhow!("timeout duration {raw:?} is too large; use at most a few minutes")
        })?;
        return Ok(Duration::from_secs(secs));
    }

    bail!("invalid duration {raw:?}; use one of: <N>ms, <N>s, <N>m (for example 500ms or 5s)")
}
