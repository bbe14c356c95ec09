use anyhow::{Context, Result};
use docsift_core::rank::FieldWeights;
use docsift_core::search::SearchParams;
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub blob: BlobConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub upload: UploadConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BlobConfig {
    #[serde(default = "default_blob_backend")]
    pub backend: String,
    /// Root directory for the `local` backend.
    #[serde(default = "default_blob_root")]
    pub root: PathBuf,
    /// Base URL for the `http` backend.
    #[serde(default)]
    pub base_url: Option<String>,
    /// HMAC key used to sign retrieval URLs.
    #[serde(default)]
    pub signing_secret: Option<String>,
    #[serde(default = "default_url_ttl_secs")]
    pub url_ttl_secs: u64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for BlobConfig {
    fn default() -> Self {
        Self {
            backend: default_blob_backend(),
            root: default_blob_root(),
            base_url: None,
            signing_secret: None,
            url_ttl_secs: default_url_ttl_secs(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_blob_backend() -> String {
    "local".to_string()
}
fn default_blob_root() -> PathBuf {
    PathBuf::from("./data/blobs")
}
fn default_url_ttl_secs() -> u64 {
    300
}
fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct SearchConfig {
    #[serde(default = "default_snippet_radius")]
    pub snippet_radius: usize,
    #[serde(default = "default_max_results")]
    pub max_results: usize,
    #[serde(default = "default_suggest_limit")]
    pub suggest_limit: usize,
    #[serde(default = "default_fuzzy_threshold")]
    pub fuzzy_threshold: f64,
    #[serde(default)]
    pub weights: FieldWeights,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            snippet_radius: default_snippet_radius(),
            max_results: default_max_results(),
            suggest_limit: default_suggest_limit(),
            fuzzy_threshold: default_fuzzy_threshold(),
            weights: FieldWeights::default(),
        }
    }
}

fn default_snippet_radius() -> usize {
    220
}
fn default_max_results() -> usize {
    100
}
fn default_suggest_limit() -> usize {
    5
}
fn default_fuzzy_threshold() -> f64 {
    0.4
}

impl SearchConfig {
    pub fn params(&self) -> SearchParams {
        SearchParams {
            snippet_radius: self.snippet_radius,
            max_results: self.max_results,
            suggest_limit: self.suggest_limit,
            weights: self.weights,
            fuzzy_threshold: self.fuzzy_threshold,
        }
    }

    /// Like [`params`](Self::params), with a caller-requested result limit
    /// that never exceeds the configured `max_results`.
    pub fn params_with_limit(&self, limit: Option<usize>) -> SearchParams {
        let mut params = self.params();
        if let Some(limit) = limit {
            params.max_results = limit.min(self.max_results);
        }
        params
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct UploadConfig {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
    #[serde(default = "default_include_globs")]
    pub include_globs: Vec<String>,
    #[serde(default)]
    pub exclude_globs: Vec<String>,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            include_globs: default_include_globs(),
            exclude_globs: Vec::new(),
        }
    }
}

fn default_max_retries() -> u32 {
    3
}
fn default_retry_base_delay_ms() -> u64 {
    500
}
fn default_include_globs() -> Vec<String> {
    vec!["**/*".to_string()]
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:7341".to_string()
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    // Validate search
    if config.search.max_results == 0 {
        anyhow::bail!("search.max_results must be >= 1");
    }
    if config.search.suggest_limit == 0 {
        anyhow::bail!("search.suggest_limit must be >= 1");
    }
    if !(0.0..=1.0).contains(&config.search.fuzzy_threshold) {
        anyhow::bail!("search.fuzzy_threshold must be in [0.0, 1.0]");
    }
    let w = &config.search.weights;
    if [w.content, w.file_name, w.title, w.author].iter().any(|v| *v < 0.0) {
        anyhow::bail!("search.weights must be >= 0");
    }
    if w.total() <= 0.0 {
        anyhow::bail!("search.weights must not all be zero");
    }

    // Validate blob backend
    match config.blob.backend.as_str() {
        "local" => {}
        "http" => {
            if config.blob.base_url.is_none() {
                anyhow::bail!("blob.base_url must be set when backend is 'http'");
            }
            if config.blob.signing_secret.is_none() {
                anyhow::bail!("blob.signing_secret must be set when backend is 'http'");
            }
        }
        other => anyhow::bail!(
            "Unknown blob backend: '{}'. Must be local or http.",
            other
        ),
    }
    if config.blob.url_ttl_secs == 0 {
        anyhow::bail!("blob.url_ttl_secs must be > 0");
    }

    if config.upload.include_globs.is_empty() {
        anyhow::bail!("upload.include_globs must not be empty");
    }

    Ok(())
}
