//! Configuration parsing and validation.
//!
//! API Harness reads a TOML file (or JSON, when the path ends in `.json`)
//! describing the sources to load, search tuning, and refresh timing:
//!
//! ```toml
//! refresh_interval = 300
//! fetch_timeout_secs = 30
//!
//! [search]
//! fuzzy_threshold = 0.6
//! max_results = 20
//!
//! [server]
//! bind = "127.0.0.1:7340"
//!
//! [[sources]]
//! name = "petstore"
//! source = "./specs/petstore.yaml"
//! description = "Pet store API"
//!
//! [[sources]]
//! name = "billing"
//! source = "https://api.example.com/openapi.json"
//! description = "Billing API"
//! headers = { Authorization = "Bearer token" }
//! ```
//!
//! camelCase spellings (`refreshInterval`, `fuzzyThreshold`,
//! `fetchTimeoutSecs`, `maxResults`) are accepted as aliases.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

use api_harness_core::index::FieldWeights;
use api_harness_core::models::{SourceDescriptor, SourceKind};
use api_harness_core::state::SearchParams;

/// Longest accepted `refresh_interval` (30 days).
pub const MAX_REFRESH_INTERVAL_SECS: u64 = 30 * 24 * 60 * 60;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub sources: Vec<SourceConfig>,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default = "default_refresh_interval", alias = "refreshInterval")]
    pub refresh_interval: u64,
    #[serde(default = "default_fetch_timeout", alias = "fetchTimeoutSecs")]
    pub fetch_timeout_secs: u64,
    #[serde(default)]
    pub server: ServerConfig,
    /// Directory relative file sources resolve against. Set by
    /// [`load_config`] to the config file's directory.
    #[serde(skip)]
    pub base_dir: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SourceConfig {
    pub name: String,
    /// File path or `http(s)://` URL.
    pub source: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SearchConfig {
    /// Minimum similarity in `[0, 1]`. Lower values are MORE permissive.
    #[serde(default = "default_fuzzy_threshold", alias = "fuzzyThreshold")]
    pub fuzzy_threshold: f64,
    #[serde(default = "default_max_results", alias = "maxResults")]
    pub max_results: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            fuzzy_threshold: default_fuzzy_threshold(),
            max_results: default_max_results(),
        }
    }
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

fn default_refresh_interval() -> u64 {
    300
}
fn default_fetch_timeout() -> u64 {
    30
}
fn default_fuzzy_threshold() -> f64 {
    0.6
}
fn default_max_results() -> usize {
    20
}
fn default_bind() -> String {
    "127.0.0.1:7340".to_string()
}

impl Config {
    /// The ordered source set for one ingestion pass.
    pub fn source_set(&self) -> Vec<SourceDescriptor> {
        self.sources
            .iter()
            .map(|s| {
                let kind = SourceKind::from_locator(&s.source);
                let locator = match (kind, &self.base_dir) {
                    (SourceKind::File, Some(base)) if Path::new(&s.source).is_relative() => {
                        base.join(&s.source).to_string_lossy().into_owned()
                    }
                    _ => s.source.clone(),
                };
                SourceDescriptor {
                    name: s.name.clone(),
                    locator,
                    kind,
                    headers: s.headers.clone(),
                    description: s.description.clone(),
                }
            })
            .collect()
    }

    pub fn refresh_period(&self) -> Duration {
        Duration::from_secs(self.refresh_interval)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn search_params(&self) -> SearchParams {
        SearchParams {
            fuzzy_threshold: self.search.fuzzy_threshold,
            max_results: self.search.max_results,
            weights: FieldWeights::default(),
        }
    }

    /// Check every rule a configuration must satisfy before any ingestion.
    pub fn validate(&self) -> Result<()> {
        if self.sources.is_empty() {
            bail!("sources must contain at least one entry");
        }

        let mut seen = HashSet::new();
        for s in &self.sources {
            if s.name.trim().is_empty() {
                bail!("sources[].name must not be empty");
            }
            if s.source.trim().is_empty() {
                bail!("source '{}' has an empty locator", s.name);
            }
            if !seen.insert(s.name.as_str()) {
                bail!("duplicate source name: '{}'", s.name);
            }
            if !s.headers.is_empty() && SourceKind::from_locator(&s.source) == SourceKind::File {
                bail!(
                    "source '{}': headers are only supported for http(s) sources",
                    s.name
                );
            }
        }

        if !(0.0..=1.0).contains(&self.search.fuzzy_threshold) {
            bail!("search.fuzzy_threshold must be in [0.0, 1.0]");
        }
        if self.search.max_results == 0 {
            bail!("search.max_results must be >= 1");
        }
        if self.refresh_interval == 0 {
            bail!("refresh_interval must be > 0");
        }
        if self.refresh_interval > MAX_REFRESH_INTERVAL_SECS {
            bail!(
                "refresh_interval must be <= {} seconds",
                MAX_REFRESH_INTERVAL_SECS
            );
        }
        if self.fetch_timeout_secs == 0 {
            bail!("fetch_timeout_secs must be > 0");
        }

        Ok(())
    }
}

/// Parse configuration text. `json` selects JSON instead of TOML.
pub fn parse_config(content: &str, json: bool) -> Result<Config> {
    let config: Config = if json {
        serde_json::from_str(content).with_context(|| "Failed to parse config file as JSON")?
    } else {
        toml::from_str(content).with_context(|| "Failed to parse config file")?
    };
    config.validate()?;
    Ok(config)
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let json = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let mut config = parse_config(&content, json)?;
    config.base_dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf);
    Ok(config)
}
