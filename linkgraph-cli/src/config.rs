//! linkgraph configuration loading from `.linkgraphrc.toml`.
//!
//! Configuration is optional: without a file every setting has a default, and
//! command-line flags override whatever the file says.
//!
//! # Example Configuration
//!
//! ```toml
//! [source]
//! url = "http://localhost:9200"
//! index = "ipfs_files"
//! page_size = 100
//! keep_alive = "1m"
//!
//! [destination]
//! alias = "ipfs_links"
//! flush_bytes = 52428800
//! flush_interval_secs = 60
//!
//! [run]
//! years = [2016, 2017, 2018, 2020, 2021, 2022, 2023]
//! monthly = false
//! continue_on_error = false
//! key_digest = "sha1"
//!
//! [output]
//! format = "table"
//! color = true
//! ```

use anyhow::{Context, Result};
use linkgraph_core::KeyDigest;
use linkgraph_store::client::{DEFAULT_TIMEOUT, DEFAULT_URL};
use linkgraph_store::driver::{
    DEFAULT_DESTINATION_ALIAS, DEFAULT_KEEP_ALIVE, DEFAULT_PAGE_SIZE, DEFAULT_SOURCE_INDEX,
};
use linkgraph_store::sink::{
    DEFAULT_FLUSH_BYTES, DEFAULT_FLUSH_INTERVAL, DEFAULT_MAX_RETRIES, DEFAULT_RETRY_WAIT,
};
use linkgraph_store::{ClientOptions, SinkConfig};
use serde::Deserialize;
use std::num::NonZeroUsize;
use std::path::Path;
use std::time::Duration;

pub const CONFIG_FILE: &str = ".linkgraphrc.toml";

/// Years loaded when neither the file nor the command line name any.
pub const DEFAULT_YEARS: &[i32] = &[2016, 2017, 2018, 2020, 2021, 2022, 2023];

/// Root configuration structure loaded from `.linkgraphrc.toml`.
#[derive(Debug, Deserialize, Default)]
pub struct LinkgraphConfig {
    /// Where documents are scanned from.
    #[serde(default)]
    pub source: SourceSection,

    /// Where edges are written to.
    #[serde(default)]
    pub destination: DestinationSection,

    /// What a run covers and how it reacts to failures.
    #[serde(default)]
    pub run: RunSection,

    /// Output formatting preferences.
    #[serde(default)]
    pub output: OutputSettings,
}

#[derive(Debug, Deserialize, Default)]
pub struct SourceSection {
    pub url: Option<String>,
    pub index: Option<String>,
    /// Documents per scan page; zero is rejected when parsing.
    pub page_size: Option<NonZeroUsize>,
    /// Cursor time-to-live, e.g. `1m`.
    pub keep_alive: Option<String>,
    pub username: Option<String>,
    /// Prefer `LINKGRAPH_PASSWORD` over storing this in the file.
    pub password: Option<String>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
pub struct DestinationSection {
    /// Defaults to the source URL.
    pub url: Option<String>,
    /// Write alias; must already exist.
    pub alias: Option<String>,
    pub flush_bytes: Option<usize>,
    pub flush_interval_secs: Option<u64>,
    /// Retries for throttled (HTTP 429) records.
    pub max_retries: Option<u32>,
    pub retry_wait_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
pub struct RunSection {
    pub years: Option<Vec<i32>>,
    #[serde(default)]
    pub monthly: bool,
    #[serde(default)]
    pub continue_on_error: bool,
    pub key_digest: Option<KeyDigest>,
}

/// Output formatting preferences; `--format` overrides these.
#[derive(Debug, Deserialize, Default)]
pub struct OutputSettings {
    /// Valid values: `table`, `json`
    pub format: Option<String>,
    pub color: Option<bool>,
}

/// Endpoint and credential overrides from the command line or environment.
#[derive(Debug, Clone, Default)]
pub struct Connection {
    pub url: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl LinkgraphConfig {
    /// Load `.linkgraphrc.toml` from the given directory.
    ///
    /// A missing file yields defaults. A file that cannot be read or parsed
    /// is logged as a warning and also yields defaults.
    pub fn load(root: &Path) -> Self {
        let config_path = root.join(CONFIG_FILE);
        if config_path.exists() {
            match std::fs::read_to_string(&config_path) {
                Ok(content) => match toml::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => {
                        tracing::warn!("Failed to parse {}: {}", CONFIG_FILE, e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read {}: {}", CONFIG_FILE, e);
                }
            }
        }
        Self::default()
    }

    /// Load an explicitly named file; any problem is an error.
    pub fn load_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// Explicit path if given, otherwise the file in the working directory.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::load_file(path),
            None => Ok(Self::load(Path::new("."))),
        }
    }

    pub fn source_index(&self) -> &str {
        self.source.index.as_deref().unwrap_or(DEFAULT_SOURCE_INDEX)
    }

    pub fn alias(&self) -> &str {
        self.destination
            .alias
            .as_deref()
            .unwrap_or(DEFAULT_DESTINATION_ALIAS)
    }

    pub fn page_size(&self) -> usize {
        self.source
            .page_size
            .map(NonZeroUsize::get)
            .unwrap_or(DEFAULT_PAGE_SIZE)
    }

    pub fn keep_alive(&self) -> &str {
        self.source.keep_alive.as_deref().unwrap_or(DEFAULT_KEEP_ALIVE)
    }

    pub fn years(&self) -> Vec<i32> {
        self.run
            .years
            .clone()
            .unwrap_or_else(|| DEFAULT_YEARS.to_vec())
    }

    pub fn key_digest(&self) -> KeyDigest {
        self.run.key_digest.unwrap_or_default()
    }

    /// Client settings for the source cluster.
    pub fn source_options(&self, conn: &Connection) -> ClientOptions {
        let url = conn
            .url
            .clone()
            .or_else(|| self.source.url.clone())
            .unwrap_or_else(|| DEFAULT_URL.to_string());
        self.client_options(url, conn)
    }

    /// Client settings for the destination cluster.
    ///
    /// A command-line URL applies to both clusters; otherwise the destination
    /// URL falls back to the source URL.
    pub fn destination_options(&self, conn: &Connection) -> ClientOptions {
        let url = conn
            .url
            .clone()
            .or_else(|| self.destination.url.clone())
            .or_else(|| self.source.url.clone())
            .unwrap_or_else(|| DEFAULT_URL.to_string());
        self.client_options(url, conn)
    }

    fn client_options(&self, url: String, conn: &Connection) -> ClientOptions {
        ClientOptions {
            url,
            username: conn.username.clone().or_else(|| self.source.username.clone()),
            password: conn.password.clone().or_else(|| self.source.password.clone()),
            timeout: self
                .source
                .timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_TIMEOUT),
        }
    }

    /// Sink settings from the `[destination]` section.
    pub fn sink_config(&self) -> SinkConfig {
        let d = &self.destination;
        SinkConfig::new(self.alias())
            .with_flush_bytes(d.flush_bytes.unwrap_or(DEFAULT_FLUSH_BYTES))
            .with_flush_interval(
                d.flush_interval_secs
                    .map(Duration::from_secs)
                    .unwrap_or(DEFAULT_FLUSH_INTERVAL),
            )
            .with_retries(
                d.max_retries.unwrap_or(DEFAULT_MAX_RETRIES),
                d.retry_wait_secs
                    .map(Duration::from_secs)
                    .unwrap_or(DEFAULT_RETRY_WAIT),
            )
    }

    pub fn default_format(&self) -> Option<&str> {
        self.output.format.as_deref()
    }

    pub fn use_color(&self) -> Option<bool> {
        self.output.color
    }
}
