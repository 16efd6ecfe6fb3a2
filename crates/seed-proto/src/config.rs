use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use super::platform;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub bucket: BucketConfig,
    #[serde(default)]
    pub listing: ListingConfig,
    #[serde(default)]
    pub playback: PlaybackConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub paths: PathsConfig,
}

/// Where recordings live and which keys count as recordings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BucketConfig {
    #[serde(default = "default_bucket_name")]
    pub name: String,
    #[serde(default = "default_bucket_host")]
    pub host: String,
    /// Full base URL that replaces `https://{name}.{host}`.
    /// Useful for path-style endpoints and local mirrors.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(default = "default_prefix")]
    pub prefix: String,
    #[serde(default = "default_extension")]
    pub extension: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingConfig {
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    #[serde(default = "default_cache_ttl_ms")]
    pub cache_ttl_ms: u64,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    #[serde(default = "default_io_timeout_ms")]
    pub io_timeout_ms: u64,
}

/// Tuning for the playback buffer manager.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaybackConfig {
    /// A pause with more than this much left drops back to metadata preload.
    #[serde(default = "default_far_from_end_secs")]
    pub far_from_end_secs: f64,
    #[serde(default = "default_scroll_debounce_ms")]
    pub scroll_debounce_ms: u64,
    /// Controls further than this many viewport heights away get unloaded.
    #[serde(default = "default_offscreen_viewports")]
    pub offscreen_viewports: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

/// User-configurable paths for the listing cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Directory holding the cached listing.
    /// Defaults to `~/.cache/streamseed`.
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,
}

impl BucketConfig {
    /// Base URL of the bucket without a trailing slash.
    pub fn base_url(&self) -> String {
        match &self.endpoint {
            Some(endpoint) => endpoint.trim_end_matches('/').to_string(),
            None => format!("https://{}.{}", self.name, self.host),
        }
    }

    /// URL of the bucket's directory listing.
    pub fn listing_url(&self) -> String {
        format!("{}/", self.base_url())
    }

    /// Direct, publicly readable URL of one object.
    pub fn object_url(&self, key: &str) -> String {
        format!("{}/{}", self.base_url(), key.trim_start_matches('/'))
    }
}

impl ListingConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn io_timeout(&self) -> Duration {
        Duration::from_millis(self.io_timeout_ms)
    }
}

impl PlaybackConfig {
    pub fn scroll_debounce(&self) -> Duration {
        Duration::from_millis(self.scroll_debounce_ms)
    }
}

impl Default for BucketConfig {
    fn default() -> Self {
        Self {
            name: default_bucket_name(),
            host: default_bucket_host(),
            endpoint: None,
            prefix: default_prefix(),
            extension: default_extension(),
        }
    }
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            cache_ttl_ms: default_cache_ttl_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
            request_timeout_ms: default_request_timeout_ms(),
            io_timeout_ms: default_io_timeout_ms(),
        }
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            far_from_end_secs: default_far_from_end_secs(),
            scroll_debounce_ms: default_scroll_debounce_ms(),
            offscreen_viewports: default_offscreen_viewports(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            cache_dir: default_cache_dir(),
        }
    }
}

fn default_bucket_name() -> String {
    "radio-files".to_string()
}

fn default_bucket_host() -> String {
    "sjc1.vultrobjects.com".to_string()
}

fn default_prefix() -> String {
    "archive/".to_string()
}

fn default_extension() -> String {
    ".mp3".to_string()
}

fn default_page_size() -> usize {
    10
}

fn default_cache_ttl_ms() -> u64 {
    300_000
}

fn default_connect_timeout_ms() -> u64 {
    5_000
}

fn default_request_timeout_ms() -> u64 {
    20_000
}

fn default_io_timeout_ms() -> u64 {
    2_000
}

fn default_far_from_end_secs() -> f64 {
    10.0
}

fn default_scroll_debounce_ms() -> u64 {
    2_000
}

fn default_offscreen_viewports() -> f64 {
    2.0
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8990
}

fn default_cache_dir() -> PathBuf {
    platform::cache_dir()
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Load from an explicit path, writing defaults there on first run.
    pub fn load_from(config_path: &std::path::Path) -> anyhow::Result<Self> {
        if !config_path.exists() {
            let config = Self::default();
            config.save_to(config_path)?;
            return Ok(config);
        }

        let content = std::fs::read_to_string(config_path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save_to(&self, config_path: &std::path::Path) -> anyhow::Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        platform::config_dir().join("config.toml")
    }
}
