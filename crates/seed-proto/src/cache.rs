//! Short-lived on-disk cache of the filtered episode listing.
//!
//! One fixed key, overwritten on every write. Any problem reading it
//! (missing file, bad JSON, stale, structurally empty) is a cache miss.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::Config;
use crate::listing::ListingEntry;

pub const CACHE_FILE: &str = "episodes-cache.json";

/// What gets stored: the fetch time in epoch milliseconds plus the
/// filtered, sorted listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedListing {
    pub timestamp: i64,
    pub episodes: Vec<ListingEntry>,
}

impl CachedListing {
    /// The first entry must carry a key. Its timestamp is already
    /// guaranteed by deserialisation.
    pub fn is_structurally_valid(&self) -> bool {
        self.episodes
            .first()
            .map(|first| !first.key.trim().is_empty())
            .unwrap_or(false)
    }

    pub fn age_ms(&self, now_ms: i64) -> i64 {
        now_ms - self.timestamp
    }
}

pub struct ListingCache {
    path: PathBuf,
    ttl_ms: i64,
    io_timeout: Duration,
}

impl ListingCache {
    pub fn new(path: PathBuf, ttl_ms: u64, io_timeout: Duration) -> Self {
        Self {
            path,
            ttl_ms: i64::try_from(ttl_ms).unwrap_or(i64::MAX),
            io_timeout,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.paths.cache_dir.join(CACHE_FILE),
            config.listing.cache_ttl_ms,
            config.listing.io_timeout(),
        )
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn read(&self) -> Option<CachedListing> {
        self.read_at(Utc::now().timestamp_millis()).await
    }

    /// Return the stored listing if present, valid and no older than the TTL.
    pub async fn read_at(&self, now_ms: i64) -> Option<CachedListing> {
        let content = match tokio::time::timeout(self.io_timeout, tokio::fs::read(&self.path)).await
        {
            Ok(Ok(bytes)) => bytes,
            Ok(Err(e)) => {
                debug!("Listing cache unavailable at {:?}: {}", self.path, e);
                return None;
            }
            Err(_) => {
                warn!("Listing cache read timed out after {:?}", self.io_timeout);
                return None;
            }
        };

        let cached: CachedListing = match serde_json::from_slice(&content) {
            Ok(c) => c,
            Err(e) => {
                debug!("Ignoring undecodable listing cache: {}", e);
                return None;
            }
        };

        if !cached.is_structurally_valid() {
            debug!("Ignoring structurally invalid listing cache");
            return None;
        }

        let age = cached.age_ms(now_ms);
        if age < 0 || age > self.ttl_ms {
            debug!("Listing cache expired (age {} ms, ttl {} ms)", age, self.ttl_ms);
            return None;
        }

        debug!("Listing cache hit ({} episodes, age {} ms)", cached.episodes.len(), age);
        Some(cached)
    }

    pub async fn write(&self, episodes: &[ListingEntry]) -> anyhow::Result<()> {
        self.write_at(episodes, Utc::now().timestamp_millis()).await
    }

    /// Overwrite the stored listing with `episodes` stamped at `now_ms`.
    pub async fn write_at(&self, episodes: &[ListingEntry], now_ms: i64) -> anyhow::Result<()> {
        let cached = CachedListing {
            timestamp: now_ms,
            episodes: episodes.to_vec(),
        };
        let json = serde_json::to_vec(&cached)?;

        let write = async {
            if let Some(parent) = self.path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(&self.path, json).await
        };

        tokio::time::timeout(self.io_timeout, write)
            .await
            .map_err(|_| anyhow::anyhow!("listing cache write timed out"))??;
        debug!("Wrote listing cache ({} episodes) to {:?}", episodes.len(), self.path);
        Ok(())
    }
}
