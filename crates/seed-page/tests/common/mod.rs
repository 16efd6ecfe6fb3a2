#![allow(dead_code)]

pub mod mock_bucket;

use std::path::Path;

use seed_proto::config::{BucketConfig, Config};
use seed_proto::fetch::ListingFetcher;

use mock_bucket::MockBucket;

/// Default config pointed at `mock`, caching under `cache_dir`.
pub fn config_for(mock: &MockBucket, cache_dir: &Path) -> Config {
    let mut config = Config::default();
    config.bucket = BucketConfig {
        endpoint: Some(mock.base_url.clone()),
        ..BucketConfig::default()
    };
    config.paths.cache_dir = cache_dir.to_path_buf();
    config
}

pub fn fetcher_for(config: &Config) -> ListingFetcher {
    ListingFetcher::new(config.bucket.clone(), &config.listing).expect("fetcher")
}

/// `count` episodes, one day apart, newest last in the listing.
pub fn episodes(count: usize) -> Vec<(String, String, u64)> {
    (0..count)
        .map(|i| {
            (
                format!("archive/show-{i:02}.mp3"),
                format!("2024-01-{:02}T10:00:00.000Z", i + 1),
                1_048_576 * (i as u64 + 1),
            )
        })
        .collect()
}

pub fn as_refs(entries: &[(String, String, u64)]) -> Vec<(&str, &str, u64)> {
    entries
        .iter()
        .map(|(k, m, s)| (k.as_str(), m.as_str(), *s))
        .collect()
}
