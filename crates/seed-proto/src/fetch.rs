//! Anonymous bucket listing client.

use reqwest::Client;
use tracing::{debug, info};

use crate::config::{BucketConfig, ListingConfig};
use crate::error::{Result, SeedError};
use crate::listing::{self, ListingEntry, ListingFilter};

/// Issues the single unauthenticated GET against the bucket.
///
/// Cheap to clone; clones share the connection pool.
#[derive(Clone)]
pub struct ListingFetcher {
    client: Client,
    bucket: BucketConfig,
}

impl ListingFetcher {
    pub fn new(bucket: BucketConfig, listing: &ListingConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(listing.connect_timeout())
            .timeout(listing.request_timeout())
            .build()
            .map_err(|e| SeedError::Network(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, bucket })
    }

    pub fn bucket(&self) -> &BucketConfig {
        &self.bucket
    }

    /// Fetch the raw listing document.
    pub async fn fetch_xml(&self) -> Result<String> {
        let url = self.bucket.listing_url();
        debug!("Fetching bucket listing from {}", url);

        let response = self
            .client
            .get(&url)
            .header("Accept", "application/xml, text/xml")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SeedError::Network(format!("HTTP error! status: {}", status)));
        }

        let body = response.text().await?;
        info!("Fetched bucket listing ({} bytes)", body.len());
        Ok(body)
    }

    /// Fetch, parse, validate, filter and sort.
    pub async fn fetch_entries(&self, filter: &ListingFilter) -> Result<Vec<ListingEntry>> {
        let xml = self.fetch_xml().await?;
        listing::parse_and_filter(&xml, filter)
    }
}
