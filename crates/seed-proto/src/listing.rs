//! Bucket listing model, parser and filter.
//!
//! The bucket answers `GET /` with an S3-style `ListBucketResult` document:
//!
//! ```xml
//! <ListBucketResult>
//!   <Name>radio-files</Name>
//!   <Contents>
//!     <Key>archive/show_2024-01-05_10-00-00.mp3</Key>
//!     <LastModified>2024-01-05T12:00:04.000Z</LastModified>
//!     <Size>115200512</Size>
//!   </Contents>
//!   ...
//! </ListBucketResult>
//! ```

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use quick_xml::events::Event;
use quick_xml::Reader;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::BucketConfig;
use crate::error::{Result, SeedError};

const LISTING_ROOT: &[u8] = b"ListBucketResult";

/// One stored object, validated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingEntry {
    pub key: String,
    pub last_modified: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

/// One `<Contents>` element exactly as it appeared in the document.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawEntry {
    #[serde(rename = "Key", default)]
    pub key: Option<String>,
    #[serde(rename = "LastModified", default)]
    pub last_modified: Option<String>,
    #[serde(rename = "Size", default)]
    pub size: Option<String>,
}

/// `Contents` runs may be split by `CommonPrefixes`; quick-xml collects
/// them only with its `overlapped-lists` feature.
#[derive(Debug, Default, Deserialize)]
struct ListBucketResult {
    #[serde(rename = "Contents", default)]
    contents: Vec<RawEntry>,
}

impl RawEntry {
    /// Check required fields and convert. Key and timestamp are required;
    /// size is optional but must be a decimal byte count when present.
    pub fn validate(&self) -> Result<ListingEntry> {
        let key = self
            .key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or_else(|| SeedError::Validation("entry has no Key".to_string()))?;

        let raw_ts = self
            .last_modified
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| SeedError::Validation(format!("{key}: missing LastModified")))?;

        let last_modified = DateTime::parse_from_rfc3339(raw_ts)
            .map_err(|e| SeedError::Validation(format!("{key}: bad LastModified {raw_ts:?}: {e}")))?
            .with_timezone(&Utc);

        let size = match self.size.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(s) => Some(
                s.parse::<u64>()
                    .map_err(|e| SeedError::Validation(format!("{key}: bad Size {s:?}: {e}")))?,
            ),
        };

        Ok(ListingEntry {
            key: key.to_string(),
            last_modified,
            size,
        })
    }
}

/// Parse a listing document into raw entries.
///
/// The document must be well-formed and rooted at `ListBucketResult`;
/// anything else is a [`SeedError::Parse`].
pub fn parse_listing(xml: &str) -> Result<Vec<RawEntry>> {
    check_document(xml)?;
    let listing: ListBucketResult = quick_xml::de::from_str(xml)?;
    debug!("Parsed listing with {} Contents elements", listing.contents.len());
    Ok(listing.contents)
}

/// Walk the document once: balanced tags, one root, and the right root name.
fn check_document(xml: &str) -> Result<()> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut depth: usize = 0;
    let mut root_seen = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                if depth == 0 {
                    if root_seen {
                        return Err(SeedError::Parse("multiple root elements".to_string()));
                    }
                    if e.name().as_ref() != LISTING_ROOT {
                        return Err(SeedError::Parse(format!(
                            "unexpected root element <{}>",
                            String::from_utf8_lossy(e.name().as_ref())
                        )));
                    }
                    root_seen = true;
                }
                depth += 1;
            }
            Ok(Event::Empty(e)) => {
                if depth == 0 {
                    if e.name().as_ref() != LISTING_ROOT {
                        return Err(SeedError::Parse(format!(
                            "unexpected root element <{}/>",
                            String::from_utf8_lossy(e.name().as_ref())
                        )));
                    }
                    root_seen = true;
                }
            }
            Ok(Event::End(_)) => {
                depth = depth.saturating_sub(1);
            }
            Ok(Event::Text(_)) if depth == 0 => {
                return Err(SeedError::Parse("text outside the root element".to_string()));
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(SeedError::Parse(format!(
                    "malformed XML at byte {}: {}",
                    reader.buffer_position(),
                    e
                )))
            }
        }
    }

    if depth != 0 {
        return Err(SeedError::Parse("unexpected end of document".to_string()));
    }
    if !root_seen {
        return Err(SeedError::Parse("document has no ListBucketResult".to_string()));
    }
    Ok(())
}

/// Validate every raw entry, logging and skipping the broken ones.
pub fn validate_entries(raw: &[RawEntry]) -> Vec<ListingEntry> {
    raw.iter()
        .filter_map(|entry| match entry.validate() {
            Ok(valid) => Some(valid),
            Err(e) => {
                warn!("Skipping listing entry: {}", e);
                None
            }
        })
        .collect()
}

/// Which keys count as recordings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingFilter {
    pub prefix: String,
    /// `None` for the plain archive, which lists every file under the prefix.
    pub extension: Option<String>,
}

impl ListingFilter {
    pub fn episodes(prefix: impl Into<String>, extension: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            extension: Some(extension.into()),
        }
    }

    pub fn archive(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            extension: None,
        }
    }

    pub fn episodes_for(bucket: &BucketConfig) -> Self {
        Self::episodes(bucket.prefix.clone(), bucket.extension.clone())
    }

    pub fn archive_for(bucket: &BucketConfig) -> Self {
        Self::archive(bucket.prefix.clone())
    }

    pub fn matches(&self, key: &str) -> bool {
        if !key.starts_with(&self.prefix) {
            return false;
        }
        match &self.extension {
            Some(ext) => key.ends_with(ext.as_str()),
            None => true,
        }
    }

    /// Display title: the key without the prefix and the extension.
    pub fn title_for<'a>(&self, key: &'a str) -> &'a str {
        let title = key.strip_prefix(self.prefix.as_str()).unwrap_or(key);
        match &self.extension {
            Some(ext) => title.strip_suffix(ext.as_str()).unwrap_or(title),
            None => title,
        }
    }
}

/// Filter to matching keys, drop repeated keys (first wins), and sort
/// newest first. Ties keep their listing order.
pub fn filter_and_sort(entries: Vec<ListingEntry>, filter: &ListingFilter) -> Vec<ListingEntry> {
    let mut seen = HashSet::new();
    let mut kept: Vec<ListingEntry> = entries
        .into_iter()
        .filter(|e| filter.matches(&e.key))
        .filter(|e| seen.insert(e.key.clone()))
        .collect();
    kept.sort_by(|a, b| b.last_modified.cmp(&a.last_modified));
    kept
}

/// Parse, validate, filter and sort in one go.
pub fn parse_and_filter(xml: &str, filter: &ListingFilter) -> Result<Vec<ListingEntry>> {
    let raw = parse_listing(xml)?;
    let total = raw.len();
    let entries = filter_and_sort(validate_entries(&raw), filter);
    debug!(
        "Listing: {} objects, {} match prefix={:?} extension={:?}",
        total,
        entries.len(),
        filter.prefix,
        filter.extension
    );
    Ok(entries)
}

/// The single newest matching entry. The first of equally new entries wins.
pub fn newest<'a>(entries: &'a [ListingEntry], filter: &ListingFilter) -> Option<&'a ListingEntry> {
    entries
        .iter()
        .filter(|e| filter.matches(&e.key))
        .fold(None, |best: Option<&ListingEntry>, e| match best {
            Some(b) if b.last_modified >= e.last_modified => Some(b),
            _ => Some(e),
        })
}
