//! Listing page controller: one per page session.
//!
//! `load` runs cache → fetch → render for page 1; `load_more` renders the
//! next slice of the same listing. Every listing error ends up as a single
//! error panel with a reload link.

use seed_proto::cache::ListingCache;
use seed_proto::config::{BucketConfig, Config, PlaybackConfig};
use seed_proto::fetch::ListingFetcher;
use seed_proto::listing::{ListingEntry, ListingFilter};
use seed_proto::pager::Pager;
use seed_proto::SeedError;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::buffer::{BufferState, HousekeepingReport, MediaEvent, PlaybackBufferManager};
use crate::document::{Document, Fragment, ARCHIVE_CONTAINER, EPISODES_CONTAINER, LOAD_MORE_CONTAINER};
use crate::render::{self, CardRenderer};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageVariant {
    Episodes,
    Archive,
}

impl PageVariant {
    pub fn title(&self) -> &'static str {
        match self {
            PageVariant::Episodes => "Episodes",
            PageVariant::Archive => "Archive",
        }
    }

    pub fn container(&self) -> &'static str {
        match self {
            PageVariant::Episodes => EPISODES_CONTAINER,
            PageVariant::Archive => ARCHIVE_CONTAINER,
        }
    }

    /// Link that reloads this page from scratch.
    pub fn retry_href(&self) -> &'static str {
        match self {
            PageVariant::Episodes => "/",
            PageVariant::Archive => "/archive",
        }
    }

    pub fn failure_message(&self) -> &'static str {
        match self {
            PageVariant::Episodes => "Failed to load episodes. Please try again later.",
            PageVariant::Archive => "Failed to load archive files. Please try again later.",
        }
    }

    pub fn filter(&self, bucket: &BucketConfig) -> ListingFilter {
        match self {
            PageVariant::Episodes => ListingFilter::episodes_for(bucket),
            PageVariant::Archive => ListingFilter::archive_for(bucket),
        }
    }
}

impl std::str::FromStr for PageVariant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "episodes" => Ok(PageVariant::Episodes),
            "archive" => Ok(PageVariant::Archive),
            other => Err(format!("unknown page variant: {other}")),
        }
    }
}

/// Cached listing if fresh, otherwise fetch it and refresh the cache.
/// A failed cache write is logged and does not fail the load.
pub async fn load_listing(
    fetcher: &ListingFetcher,
    cache: Option<&ListingCache>,
    filter: &ListingFilter,
) -> Result<Vec<ListingEntry>, SeedError> {
    if let Some(cache) = cache {
        if let Some(cached) = cache.read().await {
            debug!("Using cached listing ({} entries)", cached.episodes.len());
            return Ok(cached.episodes);
        }
    }

    let entries = fetcher.fetch_entries(filter).await?;
    if let Some(cache) = cache {
        if let Err(e) = cache.write(&entries).await {
            warn!("Failed to write listing cache: {}", e);
        }
    }
    Ok(entries)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStatus {
    Idle,
    Loading,
    Ready,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadMoreOutcome {
    /// Not ready (still loading, failed, or never loaded).
    Busy,
    /// Nothing left to show.
    Exhausted,
    /// Rendered this many cards from the new page.
    Rendered(usize),
}

pub struct ArchivePage {
    variant: PageVariant,
    fetcher: ListingFetcher,
    cache: Option<ListingCache>,
    renderer: CardRenderer,
    filter: ListingFilter,
    pager: Pager,
    buffers: PlaybackBufferManager,
    doc: Document,
    entries: Vec<ListingEntry>,
    status: LoadStatus,
}

impl ArchivePage {
    pub fn new(
        variant: PageVariant,
        fetcher: ListingFetcher,
        cache: Option<ListingCache>,
        page_size: usize,
        playback: &PlaybackConfig,
    ) -> Self {
        let bucket = fetcher.bucket().clone();
        let filter = variant.filter(&bucket);
        // Only the episodes page keeps a local copy of the listing.
        let cache = match variant {
            PageVariant::Episodes => cache,
            PageVariant::Archive => None,
        };
        // The plain archive shows everything at once.
        let page_size = match variant {
            PageVariant::Episodes => page_size,
            PageVariant::Archive => usize::MAX,
        };
        Self {
            variant,
            renderer: CardRenderer::new(bucket, filter.clone()),
            filter,
            fetcher,
            cache,
            pager: Pager::new(page_size),
            buffers: PlaybackBufferManager::new(playback),
            doc: Document::new(variant.title(), &[variant.container(), LOAD_MORE_CONTAINER]),
            entries: Vec::new(),
            status: LoadStatus::Idle,
        }
    }

    pub fn from_config(variant: PageVariant, fetcher: ListingFetcher, config: &Config) -> Self {
        Self::new(
            variant,
            fetcher,
            Some(ListingCache::from_config(config)),
            config.listing.page_size,
            &config.playback,
        )
    }

    pub fn variant(&self) -> PageVariant {
        self.variant
    }

    pub fn status(&self) -> LoadStatus {
        self.status
    }

    pub fn entries(&self) -> &[ListingEntry] {
        &self.entries
    }

    pub fn pager(&self) -> &Pager {
        &self.pager
    }

    pub fn has_more(&self) -> bool {
        self.pager.has_more(&self.entries)
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    pub fn to_html(&self) -> String {
        self.doc.to_html()
    }

    /// Load the listing and render page 1. Errors are rendered, not returned.
    pub async fn load(&mut self) -> LoadStatus {
        self.status = LoadStatus::Loading;
        let container = self.variant.container();
        self.doc.clear(LOAD_MORE_CONTAINER);

        match self.listing().await {
            Ok(entries) => {
                self.entries = entries;
                self.pager = Pager::new(self.pager.page_size());
                self.doc.clear(container);
                let page = self.pager.current(&self.entries).to_vec();
                let rendered = self.render_slice(&page, 0);
                info!(
                    "{} page: {} entries, rendered {} on page 1",
                    self.variant.title(),
                    self.entries.len(),
                    rendered
                );
                self.status = LoadStatus::Ready;
                self.sync_load_more();
            }
            Err(e) => {
                error!("Error fetching {} listing ({}): {}", self.variant.title(), e.kind(), e);
                self.entries.clear();
                self.doc.clear(container);
                self.doc.append(
                    container,
                    render::error_panel(self.variant.failure_message(), self.variant.retry_href()),
                    None,
                );
                self.status = LoadStatus::Failed;
            }
        }
        self.status
    }

    /// Render the next page, if any.
    pub fn load_more(&mut self) -> LoadMoreOutcome {
        if self.status != LoadStatus::Ready {
            debug!("Load more ignored while {:?}", self.status);
            return LoadMoreOutcome::Busy;
        }
        if !self.has_more() {
            self.sync_load_more();
            return LoadMoreOutcome::Exhausted;
        }

        self.status = LoadStatus::Loading;
        self.sync_load_more();
        let first_index = self.pager.current_page().saturating_mul(self.pager.page_size());
        let page = self.pager.advance(&self.entries).to_vec();
        let rendered = self.render_slice(&page, first_index);
        debug!("Rendered page {} ({} cards)", self.pager.current_page(), rendered);
        self.status = LoadStatus::Ready;
        self.sync_load_more();
        LoadMoreOutcome::Rendered(rendered)
    }

    /// Load and then show pages `1..=pages`, as a `?page=N` reload does.
    pub async fn load_pages(&mut self, pages: usize) -> LoadStatus {
        let status = self.load().await;
        if status != LoadStatus::Ready {
            return status;
        }
        while self.pager.current_page() < pages {
            if !matches!(self.load_more(), LoadMoreOutcome::Rendered(_)) {
                break;
            }
        }
        self.status
    }

    /// Route a media event to one of this page's audio controls.
    pub fn dispatch(&mut self, control_id: &str, event: MediaEvent) -> Option<BufferState> {
        self.buffers.dispatch(&mut self.doc, control_id, event)
    }

    pub fn on_scroll(&mut self, scroll_top: f64, now: Instant) {
        self.buffers.on_scroll(&mut self.doc, scroll_top, now);
    }

    pub fn poll(&mut self, now: Instant) -> Option<HousekeepingReport> {
        self.buffers.poll(&mut self.doc, now)
    }

    async fn listing(&self) -> Result<Vec<ListingEntry>, SeedError> {
        load_listing(&self.fetcher, self.cache.as_ref(), &self.filter).await
    }

    fn render_slice(&mut self, entries: &[ListingEntry], first_index: usize) -> usize {
        let container = self.variant.container();
        match self.variant {
            PageVariant::Episodes => self
                .renderer
                .render_episodes(&mut self.doc, container, entries, first_index),
            PageVariant::Archive => self.renderer.render_archive(&mut self.doc, container, entries),
        }
    }

    /// Show, disable or remove the load-more control to match the state.
    fn sync_load_more(&mut self) {
        self.doc.clear(LOAD_MORE_CONTAINER);
        if !self.has_more() {
            return;
        }
        let enabled = self.status == LoadStatus::Ready;
        self.doc.append(
            LOAD_MORE_CONTAINER,
            render::load_more_button(enabled, self.pager.current_page() + 1),
            None,
        );
    }

    pub fn load_more_control(&self) -> Option<&Fragment> {
        self.doc
            .container(LOAD_MORE_CONTAINER)
            .and_then(|c| c.fragments.first())
    }
}
