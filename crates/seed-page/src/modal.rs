//! On-demand "latest episode" player.

use std::sync::atomic::{AtomicBool, Ordering};

use seed_proto::config::BucketConfig;
use seed_proto::fetch::ListingFetcher;
use seed_proto::listing::{self, ListingEntry, ListingFilter};
use seed_proto::SeedError;
use tokio::sync::Mutex;
use tracing::{debug, error, info};

use crate::buffer::{apply_event, MediaEvent};
use crate::document::Document;

/// What the modal player ended up bound to.
#[derive(Debug, Clone, PartialEq)]
pub struct ModalBinding {
    pub entry: ListingEntry,
    pub label: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ModalOutcome {
    /// A new source was attached.
    Bound(ModalBinding),
    /// The newest entry is already bound; nothing was reloaded.
    Unchanged(ModalBinding),
    /// The listing has no matching entry.
    Empty,
    /// Another open is still in flight.
    Busy,
    /// The listing could not be loaded; the previous source stays.
    Failed(SeedError),
}

/// Clears the in-flight flag however an open returns.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct ModalLoader {
    filter: ListingFilter,
    far_from_end_secs: f64,
    in_flight: AtomicBool,
}

impl ModalLoader {
    pub fn new(filter: ListingFilter, far_from_end_secs: f64) -> Self {
        Self {
            filter,
            far_from_end_secs,
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    pub fn label_for(&self, entry: &ListingEntry) -> String {
        format!("Play latest episode: {}", self.filter.title_for(&entry.key))
    }

    /// Re-fetch the listing (never from cache) and return the newest entry.
    pub async fn latest(&self, fetcher: &ListingFetcher) -> seed_proto::Result<Option<ListingEntry>> {
        let entries = fetcher.fetch_entries(&self.filter).await?;
        Ok(listing::newest(&entries, &self.filter).cloned())
    }

    /// Handle the modal's "open" event on a page owned by the caller.
    pub async fn open(&self, fetcher: &ListingFetcher, doc: &mut Document) -> ModalOutcome {
        let Some(_guard) = self.claim() else {
            return ModalOutcome::Busy;
        };
        doc.modal.open = true;
        match self.fetch_newest(fetcher).await {
            Ok(entry) => self.bind(fetcher.bucket(), doc, entry),
            Err(outcome) => outcome,
        }
    }

    /// Same as [`open`](Self::open) for a page shared between tasks. The
    /// listing is fetched without holding the lock; it is taken only to
    /// rebind.
    pub async fn open_shared(&self, fetcher: &ListingFetcher, doc: &Mutex<Document>) -> ModalOutcome {
        let Some(_guard) = self.claim() else {
            return ModalOutcome::Busy;
        };
        doc.lock().await.modal.open = true;
        match self.fetch_newest(fetcher).await {
            Ok(entry) => {
                let mut doc = doc.lock().await;
                self.bind(fetcher.bucket(), &mut doc, entry)
            }
            Err(outcome) => outcome,
        }
    }

    /// Handle the modal's "close" event: pause and rewind, keep the source.
    pub fn close(&self, doc: &mut Document) {
        doc.modal.open = false;
        let control = &mut doc.modal.control;
        let remaining = control.remaining();
        apply_event(control, MediaEvent::Pause { remaining }, self.far_from_end_secs);
        control.current_time = 0.0;
    }

    fn claim(&self) -> Option<InFlight<'_>> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("Modal open ignored: previous open still in flight");
            return None;
        }
        Some(InFlight(&self.in_flight))
    }

    async fn fetch_newest(&self, fetcher: &ListingFetcher) -> Result<ListingEntry, ModalOutcome> {
        match self.latest(fetcher).await {
            Ok(Some(entry)) => Ok(entry),
            Ok(None) => {
                info!("Modal: no episodes available");
                Err(ModalOutcome::Empty)
            }
            Err(e) => {
                error!("Error loading latest episode: {}", e);
                Err(ModalOutcome::Failed(e))
            }
        }
    }

    /// Point the modal control at `entry`, reloading only if the URL changed.
    fn bind(&self, bucket: &BucketConfig, doc: &mut Document, entry: ListingEntry) -> ModalOutcome {
        let url = bucket.object_url(&entry.key);
        let label = self.label_for(&entry);
        let control = &mut doc.modal.control;
        control.label = Some(label.clone());

        let unchanged = control.src.as_deref() == Some(url.as_str());
        if unchanged {
            debug!("Modal already bound to {}", url);
        } else {
            info!("Modal bound to {}", entry.key);
            control.configured_src = Some(url.clone());
            control.release();
            control.attach(url.clone());
        }

        let binding = ModalBinding { entry, label, url };
        if unchanged {
            ModalOutcome::Unchanged(binding)
        } else {
            ModalOutcome::Bound(binding)
        }
    }
}
