//! Card renderer and HTML serialisation of the headless document.

use chrono::{DateTime, Utc};
use html_escape::{encode_double_quoted_attribute as attr, encode_text as text};
use seed_proto::config::BucketConfig;
use seed_proto::listing::{ListingEntry, ListingFilter};
use seed_proto::{Result, SeedError};
use tracing::warn;

use crate::document::{AudioControl, Document, Fragment, Modal, LOAD_MORE_CONTAINER, MODAL_ID};

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Long `en-AU` date, e.g. `5 January 2024`.
pub fn format_date(ts: &DateTime<Utc>) -> String {
    ts.format("%-d %B %Y").to_string()
}

/// Long `en-AU` date with 12-hour time, e.g. `5 January 2024 at 03:04 pm`.
pub fn format_date_time(ts: &DateTime<Utc>) -> String {
    ts.format("%-d %B %Y at %I:%M %P").to_string()
}

/// Size in mebibytes with two decimals, e.g. `12.34`.
pub fn format_size_mb(bytes: u64) -> String {
    format!("{:.2}", bytes as f64 / BYTES_PER_MB)
}

/// Id of the audio control for the entry at `index` of the sorted listing.
pub fn control_id(index: usize) -> String {
    format!("episode-audio-{index}")
}

/// Turns listing entries into fragments.
#[derive(Debug, Clone)]
pub struct CardRenderer {
    bucket: BucketConfig,
    filter: ListingFilter,
}

impl CardRenderer {
    pub fn new(bucket: BucketConfig, filter: ListingFilter) -> Self {
        Self { bucket, filter }
    }

    pub fn title(&self, key: &str) -> String {
        self.filter.title_for(key).to_string()
    }

    /// Episode card plus its audio control. `index` is the entry's position
    /// in the full sorted listing.
    pub fn episode_card(&self, entry: &ListingEntry, index: usize) -> Result<(Fragment, AudioControl)> {
        let key = entry.key.trim();
        if key.is_empty() {
            return Err(SeedError::Validation("episode entry has no key".to_string()));
        }
        let id = control_id(index);
        let url = self.bucket.object_url(key);
        let fragment = Fragment::Episode {
            key: key.to_string(),
            title: self.title(key),
            date: format_date(&entry.last_modified),
            control_id: id.clone(),
        };
        Ok((fragment, AudioControl::new(id, Some(url))))
    }

    /// Archive card: title, recording time, size and a download link.
    pub fn archive_card(&self, entry: &ListingEntry) -> Result<Fragment> {
        let key = entry.key.trim();
        if key.is_empty() {
            return Err(SeedError::Validation("archive entry has no key".to_string()));
        }
        let size = entry
            .size
            .ok_or_else(|| SeedError::Validation(format!("{key}: missing size")))?;
        Ok(Fragment::Archive {
            key: key.to_string(),
            title: self.title(key),
            recorded: format_date_time(&entry.last_modified),
            size_mb: format_size_mb(size),
            url: self.bucket.object_url(key),
        })
    }

    /// Append episode cards for `entries`, numbering from `first_index`.
    /// Broken entries are logged and skipped. Returns how many were rendered.
    pub fn render_episodes(
        &self,
        doc: &mut Document,
        container: &str,
        entries: &[ListingEntry],
        first_index: usize,
    ) -> usize {
        let mut rendered = 0;
        for (offset, entry) in entries.iter().enumerate() {
            match self.episode_card(entry, first_index + offset) {
                Ok((fragment, control)) => {
                    if doc.append(container, fragment, Some(control)) {
                        rendered += 1;
                    } else {
                        warn!("Container #{} not found, dropping card", container);
                    }
                }
                Err(e) => warn!("Skipping episode card: {}", e),
            }
        }
        rendered
    }

    pub fn render_archive(&self, doc: &mut Document, container: &str, entries: &[ListingEntry]) -> usize {
        let mut rendered = 0;
        for entry in entries {
            match self.archive_card(entry) {
                Ok(fragment) => {
                    if doc.append(container, fragment, None) {
                        rendered += 1;
                    } else {
                        warn!("Container #{} not found, dropping card", container);
                    }
                }
                Err(e) => warn!("Skipping archive card: {}", e),
            }
        }
        rendered
    }
}

pub fn error_panel(message: impl Into<String>, retry_href: impl Into<String>) -> Fragment {
    Fragment::ErrorPanel {
        message: message.into(),
        retry_href: retry_href.into(),
    }
}

pub fn load_more_button(enabled: bool, next_page: usize) -> Fragment {
    Fragment::LoadMore { enabled, next_page }
}

pub fn audio_html(control: &AudioControl) -> String {
    let mut classes = vec!["episode-audio"];
    if control.loading {
        classes.push("is-loading");
    }
    let mut html = format!(
        "<audio id=\"{}\" class=\"{}\" controls preload=\"{}\"",
        attr(&control.id),
        classes.join(" "),
        control.preload.as_attr()
    );
    if let Some(configured) = &control.configured_src {
        html.push_str(&format!(" data-src=\"{}\"", attr(configured)));
    }
    if let Some(label) = &control.label {
        html.push_str(&format!(" aria-label=\"{}\"", attr(label)));
    }
    html.push('>');
    if let Some(src) = &control.src {
        html.push_str(&format!(
            "<source src=\"{}\" type=\"audio/mpeg\">",
            attr(src)
        ));
    }
    html.push_str("Your browser does not support the audio element.</audio>");
    html
}

pub fn fragment_html(doc: &Document, fragment: &Fragment) -> String {
    match fragment {
        Fragment::Episode {
            title,
            date,
            control_id,
            ..
        } => {
            let audio = doc.control(control_id).map(audio_html).unwrap_or_default();
            format!(
                concat!(
                    "<div class=\"col-12 mb-4\"><div class=\"card\"><div class=\"card-body d-flex flex-column\">",
                    "<div class=\"d-flex justify-content-between align-items-start mb-3\">",
                    "<h4 class=\"card-title mb-0\">{}</h4><span class=\"text-muted\">{}</span></div>",
                    "{}</div></div></div>"
                ),
                text(title),
                text(date),
                audio
            )
        }
        Fragment::Archive {
            title,
            recorded,
            size_mb,
            url,
            ..
        } => format!(
            concat!(
                "<div class=\"archive-card\"><h3>{}</h3><p>Recorded: {}</p><p>Size: {} MB</p>",
                "<a href=\"{}\" download class=\"download-button\">Download Recording</a></div>"
            ),
            text(title),
            text(recorded),
            text(size_mb),
            attr(url)
        ),
        Fragment::ErrorPanel {
            message,
            retry_href,
        } => format!(
            concat!(
                "<div class=\"col-12\"><div class=\"alert alert-danger\" role=\"alert\">{} ",
                "<a class=\"alert-link retry-button\" href=\"{}\">Retry</a></div></div>"
            ),
            text(message),
            attr(retry_href)
        ),
        Fragment::LoadMore { enabled, next_page } => format!(
            "<a class=\"btn btn-primary load-more{}\" href=\"?page={}\"{}>Load more</a>",
            if *enabled { "" } else { " disabled" },
            next_page,
            if *enabled { "" } else { " aria-disabled=\"true\"" }
        ),
    }
}

pub fn modal_html(modal: &Modal) -> String {
    format!(
        "<div class=\"modal\" id=\"{}\" aria-hidden=\"{}\">{}</div>",
        MODAL_ID,
        !modal.open,
        audio_html(&modal.control)
    )
}

/// Serialise the whole document.
pub fn page_html(doc: &Document) -> String {
    let mut body = String::new();
    for container in doc.containers() {
        let class = if container.id == LOAD_MORE_CONTAINER {
            "text-center"
        } else {
            "row"
        };
        body.push_str(&format!(
            "<div id=\"{}\" class=\"{}\">",
            attr(&container.id),
            class
        ));
        for fragment in &container.fragments {
            body.push_str(&fragment_html(doc, fragment));
        }
        body.push_str("</div>");
    }
    body.push_str(&modal_html(&doc.modal));

    format!(
        concat!(
            "<!DOCTYPE html><html lang=\"en-AU\"><head><meta charset=\"utf-8\">",
            "<title>{}</title></head><body><main class=\"container\">{}</main></body></html>\n"
        ),
        text(&doc.title),
        body
    )
}
