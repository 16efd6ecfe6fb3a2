mod common;

use axum::http::StatusCode;
use common::mock_bucket::{listing_xml, MockBucket};
use common::{as_refs, config_for, episodes, fetcher_for};
use seed_page::buffer::{BufferState, MediaEvent};
use seed_page::document::{Fragment, ARCHIVE_CONTAINER, EPISODES_CONTAINER};
use seed_page::{ArchivePage, LoadMoreOutcome, LoadStatus, PageVariant};
use seed_proto::cache::ListingCache;
use std::time::Duration;
use tempfile::TempDir;
use tokio::time::Instant;

fn is_episode(f: &Fragment) -> bool {
    matches!(f, Fragment::Episode { .. })
}

fn episode_titles(page: &ArchivePage) -> Vec<String> {
    page.document()
        .container(EPISODES_CONTAINER)
        .unwrap()
        .fragments
        .iter()
        .filter_map(|f| match f {
            Fragment::Episode { title, .. } => Some(title.clone()),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn failed_fetch_renders_error_panel_only() {
    let mock = MockBucket::start(StatusCode::INTERNAL_SERVER_ERROR, "boom").await;
    let dir = TempDir::new().unwrap();
    let config = config_for(&mock, dir.path());

    let mut page = ArchivePage::from_config(PageVariant::Episodes, fetcher_for(&config), &config);
    assert_eq!(page.load().await, LoadStatus::Failed);

    let container = page.document().container(EPISODES_CONTAINER).unwrap();
    assert_eq!(container.fragments.len(), 1);
    match &container.fragments[0] {
        Fragment::ErrorPanel {
            message,
            retry_href,
        } => {
            assert!(message.starts_with("Failed to load episodes"));
            assert_eq!(retry_href, "/");
        }
        other => panic!("expected error panel, got {other:?}"),
    }
    assert_eq!(page.document().controls().count(), 0);
    assert!(page.load_more_control().is_none());
    assert_eq!(page.load_more(), LoadMoreOutcome::Busy);
    assert!(page.to_html().contains("alert-danger"));
}

#[tokio::test]
async fn malformed_listing_renders_error_panel() {
    let mock = MockBucket::start(StatusCode::OK, "<ListBucketResult><Contents>").await;
    let dir = TempDir::new().unwrap();
    let config = config_for(&mock, dir.path());

    let mut page = ArchivePage::from_config(PageVariant::Episodes, fetcher_for(&config), &config);
    assert_eq!(page.load().await, LoadStatus::Failed);
    assert_eq!(
        page.document().fragment_count(EPISODES_CONTAINER, |f| matches!(f, Fragment::ErrorPanel { .. })),
        1
    );
    assert!(page.entries().is_empty());
}

#[tokio::test]
async fn episodes_render_newest_first_with_titles() {
    let mock = MockBucket::start(
        StatusCode::OK,
        listing_xml(&[
            ("archive/a.mp3", "2024-01-02T10:00:00.000Z", 100),
            ("archive/notes.txt", "2024-01-08T10:00:00.000Z", 10),
            ("archive/b.mp3", "2024-01-05T10:00:00.000Z", 200),
        ]),
    )
    .await;
    let dir = TempDir::new().unwrap();
    let config = config_for(&mock, dir.path());

    let mut page = ArchivePage::from_config(PageVariant::Episodes, fetcher_for(&config), &config);
    assert_eq!(page.load().await, LoadStatus::Ready);

    assert_eq!(episode_titles(&page), vec!["b", "a"]);
    let first = page.document().control("episode-audio-0").unwrap();
    assert_eq!(
        first.src.as_deref(),
        Some(format!("{}/archive/b.mp3", mock.base_url).as_str())
    );
    assert!(first.paused);
    // Everything fits on page 1.
    assert!(page.load_more_control().is_none());
    assert_eq!(page.load_more(), LoadMoreOutcome::Exhausted);

    let html = page.to_html();
    assert!(html.contains("5 January 2024"));
    assert!(html.contains("id=\"episode-audio-1\""));
}

#[tokio::test]
async fn load_more_walks_every_page_once() {
    let listing = episodes(25);
    let mock = MockBucket::start(StatusCode::OK, listing_xml(&as_refs(&listing))).await;
    let dir = TempDir::new().unwrap();
    let config = config_for(&mock, dir.path());

    let mut page = ArchivePage::from_config(PageVariant::Episodes, fetcher_for(&config), &config);
    page.load().await;
    assert_eq!(page.document().fragment_count(EPISODES_CONTAINER, is_episode), 10);
    assert_eq!(
        page.load_more_control(),
        Some(&Fragment::LoadMore {
            enabled: true,
            next_page: 2
        })
    );

    assert_eq!(page.load_more(), LoadMoreOutcome::Rendered(10));
    assert_eq!(page.pager().current_page(), 2);
    assert_eq!(page.load_more(), LoadMoreOutcome::Rendered(5));
    assert!(page.load_more_control().is_none());
    assert_eq!(page.load_more(), LoadMoreOutcome::Exhausted);

    let titles = episode_titles(&page);
    assert_eq!(titles.len(), 25);
    assert_eq!(titles.first().map(String::as_str), Some("show-24"));
    assert_eq!(titles.last().map(String::as_str), Some("show-00"));
    // Control ids follow the position in the full listing.
    assert!(page.document().control("episode-audio-24").is_some());
    // One listing request serves every page.
    assert_eq!(mock.hits(), 1);
}

#[tokio::test]
async fn load_pages_restores_a_deep_link() {
    let listing = episodes(25);
    let mock = MockBucket::start(StatusCode::OK, listing_xml(&as_refs(&listing))).await;
    let dir = TempDir::new().unwrap();
    let config = config_for(&mock, dir.path());

    let mut page = ArchivePage::from_config(PageVariant::Episodes, fetcher_for(&config), &config);
    assert_eq!(page.load_pages(2).await, LoadStatus::Ready);
    assert_eq!(page.document().fragment_count(EPISODES_CONTAINER, is_episode), 20);
    assert_eq!(
        page.load_more_control(),
        Some(&Fragment::LoadMore {
            enabled: true,
            next_page: 3
        })
    );

    // Asking for more pages than exist stops at the end.
    let mut page = ArchivePage::from_config(PageVariant::Episodes, fetcher_for(&config), &config);
    page.load_pages(9).await;
    assert_eq!(page.document().fragment_count(EPISODES_CONTAINER, is_episode), 25);
}

#[tokio::test]
async fn fresh_cache_skips_the_network() {
    let mock = MockBucket::start(
        StatusCode::OK,
        listing_xml(&[("archive/a.mp3", "2024-01-02T10:00:00.000Z", 100)]),
    )
    .await;
    let dir = TempDir::new().unwrap();
    let config = config_for(&mock, dir.path());

    let mut first = ArchivePage::from_config(PageVariant::Episodes, fetcher_for(&config), &config);
    first.load().await;
    assert_eq!(mock.hits(), 1);
    assert!(ListingCache::from_config(&config).path().exists());

    // The bucket now fails, but the cached listing is still fresh.
    mock.set_response(StatusCode::SERVICE_UNAVAILABLE, "");
    let mut second = ArchivePage::from_config(PageVariant::Episodes, fetcher_for(&config), &config);
    assert_eq!(second.load().await, LoadStatus::Ready);
    assert_eq!(mock.hits(), 1);
    assert_eq!(episode_titles(&second), vec!["a"]);
}

#[tokio::test]
async fn archive_page_lists_everything_without_cache() {
    let listing = episodes(12);
    let mut refs = as_refs(&listing);
    refs.push(("archive/cover.jpg", "2024-02-01T09:30:00.000Z", 2_621_440));
    let mock = MockBucket::start(StatusCode::OK, listing_xml(&refs)).await;
    let dir = TempDir::new().unwrap();
    let config = config_for(&mock, dir.path());

    let mut page = ArchivePage::from_config(PageVariant::Archive, fetcher_for(&config), &config);
    assert_eq!(page.load().await, LoadStatus::Ready);

    let container = page.document().container(ARCHIVE_CONTAINER).unwrap();
    assert_eq!(container.fragments.len(), 13);
    match &container.fragments[0] {
        Fragment::Archive {
            title,
            recorded,
            size_mb,
            url,
            ..
        } => {
            assert_eq!(title, "cover.jpg");
            assert_eq!(recorded, "1 February 2024 at 09:30 am");
            assert_eq!(size_mb, "2.50");
            assert_eq!(url, &format!("{}/archive/cover.jpg", mock.base_url));
        }
        other => panic!("expected archive card, got {other:?}"),
    }
    assert!(page.load_more_control().is_none());
    assert!(!ListingCache::from_config(&config).path().exists());

    let mut again = ArchivePage::from_config(PageVariant::Archive, fetcher_for(&config), &config);
    again.load().await;
    assert_eq!(mock.hits(), 2);
}

#[tokio::test]
async fn scrolling_releases_far_paused_players_and_restores_them() {
    let listing = episodes(25);
    let mock = MockBucket::start(StatusCode::OK, listing_xml(&as_refs(&listing))).await;
    let dir = TempDir::new().unwrap();
    let config = config_for(&mock, dir.path());

    let mut page = ArchivePage::from_config(PageVariant::Episodes, fetcher_for(&config), &config);
    assert_eq!(page.load_pages(3).await, LoadStatus::Ready);
    assert_eq!(page.document().controls().count(), 25);

    assert_eq!(page.dispatch("episode-audio-1", MediaEvent::Play), Some(BufferState::Buffering));
    assert_eq!(
        page.dispatch("episode-audio-0", MediaEvent::Pause { remaining: None }),
        Some(BufferState::PausedNearEnd)
    );
    assert_eq!(page.dispatch("no-such-player", MediaEvent::Play), None);

    // Cards are 180px tall; with a 900px viewport at 4000 everything above
    // 2200 is more than two viewports away.
    let t0 = Instant::now();
    page.on_scroll(4000.0, t0);
    assert!(page.poll(t0 + Duration::from_secs(1)).is_none());
    let report = page.poll(t0 + Duration::from_secs(2)).unwrap();
    let far_above: Vec<String> = [0usize]
        .into_iter()
        .chain(2..=11)
        .map(|i| format!("episode-audio-{i}"))
        .collect();
    assert_eq!(report.released, far_above);
    assert!(report.restored.is_empty());
    assert!(page.document().control("episode-audio-1").unwrap().src.is_some());
    assert!(page.document().control("episode-audio-0").unwrap().src.is_none());
    // The debounce fires once per scroll.
    assert!(page.poll(t0 + Duration::from_secs(3)).is_none());

    let t1 = t0 + Duration::from_secs(5);
    page.on_scroll(0.0, t1);
    let report = page.poll(t1 + Duration::from_secs(2)).unwrap();
    assert_eq!(report.restored, far_above);
    let far_below: Vec<String> = (16..=24).map(|i| format!("episode-audio-{i}")).collect();
    assert_eq!(report.released, far_below);
    let first = page.document().control("episode-audio-0").unwrap();
    assert_eq!(first.load_count, 2);
    assert_eq!(first.src, first.configured_src);
}
