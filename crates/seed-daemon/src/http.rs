use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, Json},
    routing::get,
    Router,
};
use chrono::{DateTime, Utc};
use seed_page::document::{Document, EPISODES_CONTAINER};
use seed_page::render;
use seed_page::{load_listing, ArchivePage, ModalBinding, ModalLoader, ModalOutcome, PageVariant};
use seed_proto::cache::ListingCache;
use seed_proto::config::Config;
use seed_proto::fetch::ListingFetcher;
use seed_proto::listing::ListingFilter;
use seed_proto::pager;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info};

/// Shared across requests: config, one HTTP client and the modal player.
#[derive(Clone)]
pub struct HttpState {
    config: Arc<Config>,
    fetcher: ListingFetcher,
    modal: Arc<ModalLoader>,
    modal_doc: Arc<Mutex<Document>>,
}

impl HttpState {
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let fetcher = ListingFetcher::new(config.bucket.clone(), &config.listing)?;
        let modal = ModalLoader::new(
            ListingFilter::episodes_for(&config.bucket),
            config.playback.far_from_end_secs,
        );
        Ok(Self {
            config: Arc::new(config),
            fetcher,
            modal: Arc::new(modal),
            modal_doc: Arc::new(Mutex::new(Document::new("Latest", &[EPISODES_CONTAINER]))),
        })
    }

    fn page(&self, variant: PageVariant) -> ArchivePage {
        ArchivePage::from_config(variant, self.fetcher.clone(), &self.config)
    }

    fn episode_filter(&self) -> ListingFilter {
        ListingFilter::episodes_for(&self.config.bucket)
    }
}

#[derive(Debug, Deserialize)]
struct PageQuery {
    page: Option<usize>,
}

impl PageQuery {
    fn page(&self) -> usize {
        self.page.unwrap_or(1).max(1)
    }
}

#[derive(Serialize)]
struct EpisodeInfo {
    key: String,
    title: String,
    date: String,
    url: String,
    size: Option<u64>,
}

#[derive(Serialize)]
struct EpisodesPage {
    page: usize,
    page_size: usize,
    total: usize,
    has_more: bool,
    episodes: Vec<EpisodeInfo>,
}

#[derive(Serialize)]
struct LatestEpisode {
    key: String,
    title: String,
    label: String,
    url: String,
    last_modified: DateTime<Utc>,
    /// False when the player already had this episode bound.
    reloaded: bool,
}

#[derive(Serialize)]
struct ApiError {
    error: String,
    kind: &'static str,
}

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ApiError>)>;

fn api_error(status: StatusCode, kind: &'static str, error: impl Into<String>) -> (StatusCode, Json<ApiError>) {
    (
        status,
        Json(ApiError {
            error: error.into(),
            kind,
        }),
    )
}

pub fn router(state: HttpState) -> Router {
    Router::new()
        .route("/", get(episodes_page))
        .route("/archive", get(archive_page))
        .route("/api/episodes", get(get_episodes))
        .route("/api/latest", get(get_latest))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::new().allow_origin(Any)),
        )
        .with_state(state)
}

pub fn start_server(bind_address: String, port: u16, state: HttpState) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let app = router(state);

        let addr = format!("{}:{}", bind_address, port);
        let listener = match TcpListener::bind(&addr).await {
            Ok(l) => l,
            Err(e) => {
                error!("Failed to bind HTTP server to {}: {}", addr, e);
                return;
            }
        };

        info!("Episode pages listening on http://{}", addr);

        if let Err(e) = axum::serve(listener, app).await {
            error!("HTTP server error: {}", e);
        }
    })
}

/// Episodes page; `?page=N` shows pages 1..=N, which is where the
/// load-more link points.
async fn episodes_page(State(state): State<HttpState>, Query(query): Query<PageQuery>) -> Html<String> {
    let mut page = state.page(PageVariant::Episodes);
    let status = page.load_pages(query.page()).await;
    debug!("GET / page={} -> {:?}", query.page(), status);
    Html(page.to_html())
}

async fn archive_page(State(state): State<HttpState>) -> Html<String> {
    let mut page = state.page(PageVariant::Archive);
    let status = page.load().await;
    debug!("GET /archive -> {:?}", status);
    Html(page.to_html())
}

async fn get_episodes(State(state): State<HttpState>, Query(query): Query<PageQuery>) -> ApiResult<EpisodesPage> {
    let filter = state.episode_filter();
    let cache = ListingCache::from_config(&state.config);
    let entries = load_listing(&state.fetcher, Some(&cache), &filter)
        .await
        .map_err(|e| {
            error!("HTTP API: episode listing failed: {}", e);
            api_error(StatusCode::BAD_GATEWAY, e.kind(), e.to_string())
        })?;

    let page = query.page();
    let page_size = state.config.listing.page_size.max(1);
    let bucket = state.fetcher.bucket();
    let episodes = pager::slice(&entries, page, page_size)
        .iter()
        .map(|entry| EpisodeInfo {
            key: entry.key.clone(),
            title: filter.title_for(&entry.key).to_string(),
            date: render::format_date(&entry.last_modified),
            url: bucket.object_url(&entry.key),
            size: entry.size,
        })
        .collect();

    Ok(Json(EpisodesPage {
        page,
        page_size,
        total: entries.len(),
        has_more: pager::has_more(&entries, page, page_size),
        episodes,
    }))
}

async fn get_latest(State(state): State<HttpState>) -> ApiResult<LatestEpisode> {
    let (binding, reloaded) = match state.modal.open_shared(&state.fetcher, &state.modal_doc).await {
        ModalOutcome::Bound(binding) => (binding, true),
        ModalOutcome::Unchanged(binding) => (binding, false),
        ModalOutcome::Empty => {
            return Err(api_error(StatusCode::NOT_FOUND, "empty", "no episodes available"));
        }
        ModalOutcome::Busy => {
            return Err(api_error(StatusCode::CONFLICT, "busy", "latest episode is already loading"));
        }
        ModalOutcome::Failed(e) => {
            return Err(api_error(StatusCode::BAD_GATEWAY, e.kind(), e.to_string()));
        }
    };

    let ModalBinding { entry, label, url } = binding;
    Ok(Json(LatestEpisode {
        title: state.episode_filter().title_for(&entry.key).to_string(),
        label,
        url,
        key: entry.key,
        last_modified: entry.last_modified,
        reloaded,
    }))
}
