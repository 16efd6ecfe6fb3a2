#![allow(dead_code)]

use axum::{extract::State, http::header, http::StatusCode, routing::get, Router};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;

/// A local stand-in for the public bucket endpoint.
#[derive(Clone)]
pub struct MockBucket {
    pub base_url: String,
    state: MockState,
}

#[derive(Clone)]
struct MockState {
    response: Arc<Mutex<(StatusCode, String)>>,
    delay: Arc<Mutex<Duration>>,
    hits: Arc<AtomicUsize>,
}

impl MockBucket {
    pub async fn start(status: StatusCode, body: impl Into<String>) -> Self {
        let state = MockState {
            response: Arc::new(Mutex::new((status, body.into()))),
            delay: Arc::new(Mutex::new(Duration::ZERO)),
            hits: Arc::new(AtomicUsize::new(0)),
        };

        let app = Router::new()
            .route("/", get(serve_listing))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock bucket");
        let addr = listener.local_addr().expect("mock bucket addr");
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            base_url: format!("http://{addr}"),
            state,
        }
    }

    pub fn set_response(&self, status: StatusCode, body: impl Into<String>) {
        *self.state.response.lock().unwrap() = (status, body.into());
    }

    /// Hold every response back by `delay` before answering.
    pub fn set_delay(&self, delay: Duration) {
        *self.state.delay.lock().unwrap() = delay;
    }

    /// Requests received so far, counted on arrival.
    pub fn hits(&self) -> usize {
        self.state.hits.load(Ordering::SeqCst)
    }
}

async fn serve_listing(
    State(state): State<MockState>,
) -> (StatusCode, [(header::HeaderName, &'static str); 1], String) {
    state.hits.fetch_add(1, Ordering::SeqCst);
    let delay = *state.delay.lock().unwrap();
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
    let (status, body) = state.response.lock().unwrap().clone();
    (status, [(header::CONTENT_TYPE, "application/xml")], body)
}

pub fn listing_xml(entries: &[(&str, &str, u64)]) -> String {
    let mut xml = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<ListBucketResult>\n  <Name>radio-files</Name>\n",
    );
    for (key, modified, size) in entries {
        xml.push_str(&format!(
            "  <Contents><Key>{key}</Key><LastModified>{modified}</LastModified><Size>{size}</Size></Contents>\n"
        ));
    }
    xml.push_str("</ListBucketResult>\n");
    xml
}
