//! In-process stand-in for the shortener backend.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

/// Links issued by the mock backend: slug -> (target, visits).
#[derive(Default)]
pub struct MockBackend {
    links: Mutex<HashMap<String, (String, u64)>>,
    issued: AtomicUsize,
    stats_calls: AtomicUsize,
    pub fail_shorten: AtomicBool,
    pub fail_stats: AtomicBool,
    pub garbage_stats: AtomicBool,
}

impl MockBackend {
    /// Record `n` visits to `slug`.
    pub fn visit(&self, slug: &str, n: u64) {
        if let Some((_, visits)) = self.links.lock().unwrap().get_mut(slug) {
            *visits += n;
        }
    }

    pub fn target_of(&self, slug: &str) -> Option<String> {
        self.links.lock().unwrap().get(slug).map(|(t, _)| t.clone())
    }

    pub fn issued(&self) -> usize {
        self.issued.load(Ordering::SeqCst)
    }

    pub fn stats_calls(&self) -> usize {
        self.stats_calls.load(Ordering::SeqCst)
    }
}

#[derive(Deserialize)]
struct ShortenBody {
    url: String,
}

async fn shorten(State(backend): State<Arc<MockBackend>>, Json(body): Json<ShortenBody>) -> Response {
    if backend.fail_shorten.load(Ordering::SeqCst) {
        return (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response();
    }

    let n = backend.issued.fetch_add(1, Ordering::SeqCst);
    let slug = format!("s{n}");
    backend
        .links
        .lock()
        .unwrap()
        .insert(slug.clone(), (body.url, 0));

    Json(json!({ "shortUrl": format!("https://sho.rt/{slug}") })).into_response()
}

async fn stats(State(backend): State<Arc<MockBackend>>, Path(slug): Path<String>) -> Response {
    backend.stats_calls.fetch_add(1, Ordering::SeqCst);

    if backend.fail_stats.load(Ordering::SeqCst) {
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }
    if backend.garbage_stats.load(Ordering::SeqCst) {
        return (StatusCode::OK, "<html>oops</html>").into_response();
    }

    let visits = backend.links.lock().unwrap().get(&slug).map(|(_, v)| *v);
    match visits {
        Some(visits) => Json(json!({ "visits": visits })).into_response(),
        None => (StatusCode::NOT_FOUND, "Short link not found").into_response(),
    }
}

/// Serve a fresh mock backend on an ephemeral port. Returns it with its base URL.
pub async fn spawn_backend() -> (Arc<MockBackend>, String) {
    let backend = Arc::new(MockBackend::default());

    let app = Router::new()
        .route("/api/shorten", post(shorten))
        .route("/api/stats/:slug", get(stats))
        .with_state(backend.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (backend, format!("http://{addr}"))
}
