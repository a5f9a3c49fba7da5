//! JSON read API served next to the scrape worker.
//!
//! `GET /items` lists the current snapshot in display order and
//! `GET /dashboard` reports host resource usage. Each request reads through
//! its own read-only connection, so requests never wait on the worker.

use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use tracing::error;

use crate::db::{Notice, Store};
use crate::query;
use crate::usage::{self, ResourceUsage};

#[derive(Clone)]
struct AppState {
    db_path: Arc<PathBuf>,
}

pub fn router(db_path: PathBuf) -> Router {
    Router::new()
        .route("/items", get(items))
        .route("/dashboard", get(dashboard))
        .with_state(AppState {
            db_path: Arc::new(db_path),
        })
}

async fn items(State(state): State<AppState>) -> Result<Json<Vec<Notice>>, ApiError> {
    let notices = tokio::task::spawn_blocking(move || -> anyhow::Result<Vec<Notice>> {
        let store = Store::open_read_only(&state.db_path)?;
        Ok(query::list_notices(&store)?)
    })
    .await??;
    Ok(Json(notices))
}

async fn dashboard() -> Json<ResourceUsage> {
    Json(usage::sample().await)
}

/// Any failure behind a handler; logged and reported as a bare 500.
struct ApiError(anyhow::Error);

impl<E: Into<anyhow::Error>> From<E> for ApiError {
    fn from(e: E) -> Self {
        Self(e.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        error!("Request failed: {:#}", self.0);
        (StatusCode::INTERNAL_SERVER_ERROR, "internal error").into_response()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tempfile::TempDir;
    use tower::ServiceExt;

    use super::*;
    use crate::db::tests::row;
    use crate::extract::{Alignment, PINNED_SEQUENCE};
    use crate::scrape_loop::tests::FakeBoard;
    use crate::scrape_loop::{Schedule, Scraper};
    use crate::worker::ScrapeWorker;

    async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = app
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
        (status, json)
    }

    fn titles(json: &serde_json::Value) -> Vec<String> {
        json.as_array()
            .unwrap()
            .iter()
            .map(|n| n["title"].as_str().unwrap().to_string())
            .collect()
    }

    #[tokio::test]
    async fn items_are_sorted_for_display() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("notices.sqlite");
        let mut writer = Store::open(&path).unwrap();
        writer
            .replace_all(&[row(41, "forty-one"), row(PINNED_SEQUENCE, "pinned"), row(42, "forty-two")])
            .unwrap();

        let (status, json) = get_json(router(path), "/items").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(titles(&json), vec!["pinned", "forty-two", "forty-one"]);
        assert_eq!(json[0]["sequence_number"], PINNED_SEQUENCE);
        assert_eq!(json[0]["published_date"], "2024-03-05");
        assert!(json[0]["id"].is_i64());
    }

    #[tokio::test]
    async fn missing_database_is_a_server_error() {
        let dir = TempDir::new().unwrap();
        let (status, _) = get_json(router(dir.path().join("absent.sqlite")), "/items").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn reads_old_snapshot_while_a_cycle_is_in_flight() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("notices.sqlite");
        let board = FakeBoard::with_cycle("c1", 1..=3);
        let mut scraper = Scraper::new(board.clone(), Store::open(&path).unwrap(), 1..=3, Alignment::Truncate);
        scraper.run_cycle().await.unwrap();

        board.load_cycle("c2", 1..=3);
        board.stall(2);
        let worker = ScrapeWorker::spawn(scraper, Schedule::minutes(10, 20));
        tokio::time::sleep(Duration::from_millis(50)).await;

        let (status, json) = get_json(router(path), "/items").await;
        assert_eq!(status, StatusCode::OK);
        let titles = titles(&json);
        assert_eq!(titles.len(), 9);
        assert!(titles.iter().all(|t| t.starts_with("c1-")));

        worker.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn dashboard_reports_usage() {
        let dir = TempDir::new().unwrap();
        let (status, json) = get_json(router(dir.path().join("n.sqlite")), "/dashboard").await;
        assert_eq!(status, StatusCode::OK);
        for key in ["cpu_usage", "hdd_usage", "mem_usage"] {
            assert!(json[key].is_number(), "{key} missing");
        }
    }
}
