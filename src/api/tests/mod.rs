use super::*;
use crate::downloader::test_helpers::{self, FakeFetcher, urls, wait_for_status};
use crate::types::{Status, Task, TaskStatus};
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::Response;
use std::time::Duration;
use tower::ServiceExt;


/// Helper to create a test BatchDownloader wrapped in Arc
async fn create_test_downloader(
    fetcher: FakeFetcher,
) -> (Arc<BatchDownloader>, tempfile::TempDir) {
    let (downloader, temp_dir) = test_helpers::create_test_downloader(Arc::new(fetcher)).await;
    (Arc::new(downloader), temp_dir)
}

fn router_for(downloader: &Arc<BatchDownloader>) -> Router {
    create_router(downloader.clone(), downloader.get_config())
}

async fn json_body<T: serde::de::DeserializeOwned>(response: Response) -> T {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

fn post_json(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_api_server_serves_until_shutdown() {
    let (downloader, _temp_dir) = create_test_downloader(FakeFetcher::new()).await;

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();

    let server = tokio::spawn(serve(listener, downloader, async move {
        let _ = stop_rx.await;
    }));

    let response = reqwest::get(format!("http://{address}/health")).await.unwrap();
    assert_eq!(response.status(), 200);

    stop_tx.send(()).unwrap();
    tokio::time::timeout(Duration::from_secs(5), server)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn test_start_api_server_reports_bind_failure() {
    let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let temp_dir = tempfile::tempdir().unwrap();
    let mut config = test_helpers::test_config(temp_dir.path());
    config.server.api.bind_address = taken.local_addr().unwrap();
    let downloader = BatchDownloader::with_fetcher(config, Arc::new(FakeFetcher::new()))
        .await
        .unwrap();

    let err = start_api_server(Arc::new(downloader), async {})
        .await
        .unwrap_err();
    assert!(matches!(err, crate::Error::ApiServerError(_)));
}

#[tokio::test]
async fn test_cors_enabled() {
    let (downloader, _temp_dir) = create_test_downloader(FakeFetcher::new()).await;

    let mut config = (*downloader.get_config()).clone();
    config.server.api.cors_enabled = true;
    config.server.api.cors_origins = vec!["*".to_string()];
    let app = create_router(downloader, Arc::new(config));

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response
            .headers()
            .contains_key("access-control-allow-origin"),
        "CORS headers should be present when enabled"
    );
}

#[tokio::test]
async fn test_cors_disabled_by_default() {
    let (downloader, _temp_dir) = create_test_downloader(FakeFetcher::new()).await;
    let app = router_for(&downloader);

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert!(
        !response
            .headers()
            .contains_key("access-control-allow-origin")
    );
}

#[test]
fn test_cors_specific_origins() {
    // Unparseable origins are skipped rather than rejected
    let _layer = build_cors_layer(&["http://a.example".to_string(), "bad\norigin".to_string()]);
}
