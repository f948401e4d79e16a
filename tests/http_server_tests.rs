use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::Response;
use axum::Router;
use datadock::config::AppConfig;
use datadock::http::app_server::{AppServer, AppState};
use serde_json::Value;
use tempfile::TempDir;
use tower::util::ServiceExt;

/// Create a test router backed by a temp storage root
fn setup_test() -> (Router, TempDir) {
    let temp_dir = tempfile::tempdir().unwrap();
    let mut config = AppConfig::default();
    config.storage.root = temp_dir.path().to_string_lossy().into_owned();
    let app = AppServer::new(AppState::from_config(&config));
    (app.router, temp_dir)
}

fn setup_worker_test() -> (Router, TempDir) {
    let temp_dir = tempfile::tempdir().unwrap();
    let mut config = AppConfig::default();
    config.storage.root = temp_dir.path().to_string_lossy().into_owned();
    let app = AppServer::worker(AppState::from_config(&config));
    (app.router, temp_dir)
}

async fn send(router: &Router, request: Request<Body>) -> Response {
    router.clone().oneshot(request).await.unwrap()
}

async fn body_json(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

async fn create_dataset(router: &Router, csv: &str, name: Option<&str>) -> String {
    let uri = match name {
        Some(name) => format!("/datasets?name={}", name),
        None => "/datasets".to_string(),
    };
    let response = send(
        router,
        Request::builder()
            .method("POST")
            .uri(uri)
            .body(Body::from(csv.to_string()))
            .unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    json["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_health_endpoint() {
    let (router, _temp) = setup_test();
    let response = send(
        &router,
        Request::builder().uri("/health").body(Body::empty()).unwrap(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn test_create_and_read_dataset() {
    let (router, _temp) = setup_test();
    let id = create_dataset(&router, "a,b\n1,x\n2,y\n", Some("trades")).await;

    let response = send(
        &router,
        Request::builder()
            .uri(format!("/datasets/{}", id))
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["id"], id.as_str());
    assert_eq!(json["name"], "trades");
    assert_eq!(json["row_count"], 2);
}

#[tokio::test]
async fn test_create_name_via_header() {
    let (router, _temp) = setup_test();

    let response = send(
        &router,
        Request::builder()
            .method("POST")
            .uri("/datasets")
            .header("x-dataset-name", "from-header")
            .body(Body::from("v\n1\n"))
            .unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let id = body_json(response).await["id"].as_str().unwrap().to_string();

    let response = send(
        &router,
        Request::builder()
            .uri(format!("/datasets/{}", id))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(body_json(response).await["name"], "from-header");
}

#[tokio::test]
async fn test_create_empty_body_is_bad_request() {
    let (router, _temp) = setup_test();
    let response = send(
        &router,
        Request::builder()
            .method("POST")
            .uri("/datasets")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_create_ragged_csv_is_bad_request() {
    let (router, _temp) = setup_test();
    let response = send(
        &router,
        Request::builder()
            .method("POST")
            .uri("/datasets")
            .body(Body::from("a,b\n1,x\n2\n"))
            .unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_list_datasets() {
    let (router, _temp) = setup_test();
    let id1 = create_dataset(&router, "a\n1\n", Some("one")).await;
    let id2 = create_dataset(&router, "a\n1\n2\n", Some("two")).await;

    let response = send(
        &router,
        Request::builder().uri("/datasets").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let datasets = json["datasets"].as_array().unwrap();
    assert_eq!(datasets.len(), 2);

    let mut ids: Vec<&str> = datasets.iter().map(|d| d["id"].as_str().unwrap()).collect();
    ids.sort_unstable();
    let mut expected = vec![id1.as_str(), id2.as_str()];
    expected.sort_unstable();
    assert_eq!(ids, expected);
}

#[tokio::test]
async fn test_get_unknown_dataset_is_not_found() {
    let (router, _temp) = setup_test();

    let response = send(
        &router,
        Request::builder()
            .uri(format!("/datasets/{}", uuid::Uuid::new_v4()))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // A malformed id names no dataset either.
    let response = send(
        &router,
        Request::builder()
            .uri("/datasets/not-a-uuid")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_stats_endpoint_values() {
    let (router, _temp) = setup_test();
    let id = create_dataset(&router, "a,b\n1,x\n2,y\n", None).await;

    let response = send(
        &router,
        Request::builder()
            .uri(format!("/datasets/{}/stats", id))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    let columns = json["columns"].as_array().unwrap();
    assert_eq!(columns.len(), 1);
    assert_eq!(columns[0]["name"], "a");
    assert_eq!(columns[0]["count"], 2);
    assert_eq!(columns[0]["mean"], 1.5);
    assert_eq!(columns[0]["min"], 1.0);
    assert_eq!(columns[0]["max"], 2.0);
}

#[tokio::test]
async fn test_export_endpoint_serves_xlsx() {
    let (router, _temp) = setup_test();
    let id = create_dataset(&router, "a,b\n1,x\n", None).await;

    let response = send(
        &router,
        Request::builder()
            .uri(format!("/datasets/{}/export", id))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["content-type"],
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
    );
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&body[..2], b"PK");
}

#[tokio::test]
async fn test_plot_endpoint_serves_pdf() {
    let (router, _temp) = setup_test();
    let id = create_dataset(&router, "a,b\n1,x\n2,y\n", None).await;

    let response = send(
        &router,
        Request::builder()
            .uri(format!("/datasets/{}/plot", id))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-type"], "application/pdf");
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&body[..5], b"%PDF-");
}

#[tokio::test]
async fn test_delete_dataset() {
    let (router, _temp) = setup_test();
    let id = create_dataset(&router, "a\n1\n", None).await;

    let response = send(
        &router,
        Request::builder()
            .method("DELETE")
            .uri(format!("/datasets/{}", id))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = send(
        &router,
        Request::builder()
            .uri(format!("/datasets/{}", id))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_unknown_dataset_is_not_found() {
    let (router, _temp) = setup_test();
    let response = send(
        &router,
        Request::builder()
            .method("DELETE")
            .uri(format!("/datasets/{}", uuid::Uuid::new_v4()))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_worker_parse_endpoint() {
    let (router, _temp) = setup_worker_test();

    let response = send(
        &router,
        Request::builder()
            .method("POST")
            .uri("/parse?name=from-worker")
            .body(Body::from("a,b\n1,x\n2,y\n"))
            .unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert!(json["id"].as_str().is_some());
}

#[tokio::test]
async fn test_worker_rejects_bad_csv() {
    let (router, _temp) = setup_worker_test();

    let response = send(
        &router,
        Request::builder()
            .method("POST")
            .uri("/parse")
            .body(Body::from("a,b\n1\n"))
            .unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
