//! Integration tests for the prescription analysis server.
//!
//! A local axum stub stands in for the warehouse `jobs.query` endpoint
//! and the Gemini generate/embed endpoints, so handler logic (parameter
//! clamping, classification, projection, error mapping) is exercised
//! end-to-end through the real router without Google credentials.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::{
    Json, Router,
    body::Body,
    extract::{Path, State},
    http::{Request, StatusCode},
    routing::post,
};
use http_body_util::BodyExt;
use serde_json::{Value as JsonValue, json};
use tower::ServiceExt;

use medrx_server::AppState;
use medrx_server::config::Config;

// ---------------------------------------------------------------------------
// Stub upstreams
// ---------------------------------------------------------------------------

/// Record of every SQL statement the app sent to the warehouse stub.
type SqlLog = Arc<Mutex<Vec<String>>>;

fn cells(values: Vec<JsonValue>) -> JsonValue {
    json!({ "f": values.into_iter().map(|v| json!({ "v": v })).collect::<Vec<_>>() })
}

/// A full patient row: 8 typed columns plus a null description cell.
fn patient_row(pid: i64) -> JsonValue {
    cells(vec![
        json!(pid.to_string()),
        json!(format!("First{pid}")),
        json!(format!("Last{pid}")),
        json!("40"),
        json!("Female"),
        json!(format!("{pid} Lake Road")),
        json!("2021-03-09"),
        json!("arn 30 |--| bry 200c"),
        JsonValue::Null,
    ])
}

/// A vector-search hit: 8 base columns plus a distance cell.
fn vector_row(pid: i64, distance: &str) -> JsonValue {
    cells(vec![
        json!(pid.to_string()),
        json!(format!("First{pid}")),
        json!(format!("Last{pid}")),
        json!("40"),
        json!("Female"),
        json!(format!("{pid} Lake Road")),
        json!("2021-03-09"),
        json!("arn 30 |--| bry 200c"),
        json!(distance),
    ])
}

/// Stub for the warehouse `jobs.query` endpoint. Routes canned rows by
/// inspecting the SQL text and records every statement for assertions.
async fn stub_query(
    State(log): State<SqlLog>,
    Json(body): Json<JsonValue>,
) -> Json<JsonValue> {
    let sql = body["query"].as_str().unwrap_or_default().to_string();
    log.lock().unwrap().push(sql.clone());

    let rows: Vec<JsonValue> = if sql.contains("COUNT(*)") {
        vec![cells(vec![json!("2")])]
    } else if sql.contains("VECTOR_SEARCH") {
        // Deliberately out of order; the app must sort by distance.
        vec![vector_row(12, "0.25"), vector_row(7, "0.1")]
    } else if sql.contains("WHERE PID = ") {
        if sql.contains("WHERE PID = 7 ") {
            vec![patient_row(7)]
        } else {
            Vec::new()
        }
    } else {
        vec![patient_row(7), patient_row(12)]
    };

    Json(json!({ "jobComplete": true, "rows": rows }))
}

/// Stub for the Gemini generate/embed endpoints.
async fn stub_gemini(Path(model): Path<String>, Json(body): Json<JsonValue>) -> Json<JsonValue> {
    if model.ends_with(":embedContent") {
        return Json(json!({ "embedding": { "values": [0.1, 0.2, 0.3] } }));
    }

    let prompt = body["contents"][0]["parts"][0]["text"]
        .as_str()
        .unwrap_or_default();
    let reply = if prompt.contains("HOMEOPATHIC MEDICAL ANALYSIS") {
        "The prescriptions point to recurring musculoskeletal trauma."
    } else {
        "```json\n{\"patient_id\": \"555\", \"prescription\": \"Arnica 30, Bryonia 200c\"}\n```"
    };
    Json(json!({ "candidates": [{ "content": { "parts": [{ "text": reply }] } }] }))
}

/// Start the stub server on an ephemeral port.
async fn start_stub() -> (SocketAddr, SqlLog) {
    let log: SqlLog = Arc::new(Mutex::new(Vec::new()));
    let router = Router::new()
        .route("/bq/projects/{project}/queries", post(stub_query))
        .route("/ai/models/{model}", post(stub_gemini))
        .with_state(log.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    (addr, log)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn test_config(stub: SocketAddr) -> Config {
    Config {
        bind_address: "0.0.0.0:0".to_string(),
        cors_origins: vec!["*".to_string()],
        google_api_key: "test-key".to_string(),
        generation_model: "gemini-2.0-flash-exp".to_string(),
        embedding_model: "text-multilingual-embedding-002".to_string(),
        gemini_api_base: format!("http://{stub}/ai"),
        project_id: "demo".to_string(),
        location: "US".to_string(),
        dataset_name: "patients_vector_search_demo".to_string(),
        table_name: "patients_with_embeddings".to_string(),
        bigquery_api_base: format!("http://{stub}/bq"),
        bigquery_access_token: None,
    }
}

fn build_test_app(config: &Config) -> Router {
    medrx_server::build_app(AppState::from_config(config), config)
}

async fn test_app() -> (Router, SqlLog) {
    let (addr, log) = start_stub().await;
    (build_test_app(&test_config(addr)), log)
}

/// Send a request to the app and return (status, body as JSON).
async fn request(app: &Router, req: Request<Body>) -> (StatusCode, JsonValue) {
    let response = app.clone().oneshot(req).await.expect("Request failed");
    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("Failed to read body")
        .to_bytes();

    let body = if bytes.is_empty() {
        JsonValue::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(JsonValue::Null)
    };

    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn post_json(uri: &str, body: JsonValue) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("Content-Type", "application/json")
        .body(Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap()
}

/// Build a multipart upload for /analyze-image with the given part
/// content type.
fn image_upload(part_content_type: &str) -> Request<Body> {
    let boundary = "test-boundary";
    let body = format!(
        "--{boundary}\r\n\
         Content-Disposition: form-data; name=\"file\"; filename=\"rx.png\"\r\n\
         Content-Type: {part_content_type}\r\n\
         \r\n\
         fake image bytes\r\n\
         --{boundary}--\r\n"
    );
    Request::builder()
        .method("POST")
        .uri("/analyze-image")
        .header(
            "Content-Type",
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(body))
        .unwrap()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_root_lists_endpoints() {
    let (app, _log) = test_app().await;

    let (status, body) = request(&app, get("/")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Medical Image Analysis API");
    assert!(body["endpoints"].get("/analyze-image").is_some());
    assert!(body["endpoints"].get("/vector-search").is_some());
}

#[tokio::test]
async fn test_health() {
    let (app, _log) = test_app().await;

    let (status, body) = request(&app, get("/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn test_patient_listing_clamps_limit() {
    let (app, log) = test_app().await;

    let (status, body) = request(&app, get("/patients?limit=500")).await;

    assert_eq!(status, StatusCode::OK);
    let rows = body.as_array().unwrap();
    assert_eq!(rows.len(), 2);
    // Listing shape is camelCase
    assert_eq!(rows[0]["registrationNo"], "7");
    assert_eq!(rows[0]["firstVisitDate"], "2021-03-09");
    assert!(rows[0].get("first_name").is_none());

    // The backing store must only ever be asked for 100 rows
    let sql = log.lock().unwrap().last().unwrap().clone();
    assert!(sql.contains("LIMIT 100"), "limit not clamped: {sql}");
    assert!(sql.contains("OFFSET 0"));
}

#[tokio::test]
async fn test_patient_count() {
    let (app, _log) = test_app().await;

    let (status, body) = request(&app, get("/patients/count")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_count"], 2);
}

#[tokio::test]
async fn test_patient_by_pid() {
    let (app, _log) = test_app().await;

    let (status, body) = request(&app, get("/patients/7")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["registrationNo"], "7");
    assert_eq!(body["firstName"], "First7");
    assert_eq!(body["age"], 40);
}

#[tokio::test]
async fn test_unknown_patient_returns_404() {
    let (app, _log) = test_app().await;

    let (status, body) = request(&app, get("/patients/999999")).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    let detail = body["detail"].as_str().unwrap();
    assert!(detail.contains("999999"), "detail should name the pid: {detail}");
}

#[tokio::test]
async fn test_blank_search_query_is_rejected() {
    let (app, log) = test_app().await;

    let (status, body) = request(&app, get("/search?q=%20%20")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].as_str().unwrap().contains("'q'"));

    let (status, _) = request(&app, get("/search")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Validation happens before any warehouse call
    assert!(log.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_substring_search() {
    let (app, _log) = test_app().await;

    let (status, body) = request(&app, get("/search?q=lake%20road")).await;

    assert_eq!(status, StatusCode::OK);
    let rows = body.as_array().unwrap();
    assert_eq!(rows.len(), 2);

    // Id-as-text matching
    let (status, body) = request(&app, get("/search?q=12")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["registrationNo"], "12");
}

#[tokio::test]
async fn test_vector_search_pid_hit() {
    let (app, _log) = test_app().await;

    let (status, body) = request(
        &app,
        post_json("/vector-search", json!({ "query": "show me patient 7" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["search_type"], "pid_lookup");
    assert_eq!(body["total_results"], 1);
    assert_eq!(body["results"][0]["pid"], 7);
    assert_eq!(body["results"][0]["similarity"], 100.0);
    assert_eq!(body["status"], "success");
}

#[tokio::test]
async fn test_vector_search_pid_miss_is_not_an_error() {
    let (app, _log) = test_app().await;

    let (status, body) = request(
        &app,
        post_json("/vector-search", json!({ "query": "pid 999999" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["search_type"], "pid_lookup");
    assert_eq!(body["total_results"], 0);
    assert_eq!(body["results"].as_array().unwrap().len(), 0);
    assert!(
        body["message"].as_str().unwrap().contains("999999"),
        "message should name the pid"
    );
}

#[tokio::test]
async fn test_vector_search_semantic() {
    let (app, log) = test_app().await;

    let (status, body) = request(
        &app,
        post_json(
            "/vector-search",
            json!({ "query": "patients with joint pain", "top_k": 2 }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["search_type"], "vector_search");
    assert_eq!(body["total_results"], 2);

    // Ordered by ascending distance, similarity derived from distance
    assert_eq!(body["results"][0]["pid"], 7);
    assert_eq!(body["results"][0]["similarity"], 90.0);
    assert_eq!(body["results"][0]["distance"], 0.1);
    assert_eq!(body["results"][1]["pid"], 12);
    assert_eq!(body["results"][1]["similarity"], 75.0);

    // The caller's top_k reaches the warehouse untouched
    let sql = log.lock().unwrap().last().unwrap().clone();
    assert!(sql.contains("top_k => 2"), "top_k not forwarded: {sql}");
    assert!(sql.contains("'COSINE'"));
}

#[tokio::test]
async fn test_analyze_image_rejects_non_image() {
    let (app, _log) = test_app().await;

    let (status, body) = request(&app, image_upload("text/plain")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "File must be an image");
}

#[tokio::test]
async fn test_analyze_image_extracts_fields() {
    let (app, _log) = test_app().await;

    let (status, body) = request(&app, image_upload("image/png")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["patient_id"], "555");
    assert_eq!(body["prescription"], "Arnica 30, Bryonia 200c");
    assert!(body["analysis_date"].is_string());
}

#[tokio::test]
async fn test_analyze_image_degrades_on_upstream_failure() {
    let (addr, _log) = start_stub().await;
    let mut config = test_config(addr);
    // Point the vision client at a dead port
    config.gemini_api_base = "http://127.0.0.1:1/ai".to_string();
    let app = build_test_app(&config);

    let (status, body) = request(&app, image_upload("image/png")).await;

    // A failed vision call is still a well-formed 200
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["patient_id"], "Analysis failed");
    assert!(
        body["prescription"]
            .as_str()
            .unwrap()
            .starts_with("Error occurred during analysis"),
    );
}

#[tokio::test]
async fn test_analyze_patient() {
    let (app, _log) = test_app().await;

    let (status, body) = request(
        &app,
        post_json(
            "/analyze-patient",
            json!({ "pid": 7, "query": "why the bruising?" }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    assert_eq!(body["query"], "why the bruising?");
    assert!(body["ai_analysis"].as_str().unwrap().contains("trauma"));

    // Detail shape is snake_case
    assert_eq!(body["patient_data"]["pid"], 7);
    assert_eq!(body["patient_data"]["first_name"], "First7");
    assert_eq!(body["patient_data"]["patient_description"], "");
}

#[tokio::test]
async fn test_analyze_patient_unknown_pid() {
    let (app, _log) = test_app().await;

    let (status, body) = request(
        &app,
        post_json("/analyze-patient", json!({ "pid": 31337, "query": "q" })),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["detail"].as_str().unwrap().contains("31337"));
}
