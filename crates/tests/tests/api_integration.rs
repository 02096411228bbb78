use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;
use voices_agents::{ModelClient, OpenAiConfig};
use voices_api::{build_app, build_app_with, AppConfig};
use voices_core::NewPolicy;
use voices_storage::{seed_defaults, PolicyRepository, SqliteStore, Store};

const WORKING_HOURS: &str = "Core hours are 10:00 to 16:00, Monday through Friday.";

fn offline_config() -> AppConfig {
    AppConfig {
        seed_data: false,
        ..AppConfig::default()
    }
}

async fn app_with_working_hours() -> Router {
    let store = Store::memory();
    store
        .insert_policy(NewPolicy {
            title: "working hours".to_string(),
            content: WORKING_HOURS.to_string(),
        })
        .await
        .unwrap();
    seed_defaults(&store).await.unwrap();

    build_app_with(offline_config(), store, ModelClient::offline())
        .await
        .expect("app should build")
}

fn post_json(uri: &str, payload: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(payload.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn root_returns_greeting() {
    let app = build_app(AppConfig::default()).await.expect("app should build");

    let response = app.oneshot(get("/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await, json!({ "message": "Hello, World!" }));
}

#[tokio::test]
async fn health_reports_backends() {
    let app = app_with_working_hours().await;

    let response = app.oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let parsed = json_body(response).await;
    assert_eq!(parsed["status"], "ok");
    assert_eq!(parsed["store_backend"], "memory");
    assert_eq!(parsed["completion_backend"], "offline");
    assert_eq!(parsed["pipeline_mode"], "policy");
}

#[tokio::test]
async fn chat_answers_from_matching_policy() {
    let app = app_with_working_hours().await;

    let response = app
        .oneshot(post_json(
            "/api/chat",
            json!({ "message": "What are the working hours?" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let parsed = json_body(response).await;
    assert_eq!(parsed["found_policy"], true);
    assert!(parsed["response"].as_str().unwrap().contains(WORKING_HOURS));
}

#[tokio::test]
async fn chat_without_matching_policy_probes() {
    let app = app_with_working_hours().await;

    let response = app
        .oneshot(post_json(
            "/api/chat",
            json!({ "message": "Tell me about the dress code" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let parsed = json_body(response).await;
    assert_eq!(parsed["found_policy"], false);
    assert!(!parsed["response"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn empty_message_gets_language_notice() {
    let app = app_with_working_hours().await;

    let response = app
        .oneshot(post_json("/api/chat", json!({ "message": "" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let parsed = json_body(response).await;
    assert_eq!(parsed["found_policy"], false);
    assert_eq!(
        parsed["response"],
        "language not detected, please use English or Japanese."
    );
}

#[tokio::test]
async fn chat_without_message_is_bad_request() {
    let app = app_with_working_hours().await;

    let response = app
        .oneshot(post_json("/api/chat", json!({ "text": "hello" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(json_body(response).await.get("error").is_some());
}

#[tokio::test]
async fn saved_comment_is_listed_then_soft_deleted() {
    let app = app_with_working_hours().await;

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/save_comment",
            json!({
                "user_id": 12,
                "company_id": 1,
                "emotion_id": 2,
                "content": "I enjoyed the team offsite",
                "final_suggestion": "More of these please",
                "post_date": "2024-04-07T15:01:15Z"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let saved = json_body(response).await;
    assert_eq!(saved["message"], "Comment saved successfully");
    let post_id = saved["post_id"].as_i64().unwrap();

    let listed = json_body(app.clone().oneshot(get("/api/posts")).await.unwrap()).await;
    let posts = listed["posts"].as_array().unwrap();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0]["content"], "I enjoyed the team offsite");

    let delete = Request::builder()
        .method("DELETE")
        .uri(format!("/api/posts/{post_id}"))
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(delete).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let listed = json_body(app.clone().oneshot(get("/api/posts")).await.unwrap()).await;
    assert!(listed["posts"].as_array().unwrap().is_empty());

    let again = Request::builder()
        .method("DELETE")
        .uri(format!("/api/posts/{post_id}"))
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(again).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unknown_emotion_is_rejected() {
    let app = app_with_working_hours().await;

    let response = app
        .oneshot(post_json(
            "/api/save_comment",
            json!({ "user_id": 1, "emotion_id": 42, "content": "hmm" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn emotions_are_listed_in_id_order() {
    let app = app_with_working_hours().await;

    let parsed = json_body(app.oneshot(get("/api/emotions")).await.unwrap()).await;
    let emotions = parsed["emotions"].as_array().unwrap();
    assert_eq!(emotions.len(), 8);
    assert_eq!(emotions[0]["id"], 1);
}

#[tokio::test]
async fn export_returns_xlsx_attachment() {
    let app = app_with_working_hours().await;

    let response = app
        .oneshot(post_json(
            "/api/export_excel",
            json!({
                "tableData": [{
                    "created_at": "2024-04-07T15:01:15.549112Z",
                    "title": "Overtime",
                    "body": "Too many late nights",
                    "likes": 5,
                    "manager_comment": "Reviewing schedules"
                }],
                "voicesComment": "【概要】残業が多い。"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["content-type"],
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
    );
    assert_eq!(
        response.headers()["content-disposition"],
        "attachment;filename=report.xlsx"
    );

    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert!(body.starts_with(b"PK"));
}

#[tokio::test]
async fn closed_store_fails_chat_with_server_error() {
    let sqlite = SqliteStore::connect("sqlite::memory:").await.unwrap();
    sqlite.close().await;

    let app = build_app_with(offline_config(), Store::Sqlite(sqlite), ModelClient::offline())
        .await
        .expect("app should build");

    let response = app
        .oneshot(post_json(
            "/api/chat",
            json!({ "message": "What are the working hours?" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(json_body(response).await.get("error").is_some());
}

#[tokio::test]
async fn unreachable_model_fails_chat_with_bad_gateway() {
    let store = Store::memory();
    seed_defaults(&store).await.unwrap();
    let model = ModelClient::openai(OpenAiConfig {
        base_url: "http://127.0.0.1:1/v1".to_string(),
        timeout: Duration::from_secs(2),
        connect_timeout: Duration::from_secs(1),
        ..OpenAiConfig::new("sk-test")
    })
    .unwrap();

    let app = build_app_with(offline_config(), store, model)
        .await
        .expect("app should build");

    let response = app
        .oneshot(post_json("/api/chat", json!({ "message": "I am tired today" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

    let parsed = json_body(response).await;
    assert!(parsed["error"]
        .as_str()
        .unwrap()
        .starts_with("model call failed"));
}
