//! Request tests against a local stand-in for ARM

use super::*;
use crate::auth::StaticTokenCredential;
use axum::http::{HeaderMap, StatusCode as AxumStatus};
use axum::routing::{delete, get, put};
use axum::{Json, Router};
use serde_json::{json, Value};

async fn not_found() -> (AxumStatus, Json<Value>) {
    (
        AxumStatus::NOT_FOUND,
        Json(json!({"error": {"code": "ResourceNotFound", "message": "gone"}})),
    )
}

async fn spawn_server() -> String {
    let app = Router::new()
        .route(
            "/subscriptions/sub/resourceGroups/rg",
            get(|headers: HeaderMap| async move {
                let auth = headers
                    .get("authorization")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default()
                    .to_string();
                Json(json!({"name": "rg", "location": "westeurope", "auth": auth}))
            }),
        )
        .route("/missing", get(not_found).delete(not_found))
        .route(
            "/forbidden",
            get(|| async {
                (
                    AxumStatus::FORBIDDEN,
                    Json(json!({"error": {"code": "AuthorizationFailed", "message": "denied"}})),
                )
            }),
        )
        .route(
            "/conflict",
            put(|| async {
                (
                    AxumStatus::CONFLICT,
                    Json(json!({"error": {"code": "OperationNotAllowed", "message": "busy"}})),
                )
            }),
        )
        .route(
            "/lro",
            put(|| async {
                (
                    AxumStatus::CREATED,
                    [("azure-asyncoperation", "/operations/1")],
                    Json(json!({"name": "cluster"})),
                )
            }),
        )
        .route("/operations/1", get(|| async { Json(json!({"status": "InProgress"})) }))
        .route(
            "/operations/2",
            get(|| async {
                Json(json!({"status": "Failed", "error": {"code": "Quota", "message": "cores"}}))
            }),
        )
        .route("/location/running", get(|| async { AxumStatus::ACCEPTED }))
        .route("/location/done", get(|| async { AxumStatus::OK }))
        .route(
            "/location/throttled",
            get(|| async {
                (
                    AxumStatus::TOO_MANY_REQUESTS,
                    Json(json!({"error": {"code": "TooManyRequests", "message": "slow down"}})),
                )
            }),
        )
        .route(
            "/location/broken",
            get(|| async {
                (
                    AxumStatus::INTERNAL_SERVER_ERROR,
                    Json(json!({"error": {"code": "InternalServerError", "message": "oops"}})),
                )
            }),
        )
        .route(
            "/location/rejected",
            get(|| async {
                (
                    AxumStatus::CONFLICT,
                    Json(json!({"error": {"code": "Conflict", "message": "in use"}})),
                )
            }),
        )
        .route("/gone", delete(|| async { AxumStatus::NO_CONTENT }))
        .route(
            "/async-delete",
            delete(|| async { (AxumStatus::ACCEPTED, [("location", "/location/running")]) }),
        );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

async fn client() -> RestClient {
    let base = spawn_server().await;
    RestClient::new(Client::new(), &base, Arc::new(StaticTokenCredential))
}

#[tokio::test]
async fn test_get_sends_bearer_token() {
    let client = client().await;
    let body: Value = client
        .get("/subscriptions/sub/resourceGroups/rg?api-version=2021-04-01")
        .await
        .unwrap();
    assert_eq!(body["name"], "rg");
    assert_eq!(body["auth"], "Bearer test-token");
}

#[tokio::test]
async fn test_error_classification() {
    let client = client().await;
    let err = client.get::<Value>("/missing").await.unwrap_err();
    assert!(err.is_not_found());

    let err = client.get::<Value>("/forbidden").await.unwrap_err();
    assert!(matches!(err, AzureError::Authentication(_)));

    let err = client.put::<_, Value>("/conflict", &json!({})).await.unwrap_err();
    assert_eq!(err.code(), Some("OperationNotAllowed"));
}

#[tokio::test]
async fn test_begin_put_captures_poller() {
    let client = client().await;
    let accepted: Accepted<Value> = client.begin_put("/lro", &json!({}), &[]).await.unwrap();
    assert_eq!(accepted.body.unwrap()["name"], "cluster");
    let poller = accepted.poller.unwrap();
    assert_eq!(poller.kind, PollKind::AsyncOperation);
    assert_eq!(client.poll(&poller).await.unwrap(), OperationStatus::InProgress);

    let failed = PollerToken {
        kind: PollKind::AsyncOperation,
        url: "/operations/2".to_string(),
    };
    assert_eq!(
        client.poll(&failed).await.unwrap(),
        OperationStatus::Failed("Quota: cores".to_string())
    );
}

#[tokio::test]
async fn test_location_polling() {
    let client = client().await;
    let running = PollerToken {
        kind: PollKind::Location,
        url: "/location/running".to_string(),
    };
    let done = PollerToken {
        kind: PollKind::Location,
        url: "/location/done".to_string(),
    };
    let gone = PollerToken {
        kind: PollKind::Location,
        url: "/missing".to_string(),
    };
    assert_eq!(client.poll(&running).await.unwrap(), OperationStatus::InProgress);
    assert_eq!(client.poll(&done).await.unwrap(), OperationStatus::Succeeded);
    assert_eq!(client.poll(&gone).await.unwrap(), OperationStatus::Succeeded);
}

#[tokio::test]
async fn test_location_polling_transient_errors() {
    let client = client().await;
    let token = |url: &str| PollerToken {
        kind: PollKind::Location,
        url: url.to_string(),
    };

    let err = client.poll(&token("/location/throttled")).await.unwrap_err();
    assert!(err.is_transient());
    let err = client.poll(&token("/location/broken")).await.unwrap_err();
    assert_eq!(err.code(), Some("InternalServerError"));

    assert_eq!(
        client.poll(&token("/location/rejected")).await.unwrap(),
        OperationStatus::Failed("Conflict: in use".to_string())
    );
}

#[tokio::test]
async fn test_delete() {
    let client = client().await;
    assert!(client.delete("/gone").await.unwrap().is_none());
    let poller = client.delete("/async-delete").await.unwrap().unwrap();
    assert_eq!(poller.kind, PollKind::Location);
    assert!(client.delete("/missing").await.unwrap_err().is_not_found());
}

#[test]
fn test_with_api_version() {
    assert_eq!(with_api_version("/a", "2021-04-01"), "/a?api-version=2021-04-01");
    assert_eq!(with_api_version("/a?x=1", "v"), "/a?x=1&api-version=v");
}
