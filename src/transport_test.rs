use super::*;
use axum::Json;
use axum::Router;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use serde_json::json;

async fn spawn_server(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

async fn echo(headers: HeaderMap, Json(body): Json<Value>) -> Json<Value> {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);
    let content_type = headers
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);
    Json(json!({ "authorization": auth, "content_type": content_type, "received": body }))
}

fn transport() -> ReqwestTransport {
    ReqwestTransport::new(Duration::from_secs(5), Duration::from_secs(2)).unwrap()
}

#[test]
fn response_success_range() {
    assert!(HttpResponse::new(200, "").is_success());
    assert!(HttpResponse::new(204, "").is_success());
    assert!(!HttpResponse::new(301, "").is_success());
    assert!(!HttpResponse::new(401, "").is_success());
}

#[tokio::test]
async fn reqwest_sends_bearer_and_json_body() {
    let base = spawn_server(Router::new().route("/echo", post(echo))).await;

    let response = transport()
        .execute(HttpRequest {
            method: Method::POST,
            url: format!("{base}/echo"),
            bearer: Some("tok-123".into()),
            body: Some(json!({ "name": "Laptop" })),
        })
        .await
        .unwrap();

    assert_eq!(response.status, 200);
    let body: Value = serde_json::from_str(&response.body).unwrap();
    assert_eq!(body["authorization"], "Bearer tok-123");
    assert_eq!(body["content_type"], "application/json");
    assert_eq!(body["received"]["name"], "Laptop");
}

#[tokio::test]
async fn reqwest_omits_authorization_without_bearer() {
    let base = spawn_server(Router::new().route("/echo", post(echo))).await;

    let response = transport()
        .execute(HttpRequest {
            method: Method::POST,
            url: format!("{base}/echo"),
            bearer: None,
            body: Some(json!({})),
        })
        .await
        .unwrap();

    let body: Value = serde_json::from_str(&response.body).unwrap();
    assert!(body["authorization"].is_null());
}

#[tokio::test]
async fn reqwest_passes_error_statuses_through() {
    let app = Router::new().route(
        "/denied",
        get(|| async { (StatusCode::FORBIDDEN, Json(json!({ "message": "token invalid" }))) }),
    );
    let base = spawn_server(app).await;

    let response = transport()
        .execute(HttpRequest { method: Method::GET, url: format!("{base}/denied"), bearer: None, body: None })
        .await
        .unwrap();

    assert_eq!(response.status, 403);
    assert!(response.body.contains("token invalid"));
}

#[tokio::test]
async fn reqwest_timeout_is_reported_as_timeout() {
    let app = Router::new().route(
        "/slow",
        get(|| async {
            tokio::time::sleep(Duration::from_secs(3)).await;
            "late"
        }),
    );
    let base = spawn_server(app).await;
    let transport = ReqwestTransport::new(Duration::from_millis(200), Duration::from_secs(2)).unwrap();

    let err = transport
        .execute(HttpRequest { method: Method::GET, url: format!("{base}/slow"), bearer: None, body: None })
        .await
        .unwrap_err();

    assert!(matches!(err, TransportError::Timeout), "got {err:?}");
}

#[tokio::test]
async fn reqwest_refused_connection_is_a_transport_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = transport()
        .execute(HttpRequest { method: Method::GET, url: format!("http://{addr}/x"), bearer: None, body: None })
        .await
        .unwrap_err();

    assert!(matches!(err, TransportError::Connect(_)), "got {err:?}");
}
