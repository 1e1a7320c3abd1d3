use super::*;
use crate::transport::test_helpers::MockTransport;
use crate::transport::{HttpResponse, TransportError};
use serde_json::json;

fn all_origins() -> Origins {
    Origins::new()
        .with(Origin::Auth, "https://auth.test/")
        .with(Origin::Category, "https://category.test")
        .with(Origin::Product, "https://product.test/")
}

fn logged_in(token: &str) -> SessionStore {
    let store = SessionStore::in_memory();
    store.set(token).unwrap();
    store
}

fn gateway(transport: &Arc<MockTransport>, session: &SessionStore) -> Gateway {
    Gateway::new(all_origins(), session.clone(), transport.clone())
}

// =========================================================================
// Pre-flight short circuits
// =========================================================================

#[tokio::test]
async fn unconfigured_origin_never_reaches_network() {
    let transport = Arc::new(MockTransport::replying(200, "[]"));
    let gw = Gateway::new(Origins::new(), logged_in("t"), transport.clone());

    let err = gw.send(RequestDescriptor::get(Origin::Category, "categories")).await.unwrap_err();

    assert!(matches!(err, GatewayError::Configuration { origin: Origin::Category, .. }));
    assert_eq!(transport.call_count(), 0);
}

#[tokio::test]
async fn protected_call_without_session_is_unauthenticated() {
    let transport = Arc::new(MockTransport::replying(200, "{}"));
    let gw = gateway(&transport, &SessionStore::in_memory());

    let err = gw
        .send(RequestDescriptor::post(Origin::Category, "categories").json(json!({"name": "TV"})).authenticated())
        .await
        .unwrap_err();

    assert!(matches!(err, GatewayError::Unauthenticated));
    assert_eq!(err.redirect(), Some(crate::auth::Route::Login));
    assert_eq!(transport.call_count(), 0);
}

// =========================================================================
// Request shape
// =========================================================================

#[tokio::test]
async fn protected_call_attaches_bearer_and_joins_url() {
    let transport = Arc::new(MockTransport::replying(201, r#"{"_id":"c1","name":"TV"}"#));
    let gw = gateway(&transport, &logged_in("tok-abc"));

    gw.send(RequestDescriptor::post(Origin::Category, "categories").json(json!({"name": "TV"})).authenticated())
        .await
        .unwrap();

    let sent = transport.last_request();
    assert_eq!(sent.method, Method::POST);
    assert_eq!(sent.url, "https://category.test/categories");
    assert_eq!(sent.bearer.as_deref(), Some("tok-abc"));
    assert_eq!(sent.body, Some(json!({"name": "TV"})));
}

#[tokio::test]
async fn leading_slash_in_path_does_not_double_up() {
    let transport = Arc::new(MockTransport::replying(200, "[]"));
    let gw = gateway(&transport, &logged_in("t"));

    gw.send(RequestDescriptor::get(Origin::Product, "/products")).await.unwrap();

    assert_eq!(transport.last_request().url, "https://product.test/products");
}

#[tokio::test]
async fn anonymous_call_sends_no_credential_even_when_logged_in() {
    let transport = Arc::new(MockTransport::replying(200, r#"{"token":"x"}"#));
    let gw = gateway(&transport, &logged_in("existing"));

    gw.send(RequestDescriptor::post(Origin::Auth, "login").json(json!({}))).await.unwrap();

    assert!(transport.last_request().bearer.is_none());
}

// =========================================================================
// Session expiry
// =========================================================================

#[tokio::test]
async fn unauthorized_evicts_session() {
    let session = logged_in("stale");
    let transport = Arc::new(MockTransport::replying(401, r#"{"message":"jwt expired"}"#));
    let gw = gateway(&transport, &session);

    let err = gw.send(RequestDescriptor::get(Origin::Category, "categories").authenticated()).await.unwrap_err();

    assert!(matches!(err, GatewayError::SessionExpired { status: 401 }));
    assert!(session.get().is_none());
}

#[tokio::test]
async fn forbidden_on_delete_evicts_session_and_is_not_request_failed() {
    let session = logged_in("other-issuer");
    let transport = Arc::new(MockTransport::replying(403, r#"{"message":"forbidden"}"#));
    let gw = gateway(&transport, &session);

    let err = gw.send(RequestDescriptor::delete(Origin::Category, "categories/c1").authenticated()).await.unwrap_err();

    assert!(matches!(err, GatewayError::SessionExpired { status: 403 }));
    assert!(!matches!(err, GatewayError::RequestFailed { .. }));
    assert!(!session.is_present());
}

#[tokio::test]
async fn eviction_is_visible_to_other_holders() {
    let session = logged_in("stale");
    let other_view = session.clone();
    let transport = Arc::new(MockTransport::replying(401, ""));
    let gw = gateway(&transport, &session);

    let _ = gw.send(RequestDescriptor::get(Origin::Product, "products").authenticated()).await;

    assert!(other_view.get().is_none());
}

#[tokio::test]
async fn unauthorized_on_anonymous_call_keeps_session() {
    let session = logged_in("keep-me");
    let transport = Arc::new(MockTransport::replying(401, r#"{"message":"Invalid credentials"}"#));
    let gw = gateway(&transport, &session);

    let err = gw.send(RequestDescriptor::post(Origin::Auth, "login").json(json!({}))).await.unwrap_err();

    match err {
        GatewayError::RequestFailed { status, message } => {
            assert_eq!(status, 401);
            assert_eq!(message, "Invalid credentials");
        }
        other => panic!("expected RequestFailed, got {other:?}"),
    }
    assert_eq!(session.get().unwrap().as_str(), "keep-me");
}

// =========================================================================
// Other failures
// =========================================================================

#[tokio::test]
async fn server_error_carries_message_and_keeps_session() {
    let session = logged_in("t");
    let transport = Arc::new(MockTransport::replying(500, r#"{"message":"database unavailable"}"#));
    let gw = gateway(&transport, &session);

    let err = gw.send(RequestDescriptor::get(Origin::Product, "products").authenticated()).await.unwrap_err();

    assert_eq!(err.to_string(), "database unavailable");
    assert!(session.is_present());
}

#[tokio::test]
async fn error_field_is_used_when_message_missing() {
    let transport = Arc::new(MockTransport::replying(409, r#"{"error":"email already registered"}"#));
    let gw = gateway(&transport, &SessionStore::in_memory());

    let err = gw.send(RequestDescriptor::post(Origin::Auth, "register").json(json!({}))).await.unwrap_err();

    assert!(matches!(err, GatewayError::RequestFailed { status: 409, ref message } if message == "email already registered"));
}

#[tokio::test]
async fn non_json_error_body_uses_fallback_message() {
    let transport = Arc::new(MockTransport::replying(502, "<html>Bad Gateway</html>"));
    let gw = gateway(&transport, &logged_in("t"));

    let err = gw.send(RequestDescriptor::get(Origin::Category, "categories").authenticated()).await.unwrap_err();

    assert_eq!(err.to_string(), "request failed with status 502");
}

#[tokio::test]
async fn transport_failure_is_network_error_attempted_once() {
    let session = logged_in("t");
    let transport = Arc::new(MockTransport::new(vec![Err(TransportError::Timeout)]));
    let gw = gateway(&transport, &session);

    let err = gw.send(RequestDescriptor::get(Origin::Category, "categories").authenticated()).await.unwrap_err();

    assert!(matches!(err, GatewayError::Network(_)));
    assert_eq!(transport.call_count(), 1);
    assert!(session.is_present());
}

// =========================================================================
// Success payloads
// =========================================================================

#[tokio::test]
async fn enveloped_and_bare_bodies_unwrap_identically() {
    let transport = Arc::new(MockTransport::new(vec![
        Ok(HttpResponse::new(200, r#"{"data":[1,2,3]}"#)),
        Ok(HttpResponse::new(200, "[1,2,3]")),
    ]));
    let gw = gateway(&transport, &logged_in("t"));

    let wrapped = gw.send(RequestDescriptor::get(Origin::Product, "products")).await.unwrap();
    let bare = gw.send(RequestDescriptor::get(Origin::Product, "products")).await.unwrap();

    assert_eq!(wrapped, json!([1, 2, 3]));
    assert_eq!(bare, json!([1, 2, 3]));
}

#[tokio::test]
async fn empty_success_body_is_null() {
    let transport = Arc::new(MockTransport::replying(204, ""));
    let gw = gateway(&transport, &logged_in("t"));

    let payload = gw.send(RequestDescriptor::delete(Origin::Category, "categories/c1").authenticated()).await.unwrap();

    assert!(payload.is_null());
}

#[tokio::test]
async fn non_json_success_body_is_decode_error() {
    let transport = Arc::new(MockTransport::replying(200, "OK"));
    let gw = gateway(&transport, &logged_in("t"));

    let err = gw.send(RequestDescriptor::get(Origin::Category, "categories")).await.unwrap_err();

    assert!(matches!(err, GatewayError::Decode(_)));
}

#[tokio::test]
async fn send_as_decodes_unwrapped_payload() {
    #[derive(serde::Deserialize)]
    struct Named {
        name: String,
    }
    let transport = Arc::new(MockTransport::replying(200, r#"{"data":{"name":"Phones"},"message":"ok"}"#));
    let gw = gateway(&transport, &logged_in("t"));

    let named: Named = gw.send_as(RequestDescriptor::get(Origin::Category, "categories/c1")).await.unwrap();

    assert_eq!(named.name, "Phones");
}

#[tokio::test]
async fn concurrent_sends_are_independent() {
    let transport = Arc::new(MockTransport::new(vec![
        Ok(HttpResponse::new(200, "[]")),
        Ok(HttpResponse::new(200, r#"{"data":[]}"#)),
    ]));
    let gw = gateway(&transport, &logged_in("t"));

    let (a, b) = tokio::join!(
        gw.send(RequestDescriptor::get(Origin::Product, "products").authenticated()),
        gw.send(RequestDescriptor::get(Origin::Category, "categories").authenticated()),
    );

    assert_eq!(a.unwrap(), json!([]));
    assert_eq!(b.unwrap(), json!([]));
    assert_eq!(transport.call_count(), 2);
}

// =========================================================================
// Helpers
// =========================================================================

#[test]
fn unwrap_envelope_keeps_objects_without_data() {
    let body = json!({"token": "abc"});
    assert_eq!(unwrap_envelope(body.clone()), body);
}

#[test]
fn unwrap_envelope_null_data_is_null() {
    assert_eq!(unwrap_envelope(json!({"data": null})), Value::Null);
}

#[test]
fn extract_message_ignores_blank_fields() {
    assert_eq!(extract_message(r#"{"message":"","error":"bad"}"#, 400), "bad");
    assert_eq!(extract_message(r#"{"message": 5}"#, 400), r#"{"message":5}"#);
}

#[test]
fn extract_message_falls_back_to_compact_body_then_generic() {
    assert_eq!(extract_message(r#"{ "detail": "quota" }"#, 429), r#"{"detail":"quota"}"#);
    assert_eq!(extract_message(r#""plain reason""#, 400), "plain reason");
    assert_eq!(extract_message("{}", 400), "request failed with status 400");
    assert_eq!(extract_message("null", 400), "request failed with status 400");
}

#[tokio::test]
async fn send_status_ignores_non_json_success_body() {
    let transport = Arc::new(MockTransport::replying(201, "Created"));
    let session = logged_in("t");
    let gw = gateway(&transport, &session);

    let status = gw.send_status(RequestDescriptor::post(Origin::Auth, "register")).await.unwrap();

    assert_eq!(status, 201);
}

#[tokio::test]
async fn send_status_still_classifies_failures() {
    let transport = Arc::new(MockTransport::replying(401, ""));
    let session = logged_in("t");
    let gw = gateway(&transport, &session);

    let err = gw
        .send_status(RequestDescriptor::delete(Origin::Category, "categories/c1").authenticated())
        .await
        .unwrap_err();

    assert!(matches!(err, GatewayError::SessionExpired { status: 401 }));
    assert!(session.get().is_none());
}
