use ragchat_api::url::chat_url;
use ragchat_api::{ChatApiClient, ChatApiConfig, ChatRequest};
use serde_json::Value;

fn request_body_json(request: &reqwest::Request) -> Value {
    let bytes = request
        .body()
        .and_then(reqwest::Body::as_bytes)
        .expect("request body should be buffered");
    serde_json::from_slice(bytes).expect("request body should be JSON")
}

#[test]
fn http_request_targets_chat_endpoint() {
    let config = ChatApiConfig::new("alice", "secret")
        .with_base_url("http://backend.internal:8000");
    let client = ChatApiClient::new(config).expect("client");
    let request = ChatRequest::new("what changed in the Q3 report?", None);

    let http_request = client
        .build_chat_request(&request)
        .expect("build request")
        .build()
        .expect("request");

    assert_eq!(
        http_request.url().as_str(),
        chat_url("http://backend.internal:8000")
    );
    assert_eq!(http_request.method(), "POST");
}

#[test]
fn http_request_body_carries_message_and_session_fallback() {
    let config = ChatApiConfig::new("alice", "secret")
        .with_base_url("http://backend.internal:8000")
        .with_session_id("session-42");
    let client = ChatApiClient::new(config).expect("client");
    let request = ChatRequest::new("hello", None);

    let http_request = client
        .build_chat_request(&request)
        .expect("build request")
        .build()
        .expect("request");
    let body = request_body_json(&http_request);

    assert_eq!(body["message"], Value::String("hello".to_string()));
    assert_eq!(body["session_id"], Value::String("session-42".to_string()));
}

#[test]
fn http_request_carries_basic_auth_header() {
    let config = ChatApiConfig::new("alice", "secret");
    let client = ChatApiClient::new(config).expect("client");
    let request = ChatRequest::new("hello", None);

    let http_request = client
        .build_chat_request(&request)
        .expect("build request")
        .build()
        .expect("request");

    let auth = http_request
        .headers()
        .get("authorization")
        .expect("authorization header should be present")
        .to_str()
        .expect("header should be ascii");
    assert!(auth.starts_with("Basic "));
}
