use ragchat_api::payload::{
    DeleteSourceRequest, IndexResponse, LoginResponse, RagSourcesResponse,
};
use ragchat_api::ChatRequest;
use serde_json::{json, Value};

#[test]
fn chat_payload_omits_absent_session_id() {
    let request = ChatRequest::new("hello", None);
    let body = serde_json::to_value(&request).expect("serialize payload");

    assert_eq!(body["message"], Value::String("hello".to_string()));
    assert!(body.get("session_id").is_none());
}

#[test]
fn chat_payload_includes_session_id_when_set() {
    let request = ChatRequest::new("hello", Some("session-7".to_string()));
    let body = serde_json::to_value(&request).expect("serialize payload");

    assert_eq!(body["session_id"], Value::String("session-7".to_string()));
}

#[test]
fn login_response_tolerates_missing_session_id() {
    let parsed: LoginResponse =
        serde_json::from_value(json!({"message": "ok"})).expect("parse login response");
    assert!(parsed.session_id.is_none());

    let parsed: LoginResponse = serde_json::from_value(json!({"session_id": "s-1"}))
        .expect("parse login response");
    assert_eq!(parsed.session_id.as_deref(), Some("s-1"));
}

#[test]
fn index_response_defaults_to_empty_message() {
    let parsed: IndexResponse = serde_json::from_value(json!({})).expect("parse index response");
    assert!(parsed.message.is_empty());
}

#[test]
fn sources_response_defaults_to_empty_list() {
    let parsed: RagSourcesResponse =
        serde_json::from_value(json!({})).expect("parse sources response");
    assert!(parsed.sources.is_empty());

    let parsed: RagSourcesResponse =
        serde_json::from_value(json!({"sources": ["a.pdf", "b.md"]}))
            .expect("parse sources response");
    assert_eq!(parsed.sources, vec!["a.pdf", "b.md"]);
}

#[test]
fn delete_payload_names_the_filename_field() {
    let body = serde_json::to_value(DeleteSourceRequest {
        filename: "report.pdf".to_string(),
    })
    .expect("serialize payload");
    assert_eq!(body, json!({"filename": "report.pdf"}));
}
