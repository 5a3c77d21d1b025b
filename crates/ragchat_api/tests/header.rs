use base64::{engine::general_purpose, Engine as _};
use ragchat_api::headers::{
    basic_authorization, build_headers, HEADER_ACCEPT, HEADER_AUTHORIZATION, HEADER_USER_AGENT,
};
use ragchat_api::{ChatApiConfig, ChatApiError};

#[test]
fn headers_carry_basic_auth_and_accept() {
    let config = ChatApiConfig::new("alice", "secret");
    let headers = build_headers(&config, None).expect("headers should build");

    let expected = format!(
        "Basic {}",
        general_purpose::STANDARD.encode("alice:secret")
    );
    assert_eq!(headers.get(HEADER_AUTHORIZATION), Some(&expected));
    assert_eq!(
        headers.get(HEADER_ACCEPT).map(String::as_str),
        Some("application/json")
    );
    assert!(headers.contains_key(HEADER_USER_AGENT));
}

#[test]
fn headers_require_a_username() {
    let config = ChatApiConfig::new("   ", "secret");
    let error = build_headers(&config, None).expect_err("blank username should be rejected");
    assert!(matches!(error, ChatApiError::MissingCredentials));
}

#[test]
fn explicit_user_agent_wins_over_config_value() {
    let config = ChatApiConfig::new("alice", "secret").with_user_agent("config-agent/1");
    let headers = build_headers(&config, Some("explicit-agent/2")).expect("headers should build");
    assert_eq!(
        headers.get(HEADER_USER_AGENT).map(String::as_str),
        Some("explicit-agent/2")
    );

    let headers = build_headers(&config, None).expect("headers should build");
    assert_eq!(
        headers.get(HEADER_USER_AGENT).map(String::as_str),
        Some("config-agent/1")
    );
}

#[test]
fn extra_headers_are_lowercased_and_merged() {
    let config = ChatApiConfig::new("alice", "secret").insert_header("X-Trace-Id", " abc123 ");
    let headers = build_headers(&config, None).expect("headers should build");
    assert_eq!(headers.get("x-trace-id").map(String::as_str), Some("abc123"));
}

#[test]
fn basic_authorization_allows_empty_password() {
    assert_eq!(
        basic_authorization("alice", ""),
        format!("Basic {}", general_purpose::STANDARD.encode("alice:"))
    );
}
