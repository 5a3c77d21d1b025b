use std::fmt;

use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Error as JsonError;
use serde_json::Value;

#[derive(Debug)]
pub enum ChatApiError {
    MissingCredentials,
    InvalidBaseUrl(String),
    InvalidRequestPayload(String),
    Request(reqwest::Error),
    Status(StatusCode, String),
    MissingSessionId,
    Serde(JsonError),
    RetryExhausted {
        status: Option<StatusCode>,
        last_error: Option<String>,
    },
    Cancelled,
    Unknown(String),
}

/// FastAPI-style error body: `{"detail": ...}` where detail is a string or a
/// structured validation payload.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorPayload {
    pub detail: Option<Value>,
}

impl ErrorPayload {
    pub fn detail_message(&self) -> Option<String> {
        match self.detail.as_ref()? {
            Value::String(text) if !text.trim().is_empty() => Some(text.trim().to_owned()),
            Value::String(_) | Value::Null => None,
            structured => Some(structured.to_string()),
        }
    }
}

impl fmt::Display for ChatApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingCredentials => write!(f, "a username is required for basic auth"),
            Self::InvalidBaseUrl(value) => write!(f, "invalid base URL: {value}"),
            Self::InvalidRequestPayload(message) => {
                write!(f, "invalid request payload: {message}")
            }
            Self::Request(error) => write!(f, "request error: {error}"),
            Self::Status(status, message) => write!(f, "HTTP {status} {message}"),
            Self::MissingSessionId => write!(f, "login response did not carry a session id"),
            Self::Serde(error) => write!(f, "serialization error: {error}"),
            Self::RetryExhausted { status, last_error } => {
                let status = status
                    .map(|status| status.as_u16().to_string())
                    .unwrap_or_else(|| "n/a".to_owned());
                write!(
                    f,
                    "retry exhausted after max attempts (status: {status}, last_error: {last_error:?})"
                )
            }
            Self::Cancelled => write!(f, "request was cancelled"),
            Self::Unknown(message) => write!(f, "{message}"),
        }
    }
}

impl std::error::Error for ChatApiError {}

impl From<reqwest::Error> for ChatApiError {
    fn from(error: reqwest::Error) -> Self {
        Self::Request(error)
    }
}

impl From<JsonError> for ChatApiError {
    fn from(error: JsonError) -> Self {
        Self::Serde(error)
    }
}

pub fn parse_error_message(status: StatusCode, body: &str) -> String {
    let parsed = match serde_json::from_str::<ErrorPayload>(body) {
        Ok(payload) => payload,
        Err(_) => {
            return if body.is_empty() {
                status
                    .canonical_reason()
                    .unwrap_or("request failed")
                    .to_string()
            } else {
                body.to_string()
            };
        }
    };

    if let Some(message) = parsed.detail_message() {
        return message;
    }

    if body.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    } else {
        body.to_string()
    }
}
