use std::future::Future;
use std::sync::{atomic::AtomicBool, atomic::Ordering, Arc};
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response, StatusCode};

use crate::config::ChatApiConfig;
use crate::decoder::{BlockStreamDecoder, StreamStatus};
use crate::error::{parse_error_message, ChatApiError};
use crate::payload::{
    ChatRequest, DeleteSourceRequest, IndexResponse, LoginRequest, LoginResponse,
    RagSourcesResponse, SessionIdResponse,
};
use crate::retry::{is_retryable_http_error, retry_delay_ms, MAX_RETRIES};
use crate::url::{
    chat_url, delete_source_url, index_url, login_url, session_url, sources_url, upload_url,
};
use crate::StreamItem;

/// Optional cancellation signal shared across request and stream loops.
pub type CancellationSignal = Arc<AtomicBool>;

const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(25);

// Per-endpoint deadlines; the chat deadline covers the full streamed body.
const CHAT_TIMEOUT: Duration = Duration::from_secs(120);
const LOGIN_TIMEOUT: Duration = Duration::from_secs(5);
const SESSION_TIMEOUT: Duration = Duration::from_secs(50);
const SOURCES_TIMEOUT: Duration = Duration::from_secs(10);
const UPLOAD_TIMEOUT: Duration = Duration::from_secs(120);
const DELETE_TIMEOUT: Duration = Duration::from_secs(30);
// Re-indexing a document store can legitimately take minutes.
const INDEX_TIMEOUT: Duration = Duration::from_secs(500);

#[derive(Debug)]
pub struct ChatApiClient {
    http: Client,
    config: ChatApiConfig,
}

/// Everything one streamed chat response produced, in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamResult {
    pub items: Vec<StreamItem>,
    pub status: StreamStatus,
}

impl ChatApiClient {
    pub fn new(config: ChatApiConfig) -> Result<Self, ChatApiError> {
        let http = Client::builder().build().map_err(ChatApiError::from)?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &ChatApiConfig {
        &self.config
    }

    pub fn chat_endpoint(&self) -> String {
        chat_url(&self.config.base_url)
    }

    pub fn build_headers(&self, user_agent: Option<&str>) -> Result<HeaderMap, ChatApiError> {
        let headers = crate::headers::build_headers(&self.config, user_agent)?;
        let mut out = HeaderMap::new();
        for (key, value) in headers {
            out.insert(
                HeaderName::from_bytes(key.as_bytes()).map_err(|_| {
                    ChatApiError::InvalidBaseUrl(format!("invalid header key: {key}"))
                })?,
                HeaderValue::from_str(&value).map_err(|_| {
                    ChatApiError::InvalidBaseUrl(format!("invalid header value for {key}"))
                })?,
            );
        }
        Ok(out)
    }

    pub fn build_chat_request(
        &self,
        request: &ChatRequest,
    ) -> Result<RequestBuilder, ChatApiError> {
        if request.message.trim().is_empty() {
            return Err(ChatApiError::InvalidRequestPayload(
                "'message' must be a non-empty string".to_owned(),
            ));
        }

        let headers = self.build_headers(self.config.user_agent.as_deref())?;
        let payload = self.request_with_transport_defaults(request);
        Ok(self
            .http
            .post(self.chat_endpoint())
            .headers(headers)
            .timeout(self.config.timeout.unwrap_or(CHAT_TIMEOUT))
            .json(&payload))
    }

    fn request_with_transport_defaults(&self, request: &ChatRequest) -> ChatRequest {
        let mut payload = request.clone();
        if payload.session_id.is_none() {
            if let Some(session_id) = self
                .config
                .session_id
                .as_deref()
                .map(str::trim)
                .filter(|value| !value.is_empty())
            {
                payload.session_id = Some(session_id.to_string());
            }
        }
        payload
    }

    fn post_json<T: serde::Serialize>(
        &self,
        url: String,
        body: &T,
        timeout: Duration,
    ) -> Result<RequestBuilder, ChatApiError> {
        let headers = self.build_headers(self.config.user_agent.as_deref())?;
        Ok(self
            .http
            .post(url)
            .headers(headers)
            .timeout(timeout)
            .json(body))
    }

    pub async fn send_with_retry<F>(
        &self,
        make_request: F,
        cancellation: Option<&CancellationSignal>,
    ) -> Result<Response, ChatApiError>
    where
        F: Fn() -> Result<RequestBuilder, ChatApiError>,
    {
        let mut last_status: Option<StatusCode> = None;
        let mut last_error = None;

        for attempt in 0..=MAX_RETRIES {
            if is_cancelled(cancellation) {
                return Err(ChatApiError::Cancelled);
            }

            let response = make_request()?.send();
            let response = await_or_cancel(response, cancellation)
                .await?
                .map_err(ChatApiError::from);

            match response {
                Ok(response) => {
                    if response.status().is_success() {
                        return Ok(response);
                    }

                    let status = response.status();
                    last_status = Some(status);
                    let body = await_or_cancel(response.text(), cancellation)
                        .await?
                        .unwrap_or_else(|_| {
                            status
                                .canonical_reason()
                                .unwrap_or("request failed")
                                .to_string()
                        });
                    let message = parse_error_message(status, &body);
                    last_error = Some(message.clone());

                    if attempt < MAX_RETRIES && is_retryable_http_error(status.as_u16(), &body) {
                        await_or_cancel(tokio::time::sleep(retry_delay_ms(attempt)), cancellation)
                            .await?;
                        continue;
                    }

                    return Err(ChatApiError::Status(status, message));
                }
                Err(error) => {
                    last_error = Some(error.to_string());
                    if attempt < MAX_RETRIES {
                        await_or_cancel(tokio::time::sleep(retry_delay_ms(attempt)), cancellation)
                            .await?;
                        continue;
                    }
                    return Err(ChatApiError::RetryExhausted {
                        status: last_status,
                        last_error,
                    });
                }
            }
        }

        Err(ChatApiError::RetryExhausted {
            status: last_status,
            last_error,
        })
    }

    /// Stream one chat reply, delivering each decoded item as it completes.
    ///
    /// Transport failures surface before any item is delivered; a truncated
    /// tail is reported through the returned status, never as an error.
    pub async fn stream_chat_with_handler<F>(
        &self,
        request: &ChatRequest,
        cancellation: Option<&CancellationSignal>,
        mut on_item: F,
    ) -> Result<StreamStatus, ChatApiError>
    where
        F: FnMut(StreamItem),
    {
        let response = self
            .send_with_retry(|| self.build_chat_request(request), cancellation)
            .await?;
        let mut bytes = response.bytes_stream();
        let mut decoder = BlockStreamDecoder::default();

        loop {
            let Some(chunk) = await_or_cancel(bytes.next(), cancellation).await? else {
                break;
            };
            if is_cancelled(cancellation) {
                return Err(ChatApiError::Cancelled);
            }
            let chunk = chunk.map_err(ChatApiError::from)?;
            for item in decoder.feed(&chunk) {
                on_item(item);
            }
        }

        if is_cancelled(cancellation) {
            return Err(ChatApiError::Cancelled);
        }

        let (tail, status) = decoder.finish();
        for item in tail {
            on_item(item);
        }

        Ok(status)
    }

    pub async fn stream_chat(
        &self,
        request: &ChatRequest,
        cancellation: Option<&CancellationSignal>,
    ) -> Result<StreamResult, ChatApiError> {
        let mut items = Vec::new();
        let status = self
            .stream_chat_with_handler(request, cancellation, |item| {
                items.push(item);
            })
            .await?;

        Ok(StreamResult { items, status })
    }

    /// Authenticate and return the backend-issued session id.
    pub async fn login(
        &self,
        cancellation: Option<&CancellationSignal>,
    ) -> Result<String, ChatApiError> {
        let body = LoginRequest {
            username: self.config.username.trim().to_owned(),
            password: self.config.password.clone(),
        };
        let response = self
            .send_with_retry(
                || self.post_json(login_url(&self.config.base_url), &body, LOGIN_TIMEOUT),
                cancellation,
            )
            .await?;

        let parsed: LoginResponse = await_or_cancel(response.json(), cancellation).await??;
        parsed
            .session_id
            .filter(|id| !id.trim().is_empty())
            .ok_or(ChatApiError::MissingSessionId)
    }

    /// Ask the backend for a fresh conversation session id.
    pub async fn new_session_id(
        &self,
        cancellation: Option<&CancellationSignal>,
    ) -> Result<String, ChatApiError> {
        let response = self
            .send_with_retry(
                || {
                    self.post_json(
                        session_url(&self.config.base_url),
                        &serde_json::json!({}),
                        SESSION_TIMEOUT,
                    )
                },
                cancellation,
            )
            .await?;

        let parsed: SessionIdResponse = await_or_cancel(response.json(), cancellation).await??;
        parsed
            .session_id
            .filter(|id| !id.trim().is_empty())
            .ok_or(ChatApiError::MissingSessionId)
    }

    /// Trigger re-indexing of the backend document store.
    pub async fn index_documents(
        &self,
        cancellation: Option<&CancellationSignal>,
    ) -> Result<String, ChatApiError> {
        let response = self
            .send_with_retry(
                || {
                    self.post_json(
                        index_url(&self.config.base_url),
                        &serde_json::json!({}),
                        INDEX_TIMEOUT,
                    )
                },
                cancellation,
            )
            .await?;

        let parsed: IndexResponse = await_or_cancel(response.json(), cancellation).await??;
        Ok(parsed.message)
    }

    /// List document sources currently known to the backend.
    pub async fn rag_sources(
        &self,
        cancellation: Option<&CancellationSignal>,
    ) -> Result<Vec<String>, ChatApiError> {
        let response = self
            .send_with_retry(
                || {
                    let headers = self.build_headers(self.config.user_agent.as_deref())?;
                    Ok(self
                        .http
                        .get(sources_url(&self.config.base_url))
                        .headers(headers)
                        .timeout(SOURCES_TIMEOUT))
                },
                cancellation,
            )
            .await?;

        let parsed: RagSourcesResponse = await_or_cancel(response.json(), cancellation).await??;
        Ok(parsed.sources)
    }

    /// Upload one document for indexing.
    pub async fn upload_file(
        &self,
        file_name: &str,
        mime_type: &str,
        bytes: &[u8],
        cancellation: Option<&CancellationSignal>,
    ) -> Result<(), ChatApiError> {
        self.send_with_retry(
            || {
                let headers = self.build_headers(self.config.user_agent.as_deref())?;
                let part = Part::bytes(bytes.to_vec())
                    .file_name(file_name.to_owned())
                    .mime_str(mime_type)
                    .map_err(ChatApiError::from)?;
                Ok(self
                    .http
                    .post(upload_url(&self.config.base_url))
                    .headers(headers)
                    .timeout(UPLOAD_TIMEOUT)
                    .multipart(Form::new().part("file", part)))
            },
            cancellation,
        )
        .await?;

        Ok(())
    }

    /// Delete one document source from the backend store.
    pub async fn delete_rag_source(
        &self,
        filename: &str,
        cancellation: Option<&CancellationSignal>,
    ) -> Result<(), ChatApiError> {
        let body = DeleteSourceRequest {
            filename: filename.to_owned(),
        };
        self.send_with_retry(
            || {
                self.post_json(
                    delete_source_url(&self.config.base_url),
                    &body,
                    DELETE_TIMEOUT,
                )
            },
            cancellation,
        )
        .await?;

        Ok(())
    }
}

fn is_cancelled(cancel: Option<&CancellationSignal>) -> bool {
    cancel.is_some_and(|token| token.load(Ordering::Acquire))
}

async fn await_or_cancel<F>(
    future: F,
    cancellation: Option<&CancellationSignal>,
) -> Result<F::Output, ChatApiError>
where
    F: Future,
{
    if cancellation.is_none() {
        return Ok(future.await);
    }

    let mut future = Box::pin(future);

    loop {
        if is_cancelled(cancellation) {
            return Err(ChatApiError::Cancelled);
        }

        if let Ok(output) = tokio::time::timeout(CANCEL_POLL_INTERVAL, &mut future).await {
            if is_cancelled(cancellation) {
                return Err(ChatApiError::Cancelled);
            }
            return Ok(output);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ChatApiClient;
    use crate::config::ChatApiConfig;
    use crate::error::ChatApiError;
    use crate::payload::ChatRequest;

    fn client() -> ChatApiClient {
        let config = ChatApiConfig::new("alice", "secret")
            .with_base_url("http://localhost:8000")
            .with_session_id("session-42");
        ChatApiClient::new(config).expect("client should construct")
    }

    #[test]
    fn build_chat_request_rejects_blank_message() {
        let request = ChatRequest::new("   ", None);
        let error = client()
            .build_chat_request(&request)
            .expect_err("blank message should be rejected");
        assert!(matches!(error, ChatApiError::InvalidRequestPayload(_)));
    }

    #[test]
    fn chat_request_falls_back_to_config_session_id() {
        let request = ChatRequest::new("hello", None);
        let payload = client().request_with_transport_defaults(&request);
        assert_eq!(payload.session_id.as_deref(), Some("session-42"));
    }

    #[test]
    fn chat_request_preserves_explicit_session_id() {
        let request = ChatRequest::new("hello", Some("explicit".to_owned()));
        let payload = client().request_with_transport_defaults(&request);
        assert_eq!(payload.session_id.as_deref(), Some("explicit"));
    }
}
