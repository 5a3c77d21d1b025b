//! RAG backend implementation of the shared `chat_provider` contract.
//!
//! This adapter translates `ragchat_api` stream semantics into the ordered
//! `TurnEvent` lifecycle expected by `chat_client`: blocks and warnings are
//! forwarded at their arrival position, and every turn ends in exactly one
//! terminal event.

use std::future::Future;
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chat_provider::{
    BackendInitError, BackendProfile, CancelSignal, ChatBackend, ContentBlock, TurnEvent,
    TurnRequest, TurnWarning,
};
use ragchat_api::{
    ChatApiClient, ChatApiConfig, ChatApiError, ChatRequest, StreamBlock, StreamItem,
    StreamStatus,
};

/// Stable backend identifier used by `chat_client` startup selection.
pub const RAGCHAT_API_BACKEND_ID: &str = "ragchat-api";

/// Runtime configuration for the RAG backend adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RagchatApiBackendConfig {
    pub username: String,
    pub password: String,
    pub base_url: Option<String>,
    pub session_id: Option<String>,
    pub timeout: Option<Duration>,
}

impl RagchatApiBackendConfig {
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            base_url: None,
            session_id: None,
            timeout: None,
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    #[must_use]
    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    fn into_chat_api_config(self) -> ChatApiConfig {
        let mut config = ChatApiConfig::new(self.username, self.password);

        if let Some(base_url) = self.base_url {
            config = config.with_base_url(base_url);
        }

        if let Some(session_id) = self.session_id {
            config = config.with_session_id(session_id);
        }

        if let Some(timeout) = self.timeout {
            config = config.with_timeout(timeout);
        }

        config
    }
}

/// Transport seam between the adapter and `ragchat_api`.
///
/// The default implementation drives the async client on a current-thread
/// runtime; tests substitute deterministic fakes.
trait BackendTransport: Send + Sync {
    fn stream_chat(
        &self,
        request: &ChatRequest,
        cancel: &CancelSignal,
        on_item: &mut dyn FnMut(StreamItem),
    ) -> Result<StreamStatus, ChatApiError>;

    fn login(&self) -> Result<String, ChatApiError>;

    fn new_session_id(&self) -> Result<String, ChatApiError>;

    fn index_documents(&self) -> Result<String, ChatApiError>;

    fn rag_sources(&self) -> Result<Vec<String>, ChatApiError>;

    fn upload_file(&self, file_name: &str, bytes: &[u8]) -> Result<(), ChatApiError>;

    fn delete_rag_source(&self, file_name: &str) -> Result<(), ChatApiError>;
}

#[derive(Debug)]
struct DefaultTransport {
    client: ChatApiClient,
}

impl DefaultTransport {
    fn block_on<F, T>(&self, future: F) -> Result<T, ChatApiError>
    where
        F: Future<Output = Result<T, ChatApiError>>,
    {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|error| {
                ChatApiError::Unknown(format!("failed to initialize tokio runtime: {error}"))
            })?;

        runtime.block_on(future)
    }
}

impl BackendTransport for DefaultTransport {
    fn stream_chat(
        &self,
        request: &ChatRequest,
        cancel: &CancelSignal,
        on_item: &mut dyn FnMut(StreamItem),
    ) -> Result<StreamStatus, ChatApiError> {
        self.block_on(
            self.client
                .stream_chat_with_handler(request, Some(cancel), |item| on_item(item)),
        )
    }

    fn login(&self) -> Result<String, ChatApiError> {
        self.block_on(self.client.login(None))
    }

    fn new_session_id(&self) -> Result<String, ChatApiError> {
        self.block_on(self.client.new_session_id(None))
    }

    fn index_documents(&self) -> Result<String, ChatApiError> {
        self.block_on(self.client.index_documents(None))
    }

    fn rag_sources(&self) -> Result<Vec<String>, ChatApiError> {
        self.block_on(self.client.rag_sources(None))
    }

    fn upload_file(&self, file_name: &str, bytes: &[u8]) -> Result<(), ChatApiError> {
        let mime_type = mime_type_for(file_name);
        self.block_on(self.client.upload_file(file_name, mime_type, bytes, None))
    }

    fn delete_rag_source(&self, file_name: &str) -> Result<(), ChatApiError> {
        self.block_on(self.client.delete_rag_source(file_name, None))
    }
}

/// `ChatBackend` adapter backed by `ragchat_api` transport primitives.
pub struct RagchatApiBackend {
    endpoint: String,
    session: Mutex<Option<String>>,
    transport: Arc<dyn BackendTransport>,
}

impl RagchatApiBackend {
    /// Creates a backend using real HTTP transport.
    pub fn new(config: RagchatApiBackendConfig) -> Result<Self, BackendInitError> {
        if let Some(base_url) = config.base_url.as_deref() {
            url::Url::parse(base_url).map_err(|error| {
                BackendInitError::new(format!("invalid backend base URL '{base_url}': {error}"))
            })?;
        }

        let session = config.session_id.clone();
        let api_config = config.into_chat_api_config();
        let endpoint = ragchat_api::normalize_base_url(&api_config.base_url);
        let transport = Arc::new(DefaultTransport {
            client: ChatApiClient::new(api_config).map_err(map_init_error)?,
        });

        Ok(Self {
            endpoint,
            session: Mutex::new(session),
            transport,
        })
    }

    fn current_session(&self) -> Option<String> {
        lock_unpoisoned(&self.session).clone()
    }

    fn store_session(&self, session_id: String) -> String {
        *lock_unpoisoned(&self.session) = Some(session_id.clone());
        session_id
    }

    #[cfg(test)]
    fn with_transport_for_tests(transport: Arc<dyn BackendTransport>) -> Self {
        Self {
            endpoint: "http://localhost:8000".to_string(),
            session: Mutex::new(None),
            transport,
        }
    }
}

impl ChatBackend for RagchatApiBackend {
    fn profile(&self) -> BackendProfile {
        BackendProfile {
            backend_id: RAGCHAT_API_BACKEND_ID.to_string(),
            endpoint: self.endpoint.clone(),
        }
    }

    fn send_message(
        &self,
        req: TurnRequest,
        cancel: CancelSignal,
        emit: &mut dyn FnMut(TurnEvent),
    ) -> Result<(), String> {
        let turn_id = req.turn_id;

        emit(TurnEvent::Started { turn_id });

        if cancel.load(Ordering::Acquire) {
            emit(TurnEvent::Cancelled { turn_id });
            return Ok(());
        }

        let request = ChatRequest::new(req.message, self.current_session());
        let result = {
            let emit_blocks = &mut *emit;
            let mut forward =
                move |item: StreamItem| emit_stream_item(turn_id, item, emit_blocks);
            self.transport.stream_chat(&request, &cancel, &mut forward)
        };
        match result {
            Ok(StreamStatus::Complete) => emit(TurnEvent::Sealed { turn_id }),
            Ok(StreamStatus::Truncated { pending_bytes }) => {
                emit(TurnEvent::Warning {
                    turn_id,
                    warning: TurnWarning::TruncatedStream { pending_bytes },
                });
                emit(TurnEvent::Sealed { turn_id });
            }
            Err(ChatApiError::Cancelled) => emit(TurnEvent::Cancelled { turn_id }),
            Err(error) => emit(TurnEvent::Failed {
                turn_id,
                error: format!("chat request failed: {error}"),
            }),
        }

        Ok(())
    }

    fn login(&self) -> Result<String, String> {
        let session_id = self.transport.login().map_err(|error| error.to_string())?;
        Ok(self.store_session(session_id))
    }

    fn reset_session(&self) -> Result<String, String> {
        let session_id = self
            .transport
            .new_session_id()
            .map_err(|error| error.to_string())?;
        Ok(self.store_session(session_id))
    }

    fn index_documents(&self) -> Result<String, String> {
        self.transport
            .index_documents()
            .map_err(|error| error.to_string())
    }

    fn list_sources(&self) -> Result<Vec<String>, String> {
        self.transport
            .rag_sources()
            .map_err(|error| error.to_string())
    }

    fn upload_document(&self, file_name: &str, bytes: Vec<u8>) -> Result<(), String> {
        self.transport
            .upload_file(file_name, &bytes)
            .map_err(|error| error.to_string())
    }

    fn delete_source(&self, file_name: &str) -> Result<(), String> {
        self.transport
            .delete_rag_source(file_name)
            .map_err(|error| error.to_string())
    }
}

fn emit_stream_item(turn_id: u64, item: StreamItem, emit: &mut dyn FnMut(TurnEvent)) {
    match item {
        StreamItem::Block(StreamBlock::Text { content }) => emit(TurnEvent::Block {
            turn_id,
            block: ContentBlock::text(content),
        }),
        StreamItem::Block(StreamBlock::Image { content, alt_text }) => emit(TurnEvent::Block {
            turn_id,
            block: ContentBlock::image(content, alt_text),
        }),
        StreamItem::Skipped(skipped) => emit(TurnEvent::Warning {
            turn_id,
            warning: TurnWarning::MalformedBlock {
                detail: skipped.defect.to_string(),
                payload: skipped.payload,
            },
        }),
    }
}

/// Best-effort MIME guess for the upload multipart part.
fn mime_type_for(file_name: &str) -> &'static str {
    let extension = file_name
        .rsplit('.')
        .next()
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    match extension.as_str() {
        "pdf" => "application/pdf",
        "txt" => "text/plain",
        "md" => "text/markdown",
        "csv" => "text/csv",
        "json" => "application/json",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        _ => "application/octet-stream",
    }
}

fn map_init_error(error: ChatApiError) -> BackendInitError {
    BackendInitError::new(format!("Failed to initialize ragchat-api backend: {error}"))
}

fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
