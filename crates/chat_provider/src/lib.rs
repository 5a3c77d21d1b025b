//! Minimal backend-agnostic contract for executing a single chat turn.
//!
//! This crate intentionally defines only the shared turn lifecycle and the
//! typed content blocks a backend emits while a reply streams in. It excludes
//! backend transport details, wire payloads, and rendering concerns.

use std::fmt;
use std::sync::{atomic::AtomicBool, Arc};

use serde_json::Value;

/// Identifier for one chat turn.
pub type TurnId = u64;

/// Shared cancellation flag for a turn.
pub type CancelSignal = Arc<AtomicBool>;

/// Error returned while constructing/configuring a backend before any turn starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendInitError {
    message: String,
}

impl BackendInitError {
    /// Creates a new backend initialization error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Returns the underlying error message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for BackendInitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for BackendInitError {}

impl From<String> for BackendInitError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<&str> for BackendInitError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

/// Author of a transcript turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Speaker {
    User,
    Assistant,
}

impl Speaker {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// One decoded unit of assistant output.
///
/// Image payloads arrive base64-encoded on the wire; by the time a block
/// reaches this contract the bytes are already decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentBlock {
    Text { content: String },
    Image { content: Vec<u8>, alt_text: String },
}

impl ContentBlock {
    /// Constructs a markdown text block.
    #[must_use]
    pub fn text(content: impl Into<String>) -> Self {
        Self::Text {
            content: content.into(),
        }
    }

    /// Constructs an image block from decoded bytes.
    #[must_use]
    pub fn image(content: Vec<u8>, alt_text: impl Into<String>) -> Self {
        Self::Image {
            content,
            alt_text: alt_text.into(),
        }
    }

    /// Returns the wire discriminator for this block.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Text { .. } => "text",
            Self::Image { .. } => "image",
        }
    }
}

/// Recoverable decode condition reported alongside a streaming turn.
///
/// Warnings never abort the turn; blocks decoded before and after the
/// condition remain valid.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnWarning {
    /// A value parsed as JSON but could not be dispatched as a block. The
    /// offending payload is retained for caller-side diagnostics, never
    /// rendered or stored.
    MalformedBlock { detail: String, payload: Value },
    /// The stream ended with bytes that never completed a JSON value.
    TruncatedStream { pending_bytes: usize },
}

impl fmt::Display for TurnWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedBlock { detail, .. } => {
                write!(f, "skipped malformed content block: {detail}")
            }
            Self::TruncatedStream { pending_bytes } => write!(
                f,
                "response stream ended mid-value; dropped {pending_bytes} undecoded byte(s)"
            ),
        }
    }
}

/// Input required to start a chat turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnRequest {
    pub turn_id: TurnId,
    pub message: String,
}

/// Backend-emitted lifecycle event for a streaming turn.
///
/// Ordering contract: `Started` first, then `Block`/`Warning` interleaved in
/// arrival order, then exactly one terminal event.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnEvent {
    Started { turn_id: TurnId },
    Block { turn_id: TurnId, block: ContentBlock },
    Warning { turn_id: TurnId, warning: TurnWarning },
    Sealed { turn_id: TurnId },
    Failed { turn_id: TurnId, error: String },
    Cancelled { turn_id: TurnId },
}

impl TurnEvent {
    /// Returns the turn identifier associated with this event.
    #[must_use]
    pub fn turn_id(&self) -> TurnId {
        match self {
            Self::Started { turn_id }
            | Self::Block { turn_id, .. }
            | Self::Warning { turn_id, .. }
            | Self::Sealed { turn_id }
            | Self::Failed { turn_id, .. }
            | Self::Cancelled { turn_id } => *turn_id,
        }
    }

    /// Returns true when this event terminates the turn lifecycle.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Sealed { .. } | Self::Failed { .. } | Self::Cancelled { .. }
        )
    }
}

/// Immutable metadata describing a chat backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendProfile {
    pub backend_id: String,
    pub endpoint: String,
}

/// Backend interface for executing one chat turn and for the session and
/// document collaborator surfaces that live outside the decode core.
pub trait ChatBackend: Send + Sync + 'static {
    /// Returns backend identity metadata.
    fn profile(&self) -> BackendProfile;

    /// Executes one turn request and emits lifecycle events in stream order.
    ///
    /// The emit callback is serial from the caller perspective; each block is
    /// delivered before the next stream fragment is processed.
    fn send_message(
        &self,
        req: TurnRequest,
        cancel: CancelSignal,
        emit: &mut dyn FnMut(TurnEvent),
    ) -> Result<(), String>;

    /// Authenticates against the backend and returns the session identifier.
    ///
    /// Backends without a login surface may return an error.
    fn login(&self) -> Result<String, String> {
        Err("Login is not supported by this backend".to_string())
    }

    /// Discards the current conversation session and returns the new id.
    fn reset_session(&self) -> Result<String, String> {
        Err("Session reset is not supported by this backend".to_string())
    }

    /// Triggers re-indexing of the backend document store.
    fn index_documents(&self) -> Result<String, String> {
        Err("Document indexing is not supported by this backend".to_string())
    }

    /// Lists document sources known to the backend.
    fn list_sources(&self) -> Result<Vec<String>, String> {
        Err("Source listing is not supported by this backend".to_string())
    }

    /// Uploads one document for indexing.
    fn upload_document(&self, _file_name: &str, _bytes: Vec<u8>) -> Result<(), String> {
        Err("Document upload is not supported by this backend".to_string())
    }

    /// Deletes one document source from the backend store.
    fn delete_source(&self, _file_name: &str) -> Result<(), String> {
        Err("Source deletion is not supported by this backend".to_string())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{
        BackendInitError, BackendProfile, CancelSignal, ChatBackend, ContentBlock, Speaker,
        TurnEvent, TurnRequest, TurnWarning,
    };

    struct MinimalBackend;

    impl ChatBackend for MinimalBackend {
        fn profile(&self) -> BackendProfile {
            BackendProfile {
                backend_id: "minimal".to_string(),
                endpoint: "http://localhost:8000".to_string(),
            }
        }

        fn send_message(
            &self,
            req: TurnRequest,
            _cancel: CancelSignal,
            emit: &mut dyn FnMut(TurnEvent),
        ) -> Result<(), String> {
            emit(TurnEvent::Started {
                turn_id: req.turn_id,
            });
            emit(TurnEvent::Sealed {
                turn_id: req.turn_id,
            });
            Ok(())
        }
    }

    #[test]
    fn turn_event_turn_id_returns_event_turn_id() {
        let turn_id = 42;
        let events = [
            TurnEvent::Started { turn_id },
            TurnEvent::Block {
                turn_id,
                block: ContentBlock::text("partial"),
            },
            TurnEvent::Warning {
                turn_id,
                warning: TurnWarning::TruncatedStream { pending_bytes: 3 },
            },
            TurnEvent::Sealed { turn_id },
            TurnEvent::Failed {
                turn_id,
                error: "failure".to_string(),
            },
            TurnEvent::Cancelled { turn_id },
        ];

        for event in events {
            assert_eq!(event.turn_id(), turn_id);
        }
    }

    #[test]
    fn turn_event_terminal_detection_matches_lifecycle() {
        assert!(!TurnEvent::Started { turn_id: 1 }.is_terminal());
        assert!(!TurnEvent::Block {
            turn_id: 1,
            block: ContentBlock::text("hello"),
        }
        .is_terminal());
        assert!(!TurnEvent::Warning {
            turn_id: 1,
            warning: TurnWarning::MalformedBlock {
                detail: "unrecognized type 'chart'".to_string(),
                payload: json!({"type": "chart"}),
            },
        }
        .is_terminal());
        assert!(TurnEvent::Sealed { turn_id: 1 }.is_terminal());
        assert!(TurnEvent::Failed {
            turn_id: 1,
            error: "boom".to_string(),
        }
        .is_terminal());
        assert!(TurnEvent::Cancelled { turn_id: 1 }.is_terminal());
    }

    #[test]
    fn backend_init_error_preserves_message() {
        let error = BackendInitError::new("missing password");
        assert_eq!(error.message(), "missing password");
        assert_eq!(error.to_string(), "missing password");
    }

    #[test]
    fn content_block_constructors_set_kind() {
        let text = ContentBlock::text("# heading");
        assert_eq!(text.kind(), "text");

        let image = ContentBlock::image(vec![0x89, 0x50], "diagram");
        assert_eq!(image.kind(), "image");
        assert_eq!(
            image,
            ContentBlock::Image {
                content: vec![0x89, 0x50],
                alt_text: "diagram".to_string(),
            }
        );
    }

    #[test]
    fn speaker_as_str_matches_transcript_roles() {
        assert_eq!(Speaker::User.as_str(), "user");
        assert_eq!(Speaker::Assistant.as_str(), "assistant");
    }

    #[test]
    fn warning_display_names_the_failure_mode() {
        let malformed = TurnWarning::MalformedBlock {
            detail: "unrecognized type 'chart'".to_string(),
            payload: json!({"type": "chart"}),
        };
        assert!(malformed.to_string().contains("unrecognized type 'chart'"));

        let truncated = TurnWarning::TruncatedStream { pending_bytes: 17 };
        assert!(truncated.to_string().contains("17"));
    }

    #[test]
    fn default_collaborator_surfaces_report_unsupported() {
        let backend = MinimalBackend;
        assert!(backend
            .login()
            .expect_err("minimal backend should not support login")
            .contains("not supported"));
        assert!(backend.reset_session().is_err());
        assert!(backend.index_documents().is_err());
        assert!(backend.list_sources().is_err());
        assert!(backend.upload_document("notes.md", Vec::new()).is_err());
        assert!(backend.delete_source("notes.md").is_err());
    }

    #[test]
    fn turn_request_carries_outgoing_message() {
        let request = TurnRequest {
            turn_id: 7,
            message: "summarize the uploaded report".to_string(),
        };

        assert_eq!(request.turn_id, 7);
        assert_eq!(request.message, "summarize the uploaded report");
    }
}
