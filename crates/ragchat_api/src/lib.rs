//! Transport-only RAG chat backend client primitives.
//!
//! This crate owns request building, response parsing, and the incremental
//! decoder for the backend's unframed streaming chat responses. It
//! intentionally contains no rendering or transcript coupling.
//!
//! The streaming wire contract is a sequence of standard JSON objects
//! concatenated back-to-back with no separator; each object is either a
//! markdown text block or a base64-embedded image block. The decoder makes
//! forward progress per delivered fragment and reports malformed blocks and
//! truncated tails without aborting the stream.

pub mod blocks;
pub mod client;
pub mod config;
pub mod decoder;
pub mod error;
pub mod headers;
pub mod payload;
pub mod retry;
pub mod url;

pub use blocks::{BlockDefect, SkippedBlock, StreamBlock, StreamItem, DEFAULT_IMAGE_ALT_TEXT};
pub use client::{CancellationSignal, ChatApiClient, StreamResult};
pub use config::ChatApiConfig;
pub use decoder::{BlockStreamDecoder, StreamStatus};
pub use error::ChatApiError;
pub use payload::ChatRequest;
pub use url::normalize_base_url;
