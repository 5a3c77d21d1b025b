//! Terminal RAG chat client runtime.
//!
//! ## Backend bootstrap
//!
//! `chat_client` requires explicit backend selection:
//!
//! - `RAGCHAT_BACKEND=mock` for deterministic offline runs (the default)
//! - `RAGCHAT_BACKEND=ragchat-api` for live HTTP transport
//!
//! When `RAGCHAT_BACKEND=ragchat-api`, set:
//!
//! - `RAGCHAT_USERNAME` / `RAGCHAT_PASSWORD`: Basic-auth credentials,
//!   required
//! - `RAGCHAT_API_URL`: backend base URL, defaults to
//!   `http://localhost:8000`
//! - `RAGCHAT_TIMEOUT_SEC`: optional streaming timeout override, must be
//!   > 0 when provided
//!
//! The client logs in at startup to obtain the conversation session id, then
//! reads lines from stdin. Plain lines are sent as chat messages and the
//! reply streams into the terminal block-by-block; `/`-prefixed lines are
//! commands (see `/help`). Sealed turns are persisted as JSONL transcripts
//! under `.ragchat/transcripts/` in the working directory.

pub mod app;
pub mod commands;
pub mod providers;
pub mod render;
