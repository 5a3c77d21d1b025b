//! Append-only transcript persistence for chat conversations.
//!
//! A transcript is an ordered sequence of sealed turns, each an ordered list
//! of content blocks tagged with the speaker. Files are line-oriented JSON:
//! one header record, then one record per turn. Sealed turns are immutable
//! and the file is only ever appended to.

mod appender;
mod error;
mod paths;
mod schema;
mod store;

pub use appender::TranscriptAppender;
pub use error::TranscriptStoreError;
pub use paths::{transcript_file_name, transcript_root};
pub use schema::{
    BlockRecord, SpeakerRecord, TranscriptHeader, TranscriptRecordType, TurnRecord,
    TurnRecordType,
};
pub use store::{now_rfc3339, TranscriptStore};
