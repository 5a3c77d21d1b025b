use base64::{engine::general_purpose, Engine as _};
use chat_provider::{ContentBlock, Speaker};
use serde::{Deserialize, Serialize};

use crate::error::TranscriptStoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TranscriptRecordType {
    Transcript,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnRecordType {
    Turn,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TranscriptHeader {
    #[serde(rename = "type")]
    pub record_type: TranscriptRecordType,
    pub version: u32,
    pub transcript_id: String,
    pub created_at: String,
    pub backend: String,
}

impl TranscriptHeader {
    #[must_use]
    pub fn v1(
        transcript_id: impl Into<String>,
        created_at: impl Into<String>,
        backend: impl Into<String>,
    ) -> Self {
        Self {
            record_type: TranscriptRecordType::Transcript,
            version: 1,
            transcript_id: transcript_id.into(),
            created_at: created_at.into(),
            backend: backend.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpeakerRecord {
    User,
    Assistant,
}

impl From<Speaker> for SpeakerRecord {
    fn from(speaker: Speaker) -> Self {
        match speaker {
            Speaker::User => Self::User,
            Speaker::Assistant => Self::Assistant,
        }
    }
}

impl From<SpeakerRecord> for Speaker {
    fn from(record: SpeakerRecord) -> Self {
        match record {
            SpeakerRecord::User => Self::User,
            SpeakerRecord::Assistant => Self::Assistant,
        }
    }
}

/// Stored form of one content block, matching the wire shape: image bytes are
/// re-encoded as base64 strings so transcript files stay line-oriented JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase", deny_unknown_fields)]
pub enum BlockRecord {
    Text {
        content: String,
    },
    Image {
        content: String,
        #[serde(default)]
        alt_text: String,
    },
}

impl BlockRecord {
    #[must_use]
    pub fn from_block(block: &ContentBlock) -> Self {
        match block {
            ContentBlock::Text { content } => Self::Text {
                content: content.clone(),
            },
            ContentBlock::Image { content, alt_text } => Self::Image {
                content: general_purpose::STANDARD.encode(content),
                alt_text: alt_text.clone(),
            },
        }
    }

    pub fn to_block(&self) -> Result<ContentBlock, TranscriptStoreError> {
        match self {
            Self::Text { content } => Ok(ContentBlock::text(content.clone())),
            Self::Image { content, alt_text } => {
                let bytes = general_purpose::STANDARD.decode(content).map_err(|source| {
                    TranscriptStoreError::InvalidImageData { source }
                })?;
                Ok(ContentBlock::image(bytes, alt_text.clone()))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TurnRecord {
    #[serde(rename = "type")]
    pub record_type: TurnRecordType,
    pub id: String,
    pub ts: String,
    pub speaker: SpeakerRecord,
    pub blocks: Vec<BlockRecord>,
}

impl TurnRecord {
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        ts: impl Into<String>,
        speaker: SpeakerRecord,
        blocks: Vec<BlockRecord>,
    ) -> Self {
        Self {
            record_type: TurnRecordType::Turn,
            id: id.into(),
            ts: ts.into(),
            speaker,
            blocks,
        }
    }
}

/// One parsed transcript file line. Variants are distinguished by their own
/// `type` field, so each record serializes standalone.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub(crate) enum JsonLine {
    Transcript(TranscriptHeader),
    Turn(TurnRecord),
}
