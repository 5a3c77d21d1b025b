use std::fmt;

use serde_json::Value;

/// Caption used when an image block carries no usable `alt_text`.
pub const DEFAULT_IMAGE_ALT_TEXT: &str = "Generated Image";

/// One fully decoded wire block.
///
/// Image payloads are base64 on the wire; `content` here is the decoded bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamBlock {
    Text { content: String },
    Image { content: Vec<u8>, alt_text: String },
}

/// Why a parsed JSON value could not be dispatched as a block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockDefect {
    NotAnObject,
    MissingType,
    UnknownType(String),
    MissingContent(&'static str),
    InvalidImageData(String),
}

impl fmt::Display for BlockDefect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotAnObject => write!(f, "value is not a JSON object"),
            Self::MissingType => write!(f, "missing 'type' discriminator"),
            Self::UnknownType(found) => write!(f, "unrecognized type '{found}'"),
            Self::MissingContent(block_type) => {
                write!(f, "'{block_type}' block lacks a string 'content' field")
            }
            Self::InvalidImageData(message) => {
                write!(f, "image content is not valid base64: {message}")
            }
        }
    }
}

/// A value that parsed as JSON but was rejected by the dispatcher.
///
/// The payload is retained for caller-side reporting, never rendered.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedBlock {
    pub defect: BlockDefect,
    pub payload: Value,
}

/// Decoder output for one complete JSON value pulled off the stream.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamItem {
    Block(StreamBlock),
    Skipped(SkippedBlock),
}
