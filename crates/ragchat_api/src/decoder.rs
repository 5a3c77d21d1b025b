use base64::{engine::general_purpose, Engine as _};
use serde_json::Value;

use crate::blocks::{BlockDefect, SkippedBlock, StreamBlock, StreamItem, DEFAULT_IMAGE_ALT_TEXT};

/// Verdict returned when the transport signals end-of-stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamStatus {
    Complete,
    /// Bytes remained that never completed a JSON value. They are dropped,
    /// never rendered, never stored.
    Truncated { pending_bytes: usize },
}

/// Incremental decoder for an unframed stream of concatenated JSON values.
///
/// The buffer accumulates raw response bytes; every `feed` drains as many
/// complete values off the front as the buffer holds and retains the
/// unfinished tail untouched. Incompleteness is detected only by parse
/// failure; there is no partial-value introspection.
#[derive(Debug, Default)]
pub struct BlockStreamDecoder {
    buffer: Vec<u8>,
}

impl BlockStreamDecoder {
    /// Feed arbitrary bytes into the decoder and drain complete blocks.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<StreamItem> {
        self.buffer.extend_from_slice(bytes);
        self.drain_complete()
    }

    fn drain_complete(&mut self) -> Vec<StreamItem> {
        let mut items = Vec::new();
        let mut consumed = 0usize;

        {
            let mut values = serde_json::Deserializer::from_slice(&self.buffer).into_iter::<Value>();
            loop {
                match values.next() {
                    Some(Ok(value)) => {
                        consumed = values.byte_offset();
                        items.push(dispatch_block(value));
                    }
                    // A failed or absent parse leaves the tail for the next
                    // fragment; end-of-stream decides whether it was truncated.
                    Some(Err(_)) | None => break,
                }
            }
        }

        self.buffer.drain(..consumed);
        items
    }

    /// Final parse attempt once the transport signals end-of-stream.
    ///
    /// Any items still completable are returned; a residual tail is reported
    /// as truncation and discarded.
    pub fn finish(&mut self) -> (Vec<StreamItem>, StreamStatus) {
        let items = self.drain_complete();

        let status = if self.is_empty_buffer() {
            StreamStatus::Complete
        } else {
            StreamStatus::Truncated {
                pending_bytes: self.buffer.len(),
            }
        };
        self.buffer.clear();

        (items, status)
    }

    /// Decode a complete response body in one shot.
    pub fn decode_all(input: &[u8]) -> (Vec<StreamItem>, StreamStatus) {
        let mut decoder = Self::default();
        let mut items = decoder.feed(input);
        let (tail, status) = decoder.finish();
        items.extend(tail);
        (items, status)
    }

    pub fn is_empty_buffer(&self) -> bool {
        self.buffer.iter().all(u8::is_ascii_whitespace)
    }

    pub fn pending_bytes(&self) -> usize {
        self.buffer.len()
    }
}

/// Map one parsed JSON value to a typed block.
///
/// Rejections are reported, not dropped: the caller decides how to surface
/// them, and decoding of subsequent values continues either way.
fn dispatch_block(value: Value) -> StreamItem {
    let Some(fields) = value.as_object() else {
        return skipped(BlockDefect::NotAnObject, value);
    };

    let Some(block_type) = fields.get("type").and_then(Value::as_str) else {
        return skipped(BlockDefect::MissingType, value);
    };

    match block_type {
        "text" => {
            let Some(content) = fields.get("content").and_then(Value::as_str) else {
                return skipped(BlockDefect::MissingContent("text"), value);
            };
            StreamItem::Block(StreamBlock::Text {
                content: content.to_owned(),
            })
        }
        "image" => {
            let Some(encoded) = fields.get("content").and_then(Value::as_str) else {
                return skipped(BlockDefect::MissingContent("image"), value);
            };
            let content = match general_purpose::STANDARD.decode(encoded) {
                Ok(bytes) => bytes,
                Err(error) => {
                    return skipped(BlockDefect::InvalidImageData(error.to_string()), value)
                }
            };
            let alt_text = fields
                .get("alt_text")
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|text| !text.is_empty())
                .unwrap_or(DEFAULT_IMAGE_ALT_TEXT)
                .to_owned();
            StreamItem::Block(StreamBlock::Image { content, alt_text })
        }
        other => skipped(BlockDefect::UnknownType(other.to_owned()), value),
    }
}

fn skipped(defect: BlockDefect, payload: Value) -> StreamItem {
    StreamItem::Skipped(SkippedBlock { defect, payload })
}
