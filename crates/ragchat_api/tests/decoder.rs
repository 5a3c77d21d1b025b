use base64::{engine::general_purpose, Engine as _};
use ragchat_api::{BlockDefect, BlockStreamDecoder, StreamBlock, StreamItem, StreamStatus};

const TWO_BLOCK_WIRE: &[u8] =
    br#"{"type":"text","content":"Hello"}{"type":"image","content":"aGk=","alt_text":"x"}"#;

fn blocks_of(items: &[StreamItem]) -> Vec<StreamBlock> {
    items
        .iter()
        .filter_map(|item| match item {
            StreamItem::Block(block) => Some(block.clone()),
            StreamItem::Skipped(_) => None,
        })
        .collect()
}

fn wire_for(count: usize) -> Vec<u8> {
    let mut wire = Vec::new();
    for index in 0..count {
        wire.extend_from_slice(
            format!(r#"{{"type":"text","content":"block {index}"}}"#).as_bytes(),
        );
    }
    wire
}

#[test]
fn single_shot_yields_every_block_in_source_order() {
    let wire = wire_for(5);
    let (items, status) = BlockStreamDecoder::decode_all(&wire);

    assert_eq!(status, StreamStatus::Complete);
    let blocks = blocks_of(&items);
    assert_eq!(blocks.len(), 5);
    for (index, block) in blocks.iter().enumerate() {
        assert_eq!(
            block,
            &StreamBlock::Text {
                content: format!("block {index}"),
            }
        );
    }
}

#[test]
fn fragmentation_boundaries_never_change_the_decoded_sequence() {
    let wire = wire_for(3);
    let (expected_items, expected_status) = BlockStreamDecoder::decode_all(&wire);

    // Every split point of the byte sequence into two fragments.
    for split in 0..=wire.len() {
        let mut decoder = BlockStreamDecoder::default();
        let mut items = decoder.feed(&wire[..split]);
        items.extend(decoder.feed(&wire[split..]));
        let (tail, status) = decoder.finish();
        items.extend(tail);

        assert_eq!(items, expected_items, "split at byte {split}");
        assert_eq!(status, expected_status, "split at byte {split}");
    }
}

#[test]
fn one_byte_at_a_time_matches_single_shot() {
    let wire = wire_for(3);
    let (expected_items, _) = BlockStreamDecoder::decode_all(&wire);

    let mut decoder = BlockStreamDecoder::default();
    let mut items = Vec::new();
    for byte in &wire {
        items.extend(decoder.feed(std::slice::from_ref(byte)));
    }
    let (tail, status) = decoder.finish();
    items.extend(tail);

    assert_eq!(items, expected_items);
    assert_eq!(status, StreamStatus::Complete);
}

#[test]
fn truncation_at_any_offset_keeps_completed_blocks_and_warns() {
    let wire = wire_for(3);
    let (complete_items, _) = BlockStreamDecoder::decode_all(&wire);
    let boundary = wire.len() - wire_for(1).len();

    // Cut anywhere inside the final block, short of its last byte.
    for cut in boundary + 1..wire.len() {
        let (items, status) = BlockStreamDecoder::decode_all(&wire[..cut]);

        assert_eq!(items, complete_items[..2], "cut at byte {cut}");
        assert_eq!(
            status,
            StreamStatus::Truncated {
                pending_bytes: cut - boundary,
            },
            "cut at byte {cut}"
        );
    }
}

#[test]
fn unrecognized_type_is_skipped_and_reported_between_valid_blocks() {
    let wire = concat!(
        r#"{"type":"text","content":"before"}"#,
        r#"{"type":"chart","content":"series"}"#,
        r#"{"type":"text","content":"after"}"#,
    );
    let (items, status) = BlockStreamDecoder::decode_all(wire.as_bytes());

    assert_eq!(status, StreamStatus::Complete);
    assert_eq!(items.len(), 3);
    assert_eq!(
        blocks_of(&items),
        vec![
            StreamBlock::Text {
                content: "before".to_string(),
            },
            StreamBlock::Text {
                content: "after".to_string(),
            },
        ]
    );

    let StreamItem::Skipped(skipped) = &items[1] else {
        panic!("middle item should be skipped");
    };
    assert_eq!(skipped.defect, BlockDefect::UnknownType("chart".to_string()));
    assert_eq!(skipped.payload["content"], "series");
}

#[test]
fn missing_type_and_missing_content_are_block_level_defects() {
    let wire = concat!(
        r#"{"content":"orphan"}"#,
        r#"{"type":"text"}"#,
        r#"{"type":"image","content":"@@not-base64@@"}"#,
        r#"[1,2,3]"#,
    );
    let (items, status) = BlockStreamDecoder::decode_all(wire.as_bytes());

    assert_eq!(status, StreamStatus::Complete);
    assert_eq!(items.len(), 4);
    let defects: Vec<_> = items
        .iter()
        .map(|item| match item {
            StreamItem::Skipped(skipped) => skipped.defect.clone(),
            StreamItem::Block(block) => panic!("unexpected block: {block:?}"),
        })
        .collect();

    assert_eq!(defects[0], BlockDefect::MissingType);
    assert_eq!(defects[1], BlockDefect::MissingContent("text"));
    assert!(matches!(defects[2], BlockDefect::InvalidImageData(_)));
    assert_eq!(defects[3], BlockDefect::NotAnObject);
}

#[test]
fn image_bytes_round_trip_through_base64() {
    let original = b"\x89PNG\r\n\x1a\nimage-payload";
    let encoded = general_purpose::STANDARD.encode(original);
    let wire = format!(r#"{{"type":"image","content":"{encoded}","alt_text":"diagram"}}"#);

    let (items, _) = BlockStreamDecoder::decode_all(wire.as_bytes());
    let StreamItem::Block(StreamBlock::Image { content, alt_text }) = &items[0] else {
        panic!("expected an image block");
    };

    assert_eq!(content.as_slice(), original);
    assert_eq!(alt_text, "diagram");
    assert_eq!(general_purpose::STANDARD.encode(content), encoded);
}

#[test]
fn image_alt_text_defaults_when_absent_or_empty() {
    let wire = concat!(
        r#"{"type":"image","content":"aGk="}"#,
        r#"{"type":"image","content":"aGk=","alt_text":"  "}"#,
    );
    let (items, _) = BlockStreamDecoder::decode_all(wire.as_bytes());

    for item in &items {
        let StreamItem::Block(StreamBlock::Image { alt_text, .. }) = item else {
            panic!("expected image blocks");
        };
        assert_eq!(alt_text, "Generated Image");
    }
}

#[test]
fn three_fragment_delivery_decodes_text_then_image() {
    let mut decoder = BlockStreamDecoder::default();
    let mut items = Vec::new();

    items.extend(decoder.feed(&TWO_BLOCK_WIRE[..10]));
    assert!(items.is_empty());
    items.extend(decoder.feed(&TWO_BLOCK_WIRE[10..50]));
    items.extend(decoder.feed(&TWO_BLOCK_WIRE[50..]));
    let (tail, status) = decoder.finish();
    items.extend(tail);

    assert_eq!(status, StreamStatus::Complete);
    assert_eq!(
        blocks_of(&items),
        vec![
            StreamBlock::Text {
                content: "Hello".to_string(),
            },
            StreamBlock::Image {
                content: b"hi".to_vec(),
                alt_text: "x".to_string(),
            },
        ]
    );
}

#[test]
fn truncated_tail_is_dropped_after_finish() {
    let mut decoder = BlockStreamDecoder::default();
    let items = decoder.feed(br#"{"type":"text","content":"kept"}{"type":"te"#);
    assert_eq!(items.len(), 1);
    assert_eq!(decoder.pending_bytes(), 11);

    let (tail, status) = decoder.finish();
    assert!(tail.is_empty());
    assert_eq!(status, StreamStatus::Truncated { pending_bytes: 11 });
    assert_eq!(decoder.pending_bytes(), 0);

    // A decoder is per-turn state; after finish it starts clean.
    let items = decoder.feed(br#"{"type":"text","content":"next turn"}"#);
    assert_eq!(items.len(), 1);
}

#[test]
fn whitespace_between_values_is_tolerated() {
    let wire = b"{\"type\":\"text\",\"content\":\"a\"}\n {\"type\":\"text\",\"content\":\"b\"} \n";
    let (items, status) = BlockStreamDecoder::decode_all(wire);

    assert_eq!(status, StreamStatus::Complete);
    assert_eq!(blocks_of(&items).len(), 2);
}
