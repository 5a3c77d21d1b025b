use std::sync::atomic::Ordering;
use std::thread;
use std::time::Duration;

use chat_provider::{
    BackendProfile, CancelSignal, ChatBackend, ContentBlock, TurnEvent, TurnRequest,
};

/// Deterministic offline backend used for local runs and tests.
///
/// Emits a fixed block sequence with small delays so progressive rendering is
/// visible without a live backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockChatBackend {
    blocks: Vec<ContentBlock>,
}

// Smallest well-formed PNG: 1x1 transparent pixel.
const MOCK_IMAGE_BYTES: &[u8] = &[
    0x89, 0x50, 0x4e, 0x47, 0x0d, 0x0a, 0x1a, 0x0a, 0x00, 0x00, 0x00, 0x0d, 0x49, 0x48, 0x44,
    0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1f,
    0x15, 0xc4, 0x89, 0x00, 0x00, 0x00, 0x0a, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9c, 0x63, 0x00,
    0x01, 0x00, 0x00, 0x05, 0x00, 0x01, 0x0d, 0x0a, 0x2d, 0xb4, 0x00, 0x00, 0x00, 0x00, 0x49,
    0x45, 0x4e, 0x44, 0xae, 0x42, 0x60, 0x82,
];

impl MockChatBackend {
    #[must_use]
    pub fn new(blocks: Vec<ContentBlock>) -> Self {
        Self { blocks }
    }

    const BLOCK_DELAY_MS: u64 = 150;
}

impl Default for MockChatBackend {
    fn default() -> Self {
        Self {
            blocks: vec![
                ContentBlock::text("## Mocked retrieval answer\n"),
                ContentBlock::text(
                    "- No backend is configured, so this reply is **canned**.\n",
                ),
                ContentBlock::text(
                    "- Set `RAGCHAT_BACKEND=ragchat-api` to talk to a real server.\n",
                ),
                ContentBlock::image(MOCK_IMAGE_BYTES.to_vec(), "Placeholder pixel"),
                ContentBlock::text("Done.\n"),
            ],
        }
    }
}

impl ChatBackend for MockChatBackend {
    fn profile(&self) -> BackendProfile {
        BackendProfile {
            backend_id: "mock".to_string(),
            endpoint: "offline".to_string(),
        }
    }

    fn send_message(
        &self,
        req: TurnRequest,
        cancel: CancelSignal,
        emit: &mut dyn FnMut(TurnEvent),
    ) -> Result<(), String> {
        let turn_id = req.turn_id;
        let _ = req.message;

        emit(TurnEvent::Started { turn_id });

        for block in &self.blocks {
            if cancel.load(Ordering::Acquire) {
                emit(TurnEvent::Cancelled { turn_id });
                return Ok(());
            }

            thread::sleep(Duration::from_millis(Self::BLOCK_DELAY_MS));
            emit(TurnEvent::Block {
                turn_id,
                block: block.clone(),
            });
        }

        if cancel.load(Ordering::Acquire) {
            emit(TurnEvent::Cancelled { turn_id });
        } else {
            emit(TurnEvent::Sealed { turn_id });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;

    use super::*;

    #[test]
    fn mock_backend_emits_started_blocks_and_sealed() {
        let backend = MockChatBackend::new(vec![
            ContentBlock::text("a"),
            ContentBlock::text("b"),
        ]);
        let cancel = Arc::new(AtomicBool::new(false));
        let mut events = Vec::new();

        backend
            .send_message(
                TurnRequest {
                    turn_id: 3,
                    message: "hi".to_string(),
                },
                cancel,
                &mut |event| events.push(event),
            )
            .expect("mock send should succeed");

        assert!(matches!(events.first(), Some(TurnEvent::Started { turn_id: 3 })));
        assert_eq!(
            events
                .iter()
                .filter(|event| matches!(event, TurnEvent::Block { .. }))
                .count(),
            2
        );
        assert!(matches!(events.last(), Some(TurnEvent::Sealed { turn_id: 3 })));
    }

    #[test]
    fn cancelled_mock_turn_ends_in_cancelled() {
        let backend = MockChatBackend::default();
        let cancel = Arc::new(AtomicBool::new(true));
        let mut events = Vec::new();

        backend
            .send_message(
                TurnRequest {
                    turn_id: 4,
                    message: "hi".to_string(),
                },
                cancel,
                &mut |event| events.push(event),
            )
            .expect("mock send should succeed");

        assert!(matches!(
            events.last(),
            Some(TurnEvent::Cancelled { turn_id: 4 })
        ));
        assert!(!events
            .iter()
            .any(|event| matches!(event, TurnEvent::Block { .. })));
    }
}
