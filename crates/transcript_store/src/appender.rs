use chat_provider::{ContentBlock, Speaker};
use uuid::Uuid;

use crate::error::TranscriptStoreError;
use crate::schema::{BlockRecord, TurnRecord};
use crate::store::{now_rfc3339, TranscriptStore};

#[derive(Debug)]
struct OpenTurn {
    speaker: Speaker,
    blocks: Vec<ContentBlock>,
}

/// Orders blocks into turns and turns into the transcript.
///
/// One turn may be open at a time. Blocks accumulate in arrival order until
/// the turn is sealed (frozen and appended, written through to the store when
/// one is attached) or discarded (nothing committed).
pub struct TranscriptAppender {
    store: Option<TranscriptStore>,
    turns: Vec<TurnRecord>,
    open_turn: Option<OpenTurn>,
}

impl Default for TranscriptAppender {
    fn default() -> Self {
        Self::new()
    }
}

impl TranscriptAppender {
    /// In-memory transcript without persistence.
    #[must_use]
    pub fn new() -> Self {
        Self {
            store: None,
            turns: Vec::new(),
            open_turn: None,
        }
    }

    /// Transcript backed by a JSONL store; previously persisted turns are
    /// visible through [`TranscriptAppender::turns`].
    #[must_use]
    pub fn with_store(store: TranscriptStore) -> Self {
        let turns = store.turns().to_vec();
        Self {
            store: Some(store),
            turns,
            open_turn: None,
        }
    }

    pub fn begin_turn(&mut self, speaker: Speaker) -> Result<(), TranscriptStoreError> {
        if self.open_turn.is_some() {
            return Err(TranscriptStoreError::TurnAlreadyOpen);
        }

        self.open_turn = Some(OpenTurn {
            speaker,
            blocks: Vec::new(),
        });
        Ok(())
    }

    pub fn append_block(&mut self, block: ContentBlock) -> Result<(), TranscriptStoreError> {
        let open_turn = self
            .open_turn
            .as_mut()
            .ok_or(TranscriptStoreError::NoOpenTurn)?;
        open_turn.blocks.push(block);
        Ok(())
    }

    /// Drops the open turn without committing anything. Returns whether a
    /// turn was actually discarded.
    pub fn discard_turn(&mut self) -> bool {
        self.open_turn.take().is_some()
    }

    /// Freezes the open turn and appends it to the transcript.
    pub fn seal_turn(&mut self) -> Result<&TurnRecord, TranscriptStoreError> {
        let open_turn = self
            .open_turn
            .take()
            .ok_or(TranscriptStoreError::NoOpenTurn)?;

        let record = TurnRecord::new(
            Uuid::new_v4().to_string(),
            now_rfc3339()?,
            open_turn.speaker.into(),
            open_turn.blocks.iter().map(BlockRecord::from_block).collect(),
        );

        if let Some(store) = self.store.as_mut() {
            store.append(record.clone())?;
        }
        self.turns.push(record);

        Ok(self.turns.last().expect("turn was just pushed"))
    }

    /// Convenience for single-shot turns (a submitted user message).
    pub fn append_whole_turn(
        &mut self,
        speaker: Speaker,
        blocks: Vec<ContentBlock>,
    ) -> Result<&TurnRecord, TranscriptStoreError> {
        self.begin_turn(speaker)?;
        for block in blocks {
            self.append_block(block)?;
        }
        self.seal_turn()
    }

    #[must_use]
    pub fn turns(&self) -> &[TurnRecord] {
        &self.turns
    }

    #[must_use]
    pub fn has_open_turn(&self) -> bool {
        self.open_turn.is_some()
    }

    #[must_use]
    pub fn open_block_count(&self) -> usize {
        self.open_turn
            .as_ref()
            .map(|turn| turn.blocks.len())
            .unwrap_or(0)
    }

    #[must_use]
    pub fn store(&self) -> Option<&TranscriptStore> {
        self.store.as_ref()
    }
}
