use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use chat_provider::{ChatBackend, ContentBlock, Speaker, TurnEvent, TurnId, TurnRequest};
use transcript_store::{TranscriptAppender, TranscriptStore};

use crate::commands::{parse_slash_command, SlashCommand};
use crate::render::BlockSink;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    Idle,
    Streaming { turn_id: TurnId },
    Exiting,
}

/// Client-side cap on stored document sources.
pub const MAX_RAG_SOURCES: usize = 10;

const HELP_TEXT: &str =
    "Commands: /help, /reset, /index, /sources, /upload <path>, /delete <name>, /quit";

/// Line-oriented client state machine.
///
/// One submitted message drives one full turn: the user turn is sealed
/// immediately, the assistant turn is opened, populated block-by-block as the
/// backend streams, and sealed (or discarded) on the terminal event. The
/// decode loop is strictly sequential, so every block is rendered before the
/// next stream fragment is processed.
pub struct App {
    backend: Arc<dyn ChatBackend>,
    sink: Box<dyn BlockSink>,
    appender: TranscriptAppender,
    transcript_base: Option<PathBuf>,
    sources: BTreeSet<String>,
    pub mode: Mode,
    next_turn_id: TurnId,
    pub should_exit: bool,
    last_error: Option<String>,
}

impl App {
    pub fn new(
        backend: Arc<dyn ChatBackend>,
        sink: Box<dyn BlockSink>,
        appender: TranscriptAppender,
        transcript_base: Option<PathBuf>,
    ) -> Self {
        Self {
            backend,
            sink,
            appender,
            transcript_base,
            sources: BTreeSet::new(),
            mode: Mode::Idle,
            next_turn_id: 1,
            should_exit: false,
            last_error: None,
        }
    }

    pub fn transcript(&self) -> &TranscriptAppender {
        &self.appender
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn known_sources(&self) -> &BTreeSet<String> {
        &self.sources
    }

    /// Entry point for one line of user input.
    pub fn handle_line(&mut self, line: &str) {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return;
        }

        match parse_slash_command(trimmed) {
            Some(command) => self.handle_command(command),
            None => self.submit_message(trimmed),
        }
    }

    fn handle_command(&mut self, command: SlashCommand) {
        match command {
            SlashCommand::Help => self.sink.notice(HELP_TEXT),
            SlashCommand::Reset => self.reset_history(),
            SlashCommand::Index => self.index_documents(),
            SlashCommand::Sources => self.refresh_sources(true),
            SlashCommand::Upload(path) => self.upload_document(&path),
            SlashCommand::Delete(name) => self.delete_source(&name),
            SlashCommand::Quit => {
                self.mode = Mode::Exiting;
                self.should_exit = true;
            }
            SlashCommand::Unknown(command) => {
                self.sink.notice(&format!("Unknown command '{command}'. {HELP_TEXT}"));
            }
        }
    }

    fn submit_message(&mut self, message: &str) {
        if !matches!(self.mode, Mode::Idle) {
            self.sink.error("Turn already active");
            return;
        }

        if let Err(error) = self
            .appender
            .append_whole_turn(Speaker::User, vec![ContentBlock::text(message)])
        {
            self.sink.error(&format!("could not record user turn: {error}"));
            return;
        }

        if let Err(error) = self.appender.begin_turn(Speaker::Assistant) {
            self.sink.error(&format!("could not open assistant turn: {error}"));
            return;
        }

        let turn_id = self.next_turn_id;
        self.next_turn_id += 1;
        self.last_error = None;

        let backend = Arc::clone(&self.backend);
        let cancel = Arc::new(AtomicBool::new(false));
        let request = TurnRequest {
            turn_id,
            message: message.to_string(),
        };

        let result = backend.send_message(request, cancel, &mut |event| self.on_turn_event(event));

        match result {
            Ok(()) => {
                if matches!(self.mode, Mode::Streaming { .. }) || self.appender.has_open_turn() {
                    // No terminal event arrived; nothing partial is committed.
                    self.abandon_turn("backend ended the turn without a terminal event");
                }
            }
            Err(error) => {
                self.abandon_turn(&format!("backend failure: {error}"));
            }
        }
    }

    fn on_turn_event(&mut self, event: TurnEvent) {
        match event {
            TurnEvent::Started { turn_id } => {
                self.mode = Mode::Streaming { turn_id };
            }
            TurnEvent::Block { block, .. } => {
                self.sink.block(&block);
                if let Err(error) = self.appender.append_block(block) {
                    self.sink.error(&format!("could not record block: {error}"));
                }
            }
            TurnEvent::Warning { warning, .. } => {
                self.sink.warning(&warning);
            }
            TurnEvent::Sealed { .. } => {
                if let Err(error) = self.appender.seal_turn() {
                    self.sink.error(&format!("could not seal turn: {error}"));
                }
                self.mode = Mode::Idle;
            }
            TurnEvent::Failed { error, .. } => {
                self.abandon_turn(&error);
            }
            TurnEvent::Cancelled { .. } => {
                self.appender.discard_turn();
                self.sink.notice("Turn cancelled; nothing was added to the transcript.");
                self.mode = Mode::Idle;
            }
        }
    }

    fn abandon_turn(&mut self, error: &str) {
        self.appender.discard_turn();
        self.sink.error(error);
        self.last_error = Some(error.to_string());
        self.mode = Mode::Idle;
    }

    fn reset_history(&mut self) {
        match self.backend.reset_session() {
            Ok(session_id) => self.sink.notice(&format!("Session reset to: {session_id}")),
            Err(error) => self.sink.notice(&error),
        }

        self.appender = self.fresh_appender();
        self.sink.notice("Chat history cleared!");
    }

    fn fresh_appender(&mut self) -> TranscriptAppender {
        let Some(base) = self.transcript_base.clone() else {
            return TranscriptAppender::new();
        };

        match TranscriptStore::create_new(&base, &self.backend.profile().backend_id) {
            Ok(store) => TranscriptAppender::with_store(store),
            Err(error) => {
                self.sink.error(&format!(
                    "could not start a new transcript file, keeping history in memory: {error}"
                ));
                TranscriptAppender::new()
            }
        }
    }

    fn index_documents(&mut self) {
        match self.backend.index_documents() {
            Ok(message) => self.sink.notice(&message),
            Err(error) => self.sink.error(&error),
        }

        self.refresh_sources(false);
    }

    fn refresh_sources(&mut self, announce: bool) {
        match self.backend.list_sources() {
            Ok(sources) => {
                self.sources = sources.into_iter().collect();
                if announce {
                    if self.sources.is_empty() {
                        self.sink.notice("No RAG sources found.");
                    } else {
                        let listing: Vec<String> = self
                            .sources
                            .iter()
                            .map(|source| format!("- {source}"))
                            .collect();
                        self.sink
                            .notice(&format!("Current RAG sources:\n{}", listing.join("\n")));
                    }
                }
            }
            Err(error) => {
                if announce {
                    self.sink.notice(&error);
                }
            }
        }
    }

    fn upload_document(&mut self, path: &str) {
        if self.sources.len() >= MAX_RAG_SOURCES {
            self.sink.error(&format!(
                "Maximum number of documents reached ({MAX_RAG_SOURCES})."
            ));
            return;
        }

        let Some(file_name) = Path::new(path)
            .file_name()
            .and_then(|name| name.to_str())
            .map(str::to_string)
        else {
            self.sink.error(&format!("'{path}' has no usable file name"));
            return;
        };

        if self.sources.contains(&file_name) {
            self.sink.notice(&format!("'{file_name}' is already uploaded."));
            return;
        }

        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(error) => {
                self.sink.error(&format!("could not read '{path}': {error}"));
                return;
            }
        };

        match self.backend.upload_document(&file_name, bytes) {
            Ok(()) => {
                self.sources.insert(file_name.clone());
                self.sink.notice(&format!("Uploaded and indexed: {file_name}"));
            }
            Err(error) => self.sink.error(&format!("Failed to upload {file_name}: {error}")),
        }
    }

    fn delete_source(&mut self, name: &str) {
        match self.backend.delete_source(name) {
            Ok(()) => {
                self.sources.remove(name);
                self.sink.notice(&format!("Deleted: {name}"));
            }
            Err(error) => self.sink.error(&format!("Failed to delete {name}: {error}")),
        }
    }
}
