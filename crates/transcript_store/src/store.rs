use std::collections::HashSet;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::TranscriptStoreError;
use crate::paths::{transcript_file_name, transcript_root};
use crate::schema::{JsonLine, TranscriptHeader, TurnRecord};

/// Append-only JSONL persistence for one conversation transcript.
///
/// The file holds one header line followed by one line per sealed turn, in
/// seal order. Records are never rewritten.
#[derive(Debug)]
pub struct TranscriptStore {
    pub(crate) path: PathBuf,
    pub(crate) file: File,
    pub(crate) header: TranscriptHeader,
    pub(crate) turns: Vec<TurnRecord>,
    pub(crate) seen_ids: HashSet<String>,
}

impl TranscriptStore {
    /// Creates a fresh transcript file under `base/.ragchat/transcripts/`.
    pub fn create_new(base: &Path, backend: &str) -> Result<Self, TranscriptStoreError> {
        let created_at = now_rfc3339()?;
        let transcript_id = Uuid::new_v4().to_string();

        let root = transcript_root(base);
        fs::create_dir_all(&root)
            .map_err(|source| TranscriptStoreError::io("creating transcript dir", &root, source))?;

        let path = root.join(transcript_file_name(&created_at, &transcript_id));
        let header = TranscriptHeader::v1(transcript_id, created_at, backend);

        let mut file = OpenOptions::new()
            .create_new(true)
            .append(true)
            .open(&path)
            .map_err(|source| {
                TranscriptStoreError::io("creating transcript file", &path, source)
            })?;
        write_record(&mut file, &path, &header)?;

        Ok(Self {
            path,
            file,
            header,
            turns: Vec::new(),
            seen_ids: HashSet::new(),
        })
    }

    pub fn open(path: &Path) -> Result<Self, TranscriptStoreError> {
        let path = path.to_path_buf();
        let read_file = File::open(&path)
            .map_err(|source| TranscriptStoreError::io("opening transcript file", &path, source))?;
        let reader = BufReader::new(read_file);

        let mut header: Option<TranscriptHeader> = None;
        let mut turns: Vec<TurnRecord> = Vec::new();
        let mut seen_ids = HashSet::new();

        for (line_index, line_result) in reader.lines().enumerate() {
            let line_number = line_index + 1;
            let line = line_result
                .map_err(|source| TranscriptStoreError::io_line(&path, line_number, source))?;
            let parsed = parse_json_line(&path, line_number, &line)?;

            if line_number == 1 {
                match parsed {
                    JsonLine::Transcript(parsed_header) => {
                        validate_header_line(&path, line_number, &parsed_header)?;
                        header = Some(parsed_header);
                    }
                    JsonLine::Turn(_) => {
                        return Err(TranscriptStoreError::InvalidHeaderRecord {
                            path,
                            line: line_number,
                        });
                    }
                }

                continue;
            }

            match parsed {
                JsonLine::Transcript(_) => {
                    return Err(TranscriptStoreError::InvalidTurnRecord {
                        path,
                        line: line_number,
                    });
                }
                JsonLine::Turn(turn) => {
                    validate_turn_line(&path, line_number, &turn)?;
                    if !seen_ids.insert(turn.id.clone()) {
                        return Err(TranscriptStoreError::DuplicateTurnId {
                            path,
                            line: line_number,
                            id: turn.id,
                        });
                    }
                    turns.push(turn);
                }
            }
        }

        let header =
            header.ok_or_else(|| TranscriptStoreError::MissingHeader { path: path.clone() })?;

        let file = OpenOptions::new()
            .append(true)
            .open(&path)
            .map_err(|source| {
                TranscriptStoreError::io("opening transcript file for append", &path, source)
            })?;

        Ok(Self {
            path,
            file,
            header,
            turns,
            seen_ids,
        })
    }

    /// Appends one sealed turn, persisting it before it becomes visible.
    pub fn append(&mut self, turn: TurnRecord) -> Result<&TurnRecord, TranscriptStoreError> {
        if self.seen_ids.contains(&turn.id) {
            return Err(TranscriptStoreError::DuplicateTurnId {
                path: self.path.clone(),
                line: self.turns.len() + 2,
                id: turn.id,
            });
        }

        write_record(&mut self.file, &self.path, &turn)?;
        self.seen_ids.insert(turn.id.clone());
        self.turns.push(turn);

        Ok(self.turns.last().expect("turn was just pushed"))
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn header(&self) -> &TranscriptHeader {
        &self.header
    }

    #[must_use]
    pub fn turns(&self) -> &[TurnRecord] {
        &self.turns
    }
}

/// Current UTC timestamp in the transcript's on-disk format.
pub fn now_rfc3339() -> Result<String, TranscriptStoreError> {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .map_err(TranscriptStoreError::ClockFormat)
}

fn write_record<T: serde::Serialize>(
    file: &mut File,
    path: &Path,
    record: &T,
) -> Result<(), TranscriptStoreError> {
    let line = serde_json::to_string(record)
        .map_err(|source| TranscriptStoreError::json_serialize(path, source))?;
    writeln!(file, "{line}")
        .map_err(|source| TranscriptStoreError::io("appending transcript line", path, source))?;
    file.flush()
        .map_err(|source| TranscriptStoreError::io("flushing transcript file", path, source))
}

pub(crate) fn parse_json_line(
    path: &Path,
    line_number: usize,
    line: &str,
) -> Result<JsonLine, TranscriptStoreError> {
    serde_json::from_str::<JsonLine>(line)
        .map_err(|source| TranscriptStoreError::json_line(path, line_number, source))
}

pub(crate) fn validate_header_line(
    path: &Path,
    line_number: usize,
    header: &TranscriptHeader,
) -> Result<(), TranscriptStoreError> {
    if header.version != 1 {
        return Err(TranscriptStoreError::UnsupportedVersion {
            path: path.to_path_buf(),
            line: line_number,
            found: header.version,
        });
    }

    validate_rfc3339(path, line_number, "created_at", &header.created_at)
}

pub(crate) fn validate_turn_line(
    path: &Path,
    line_number: usize,
    turn: &TurnRecord,
) -> Result<(), TranscriptStoreError> {
    validate_rfc3339(path, line_number, "ts", &turn.ts)
}

pub(crate) fn validate_rfc3339(
    path: &Path,
    line_number: usize,
    field: &'static str,
    value: &str,
) -> Result<(), TranscriptStoreError> {
    if OffsetDateTime::parse(value, &Rfc3339).is_err() {
        return Err(TranscriptStoreError::InvalidTimestamp {
            path: path.to_path_buf(),
            line: line_number,
            field,
            value: value.to_string(),
        });
    }

    Ok(())
}
