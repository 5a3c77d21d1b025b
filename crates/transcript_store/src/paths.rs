use std::path::{Path, PathBuf};

pub const TRANSCRIPT_DIR: [&str; 2] = [".ragchat", "transcripts"];

#[must_use]
pub fn transcript_root(base: &Path) -> PathBuf {
    base.join(TRANSCRIPT_DIR[0]).join(TRANSCRIPT_DIR[1])
}

#[must_use]
pub fn sanitize_timestamp_for_filename(timestamp: &str) -> String {
    timestamp
        .chars()
        .map(|c| match c {
            ':' | '/' | '\\' | ' ' => '-',
            _ => c,
        })
        .collect()
}

#[must_use]
pub fn transcript_file_name(created_at: &str, transcript_id: &str) -> String {
    format!(
        "{}_{}.jsonl",
        sanitize_timestamp_for_filename(created_at),
        transcript_id
    )
}
