/// Default base URL for the chat backend.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// Normalize a configured base URL.
///
/// Empty input falls back to the default; trailing slashes are stripped so
/// endpoint joins never produce `//`.
pub fn normalize_base_url(input: &str) -> String {
    let base = if input.trim().is_empty() {
        DEFAULT_BASE_URL
    } else {
        input.trim()
    };

    base.trim_end_matches('/').to_string()
}

pub fn chat_url(base: &str) -> String {
    format!("{}/chat", normalize_base_url(base))
}

pub fn login_url(base: &str) -> String {
    format!("{}/login", normalize_base_url(base))
}

pub fn session_url(base: &str) -> String {
    format!("{}/session_id", normalize_base_url(base))
}

pub fn index_url(base: &str) -> String {
    format!("{}/index", normalize_base_url(base))
}

pub fn sources_url(base: &str) -> String {
    format!("{}/rag_sources", normalize_base_url(base))
}

pub fn upload_url(base: &str) -> String {
    format!("{}/upload_files", normalize_base_url(base))
}

pub fn delete_source_url(base: &str) -> String {
    format!("{}/delete_rag_source", normalize_base_url(base))
}
