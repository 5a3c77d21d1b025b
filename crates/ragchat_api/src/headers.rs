use std::collections::BTreeMap;

use base64::{engine::general_purpose, Engine as _};

use crate::config::ChatApiConfig;
use crate::error::ChatApiError;

pub const HEADER_ACCEPT: &str = "accept";
pub const HEADER_AUTHORIZATION: &str = "authorization";
pub const HEADER_USER_AGENT: &str = "User-Agent";

/// Build a deterministic header map for chat backend requests.
///
/// Content-type is owned by the request body builder (JSON vs multipart), so
/// it is deliberately absent here.
pub fn build_headers(
    config: &ChatApiConfig,
    user_agent: Option<&str>,
) -> Result<BTreeMap<String, String>, ChatApiError> {
    let mut headers = BTreeMap::new();

    if config.username.trim().is_empty() {
        return Err(ChatApiError::MissingCredentials);
    }

    headers.insert(
        HEADER_AUTHORIZATION.to_owned(),
        basic_authorization(config.username.trim(), &config.password),
    );
    headers.insert(HEADER_ACCEPT.to_owned(), "application/json".to_owned());

    let ua = match (user_agent, config.user_agent.as_deref()) {
        (Some(explicit), _) if !explicit.trim().is_empty() => explicit.trim().to_owned(),
        (None, Some(explicit)) if !explicit.trim().is_empty() => explicit.trim().to_owned(),
        _ => default_user_agent(),
    };
    headers.insert(HEADER_USER_AGENT.to_owned(), ua);

    for (key, value) in &config.extra_headers {
        headers.insert(key.trim().to_ascii_lowercase(), value.trim().to_owned());
    }

    Ok(headers)
}

/// RFC 7617 `Basic` credential pair encoding.
pub fn basic_authorization(username: &str, password: &str) -> String {
    let pair = format!("{username}:{password}");
    format!("Basic {}", general_purpose::STANDARD.encode(pair))
}

fn default_user_agent() -> String {
    match runtime_os_triplet() {
        Some((platform, release, arch)) => format!("ragchat ({platform} {release}; {arch})"),
        None => "ragchat".to_owned(),
    }
}

fn normalize_arch(arch: &str) -> String {
    match arch.to_ascii_lowercase().as_str() {
        "x86_64" | "amd64" => "x64".to_owned(),
        "x86" | "i386" | "i686" => "ia32".to_owned(),
        "aarch64" => "arm64".to_owned(),
        normalized => normalized.to_owned(),
    }
}

#[cfg(unix)]
fn runtime_os_triplet() -> Option<(String, String, String)> {
    use std::ffi::CStr;
    use std::mem::MaybeUninit;

    let mut raw = MaybeUninit::<libc::utsname>::uninit();
    // SAFETY: `uname` initializes the provided `utsname` struct on success.
    let rc = unsafe { libc::uname(raw.as_mut_ptr()) };
    if rc != 0 {
        return None;
    }

    // SAFETY: We checked `uname` returned success, so `raw` is initialized.
    let raw = unsafe { raw.assume_init() };
    // SAFETY: `uname` provides NUL-terminated fixed-size C strings.
    let platform = unsafe { CStr::from_ptr(raw.sysname.as_ptr()) }
        .to_string_lossy()
        .to_lowercase();
    // SAFETY: `uname` provides NUL-terminated fixed-size C strings.
    let release = unsafe { CStr::from_ptr(raw.release.as_ptr()) }
        .to_string_lossy()
        .into_owned();
    // SAFETY: `uname` provides NUL-terminated fixed-size C strings.
    let arch = unsafe { CStr::from_ptr(raw.machine.as_ptr()) }.to_string_lossy();
    let arch = normalize_arch(&arch);

    if platform.is_empty() || release.is_empty() || arch.is_empty() {
        None
    } else {
        Some((platform, release, arch))
    }
}

#[cfg(not(unix))]
fn runtime_os_triplet() -> Option<(String, String, String)> {
    None
}
