use std::sync::Arc;
use std::time::Duration;

use chat_provider::ChatBackend;
use chat_provider_ragchat_api::{
    RagchatApiBackend, RagchatApiBackendConfig, RAGCHAT_API_BACKEND_ID,
};

mod mock;

pub use mock::MockChatBackend;

pub const DEFAULT_BACKEND_ID: &str = "mock";
pub const BACKEND_ENV_VAR: &str = "RAGCHAT_BACKEND";
pub const API_URL_ENV_VAR: &str = "RAGCHAT_API_URL";
pub const USERNAME_ENV_VAR: &str = "RAGCHAT_USERNAME";
pub const PASSWORD_ENV_VAR: &str = "RAGCHAT_PASSWORD";
pub const TIMEOUT_ENV_VAR: &str = "RAGCHAT_TIMEOUT_SEC";

pub fn backend_from_env() -> Result<Arc<dyn ChatBackend>, String> {
    let backend_id = std::env::var(BACKEND_ENV_VAR)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty());

    backend_for_id(backend_id.as_deref().unwrap_or(DEFAULT_BACKEND_ID))
}

pub fn backend_for_id(backend_id: &str) -> Result<Arc<dyn ChatBackend>, String> {
    match backend_id {
        DEFAULT_BACKEND_ID => Ok(Arc::new(MockChatBackend::default())),
        RAGCHAT_API_BACKEND_ID => Ok(Arc::new(ragchat_backend_from_env()?)),
        unknown => Err(format!(
            "Unsupported backend '{unknown}'. Available backends: {DEFAULT_BACKEND_ID}, {RAGCHAT_API_BACKEND_ID}"
        )),
    }
}

fn ragchat_backend_from_env() -> Result<RagchatApiBackend, String> {
    let username = required_env(USERNAME_ENV_VAR)?;
    let password = required_env(PASSWORD_ENV_VAR)?;

    let mut config = RagchatApiBackendConfig::new(username, password);

    if let Some(base_url) = optional_env(API_URL_ENV_VAR) {
        config = config.with_base_url(base_url);
    }

    if let Some(raw_timeout) = optional_env(TIMEOUT_ENV_VAR) {
        let seconds: u64 = raw_timeout
            .parse()
            .map_err(|_| format!("{TIMEOUT_ENV_VAR} must be a positive integer"))?;
        if seconds == 0 {
            return Err(format!("{TIMEOUT_ENV_VAR} must be > 0"));
        }
        config = config.with_timeout(Duration::from_secs(seconds));
    }

    RagchatApiBackend::new(config).map_err(|error| error.to_string())
}

fn required_env(name: &str) -> Result<String, String> {
    optional_env(name).ok_or_else(|| format!("{name} must be set for the ragchat-api backend"))
}

fn optional_env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_for_id_supports_mock() {
        let backend = backend_for_id("mock").expect("mock backend should resolve");
        assert_eq!(backend.profile().backend_id, "mock");
    }

    #[test]
    fn backend_for_id_rejects_unknown_backend() {
        let error = match backend_for_id("custom") {
            Ok(_) => panic!("unknown backends should fail"),
            Err(error) => error,
        };

        assert!(error.contains("Unsupported backend 'custom'"));
    }
}
