//! Resolves backend endpoints from the process environment.

use crate::types::{BackendKind, EndpointConfig};
use std::time::Duration;

/// Model name of the local Ollama backend.
pub const LOCAL_MODEL_NAME_ENV_VAR: &str = "LOCAL_MODEL_NAME";
/// Base URL of the local Ollama backend.
pub const LOCAL_MODEL_URL_ENV_VAR: &str = "LOCAL_MODEL_URL";
/// Model name of the Kimi backend.
pub const KIMI_MODEL_NAME_ENV_VAR: &str = "KIMI_MODEL_NAME";
/// Base URL of the Kimi backend.
pub const KIMI_MODEL_URL_ENV_VAR: &str = "KIMI_MODEL_URL";
/// API key of the Kimi backend.
pub const KIMI_MODEL_KEY_ENV_VAR: &str = "KIMI_MODEL_KEY";
/// Model name of the DashScope backend.
pub const QWEN_MODEL_NAME_ENV_VAR: &str = "QWEN_MODEL_NAME";
/// Base URL of the DashScope backend.
pub const QWEN_MODEL_URL_ENV_VAR: &str = "QWEN_MODEL_URL";
/// API key of the DashScope backend.
pub const QWEN_KEY_ENV_VAR: &str = "QWEN_KEY";
/// Per-call guard timeout in seconds.
pub const MAX_TIMEOUT_ENV_VAR: &str = "MAX_TIMEOUT";

/// Guard timeout used when `MAX_TIMEOUT` is unset or unparsable.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

/// Resolves the endpoint for `kind` from the environment.
///
/// Resolution order per setting:
/// 1. The backend's environment variable, if set and non-blank.
/// 2. The documented default.
#[must_use]
pub fn resolve_endpoint(kind: BackendKind) -> EndpointConfig {
    resolve_endpoint_with(kind, |name| std::env::var(name).ok())
}

/// Same as [`resolve_endpoint`] with an injectable variable lookup.
pub fn resolve_endpoint_with<F>(kind: BackendKind, lookup: F) -> EndpointConfig
where
    F: Fn(&str) -> Option<String>,
{
    let get = |name: &str, default: &str| {
        lookup(name)
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| default.to_string())
    };

    match kind {
        BackendKind::LocalQwen => EndpointConfig::new(
            kind,
            get(LOCAL_MODEL_URL_ENV_VAR, "http://localhost:11434"),
            get(LOCAL_MODEL_NAME_ENV_VAR, "qwen3:8b"),
        ),
        BackendKind::Kimi => EndpointConfig::new(
            kind,
            get(KIMI_MODEL_URL_ENV_VAR, "https://api.moonshot.cn/v1"),
            get(KIMI_MODEL_NAME_ENV_VAR, "kimi-k2-0711-preview"),
        )
        .with_api_key(get(KIMI_MODEL_KEY_ENV_VAR, "")),
        BackendKind::DashScope => EndpointConfig::new(
            kind,
            get(
                QWEN_MODEL_URL_ENV_VAR,
                "https://dashscope.aliyuncs.com/compatible-mode/v1",
            ),
            get(QWEN_MODEL_NAME_ENV_VAR, "qwen-plus"),
        )
        .with_api_key(get(QWEN_KEY_ENV_VAR, "")),
    }
}

/// Reads `MAX_TIMEOUT` (whole seconds), falling back to [`DEFAULT_TIMEOUT`].
#[must_use]
pub fn resolve_timeout() -> Duration {
    std::env::var(MAX_TIMEOUT_ENV_VAR)
        .ok()
        .and_then(|raw| raw.trim().parse::<u64>().ok())
        .filter(|secs| *secs > 0)
        .map_or(DEFAULT_TIMEOUT, Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_without_environment() {
        let endpoint = resolve_endpoint_with(BackendKind::Kimi, |_| None);
        assert_eq!(endpoint.base_url, "https://api.moonshot.cn/v1");
        assert_eq!(endpoint.model, "kimi-k2-0711-preview");
        assert!(endpoint.api_key.is_none());

        let local = resolve_endpoint_with(BackendKind::LocalQwen, |_| None);
        assert_eq!(local.model, "qwen3:8b");
    }

    #[test]
    fn test_environment_overrides() {
        let vars: HashMap<&str, &str> = HashMap::from([
            (QWEN_MODEL_NAME_ENV_VAR, "qwen-max"),
            (QWEN_KEY_ENV_VAR, "sk-test"),
            (QWEN_MODEL_URL_ENV_VAR, "   "),
        ]);
        let endpoint =
            resolve_endpoint_with(BackendKind::DashScope, |name| vars.get(name).map(|v| (*v).to_string()));
        assert_eq!(endpoint.model, "qwen-max");
        assert_eq!(endpoint.api_key.as_deref(), Some("sk-test"));
        assert_eq!(
            endpoint.base_url,
            "https://dashscope.aliyuncs.com/compatible-mode/v1"
        );
    }
}
