/// Application-level constants
pub const APP_NAME: &str = "portfolio-extract";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Env var pointing at a JSON `PipelineConfig` file.
pub const CONFIG_PATH_ENV: &str = "PORTFOLIO_EXTRACT_CONFIG";

/// Env var overriding the Ollama base URL used by the vision backend.
pub const OLLAMA_URL_ENV: &str = "PORTFOLIO_EXTRACT_OLLAMA_URL";

/// Env var pinning the vision model name instead of discovering one.
pub const OLLAMA_MODEL_ENV: &str = "PORTFOLIO_EXTRACT_OLLAMA_MODEL";

/// Default Ollama instance.
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

/// Per-request timeout for vision inference (one page per request).
pub const OLLAMA_TIMEOUT_SECS: u64 = 300;

/// Log filter used when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "portfolio_extract_lib=info,portfolio_extract=info,warn"
}

/// Resolve the Ollama base URL (env override, then default).
pub fn ollama_base_url() -> String {
    std::env::var(OLLAMA_URL_ENV).unwrap_or_else(|_| DEFAULT_OLLAMA_URL.to_string())
}

/// Model name pinned through the environment, if any.
pub fn ollama_model() -> Option<String> {
    std::env::var(OLLAMA_MODEL_ENV)
        .ok()
        .map(|m| m.trim().to_string())
        .filter(|m| !m.is_empty())
}
