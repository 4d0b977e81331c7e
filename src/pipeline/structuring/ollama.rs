use std::sync::OnceLock;

use base64::Engine;
use serde::{Deserialize, Serialize};

use super::types::VisionModel;
use super::StructuringError;
use crate::config;
use crate::pipeline::extraction::PageImage;

/// Vision models able to read statement pages, in order of preference.
const VISION_MODELS: &[&str] = &[
    "qwen2.5vl",
    "llama3.2-vision",
    "minicpm-v",
    "llava",
];

/// Ollama HTTP client for local vision inference.
///
/// The model name is resolved once, on first use, and then reused for every
/// page of every job.
pub struct OllamaVisionClient {
    base_url: String,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
    model: OnceLock<String>,
}

impl OllamaVisionClient {
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self, StructuringError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| StructuringError::HttpClient(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            timeout_secs,
            model: OnceLock::new(),
        })
    }

    /// Client for the configured Ollama instance (env override, then
    /// localhost), with a pinned model when one is set in the environment.
    pub fn from_env() -> Result<Self, StructuringError> {
        let client = Self::new(&config::ollama_base_url(), config::OLLAMA_TIMEOUT_SECS)?;
        Ok(match config::ollama_model() {
            Some(model) => client.with_model(&model),
            None => client,
        })
    }

    /// Skip discovery and always use `model`.
    pub fn with_model(mut self, model: &str) -> Self {
        self.model = OnceLock::from(model.to_string());
        self
    }

    /// The model in use, discovering the best installed one on first call.
    pub fn model(&self) -> Result<&str, StructuringError> {
        if let Some(model) = self.model.get() {
            return Ok(model);
        }
        let found = select_model(&self.list_models()?)?;
        tracing::info!(model = %found, "Vision model selected");
        Ok(self.model.get_or_init(|| found))
    }

    pub fn list_models(&self) -> Result<Vec<String>, StructuringError> {
        let url = format!("{}/api/tags", self.base_url);

        let response = self.client.get(&url).send().map_err(|e| self.request_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(StructuringError::OllamaError {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: OllamaTagsResponse = response
            .json()
            .map_err(|e| StructuringError::ResponseParsing(e.to_string()))?;

        Ok(parsed.models.into_iter().map(|m| m.name).collect())
    }

    fn request_error(&self, e: reqwest::Error) -> StructuringError {
        if e.is_connect() {
            StructuringError::OllamaConnection(self.base_url.clone())
        } else if e.is_timeout() {
            StructuringError::HttpClient(format!("Request timed out after {}s", self.timeout_secs))
        } else {
            StructuringError::HttpClient(e.to_string())
        }
    }
}

/// First preferred family with an installed tag; the installed tag is used
/// as-is (e.g. `llava:13b`).
fn select_model(available: &[String]) -> Result<String, StructuringError> {
    VISION_MODELS
        .iter()
        .find_map(|preferred| available.iter().find(|m| m.starts_with(preferred)))
        .cloned()
        .ok_or(StructuringError::NoModelAvailable)
}

/// Request body for Ollama /api/chat
#[derive(Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: Vec<OllamaChatMessage<'a>>,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Serialize)]
struct OllamaChatMessage<'a> {
    role: &'a str,
    content: &'a str,
    images: Vec<String>,
}

#[derive(Serialize)]
struct OllamaOptions {
    temperature: f32,
}

/// Response body from Ollama /api/chat
#[derive(Deserialize)]
struct OllamaChatResponse {
    message: OllamaResponseMessage,
}

#[derive(Deserialize)]
struct OllamaResponseMessage {
    content: String,
}

/// Response body from Ollama /api/tags
#[derive(Deserialize)]
struct OllamaTagsResponse {
    models: Vec<OllamaModel>,
}

#[derive(Deserialize)]
struct OllamaModel {
    name: String,
}

impl VisionModel for OllamaVisionClient {
    fn generate(&self, page: &PageImage, instruction: &str) -> Result<String, StructuringError> {
        let model = self.model()?;
        let url = format!("{}/api/chat", self.base_url);
        let body = OllamaChatRequest {
            model,
            messages: vec![OllamaChatMessage {
                role: "user",
                content: instruction,
                images: vec![base64::engine::general_purpose::STANDARD.encode(&page.bytes)],
            }],
            stream: false,
            options: OllamaOptions { temperature: 0.0 },
        };

        tracing::debug!(model, page = page.page_number, "Vision request");

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .map_err(|e| self.request_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(StructuringError::OllamaError {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: OllamaChatResponse = response
            .json()
            .map_err(|e| StructuringError::ResponseParsing(e.to_string()))?;

        Ok(parsed.message.content)
    }
}

/// Mock vision model for testing: page `n` (1-based) answers `responses[n - 1]`.
/// Pages beyond the list, or listed in `failing_pages`, return an error.
pub struct MockVisionModel {
    responses: Vec<String>,
    failing_pages: Vec<usize>,
}

impl MockVisionModel {
    pub fn new(responses: &[&str]) -> Self {
        Self {
            responses: responses.iter().map(|r| r.to_string()).collect(),
            failing_pages: Vec::new(),
        }
    }

    pub fn failing_on(mut self, page_number: usize) -> Self {
        self.failing_pages.push(page_number);
        self
    }
}

impl VisionModel for MockVisionModel {
    fn generate(&self, page: &PageImage, _instruction: &str) -> Result<String, StructuringError> {
        if self.failing_pages.contains(&page.page_number) {
            return Err(StructuringError::OllamaConnection("mock".into()));
        }
        page.page_number
            .checked_sub(1)
            .and_then(|i| self.responses.get(i))
            .cloned()
            .ok_or_else(|| StructuringError::ResponseParsing(format!("no response for page {}", page.page_number)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(n: usize) -> PageImage {
        PageImage {
            page_number: n,
            bytes: vec![0x89, b'P', b'N', b'G'],
        }
    }

    #[test]
    fn constructor_trims_trailing_slash() {
        let client = OllamaVisionClient::new("http://localhost:11434/", 60).unwrap();
        assert_eq!(client.base_url, "http://localhost:11434");
        assert_eq!(client.timeout_secs, 60);
    }

    #[test]
    fn pinned_model_skips_discovery() {
        // Nothing listens on this port; discovery would fail.
        let client = OllamaVisionClient::new("http://127.0.0.1:9", 1)
            .unwrap()
            .with_model("llava:7b");
        assert_eq!(client.model().unwrap(), "llava:7b");
    }

    #[test]
    fn later_pin_replaces_earlier_one() {
        let client = OllamaVisionClient::new("http://127.0.0.1:9", 1)
            .unwrap()
            .with_model("llava:7b")
            .with_model("minicpm-v:8b");
        assert_eq!(client.model().unwrap(), "minicpm-v:8b");
    }

    #[test]
    fn select_model_follows_preference_then_installed_tag() {
        let available = vec!["llava:13b".to_string(), "llama3.2-vision:11b".to_string()];
        assert_eq!(select_model(&available).unwrap(), "llama3.2-vision:11b");
    }

    #[test]
    fn select_model_none_available() {
        let available = vec!["mistral:7b".to_string()];
        assert!(matches!(
            select_model(&available),
            Err(StructuringError::NoModelAvailable)
        ));
    }

    #[test]
    fn chat_request_shape() {
        let body = OllamaChatRequest {
            model: "llava",
            messages: vec![OllamaChatMessage {
                role: "user",
                content: "read",
                images: vec!["aGVsbG8=".into()],
            }],
            stream: false,
            options: OllamaOptions { temperature: 0.0 },
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["messages"][0]["images"][0], "aGVsbG8=");
        assert_eq!(json["stream"], false);
    }

    #[test]
    fn chat_response_parses() {
        let raw = r#"{"model":"llava","message":{"role":"assistant","content":"{}"},"done":true}"#;
        let parsed: OllamaChatResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.message.content, "{}");
    }

    #[test]
    fn mock_returns_per_page_responses() {
        let model = MockVisionModel::new(&["one", "two"]).failing_on(2);
        assert_eq!(model.generate(&page(1), "x").unwrap(), "one");
        assert!(model.generate(&page(2), "x").is_err());
        assert!(model.generate(&page(3), "x").is_err());
    }
}
