pub mod types;
pub mod prompt;
pub mod parser;
pub mod classify;
pub mod validation;
pub mod confidence;
pub mod ollama;
pub mod orchestrator;

pub use types::*;
pub use prompt::*;
pub use parser::*;
pub use classify::*;
pub use validation::*;
pub use confidence::*;
pub use ollama::*;
pub use orchestrator::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StructuringError {
    #[error("Ollama is not running at {0}")]
    OllamaConnection(String),

    #[error("Ollama returned error (status {status}): {body}")]
    OllamaError { status: u16, body: String },

    #[error("No compatible vision model available")]
    NoModelAvailable,

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Response parsing error: {0}")]
    ResponseParsing(String),
}
