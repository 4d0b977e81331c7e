pub mod types;
pub mod anchors;
pub mod amounts;
pub mod fields;
pub mod classify;
pub mod assignment;
pub mod holdings;
pub mod summary;
pub mod confidence;
pub mod preprocess;
pub mod ocr;
pub mod orchestrator;

pub use types::*;
pub use anchors::*;
pub use amounts::*;
pub use fields::*;
pub use classify::*;
pub use assignment::*;
pub use holdings::*;
pub use summary::*;
pub use confidence::*;
pub use preprocess::*;
pub use ocr::*;
pub use orchestrator::*;

use thiserror::Error;

use crate::pipeline_config::ConfigError;

#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("Document rasterization failed: {0}")]
    Rasterization(String),

    #[error("Image processing failed: {0}")]
    ImageProcessing(String),

    #[error("OCR processing failed: {0}")]
    OcrProcessing(String),

    #[error("Invalid pipeline configuration: {0}")]
    Config(#[from] ConfigError),
}
