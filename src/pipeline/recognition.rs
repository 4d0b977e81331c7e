use std::sync::Arc;

use tracing::warn;

use crate::models::ExtractionMethod;
use crate::pipeline::extraction::{OcrEngine, PageImage};
use crate::pipeline::structuring::{
    build_page_instruction, parse_model_response, ModelPageOutput, VisionModel,
};

/// Per-page recognition output of one document.
#[derive(Debug, Clone, PartialEq)]
pub enum RecognizedDocument {
    Text(Vec<String>),
    Structured(Vec<ModelPageOutput>),
}

impl RecognizedDocument {
    pub fn page_count(&self) -> usize {
        match self {
            Self::Text(pages) => pages.len(),
            Self::Structured(pages) => pages.len(),
        }
    }
}

/// The collaborator that reads page images: OCR text or a vision model.
#[derive(Clone)]
pub enum RecognitionBackend {
    Ocr(Arc<dyn OcrEngine + Send + Sync>),
    Model(Arc<dyn VisionModel + Send + Sync>),
}

impl RecognitionBackend {
    pub fn method(&self) -> ExtractionMethod {
        match self {
            Self::Ocr(_) => ExtractionMethod::TesseractOcr,
            Self::Model(_) => ExtractionMethod::VisionModel,
        }
    }

    /// Recognize pages in order. A page that fails is logged and yields no
    /// data; the remaining pages are still processed.
    pub fn recognize(&self, pages: &[PageImage]) -> RecognizedDocument {
        match self {
            Self::Ocr(engine) => RecognizedDocument::Text(
                pages
                    .iter()
                    .map(|page| {
                        engine.recognize(page).unwrap_or_else(|e| {
                            warn!(page = page.page_number, error = %e, "OCR failed, page skipped");
                            String::new()
                        })
                    })
                    .collect(),
            ),
            Self::Model(model) => RecognizedDocument::Structured(
                pages
                    .iter()
                    .map(|page| {
                        let instruction = build_page_instruction(page.page_number, pages.len());
                        match model.generate(page, &instruction) {
                            Ok(response) => parse_model_response(&response),
                            Err(e) => {
                                warn!(page = page.page_number, error = %e, "Vision model failed, page skipped");
                                ModelPageOutput::RawText(String::new())
                            }
                        }
                    })
                    .collect(),
            ),
        }
    }
}
