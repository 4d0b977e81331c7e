//! Job boundary: payload in, canonical result out.
//!
//! Decodes the document, rasterizes it, hands pages to the configured
//! recognition backend and normalizes whatever comes back. This is the only
//! place where errors become the error result shape; everything below it
//! degrades to missing fields instead.

use std::sync::Arc;
use std::time::Instant;

use base64::Engine;
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use crate::models::{ErrorResult, ExtractionResult, JobResponse};
use crate::pipeline::extraction::{DocumentRasterizer, ExtractionError, OcrPipeline};
use crate::pipeline::normalize::{BackendOutput, JobContext, ResultNormalizer};
use crate::pipeline::recognition::{RecognitionBackend, RecognizedDocument};
use crate::pipeline::structuring::VisionPipeline;
use crate::pipeline_config::PipelineConfig;

/// Filename reported when the job does not name its document.
pub const DEFAULT_FILENAME: &str = "unknown.pdf";

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ProcessingError {
    #[error("No PDF data provided")]
    InputMissing,

    #[error("Invalid job payload: {0}")]
    InvalidPayload(String),

    #[error("PDF payload is not valid base64: {0}")]
    Decode(#[from] base64::DecodeError),

    #[error("{0}")]
    Rasterize(#[from] ExtractionError),
}

// ---------------------------------------------------------------------------
// Job payload
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct JobPayload {
    pub pdf_base64: Option<String>,
    pub filename: Option<String>,
}

impl JobPayload {
    /// Read a payload, unwrapping the `{"input": …}` envelope of the job
    /// runtime when present.
    pub fn from_value(value: &Value) -> Result<Self, ProcessingError> {
        let inner = value.get("input").unwrap_or(value);
        if !inner.is_object() {
            return Err(ProcessingError::InvalidPayload("expected a JSON object".into()));
        }
        serde_json::from_value(inner.clone())
            .map_err(|e| ProcessingError::InvalidPayload(e.to_string()))
    }

    pub fn filename(&self) -> &str {
        self.filename
            .as_deref()
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .unwrap_or(DEFAULT_FILENAME)
    }
}

// ---------------------------------------------------------------------------
// Processor
// ---------------------------------------------------------------------------

/// Processes statement jobs with injected collaborators.
///
/// Holds no per-job state; one instance serves any number of jobs.
pub struct StatementProcessor {
    rasterizer: Arc<dyn DocumentRasterizer + Send + Sync>,
    backend: RecognitionBackend,
    ocr: OcrPipeline,
    vision: VisionPipeline,
    normalizer: ResultNormalizer,
    render_dpi: u32,
}

impl StatementProcessor {
    pub fn new(
        rasterizer: Arc<dyn DocumentRasterizer + Send + Sync>,
        backend: RecognitionBackend,
        config: &PipelineConfig,
    ) -> Result<Self, ExtractionError> {
        Ok(Self {
            rasterizer,
            backend,
            ocr: OcrPipeline::new(config)?,
            vision: VisionPipeline::new(config),
            normalizer: ResultNormalizer::from_config(config),
            render_dpi: config.render_dpi,
        })
    }

    /// Handle a raw job input. Always returns a result object.
    pub fn handle_value(&self, input: &Value) -> JobResponse {
        match JobPayload::from_value(input) {
            Ok(payload) => self.handle(&payload),
            Err(e) => failure(&e),
        }
    }

    /// Handle a decoded job payload. Always returns a result object.
    pub fn handle(&self, payload: &JobPayload) -> JobResponse {
        let job_id = Uuid::new_v4();
        let _span = tracing::info_span!(
            "extraction_job",
            job_id = %job_id,
            filename = payload.filename(),
            method = self.backend.method().as_str()
        )
        .entered();

        match self.process(payload) {
            Ok(result) => {
                tracing::info!(
                    pages = result.pages_processed,
                    holdings = result.holdings.len(),
                    confidence = result.confidence_percent(),
                    requires_review = result.requires_review,
                    seconds = result.processing_time_seconds,
                    "Extraction complete"
                );
                JobResponse::Success(Box::new(result))
            }
            Err(e) => failure(&e),
        }
    }

    pub fn process(&self, payload: &JobPayload) -> Result<ExtractionResult, ProcessingError> {
        let started = Instant::now();

        let pdf_base64 = payload
            .pdf_base64
            .as_deref()
            .map(str::trim)
            .filter(|b| !b.is_empty())
            .ok_or(ProcessingError::InputMissing)?;

        // MIME and `base64(1)` output is line-wrapped
        let compact: String = pdf_base64.split_ascii_whitespace().collect();
        let pdf_bytes = base64::engine::general_purpose::STANDARD.decode(compact)?;
        let pages = self.rasterizer.rasterize(&pdf_bytes, self.render_dpi)?;
        tracing::info!(pages = pages.len(), dpi = self.render_dpi, "Document rasterized");

        let recognized = self.backend.recognize(&pages);
        tracing::debug!(pages = recognized.page_count(), "Pages recognized");
        let output = match recognized {
            RecognizedDocument::Text(texts) => BackendOutput::Ocr(self.ocr.analyze_pages(&texts)),
            RecognizedDocument::Structured(outputs) => {
                BackendOutput::Model(self.vision.analyze(&outputs))
            }
        };

        let job = JobContext {
            pdf_filename: payload.filename(),
            pdf_base64,
            pages_processed: pages.len(),
            processing_time_seconds: started.elapsed().as_secs_f64(),
        };
        Ok(self.normalizer.normalize(output, &job))
    }
}

fn failure(error: &ProcessingError) -> JobResponse {
    tracing::error!(error = %error, "Extraction job failed");
    JobResponse::Failure(ErrorResult::new(error.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use crate::models::{AssetClass, ExtractionMethod, ExtractionStatus};
    use crate::pipeline::extraction::{MockOcrEngine, MockRasterizer, PageImage};
    use crate::pipeline::structuring::MockVisionModel;

    const STATEMENT: &str = "Client: ABC123\n\
        Acme Corp Bond CH0012345678 1000 102.50 104500.00 CHF\n\
        Total: 104500.00 CHF 30.09.2025";

    const STATEMENT_JSON: &str = r#"```json
{
  "summary": {
    "client_id": "ABC123",
    "currency": "CHF",
    "statement_date": "30.09.2025",
    "total_portfolio_value": 104500.00
  },
  "holdings": [{
    "isin": "CH0012345678",
    "security_name": "Acme Corp Bond",
    "quantity": 1000,
    "price": 102.50,
    "market_value": 104500.00,
    "currency": "CHF",
    "asset_class": "BOND"
  }]
}
```"#;

    fn pdf_base64() -> String {
        base64::engine::general_purpose::STANDARD.encode(b"%PDF-1.4 statement")
    }

    fn ocr_processor(pages: &[&str]) -> StatementProcessor {
        StatementProcessor::new(
            Arc::new(MockRasterizer::with_pages(pages.len())),
            RecognitionBackend::Ocr(Arc::new(MockOcrEngine::new(pages))),
            &PipelineConfig::default(),
        )
        .unwrap()
    }

    fn model_processor(responses: &[&str]) -> StatementProcessor {
        StatementProcessor::new(
            Arc::new(MockRasterizer::with_pages(responses.len())),
            RecognitionBackend::Model(Arc::new(MockVisionModel::new(responses))),
            &PipelineConfig::default(),
        )
        .unwrap()
    }

    fn payload() -> JobPayload {
        JobPayload {
            pdf_base64: Some(pdf_base64()),
            filename: Some("q3.pdf".into()),
        }
    }

    fn success(response: JobResponse) -> ExtractionResult {
        match response {
            JobResponse::Success(result) => *result,
            JobResponse::Failure(e) => panic!("expected success, got {}", e.error),
        }
    }

    #[test]
    fn ocr_job_end_to_end() {
        let result = success(ocr_processor(&[STATEMENT]).handle(&payload()));

        assert_eq!(result.status, ExtractionStatus::Success);
        assert_eq!(result.pdf_filename, "q3.pdf");
        assert_eq!(result.pages_processed, 1);
        assert_eq!(result.extraction_method, ExtractionMethod::TesseractOcr);
        assert_eq!(result.holdings.len(), 1);
        assert_eq!(result.holdings[0].asset_class, AssetClass::Bond);
        // page text is followed by a blank line: 80 / 102 alphanumeric
        assert_eq!(result.confidence_score, 0.61);
        assert!(result.requires_review);

        let review = result.review_data.unwrap();
        assert_eq!(review.pdf_base64, pdf_base64());
        assert!(review.extracted_text_sample.starts_with("Client: ABC123"));
        assert_eq!(result.asset_allocation.unwrap().bonds, 1.0);
    }

    #[test]
    fn both_backends_converge_on_summary_and_holdings() {
        let ocr = success(ocr_processor(&[STATEMENT]).handle(&payload()));
        let model = success(model_processor(&[STATEMENT_JSON]).handle(&payload()));

        assert_eq!(ocr.summary, model.summary);
        assert_eq!(ocr.holdings, model.holdings);
        assert_ne!(ocr.extraction_method, model.extraction_method);
    }

    #[test]
    fn missing_pdf_is_error_shape() {
        let response = ocr_processor(&[STATEMENT]).handle(&JobPayload::default());
        assert!(!response.is_success());
        assert!(response.requires_review());
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json, json!({
            "status": "error",
            "error": "No PDF data provided",
            "requires_review": true
        }));
    }

    #[test]
    fn blank_pdf_is_input_missing() {
        let payload = JobPayload {
            pdf_base64: Some("   ".into()),
            filename: None,
        };
        let err = ocr_processor(&[STATEMENT]).process(&payload).unwrap_err();
        assert!(matches!(err, ProcessingError::InputMissing));
    }

    #[test]
    fn undecodable_base64_is_fatal() {
        let payload = JobPayload {
            pdf_base64: Some("not base64 at all!".into()),
            filename: None,
        };
        let err = ocr_processor(&[STATEMENT]).process(&payload).unwrap_err();
        assert!(matches!(err, ProcessingError::Decode(_)));
    }

    /// Accepts only the exact document bytes it was built with.
    struct ExpectingRasterizer(Vec<u8>);

    impl DocumentRasterizer for ExpectingRasterizer {
        fn rasterize(&self, pdf_bytes: &[u8], _dpi: u32) -> Result<Vec<PageImage>, ExtractionError> {
            if pdf_bytes != self.0.as_slice() {
                return Err(ExtractionError::Rasterization("unexpected document bytes".into()));
            }
            Ok(vec![PageImage {
                page_number: 1,
                bytes: vec![],
            }])
        }
    }

    #[test]
    fn line_wrapped_base64_decodes() {
        let document: Vec<u8> = (0..120u8).collect();
        let encoded = base64::engine::general_purpose::STANDARD.encode(&document);
        assert_eq!(encoded.len(), 160);
        let wrapped = format!("{}\n{}\r\n", &encoded[..76], &encoded[76..]);

        let processor = StatementProcessor::new(
            Arc::new(ExpectingRasterizer(document)),
            RecognitionBackend::Ocr(Arc::new(MockOcrEngine::new(&[STATEMENT]))),
            &PipelineConfig::default(),
        )
        .unwrap();
        let payload = JobPayload {
            pdf_base64: Some(wrapped.clone()),
            filename: None,
        };
        let result = processor.process(&payload).unwrap();
        assert_eq!(result.holdings.len(), 1);
        assert_eq!(result.review_data.unwrap().pdf_base64, wrapped.trim());
    }

    #[test]
    fn rasterizer_failure_is_fatal() {
        let processor = StatementProcessor::new(
            Arc::new(MockRasterizer::failing()),
            RecognitionBackend::Ocr(Arc::new(MockOcrEngine::new(&[]))),
            &PipelineConfig::default(),
        )
        .unwrap();
        let response = processor.handle(&payload());
        let JobResponse::Failure(error) = response else {
            panic!("expected failure");
        };
        assert_eq!(error.status, ExtractionStatus::Error);
        assert!(error.error.contains("rasterization"));
    }

    #[test]
    fn failed_page_does_not_abort_job() {
        let processor = StatementProcessor::new(
            Arc::new(MockRasterizer::with_pages(2)),
            RecognitionBackend::Ocr(Arc::new(
                MockOcrEngine::new(&["unreadable", STATEMENT]).failing_on(1),
            )),
            &PipelineConfig::default(),
        )
        .unwrap();
        let result = success(processor.handle(&payload()));
        assert_eq!(result.pages_processed, 2);
        assert_eq!(result.holdings.len(), 1);
    }

    #[test]
    fn raw_text_model_output_is_success_with_review() {
        let result = success(model_processor(&["Sorry, I can't read this."]).handle(&payload()));
        assert!(result.holdings.is_empty());
        assert_eq!(result.confidence_score, 0.0);
        assert!(result.requires_review);
        assert_eq!(
            result.review_data.unwrap().extracted_text_sample,
            "Sorry, I can't read this.\n\n"
        );
    }

    #[test]
    fn job_envelope_unwrapped() {
        let input = json!({"input": {"pdf_base64": pdf_base64()}});
        let result = success(ocr_processor(&[STATEMENT]).handle_value(&input));
        assert_eq!(result.pdf_filename, DEFAULT_FILENAME);
    }

    #[test]
    fn bare_payload_accepted() {
        let input = json!({"pdf_base64": pdf_base64(), "filename": "  "});
        let result = success(ocr_processor(&[STATEMENT]).handle_value(&input));
        assert_eq!(result.pdf_filename, DEFAULT_FILENAME);
    }

    #[test]
    fn non_object_input_is_error() {
        let response = ocr_processor(&[STATEMENT]).handle_value(&json!("pdf"));
        assert!(!response.is_success());
    }

    #[test]
    fn wrong_field_type_is_error() {
        let response = ocr_processor(&[STATEMENT]).handle_value(&json!({"pdf_base64": 42}));
        let JobResponse::Failure(error) = response else {
            panic!("expected failure");
        };
        assert!(error.error.starts_with("Invalid job payload"));
    }
}
