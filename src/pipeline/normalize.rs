use crate::models::{
    AssetAllocation, ExtractionMethod, ExtractionResult, ExtractionStatus, ReviewData,
};
use crate::pipeline::extraction::{ConfidenceBreakdown, TextAnalysis};
use crate::pipeline::structuring::ModelAnalysis;
use crate::pipeline_config::PipelineConfig;

/// Native output of either backend, before normalization.
#[derive(Debug, Clone)]
pub enum BackendOutput {
    Ocr(TextAnalysis),
    Model(ModelAnalysis),
}

impl BackendOutput {
    pub fn confidence(&self) -> &ConfidenceBreakdown {
        match self {
            Self::Ocr(a) => &a.confidence,
            Self::Model(a) => &a.confidence,
        }
    }
}

/// Job facts the normalizer copies into the result.
#[derive(Debug, Clone)]
pub struct JobContext<'a> {
    pub pdf_filename: &'a str,
    pub pdf_base64: &'a str,
    pub pages_processed: usize,
    pub processing_time_seconds: f64,
}

pub fn requires_review(score_percent: u8, threshold: u8) -> bool {
    score_percent < threshold
}

/// Maps backend output onto the canonical `ExtractionResult`.
pub struct ResultNormalizer {
    review_threshold: u8,
    review_sample_chars: usize,
}

impl ResultNormalizer {
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            review_threshold: config.review_threshold,
            review_sample_chars: config.review_sample_chars,
        }
    }

    pub fn normalize(&self, output: BackendOutput, job: &JobContext<'_>) -> ExtractionResult {
        let score = output.confidence().score();
        let review = requires_review(score, self.review_threshold);

        let (method, summary, holdings, allocation, evidence) = match output {
            BackendOutput::Ocr(a) => {
                let allocation = AssetAllocation::from_holdings(&a.holdings);
                (ExtractionMethod::TesseractOcr, a.summary, a.holdings, allocation, a.text)
            }
            BackendOutput::Model(a) => {
                let allocation = a
                    .allocation
                    .unwrap_or_else(|| AssetAllocation::from_holdings(&a.holdings));
                (ExtractionMethod::VisionModel, a.summary, a.holdings, allocation, a.evidence)
            }
        };

        let review_data = review.then(|| ReviewData {
            pdf_base64: job.pdf_base64.to_string(),
            extracted_text_sample: evidence.chars().take(self.review_sample_chars).collect(),
            message: format!(
                "Extraction confidence below {}% - document attached for manual review",
                self.review_threshold
            ),
        });

        if review {
            tracing::warn!(score, threshold = self.review_threshold, "Low confidence, flagged for review");
        }

        ExtractionResult {
            status: ExtractionStatus::Success,
            pdf_filename: job.pdf_filename.to_string(),
            summary: Some(summary),
            holdings,
            asset_allocation: Some(allocation),
            confidence_score: f64::from(score) / 100.0,
            requires_review: review,
            extraction_method: method,
            pages_processed: job.pages_processed,
            processing_time_seconds: job.processing_time_seconds,
            review_data,
        }
    }
}
