use tracing::{debug, info};

use super::anchors::extract_anchors;
use super::confidence::{score_extraction, ConfidenceBreakdown};
use super::holdings::HoldingAssembler;
use super::summary::SummaryAssembler;
use super::ExtractionError;
use crate::models::{Holding, Summary};
use crate::pipeline_config::PipelineConfig;

/// Separator appended after every page when pages are concatenated.
pub const PAGE_SEPARATOR: &str = "\n\n";

/// Everything the rule-based backend derives from a document's text.
#[derive(Debug, Clone, PartialEq)]
pub struct TextAnalysis {
    pub text: String,
    pub summary: Summary,
    pub holdings: Vec<Holding>,
    pub confidence: ConfidenceBreakdown,
}

/// Anchors → holdings → summary → confidence over recognized page text.
pub struct OcrPipeline {
    holdings: HoldingAssembler,
    summary: SummaryAssembler,
}

impl OcrPipeline {
    pub fn new(config: &PipelineConfig) -> Result<Self, ExtractionError> {
        Ok(Self {
            holdings: HoldingAssembler::from_config(config)?,
            summary: SummaryAssembler::from_config(config)?,
        })
    }

    /// Analyze pages in order. Every page, including the last, is followed
    /// by a blank line in the concatenated text.
    pub fn analyze_pages(&self, pages: &[String]) -> TextAnalysis {
        self.analyze_text(&join_pages(pages))
    }

    pub fn analyze_text(&self, text: &str) -> TextAnalysis {
        let anchors = extract_anchors(text);
        debug!(anchors = anchors.len(), chars = text.chars().count(), "Anchors extracted");

        let holdings = self.holdings.assemble(text, &anchors);
        let summary = self.summary.assemble(text);
        let confidence = score_extraction(&summary, &holdings, text);

        info!(
            holdings = holdings.len(),
            summary_fields = summary.completeness(),
            anchor_coverage = confidence.anchor_coverage,
            summary_completeness = confidence.summary_completeness,
            holdings_quality = confidence.holdings_quality,
            text_quality = confidence.quality_signal,
            score = confidence.score(),
            "Rule-based extraction scored"
        );

        TextAnalysis {
            text: text.to_string(),
            summary,
            holdings,
            confidence,
        }
    }
}

pub fn join_pages(pages: &[String]) -> String {
    pages.iter().fold(String::new(), |mut acc, page| {
        acc.push_str(page);
        acc.push_str(PAGE_SEPARATOR);
        acc
    })
}
