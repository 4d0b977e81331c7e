use std::collections::HashSet;

use tracing::info;

use super::confidence::{score_model_extraction, ModelSignals};
use super::types::{ModelPageOutput, PartialSummary};
use super::validation::{validate_statement, ValidatedPage};
use crate::models::{AssetAllocation, Holding, Summary};
use crate::pipeline::extraction::{join_pages, ConfidenceBreakdown};
use crate::pipeline_config::PipelineConfig;

/// Merged result of all model pages of one document.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelAnalysis {
    pub summary: Summary,
    pub holdings: Vec<Holding>,
    /// Allocation reported by the model, if any page supplied a valid one.
    pub allocation: Option<AssetAllocation>,
    pub confidence: ConfidenceBreakdown,
    pub warnings: Vec<String>,
    /// Page outputs rendered as text, for review samples.
    pub evidence: String,
}

/// Validates and merges per-page model output into one statement.
pub struct VisionPipeline {
    config: PipelineConfig,
}

impl VisionPipeline {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    pub fn analyze(&self, pages: &[ModelPageOutput]) -> ModelAnalysis {
        let validated: Vec<Option<ValidatedPage>> = pages
            .iter()
            .map(|page| match page {
                ModelPageOutput::Json(value) => Some(validate_statement(value, &self.config)),
                ModelPageOutput::RawText(_) => None,
            })
            .collect();

        let order = summary_order(validated.len(), self.config.summary_page);

        let mut partial = PartialSummary::default();
        for page in order.iter().filter_map(|&i| validated[i].as_ref()) {
            partial.fill_gaps_from(&page.summary);
        }
        let summary = partial.into_summary(&self.config.default_currency);

        let allocation = order
            .iter()
            .filter_map(|&i| validated[i].as_ref())
            .find_map(|page| page.allocation.clone());

        let holdings = union_holdings(validated.iter().flatten());
        let warnings: Vec<String> = validated
            .iter()
            .flatten()
            .flat_map(|page| page.warnings.iter().cloned())
            .collect();

        let structured_pages = pages.iter().filter(|p| p.is_structured()).count();
        let confidence = score_model_extraction(
            &summary,
            &holdings,
            ModelSignals {
                structured_pages,
                total_pages: pages.len(),
                warnings: warnings.len(),
                penalty_per_warning: self.config.model_warning_penalty,
                penalty_cap: self.config.model_warning_penalty_cap,
            },
        );

        info!(
            pages = pages.len(),
            structured_pages,
            holdings = holdings.len(),
            warnings = warnings.len(),
            anchor_coverage = confidence.anchor_coverage,
            summary_completeness = confidence.summary_completeness,
            holdings_quality = confidence.holdings_quality,
            structured_ratio = confidence.quality_signal,
            penalty = confidence.penalty,
            score = confidence.score(),
            "Model extraction scored"
        );

        let evidence: Vec<String> = pages.iter().map(ModelPageOutput::as_evidence).collect();

        ModelAnalysis {
            summary,
            holdings,
            allocation,
            confidence,
            warnings,
            evidence: join_pages(&evidence),
        }
    }
}

/// Designated page first, then every other page in page order.
fn summary_order(page_count: usize, summary_page: usize) -> Vec<usize> {
    let mut order: Vec<usize> = (0..page_count).collect();
    if summary_page < page_count {
        order.remove(summary_page);
        order.insert(0, summary_page);
    }
    order
}

/// Holdings unioned by ISIN, first occurrence wins. Holdings without an
/// ISIN cannot be matched and are all kept, in page order.
fn union_holdings<'a>(pages: impl Iterator<Item = &'a ValidatedPage>) -> Vec<Holding> {
    let mut seen = HashSet::new();
    let mut holdings = Vec::new();
    for holding in pages.flat_map(|page| page.holdings.iter()) {
        let is_new = match &holding.isin {
            Some(isin) => seen.insert(isin.clone()),
            None => true,
        };
        if is_new {
            holdings.push(holding.clone());
        }
    }
    holdings
}
