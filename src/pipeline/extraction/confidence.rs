use serde::Serialize;

use crate::models::{Holding, Summary};

/// Scoring weights, in percent points.
pub mod thresholds {
    /// Points per extracted holding.
    pub const POINTS_PER_HOLDING: f64 = 4.0;

    /// Anchor coverage saturates at 10 holdings.
    pub const ANCHOR_COVERAGE_MAX: f64 = 40.0;

    /// Points for each of total value, statement date and client id.
    pub const POINTS_PER_SUMMARY_FIELD: f64 = 10.0;

    pub const HOLDINGS_QUALITY_MAX: f64 = 20.0;

    /// Text quality (OCR) or structured-page ratio (model).
    pub const QUALITY_SIGNAL_MAX: f64 = 10.0;

    /// Default review gate: below this, a human looks at the result.
    pub const REVIEW_THRESHOLD: u8 = 90;
}

/// Per-component contributions to a confidence score.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ConfidenceBreakdown {
    pub anchor_coverage: f64,
    pub summary_completeness: f64,
    pub holdings_quality: f64,
    /// Alphanumeric density of the text, or the share of model pages that
    /// returned structured output.
    pub quality_signal: f64,
    /// Deducted after summing (model validation warnings).
    pub penalty: f64,
}

impl ConfidenceBreakdown {
    /// Sum of components minus penalty, clamped to [0, 100] and floored.
    pub fn score(&self) -> u8 {
        let raw = self.anchor_coverage
            + self.summary_completeness
            + self.holdings_quality
            + self.quality_signal
            - self.penalty;
        raw.clamp(0.0, 100.0).floor() as u8
    }

    /// Score as the fraction exposed to callers.
    pub fn fraction(&self) -> f64 {
        f64::from(self.score()) / 100.0
    }
}

pub fn anchor_coverage(holdings_count: usize) -> f64 {
    (holdings_count as f64 * thresholds::POINTS_PER_HOLDING).min(thresholds::ANCHOR_COVERAGE_MAX)
}

pub fn summary_completeness(summary: &Summary) -> f64 {
    summary.completeness() as f64 * thresholds::POINTS_PER_SUMMARY_FIELD
}

/// Share of holdings with a positive market value, scaled to 20. Zero when
/// there are no holdings.
pub fn holdings_quality(holdings: &[Holding]) -> f64 {
    if holdings.is_empty() {
        return 0.0;
    }
    let with_value = holdings.iter().filter(|h| h.has_market_value()).count();
    (with_value as f64 * thresholds::HOLDINGS_QUALITY_MAX / holdings.len() as f64)
        .min(thresholds::HOLDINGS_QUALITY_MAX)
}

/// ASCII alphanumeric characters over all characters, scaled to 10. Empty text
/// counts as length 1.
pub fn text_quality(text: &str) -> f64 {
    let total = text.chars().count().max(1);
    let alnum = text.chars().filter(char::is_ascii_alphanumeric).count();
    alnum as f64 * thresholds::QUALITY_SIGNAL_MAX / total as f64
}

/// Confidence of a rule-based extraction. Pure: identical inputs always give
/// the identical breakdown.
pub fn score_extraction(summary: &Summary, holdings: &[Holding], text: &str) -> ConfidenceBreakdown {
    ConfidenceBreakdown {
        anchor_coverage: anchor_coverage(holdings.len()),
        summary_completeness: summary_completeness(summary),
        holdings_quality: holdings_quality(holdings),
        quality_signal: text_quality(text),
        penalty: 0.0,
    }
}
