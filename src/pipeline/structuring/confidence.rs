use crate::models::{Holding, Summary};
use crate::pipeline::extraction::confidence::{
    anchor_coverage, holdings_quality, summary_completeness, thresholds, ConfidenceBreakdown,
};

/// Inputs of the model confidence beyond the merged summary and holdings.
#[derive(Debug, Clone, Copy)]
pub struct ModelSignals {
    pub structured_pages: usize,
    pub total_pages: usize,
    pub warnings: usize,
    pub penalty_per_warning: u8,
    pub penalty_cap: u8,
}

/// Confidence of a model extraction.
///
/// Same anchor, summary and holdings components as the rule-based scorer.
/// Text quality is replaced by the share of pages that returned a JSON
/// object, and each validation warning costs points up to a cap.
pub fn score_model_extraction(
    summary: &Summary,
    holdings: &[Holding],
    signals: ModelSignals,
) -> ConfidenceBreakdown {
    let structured_ratio = signals.structured_pages as f64 / signals.total_pages.max(1) as f64;
    let penalty = (signals.warnings as f64 * f64::from(signals.penalty_per_warning))
        .min(f64::from(signals.penalty_cap));

    ConfidenceBreakdown {
        anchor_coverage: anchor_coverage(holdings.len()),
        summary_completeness: summary_completeness(summary),
        holdings_quality: holdings_quality(holdings),
        quality_signal: structured_ratio * thresholds::QUALITY_SIGNAL_MAX,
        penalty,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signals(structured: usize, total: usize, warnings: usize) -> ModelSignals {
        ModelSignals {
            structured_pages: structured,
            total_pages: total,
            warnings,
            penalty_per_warning: 2,
            penalty_cap: 20,
        }
    }

    fn summary() -> Summary {
        Summary {
            statement_date: Some("30.09.2025".into()),
            total_portfolio_value: Some(104_500.0),
            client_id: Some("ABC123".into()),
            ..Summary::empty("CHF")
        }
    }

    fn holding() -> Holding {
        let mut h = Holding::new(Some("CH0012345678".into()), "CHF");
        h.market_value = Some(104_500.0);
        h
    }

    #[test]
    fn clean_single_page() {
        let b = score_model_extraction(&summary(), &[holding()], signals(1, 1, 0));
        assert_eq!(b.quality_signal, 10.0);
        assert_eq!(b.score(), 64);
    }

    #[test]
    fn raw_text_pages_lower_quality() {
        let b = score_model_extraction(&summary(), &[holding()], signals(1, 4, 0));
        assert_eq!(b.quality_signal, 2.5);
        assert_eq!(b.score(), 56);
    }

    #[test]
    fn warnings_cost_points() {
        let b = score_model_extraction(&summary(), &[holding()], signals(1, 1, 3));
        assert_eq!(b.penalty, 6.0);
        assert_eq!(b.score(), 58);
    }

    #[test]
    fn penalty_is_capped() {
        let b = score_model_extraction(&summary(), &[holding()], signals(1, 1, 50));
        assert_eq!(b.penalty, 20.0);
        assert_eq!(b.score(), 44);
    }

    #[test]
    fn no_pages_scores_zero() {
        let b = score_model_extraction(&Summary::empty("USD"), &[], signals(0, 0, 0));
        assert_eq!(b.score(), 0);
    }
}
