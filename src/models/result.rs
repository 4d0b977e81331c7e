use serde::{Deserialize, Serialize};

use super::enums::{AssetClass, ExtractionMethod, ExtractionStatus};
use super::holding::Holding;
use super::summary::Summary;

/// Share per asset class. Either holding counts (rule-based backend) or
/// percentages (when the model reported an allocation).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssetAllocation {
    pub bonds: f64,
    pub structured_products: f64,
    pub equities: f64,
    pub cash: f64,
    pub other: f64,
    pub alternatives: f64,
}

impl AssetAllocation {
    /// Count holdings per asset class.
    pub fn from_holdings(holdings: &[Holding]) -> Self {
        let mut allocation = Self::default();
        for holding in holdings {
            let slot = match holding.asset_class {
                AssetClass::Bond => &mut allocation.bonds,
                AssetClass::StructuredProduct => &mut allocation.structured_products,
                AssetClass::Equity => &mut allocation.equities,
                AssetClass::Cash => &mut allocation.cash,
                AssetClass::Other => &mut allocation.other,
            };
            *slot += 1.0;
        }
        allocation
    }
}

/// Evidence attached when an extraction is routed to review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewData {
    pub pdf_base64: String,
    pub extracted_text_sample: String,
    pub message: String,
}

/// Canonical result of one extraction job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub status: ExtractionStatus,
    pub pdf_filename: String,
    pub summary: Option<Summary>,
    pub holdings: Vec<Holding>,
    pub asset_allocation: Option<AssetAllocation>,
    /// 0.0 to 1.0
    pub confidence_score: f64,
    pub requires_review: bool,
    pub extraction_method: ExtractionMethod,
    pub pages_processed: usize,
    pub processing_time_seconds: f64,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub review_data: Option<ReviewData>,
}

impl ExtractionResult {
    /// Confidence as the 0-100 integer it was computed from.
    pub fn confidence_percent(&self) -> u8 {
        (self.confidence_score * 100.0).round().clamp(0.0, 100.0) as u8
    }
}

/// Result shape for a job that could not be processed at all.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResult {
    pub status: ExtractionStatus,
    pub error: String,
    pub requires_review: bool,
}

impl ErrorResult {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: ExtractionStatus::Error,
            error: message.into(),
            requires_review: true,
        }
    }
}

/// What the job runtime receives back: always one of the two shapes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JobResponse {
    Success(Box<ExtractionResult>),
    Failure(ErrorResult),
}

impl JobResponse {
    pub fn requires_review(&self) -> bool {
        match self {
            Self::Success(result) => result.requires_review,
            Self::Failure(err) => err.requires_review,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn holding(class: AssetClass) -> Holding {
        let mut h = Holding::new(None, "USD");
        h.asset_class = class;
        h
    }

    #[test]
    fn allocation_counts_per_class() {
        let holdings = vec![
            holding(AssetClass::Bond),
            holding(AssetClass::Bond),
            holding(AssetClass::Equity),
            holding(AssetClass::Other),
        ];
        let allocation = AssetAllocation::from_holdings(&holdings);
        assert_eq!(allocation.bonds, 2.0);
        assert_eq!(allocation.equities, 1.0);
        assert_eq!(allocation.other, 1.0);
        assert_eq!(allocation.cash, 0.0);
        assert_eq!(allocation.alternatives, 0.0);
    }

    #[test]
    fn allocation_keys_are_fixed() {
        let json = serde_json::to_value(AssetAllocation::default()).unwrap();
        let mut keys: Vec<&str> = json.as_object().unwrap().keys().map(|k| k.as_str()).collect();
        keys.sort_unstable();
        assert_eq!(
            keys,
            vec!["alternatives", "bonds", "cash", "equities", "other", "structured_products"]
        );
    }

    #[test]
    fn error_result_always_requires_review() {
        let err = ErrorResult::new("No PDF data provided");
        let json = serde_json::to_value(JobResponse::Failure(err)).unwrap();
        assert_eq!(json["status"], "error");
        assert_eq!(json["error"], "No PDF data provided");
        assert_eq!(json["requires_review"], true);
    }

    #[test]
    fn review_data_omitted_when_absent() {
        let result = ExtractionResult {
            status: ExtractionStatus::Success,
            pdf_filename: "statement.pdf".into(),
            summary: Some(Summary::empty("USD")),
            holdings: vec![],
            asset_allocation: Some(AssetAllocation::default()),
            confidence_score: 0.95,
            requires_review: false,
            extraction_method: ExtractionMethod::TesseractOcr,
            pages_processed: 1,
            processing_time_seconds: 0.5,
            review_data: None,
        };
        let json = serde_json::to_value(&result).unwrap();
        assert!(json.get("review_data").is_none());
        assert_eq!(json["extraction_method"], "tesseract_ocr");
        assert_eq!(result.confidence_percent(), 95);
    }
}
