use serde_json::Value;

use super::StructuringError;
use crate::models::Summary;
use crate::pipeline::extraction::PageImage;

/// Vision-language model abstraction (allows mocking).
///
/// Implementations are created once and shared read-only across jobs.
pub trait VisionModel {
    fn generate(&self, page: &PageImage, instruction: &str) -> Result<String, StructuringError>;
}

/// What one page of model output amounts to after parsing.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelPageOutput {
    /// A JSON object found in the response.
    Json(Value),
    /// Anything else, kept as evidence only. Contributes no fields.
    RawText(String),
}

impl ModelPageOutput {
    pub fn is_structured(&self) -> bool {
        matches!(self, Self::Json(_))
    }

    /// Text form used for review samples.
    pub fn as_evidence(&self) -> String {
        match self {
            Self::Json(value) => value.to_string(),
            Self::RawText(text) => text.clone(),
        }
    }
}

/// Summary fields reported by a single page, all optional until merged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartialSummary {
    pub currency: Option<String>,
    pub statement_date: Option<String>,
    pub total_portfolio_value: Option<f64>,
    pub client_id: Option<String>,
    pub client_name: Option<String>,
    pub bank_name: Option<String>,
    pub ytd_performance_pct: Option<f64>,
    pub ytd_gain_loss: Option<f64>,
}

impl PartialSummary {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Take every field still missing here from `other`.
    pub fn fill_gaps_from(&mut self, other: &PartialSummary) {
        fn fill<T: Clone>(slot: &mut Option<T>, source: &Option<T>) {
            if slot.is_none() {
                slot.clone_from(source);
            }
        }
        fill(&mut self.currency, &other.currency);
        fill(&mut self.statement_date, &other.statement_date);
        fill(&mut self.total_portfolio_value, &other.total_portfolio_value);
        fill(&mut self.client_id, &other.client_id);
        fill(&mut self.client_name, &other.client_name);
        fill(&mut self.bank_name, &other.bank_name);
        fill(&mut self.ytd_performance_pct, &other.ytd_performance_pct);
        fill(&mut self.ytd_gain_loss, &other.ytd_gain_loss);
    }

    pub fn into_summary(self, default_currency: &str) -> Summary {
        Summary {
            currency: self.currency.unwrap_or_else(|| default_currency.to_string()),
            statement_date: self.statement_date,
            total_portfolio_value: self.total_portfolio_value,
            client_id: self.client_id,
            client_name: self.client_name,
            bank_name: self.bank_name,
            ytd_performance_pct: self.ytd_performance_pct,
            ytd_gain_loss: self.ytd_gain_loss,
        }
    }
}
