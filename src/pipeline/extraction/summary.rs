use super::amounts::extract_amounts;
use super::fields::FieldExtractors;
use crate::models::Summary;
use crate::pipeline_config::{ConfigError, PipelineConfig};

/// Whole-document fields, extracted once over the concatenated page text.
pub struct SummaryAssembler {
    fields: FieldExtractors,
    min_amount: f64,
}

impl SummaryAssembler {
    pub fn from_config(config: &PipelineConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            fields: FieldExtractors::from_config(config)?,
            min_amount: config.min_amount,
        })
    }

    /// `total_portfolio_value` is the largest qualifying amount anywhere in
    /// the document, not the figure next to a "Total" label.
    pub fn assemble(&self, text: &str) -> Summary {
        let total_portfolio_value = extract_amounts(text, self.min_amount)
            .into_iter()
            .reduce(f64::max);

        Summary {
            currency: self.fields.currency(text),
            statement_date: self.fields.date(text),
            total_portfolio_value,
            client_id: self.fields.client_id(text),
            client_name: None,
            bank_name: self.fields.bank_name(text),
            ytd_performance_pct: None,
            ytd_gain_loss: None,
        }
    }
}
