use serde::{Deserialize, Serialize};

/// Whole-document figures of a statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub currency: String,
    pub statement_date: Option<String>,
    pub total_portfolio_value: Option<f64>,
    pub client_id: Option<String>,
    pub client_name: Option<String>,
    pub bank_name: Option<String>,
    pub ytd_performance_pct: Option<f64>,
    pub ytd_gain_loss: Option<f64>,
}

impl Summary {
    pub fn empty(currency: &str) -> Self {
        Self {
            currency: currency.to_string(),
            statement_date: None,
            total_portfolio_value: None,
            client_id: None,
            client_name: None,
            bank_name: None,
            ytd_performance_pct: None,
            ytd_gain_loss: None,
        }
    }

    /// Number of the three scored fields (total value, date, client id) present.
    pub fn completeness(&self) -> usize {
        [
            self.total_portfolio_value.is_some_and(|v| v > 0.0),
            self.statement_date.as_deref().is_some_and(|d| !d.is_empty()),
            self.client_id.as_deref().is_some_and(|c| !c.is_empty()),
        ]
        .into_iter()
        .filter(|present| *present)
        .count()
    }
}
