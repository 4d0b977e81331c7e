use serde::{Deserialize, Serialize};

use super::enums::AssetClass;

/// Placeholder name when nothing precedes the anchor on its line.
pub const UNKNOWN_SECURITY: &str = "Unknown Security";

/// One position of the statement, anchored on its ISIN when one was found.
///
/// `asset_class` and `currency` are always set. Numeric fields are optional
/// and never negative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Holding {
    pub isin: Option<String>,
    pub security_name: String,
    pub quantity: Option<f64>,
    pub price: Option<f64>,
    pub market_value: Option<f64>,
    pub currency: String,
    pub asset_class: AssetClass,
    pub percentage: Option<f64>,
    pub maturity_date: Option<String>,
}

impl Holding {
    /// An empty holding carrying only the mandatory fields.
    pub fn new(isin: Option<String>, currency: &str) -> Self {
        Self {
            isin,
            security_name: UNKNOWN_SECURITY.to_string(),
            quantity: None,
            price: None,
            market_value: None,
            currency: currency.to_string(),
            asset_class: AssetClass::Other,
            percentage: None,
            maturity_date: None,
        }
    }

    pub fn has_market_value(&self) -> bool {
        self.market_value.is_some_and(|v| v > 0.0)
    }
}
