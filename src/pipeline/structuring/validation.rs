//! Validated deserialization of model statement JSON.
//!
//! Every field is optional. A value that fails its shape check is dropped and
//! recorded as a warning; a holding that cannot be read at all is skipped.
//! Warnings feed the model confidence penalty.

use serde::Deserialize;
use serde_json::Value;

use super::classify::{asset_class_from_label, validate_statement_date};
use super::types::PartialSummary;
use crate::models::{AssetAllocation, AssetClass, Holding, UNKNOWN_SECURITY};
use crate::pipeline::extraction::{is_isin_shape, parse_amount};
use crate::pipeline_config::PipelineConfig;

/// A number as the model wrote it: JSON number or text such as `"1'250.00"`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum RawNumber {
    Number(f64),
    Text(String),
}

/// Identifier that may come back as a string or a bare number.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum RawIdentifier {
    Text(String),
    Number(serde_json::Number),
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawStatement {
    summary: Option<Value>,
    holdings: Option<Vec<Value>>,
    asset_allocation: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawSummary {
    currency: Option<String>,
    statement_date: Option<String>,
    total_portfolio_value: Option<RawNumber>,
    client_id: Option<RawIdentifier>,
    client_name: Option<String>,
    bank_name: Option<String>,
    ytd_performance_pct: Option<RawNumber>,
    ytd_gain_loss: Option<RawNumber>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawHolding {
    isin: Option<String>,
    #[serde(alias = "name")]
    security_name: Option<String>,
    quantity: Option<RawNumber>,
    price: Option<RawNumber>,
    market_value: Option<RawNumber>,
    currency: Option<String>,
    asset_class: Option<String>,
    percentage: Option<RawNumber>,
    maturity_date: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawAllocation {
    bonds: Option<RawNumber>,
    structured_products: Option<RawNumber>,
    equities: Option<RawNumber>,
    cash: Option<RawNumber>,
    other: Option<RawNumber>,
    alternatives: Option<RawNumber>,
}

/// One page of model output after validation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidatedPage {
    pub summary: PartialSummary,
    pub holdings: Vec<Holding>,
    pub allocation: Option<AssetAllocation>,
    pub warnings: Vec<String>,
}

/// Validate one page of statement JSON against the canonical schema.
pub fn validate_statement(value: &Value, config: &PipelineConfig) -> ValidatedPage {
    let mut v = Validator {
        config,
        warnings: Vec::new(),
    };

    let raw: RawStatement = match serde_json::from_value(value.clone()) {
        Ok(raw) => raw,
        Err(e) => {
            v.warn(format!("statement shape rejected: {e}"));
            return ValidatedPage {
                warnings: v.warnings,
                ..ValidatedPage::default()
            };
        }
    };

    let summary = raw
        .summary
        .filter(|s| !s.is_null())
        .and_then(|s| v.parse::<RawSummary>("summary", s))
        .map(|s| v.summary(s))
        .unwrap_or_default();

    let mut holdings = Vec::new();
    for (i, item) in raw.holdings.unwrap_or_default().into_iter().enumerate() {
        if let Some(holding) = v
            .parse::<RawHolding>(&format!("holdings[{i}]"), item)
            .and_then(|h| v.holding(h))
        {
            holdings.push(holding);
        }
    }

    let allocation = raw
        .asset_allocation
        .filter(|a| !a.is_null())
        .and_then(|a| v.parse::<RawAllocation>("asset_allocation", a))
        .and_then(|a| v.allocation(a));

    ValidatedPage {
        summary,
        holdings,
        allocation,
        warnings: v.warnings,
    }
}

struct Validator<'a> {
    config: &'a PipelineConfig,
    warnings: Vec<String>,
}

impl Validator<'_> {
    fn warn(&mut self, message: String) {
        tracing::debug!(warning = %message, "Model output validation");
        self.warnings.push(message);
    }

    fn parse<T: for<'de> Deserialize<'de>>(&mut self, what: &str, value: Value) -> Option<T> {
        match serde_json::from_value(value) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                self.warn(format!("{what} skipped: {e}"));
                None
            }
        }
    }

    fn summary(&mut self, raw: RawSummary) -> PartialSummary {
        PartialSummary {
            currency: self.currency("summary.currency", raw.currency),
            statement_date: self.date("summary.statement_date", raw.statement_date),
            total_portfolio_value: self.amount("summary.total_portfolio_value", raw.total_portfolio_value),
            client_id: raw.client_id.and_then(identifier_text),
            client_name: non_empty(raw.client_name),
            bank_name: non_empty(raw.bank_name),
            ytd_performance_pct: self.signed("summary.ytd_performance_pct", raw.ytd_performance_pct),
            ytd_gain_loss: self.signed("summary.ytd_gain_loss", raw.ytd_gain_loss),
        }
    }

    fn holding(&mut self, raw: RawHolding) -> Option<Holding> {
        let isin = non_empty(raw.isin).and_then(|isin| {
            if is_isin_shape(&isin) {
                Some(isin)
            } else {
                self.warn(format!("holding isin {isin:?} is not ISIN-shaped"));
                None
            }
        });
        let security_name = non_empty(raw.security_name).map(|n| self.security_name(&n));
        let quantity = self.amount("holding.quantity", raw.quantity);
        let price = self.amount("holding.price", raw.price);
        let market_value = self.amount("holding.market_value", raw.market_value);

        if isin.is_none()
            && security_name.is_none()
            && quantity.is_none()
            && price.is_none()
            && market_value.is_none()
        {
            self.warn("holding without identifier, name or amounts skipped".into());
            return None;
        }

        let asset_class = match non_empty(raw.asset_class) {
            None => AssetClass::Other,
            Some(label) => asset_class_from_label(&label).unwrap_or_else(|| {
                self.warn(format!("unknown asset class {label:?} mapped to OTHER"));
                AssetClass::Other
            }),
        };

        let percentage = self.amount("holding.percentage", raw.percentage).and_then(|p| {
            if p <= 100.0 {
                Some(p)
            } else {
                self.warn(format!("holding percentage {p} above 100 dropped"));
                None
            }
        });

        Some(Holding {
            isin,
            security_name: security_name.unwrap_or_else(|| UNKNOWN_SECURITY.to_string()),
            quantity,
            price,
            market_value,
            currency: self
                .currency("holding.currency", raw.currency)
                .unwrap_or_else(|| self.config.default_currency.clone()),
            asset_class,
            percentage,
            maturity_date: self.date("holding.maturity_date", raw.maturity_date),
        })
    }

    fn allocation(&mut self, raw: RawAllocation) -> Option<AssetAllocation> {
        let shares = [
            self.amount("asset_allocation.bonds", raw.bonds),
            self.amount("asset_allocation.structured_products", raw.structured_products),
            self.amount("asset_allocation.equities", raw.equities),
            self.amount("asset_allocation.cash", raw.cash),
            self.amount("asset_allocation.other", raw.other),
            self.amount("asset_allocation.alternatives", raw.alternatives),
        ];
        if shares.iter().all(Option::is_none) {
            return None;
        }
        let [bonds, structured_products, equities, cash, other, alternatives] =
            shares.map(|s| s.unwrap_or(0.0));
        Some(AssetAllocation {
            bonds,
            structured_products,
            equities,
            cash,
            other,
            alternatives,
        })
    }

    /// Non-negative amount. Unparsable or negative values are dropped.
    fn amount(&mut self, field: &str, raw: Option<RawNumber>) -> Option<f64> {
        let value = self.signed(field, raw)?;
        if value < 0.0 {
            self.warn(format!("{field} negative value {value} dropped"));
            return None;
        }
        Some(value)
    }

    fn signed(&mut self, field: &str, raw: Option<RawNumber>) -> Option<f64> {
        match raw? {
            RawNumber::Number(n) if n.is_finite() => Some(n),
            RawNumber::Number(n) => {
                self.warn(format!("{field} non-finite value {n} dropped"));
                None
            }
            RawNumber::Text(text) => {
                let trimmed = text.trim();
                if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("null") {
                    return None;
                }
                let parsed = match trimmed.strip_prefix('-') {
                    Some(rest) => parse_amount(rest).map(|v| -v),
                    None => parse_amount(trimmed),
                };
                if parsed.is_none() {
                    self.warn(format!("{field} unparsable value {trimmed:?} dropped"));
                }
                parsed
            }
        }
    }

    fn currency(&mut self, field: &str, raw: Option<String>) -> Option<String> {
        let code = non_empty(raw)?.to_uppercase();
        if code.len() == 3 && code.chars().all(|c| c.is_ascii_uppercase()) {
            Some(code)
        } else {
            self.warn(format!("{field} {code:?} is not a currency code"));
            None
        }
    }

    fn date(&mut self, field: &str, raw: Option<String>) -> Option<String> {
        let date = non_empty(raw)?;
        let valid = validate_statement_date(&date, &self.config.date_patterns);
        if valid.is_none() {
            self.warn(format!("{field} {date:?} is not a valid date"));
        }
        valid
    }

    fn security_name(&self, name: &str) -> String {
        let collapsed = name.split_whitespace().collect::<Vec<_>>().join(" ");
        collapsed.chars().take(self.config.security_name_max_chars).collect()
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case("null"))
}

fn identifier_text(raw: RawIdentifier) -> Option<String> {
    match raw {
        RawIdentifier::Text(text) => non_empty(Some(text)),
        RawIdentifier::Number(n) => Some(n.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn validate(value: Value) -> ValidatedPage {
        validate_statement(&value, &PipelineConfig::default())
    }

    #[test]
    fn full_page() {
        let page = validate(json!({
            "summary": {
                "client_id": "ABC123",
                "currency": "chf",
                "statement_date": "30.09.2025",
                "total_portfolio_value": 104500.0,
                "ytd_performance_pct": -2.5
            },
            "holdings": [{
                "isin": "CH0012345678",
                "security_name": "Acme  Corp Bond",
                "quantity": 1000,
                "price": "102.50",
                "market_value": "104'500.00",
                "currency": "CHF",
                "asset_class": "BOND",
                "maturity_date": "15.06.2030"
            }],
            "asset_allocation": {"bonds": 100}
        }));

        assert!(page.warnings.is_empty(), "{:?}", page.warnings);
        assert_eq!(page.summary.client_id.as_deref(), Some("ABC123"));
        assert_eq!(page.summary.currency.as_deref(), Some("CHF"));
        assert_eq!(page.summary.ytd_performance_pct, Some(-2.5));

        let h = &page.holdings[0];
        assert_eq!(h.security_name, "Acme Corp Bond");
        assert_eq!(h.quantity, Some(1000.0));
        assert_eq!(h.price, Some(102.5));
        assert_eq!(h.market_value, Some(104_500.0));
        assert_eq!(h.asset_class, AssetClass::Bond);
        assert_eq!(h.maturity_date.as_deref(), Some("15.06.2030"));

        let allocation = page.allocation.unwrap();
        assert_eq!(allocation.bonds, 100.0);
        assert_eq!(allocation.equities, 0.0);
    }

    #[test]
    fn negative_amounts_dropped_with_warning() {
        let page = validate(json!({"holdings": [
            {"isin": "CH0012345678", "quantity": -5, "market_value": 1000}
        ]}));
        assert_eq!(page.holdings[0].quantity, None);
        assert_eq!(page.holdings[0].market_value, Some(1000.0));
        assert_eq!(page.warnings.len(), 1);
    }

    #[test]
    fn malformed_isin_dropped_but_holding_kept() {
        let page = validate(json!({"holdings": [
            {"isin": "CH00-123", "security_name": "Acme", "market_value": 10}
        ]}));
        assert_eq!(page.holdings.len(), 1);
        assert_eq!(page.holdings[0].isin, None);
        assert_eq!(page.warnings.len(), 1);
    }

    #[test]
    fn unknown_asset_class_is_other() {
        let page = validate(json!({"holdings": [
            {"isin": "CH0012345678", "asset_class": "commodities"}
        ]}));
        assert_eq!(page.holdings[0].asset_class, AssetClass::Other);
        assert_eq!(page.warnings.len(), 1);
    }

    #[test]
    fn missing_fields_take_defaults_without_warnings() {
        let page = validate(json!({"holdings": [{"isin": "CH0012345678"}]}));
        let h = &page.holdings[0];
        assert_eq!(h.security_name, UNKNOWN_SECURITY);
        assert_eq!(h.currency, "USD");
        assert_eq!(h.asset_class, AssetClass::Other);
        assert!(page.warnings.is_empty());
        assert!(page.summary.is_empty());
        assert!(page.allocation.is_none());
    }

    #[test]
    fn unreadable_items_skipped_leniently() {
        let page = validate(json!({"holdings": [
            "not an object",
            {"isin": "CH0012345678", "quantity": true},
            {},
            {"isin": "US0378331005", "market_value": 19000}
        ]}));
        assert_eq!(page.holdings.len(), 1);
        assert_eq!(page.holdings[0].isin.as_deref(), Some("US0378331005"));
        assert_eq!(page.warnings.len(), 3);
    }

    #[test]
    fn invalid_dates_dropped() {
        let page = validate(json!({
            "summary": {"statement_date": "31.02.2025"},
            "holdings": [{"isin": "CH0012345678", "maturity_date": "soon"}]
        }));
        assert_eq!(page.summary.statement_date, None);
        assert_eq!(page.holdings[0].maturity_date, None);
        assert_eq!(page.warnings.len(), 2);
    }

    #[test]
    fn wrong_statement_shape_is_one_warning() {
        let page = validate(json!({"holdings": "none on this page"}));
        assert!(page.holdings.is_empty());
        assert_eq!(page.warnings.len(), 1);
    }

    #[test]
    fn numeric_client_id_and_null_strings() {
        let page = validate(json!({"summary": {
            "client_id": 778812,
            "client_name": "null",
            "bank_name": "  ",
            "total_portfolio_value": "null"
        }}));
        assert_eq!(page.summary.client_id.as_deref(), Some("778812"));
        assert_eq!(page.summary.client_name, None);
        assert_eq!(page.summary.bank_name, None);
        assert_eq!(page.summary.total_portfolio_value, None);
        assert!(page.warnings.is_empty());
    }

    #[test]
    fn bad_currency_and_percentage() {
        let page = validate(json!({"holdings": [
            {"isin": "CH0012345678", "currency": "Swiss francs", "percentage": 140}
        ]}));
        let h = &page.holdings[0];
        assert_eq!(h.currency, "USD");
        assert_eq!(h.percentage, None);
        assert_eq!(page.warnings.len(), 2);
    }

    #[test]
    fn null_sections_are_absent() {
        let page = validate(json!({"summary": null, "holdings": null, "asset_allocation": null}));
        assert!(page.summary.is_empty());
        assert!(page.holdings.is_empty());
        assert!(page.allocation.is_none());
        assert!(page.warnings.is_empty());
    }
}
