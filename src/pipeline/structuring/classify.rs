use chrono::NaiveDate;

use crate::models::AssetClass;
use crate::pipeline_config::DatePattern;

/// Map a model-supplied asset-class label onto the canonical enum.
/// `None` when the label is not recognized.
pub fn asset_class_from_label(label: &str) -> Option<AssetClass> {
    let normalized = label.trim().to_lowercase().replace(['-', ' '], "_");
    let class = match normalized.as_str() {
        "bond" | "bonds" | "fixed_income" | "note" | "notes" => AssetClass::Bond,
        "structured_product" | "structured_products" | "structured" | "certificate"
        | "certificates" => AssetClass::StructuredProduct,
        "equity" | "equities" | "stock" | "stocks" | "share" | "shares" => AssetClass::Equity,
        "cash" | "liquidity" | "money_market" | "deposit" | "deposits" => AssetClass::Cash,
        "other" | "others" | "alternative" | "alternatives" => AssetClass::Other,
        _ => return None,
    };
    Some(class)
}

/// Validate a model-supplied date against the accepted shapes and the
/// calendar. Returns the trimmed input, unchanged, when it is a real date.
pub fn validate_statement_date(date_str: &str, patterns: &[DatePattern]) -> Option<String> {
    let trimmed = date_str.trim();
    if trimmed.is_empty() {
        return None;
    }
    patterns
        .iter()
        .any(|p| NaiveDate::parse_from_str(trimmed, p.chrono_format()).is_ok())
        .then(|| trimmed.to_string())
}
