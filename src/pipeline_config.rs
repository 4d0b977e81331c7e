//! Pipeline configuration.
//!
//! Every heuristic the extraction core applies (currency priority, amount
//! floor, date pattern order, keyword sets, context window, review threshold)
//! is a value here rather than a literal in the extractors. Defaults reproduce
//! the reference behaviour; a JSON file can override any subset of fields.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config;
use crate::models::AssetClass;

// ═══════════════════════════════════════════════════════════
// Errors
// ═══════════════════════════════════════════════════════════

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("I/O error reading config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

// ═══════════════════════════════════════════════════════════
// Policies
// ═══════════════════════════════════════════════════════════

/// How the currency extractor picks among several codes present in the text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CurrencyPolicy {
    /// Earliest code in the text wins.
    DocumentOrder,
    /// First code of `currency_codes` present anywhere wins.
    ListPriority,
}

/// Date shapes recognised in statement text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatePattern {
    /// `DD.MM.YYYY`
    DottedDmy,
    /// `YYYY-MM-DD`
    IsoYmd,
    /// `DD/MM/YYYY`
    SlashedDmy,
}

impl DatePattern {
    /// chrono format string for calendar validation.
    pub fn chrono_format(self) -> &'static str {
        match self {
            Self::DottedDmy => "%d.%m.%Y",
            Self::IsoYmd => "%Y-%m-%d",
            Self::SlashedDmy => "%d/%m/%Y",
        }
    }
}

/// Which line a repeated ISIN is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnchorPolicy {
    FirstOccurrence,
    LastOccurrence,
}

/// How numbers found around an anchor become quantity / price / value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentStrategy {
    /// 1st → quantity, 2nd → price, 3rd → market value (2nd when only two).
    Positional,
    /// Prefer a triple whose product is consistent, else positional.
    ProductConsistent,
}

/// Ordered keyword set for one asset class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetClassRule {
    pub asset_class: AssetClass,
    pub keywords: Vec<String>,
}

impl AssetClassRule {
    fn new(asset_class: AssetClass, keywords: &[&str]) -> Self {
        Self {
            asset_class,
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Config
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Currency used when no known code appears.
    pub default_currency: String,
    /// Recognised currency codes, in priority order.
    pub currency_codes: Vec<String>,
    pub currency_policy: CurrencyPolicy,
    /// Amounts at or below this value are discarded.
    pub min_amount: f64,
    /// Tried in order; the first pattern with any match wins.
    pub date_patterns: Vec<DatePattern>,
    /// Labels preceding a client/account identifier, tried in order.
    pub client_labels: Vec<String>,
    /// Institution names looked up for `Summary.bank_name`.
    pub known_banks: Vec<String>,
    /// Checked in order; the first rule with a keyword hit wins.
    pub asset_class_rules: Vec<AssetClassRule>,
    pub context_lines_before: usize,
    pub context_lines_after: usize,
    pub security_name_max_chars: usize,
    pub anchor_policy: AnchorPolicy,
    pub assignment_strategy: AssignmentStrategy,
    /// Percent score below which a result requires review.
    pub review_threshold: u8,
    /// Characters of recognized text attached to review data.
    pub review_sample_chars: usize,
    /// Page (0-based) whose model output provides the summary.
    pub summary_page: usize,
    /// Resolution requested from the rasterizer.
    pub render_dpi: u32,
    /// Points removed per model validation warning.
    pub model_warning_penalty: u8,
    /// Upper bound on the total model validation penalty.
    pub model_warning_penalty_cap: u8,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            default_currency: "USD".into(),
            currency_codes: ["USD", "EUR", "CHF", "GBP", "JPY"]
                .iter()
                .map(|c| c.to_string())
                .collect(),
            currency_policy: CurrencyPolicy::DocumentOrder,
            min_amount: 100.0,
            date_patterns: vec![
                DatePattern::DottedDmy,
                DatePattern::IsoYmd,
                DatePattern::SlashedDmy,
            ],
            client_labels: vec!["Client".into(), "Account".into(), "Portfolio".into()],
            known_banks: [
                "UBS",
                "Credit Suisse",
                "Julius Baer",
                "Pictet",
                "Lombard Odier",
                "Vontobel",
                "Zürcher Kantonalbank",
                "ZKB",
                "Raiffeisen",
                "PostFinance",
                "EFG",
                "Edmond de Rothschild",
                "J. Safra Sarasin",
                "LGT",
            ]
            .iter()
            .map(|b| b.to_string())
            .collect(),
            asset_class_rules: vec![
                AssetClassRule::new(AssetClass::Bond, &["bond", "note", "treasury", "govt"]),
                AssetClassRule::new(
                    AssetClass::StructuredProduct,
                    &["struct", "product", "certif"],
                ),
                AssetClassRule::new(AssetClass::Equity, &["equity", "stock", "share"]),
                AssetClassRule::new(AssetClass::Cash, &["cash", "liquidity"]),
            ],
            context_lines_before: 1,
            context_lines_after: 2,
            security_name_max_chars: 100,
            anchor_policy: AnchorPolicy::FirstOccurrence,
            assignment_strategy: AssignmentStrategy::Positional,
            review_threshold: crate::pipeline::extraction::thresholds::REVIEW_THRESHOLD,
            review_sample_chars: 1000,
            summary_page: 0,
            render_dpi: 300,
            model_warning_penalty: 2,
            model_warning_penalty_cap: 20,
        }
    }
}

impl PipelineConfig {
    /// Parse and validate a JSON config. Missing fields take defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        let config = Self::from_json_str(&raw)?;
        tracing::info!(path = %path.display(), "Loaded pipeline config");
        Ok(config)
    }

    /// Config from the file named by `PORTFOLIO_EXTRACT_CONFIG`, or defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        match std::env::var(config::CONFIG_PATH_ENV) {
            Ok(path) => Self::load(Path::new(&path)),
            Err(_) => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_currency.trim().is_empty() {
            return Err(ConfigError::Invalid("default_currency is empty".into()));
        }
        if self.currency_codes.iter().any(|c| c.trim().is_empty()) {
            return Err(ConfigError::Invalid("currency_codes contains an empty code".into()));
        }
        if self.date_patterns.is_empty() {
            return Err(ConfigError::Invalid("date_patterns must not be empty".into()));
        }
        if self.review_threshold > 100 {
            return Err(ConfigError::Invalid(format!(
                "review_threshold {} exceeds 100",
                self.review_threshold
            )));
        }
        if !self.min_amount.is_finite() || self.min_amount < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "min_amount {} must be a non-negative number",
                self.min_amount
            )));
        }
        if self.security_name_max_chars == 0 {
            return Err(ConfigError::Invalid("security_name_max_chars must be > 0".into()));
        }
        if self.render_dpi == 0 {
            return Err(ConfigError::Invalid("render_dpi must be > 0".into()));
        }
        for rule in &self.asset_class_rules {
            if rule.asset_class == AssetClass::Other {
                return Err(ConfigError::Invalid(
                    "OTHER is the fallback class and takes no keywords".into(),
                ));
            }
            if rule.keywords.iter().any(|k| k.trim().is_empty()) {
                return Err(ConfigError::Invalid(format!(
                    "empty keyword in {} rule",
                    rule.asset_class
                )));
            }
        }
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════
