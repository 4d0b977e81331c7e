use std::sync::LazyLock;

use regex::Regex;

use crate::models::UNKNOWN_SECURITY;
use crate::pipeline_config::{ConfigError, CurrencyPolicy, DatePattern, PipelineConfig};

static DOTTED_DMY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[0-9]{2}\.[0-9]{2}\.[0-9]{4}").expect("valid date pattern"));
static ISO_YMD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[0-9]{4}-[0-9]{2}-[0-9]{2}").expect("valid date pattern"));
static SLASHED_DMY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[0-9]{2}/[0-9]{2}/[0-9]{4}").expect("valid date pattern"));

/// `4.25%` or `12 %`, not preceded by another digit or grouping mark.
static PERCENTAGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[^0-9.'])([0-9]{1,3}(?:\.[0-9]{1,4})?)\s?%").expect("valid percentage pattern")
});

fn date_regex(pattern: DatePattern) -> &'static Regex {
    match pattern {
        DatePattern::DottedDmy => &DOTTED_DMY,
        DatePattern::IsoYmd => &ISO_YMD,
        DatePattern::SlashedDmy => &SLASHED_DMY,
    }
}

/// First date under the first pattern (in `patterns` order) that matches
/// anywhere in `text`. A later pattern never wins over an earlier one, even
/// when its match comes first in the text.
pub fn find_date(text: &str, patterns: &[DatePattern]) -> Option<String> {
    patterns
        .iter()
        .find_map(|p| date_regex(*p).find(text))
        .map(|m| m.as_str().to_string())
}

/// Portfolio weight written on a holding line, within [0, 100].
pub fn find_percentage(line: &str) -> Option<f64> {
    PERCENTAGE
        .captures_iter(line)
        .filter_map(|c| c.get(1)?.as_str().parse::<f64>().ok())
        .find(|v| (0.0..=100.0).contains(v))
}

/// Whole-text field extractors with their patterns compiled from config.
#[derive(Clone)]
pub struct FieldExtractors {
    default_currency: String,
    currency_policy: CurrencyPolicy,
    currency_patterns: Vec<(String, Regex)>,
    date_patterns: Vec<DatePattern>,
    client_patterns: Vec<Regex>,
    bank_patterns: Vec<(String, Regex)>,
    name_max_chars: usize,
}

impl FieldExtractors {
    pub fn from_config(config: &PipelineConfig) -> Result<Self, ConfigError> {
        let currency_patterns = config
            .currency_codes
            .iter()
            .map(|code| Ok((code.clone(), compile(&format!(r"\b{}\b", regex::escape(code)))?)))
            .collect::<Result<Vec<_>, ConfigError>>()?;

        let client_patterns = config
            .client_labels
            .iter()
            .map(|label| compile(&format!(r"(?i){}[:\s]+([A-Z0-9]+)", regex::escape(label))))
            .collect::<Result<Vec<_>, ConfigError>>()?;

        let bank_patterns = config
            .known_banks
            .iter()
            .map(|bank| Ok((bank.clone(), compile(&format!(r"(?i)\b{}\b", regex::escape(bank)))?)))
            .collect::<Result<Vec<_>, ConfigError>>()?;

        Ok(Self {
            default_currency: config.default_currency.clone(),
            currency_policy: config.currency_policy,
            currency_patterns,
            date_patterns: config.date_patterns.clone(),
            client_patterns,
            bank_patterns,
            name_max_chars: config.security_name_max_chars,
        })
    }

    /// Currency code of `text`, falling back to the configured default.
    pub fn currency(&self, text: &str) -> String {
        let found = match self.currency_policy {
            CurrencyPolicy::DocumentOrder => self
                .currency_patterns
                .iter()
                .filter_map(|(code, re)| re.find(text).map(|m| (m.start(), code)))
                .min_by_key(|(pos, _)| *pos)
                .map(|(_, code)| code),
            CurrencyPolicy::ListPriority => self
                .currency_patterns
                .iter()
                .find(|(_, re)| re.is_match(text))
                .map(|(code, _)| code),
        };
        found.unwrap_or(&self.default_currency).clone()
    }

    pub fn date(&self, text: &str) -> Option<String> {
        find_date(text, &self.date_patterns)
    }

    /// Client/account identifier following the first matching label.
    pub fn client_id(&self, text: &str) -> Option<String> {
        self.client_patterns
            .iter()
            .find_map(|re| re.captures(text))
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
    }

    /// First configured institution named in `text`.
    pub fn bank_name(&self, text: &str) -> Option<String> {
        self.bank_patterns
            .iter()
            .find(|(_, re)| re.is_match(text))
            .map(|(name, _)| name.clone())
    }

    /// Text preceding `isin` on `line`, whitespace-collapsed and truncated.
    pub fn security_name(&self, line: &str, isin: &str) -> String {
        let Some(pos) = line.find(isin) else {
            return UNKNOWN_SECURITY.to_string();
        };
        let collapsed = line[..pos].split_whitespace().collect::<Vec<_>>().join(" ");
        let name: String = collapsed.chars().take(self.name_max_chars).collect();
        if name.is_empty() {
            UNKNOWN_SECURITY.to_string()
        } else {
            name
        }
    }
}

fn compile(pattern: &str) -> Result<Regex, ConfigError> {
    Regex::new(pattern).map_err(|e| ConfigError::Invalid(format!("pattern {pattern}: {e}")))
}
