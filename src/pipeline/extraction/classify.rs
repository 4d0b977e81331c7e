use crate::models::AssetClass;
use crate::pipeline_config::AssetClassRule;

/// Keyword classifier over ordered asset-class rules.
///
/// Matching is substring-based on the lower-cased line, so `bonds` and
/// `Eurobond` both hit `bond`. The first rule with any hit wins.
pub struct AssetClassifier {
    rules: Vec<(AssetClass, Vec<String>)>,
}

impl AssetClassifier {
    pub fn from_rules(rules: &[AssetClassRule]) -> Self {
        Self {
            rules: rules
                .iter()
                .map(|r| {
                    let keywords = r
                        .keywords
                        .iter()
                        .map(|k| k.trim().to_lowercase())
                        .filter(|k| !k.is_empty())
                        .collect();
                    (r.asset_class, keywords)
                })
                .collect(),
        }
    }

    pub fn classify(&self, line: &str) -> AssetClass {
        let lower = line.to_lowercase();
        self.rules
            .iter()
            .find(|(_, keywords)| keywords.iter().any(|k| lower.contains(k.as_str())))
            .map(|(class, _)| *class)
            .unwrap_or_default()
    }
}
