use tracing::debug;

use super::amounts::extract_amounts;
use super::assignment::{assignment_for, FieldAssignment};
use super::classify::AssetClassifier;
use super::fields::{find_percentage, FieldExtractors};
use crate::models::{AssetClass, Holding};
use crate::pipeline_config::{AnchorPolicy, ConfigError, PipelineConfig};

/// Builds one holding per anchor from the lines around its occurrence.
pub struct HoldingAssembler {
    fields: FieldExtractors,
    classifier: AssetClassifier,
    assignment: Box<dyn FieldAssignment + Send + Sync>,
    anchor_policy: AnchorPolicy,
    lines_before: usize,
    lines_after: usize,
    min_amount: f64,
}

impl HoldingAssembler {
    pub fn from_config(config: &PipelineConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            fields: FieldExtractors::from_config(config)?,
            classifier: AssetClassifier::from_rules(&config.asset_class_rules),
            assignment: assignment_for(config.assignment_strategy),
            anchor_policy: config.anchor_policy,
            lines_before: config.context_lines_before,
            lines_after: config.context_lines_after,
            min_amount: config.min_amount,
        })
    }

    /// Holdings for `anchors` in the given order. Anchors that occur on no
    /// line of `text` are skipped.
    pub fn assemble(&self, text: &str, anchors: &[String]) -> Vec<Holding> {
        let lines: Vec<&str> = text.lines().collect();
        anchors
            .iter()
            .filter_map(|isin| {
                let idx = self.anchor_line(&lines, isin)?;
                Some(self.build(&lines, idx, isin))
            })
            .collect()
    }

    fn anchor_line(&self, lines: &[&str], isin: &str) -> Option<usize> {
        let mut hits = lines
            .iter()
            .enumerate()
            .filter(|(_, line)| line.contains(isin))
            .map(|(i, _)| i);
        match self.anchor_policy {
            AnchorPolicy::FirstOccurrence => hits.next(),
            AnchorPolicy::LastOccurrence => hits.last(),
        }
    }

    fn build(&self, lines: &[&str], idx: usize, isin: &str) -> Holding {
        let line = lines[idx];
        let start = idx.saturating_sub(self.lines_before);
        let end = idx.saturating_add(self.lines_after).saturating_add(1).min(lines.len());
        let context = lines[start..end].join(" ");

        let numbers = extract_amounts(&context, self.min_amount);
        let amounts = self.assignment.assign(&numbers);
        let asset_class = self.classifier.classify(line);

        debug!(isin, numbers = numbers.len(), asset_class = %asset_class, "Holding assembled");

        let maturity_date = match asset_class {
            AssetClass::Bond | AssetClass::StructuredProduct => self.fields.date(line),
            _ => None,
        };

        Holding {
            isin: Some(isin.to_string()),
            security_name: self.fields.security_name(line, isin),
            quantity: amounts.quantity,
            price: amounts.price,
            market_value: amounts.market_value,
            currency: self.fields.currency(&context),
            asset_class,
            percentage: find_percentage(line),
            maturity_date,
        }
    }
}
