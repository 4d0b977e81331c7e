//! Mapping from the ordered numbers around an anchor to holding amounts.
//!
//! Kept apart from line scanning so strategies can be swapped through
//! `PipelineConfig::assignment_strategy` without touching the assembler.

use crate::pipeline_config::AssignmentStrategy;

/// Relative tolerance when checking `quantity * price ≈ market_value`.
const PRODUCT_TOLERANCE: f64 = 0.01;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AssignedAmounts {
    pub quantity: Option<f64>,
    pub price: Option<f64>,
    pub market_value: Option<f64>,
}

pub trait FieldAssignment {
    fn assign(&self, numbers: &[f64]) -> AssignedAmounts;
}

/// 1st → quantity, 2nd → price, 3rd → market value.
///
/// With exactly two numbers the second doubles as market value. This is a
/// convention of row layout, not a parse: columns in a different order come
/// out wrong.
pub struct PositionalAssignment;

impl FieldAssignment for PositionalAssignment {
    fn assign(&self, numbers: &[f64]) -> AssignedAmounts {
        let quantity = numbers.first().copied();
        let price = numbers.get(1).copied();
        let market_value = numbers.get(2).copied().or(price);
        AssignedAmounts {
            quantity,
            price,
            market_value,
        }
    }
}

/// First ordered triple whose product is consistent, else positional.
///
/// Both plain pricing (`q * p`) and percent-of-nominal bond pricing
/// (`q * p / 100`) are accepted.
pub struct ProductConsistentAssignment;

impl FieldAssignment for ProductConsistentAssignment {
    fn assign(&self, numbers: &[f64]) -> AssignedAmounts {
        let n = numbers.len();
        for i in 0..n {
            for j in (i + 1)..n {
                for k in (j + 1)..n {
                    let (q, p, v) = (numbers[i], numbers[j], numbers[k]);
                    if is_consistent(q, p, v) {
                        return AssignedAmounts {
                            quantity: Some(q),
                            price: Some(p),
                            market_value: Some(v),
                        };
                    }
                }
            }
        }
        PositionalAssignment.assign(numbers)
    }
}

fn is_consistent(quantity: f64, price: f64, value: f64) -> bool {
    if value <= 0.0 {
        return false;
    }
    let plain = quantity * price;
    let percent_of_nominal = plain / 100.0;
    [plain, percent_of_nominal]
        .iter()
        .any(|candidate| ((candidate - value) / value).abs() <= PRODUCT_TOLERANCE)
}

pub fn assignment_for(strategy: AssignmentStrategy) -> Box<dyn FieldAssignment + Send + Sync> {
    match strategy {
        AssignmentStrategy::Positional => Box::new(PositionalAssignment),
        AssignmentStrategy::ProductConsistent => Box::new(ProductConsistentAssignment),
    }
}
