//! Amount tokens in recognized statement text.
//!
//! Swiss statements group thousands with apostrophes (`1'234'567.89`). OCR
//! frequently turns the apostrophe into a typographic one, so both count as
//! grouping marks. A token only counts when it stands alone: digits glued to
//! letters (an ISIN, `ABC123`) or chained with date separators
//! (`30.09.2025`, `2025-09-30`) are not amounts.

use std::sync::LazyLock;

use regex::Regex;

const GROUPING_MARKS: [char; 2] = ['\'', '\u{2019}'];

static AMOUNT_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[0-9][0-9'\x{2019}]*(?:\.[0-9]{2})?").expect("valid amount pattern")
});

/// All standalone amounts in `text` strictly above `min_amount`, in text order.
///
/// Values at or below the floor are dropped: they are mostly day/month
/// fragments, counts and row numbers.
pub fn extract_amounts(text: &str, min_amount: f64) -> Vec<f64> {
    AMOUNT_TOKEN
        .find_iter(text)
        .filter(|m| stands_alone(text, m.start(), m.end()))
        .filter_map(|m| parse_amount(m.as_str()))
        .filter(|value| *value > min_amount)
        .collect()
}

/// Parse one amount token, removing grouping marks. `None` when malformed.
pub fn parse_amount(token: &str) -> Option<f64> {
    let cleaned: String = token
        .trim()
        .chars()
        .filter(|c| !GROUPING_MARKS.contains(c))
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Reject tokens embedded in identifiers or chained with `.`/`/`/`-`/`,`.
fn stands_alone(text: &str, start: usize, end: usize) -> bool {
    let mut before = text[..start].chars().rev();
    match before.next() {
        Some(c) if c.is_alphanumeric() || c == '_' => return false,
        Some(c) if is_chain_separator(c) => {
            if before.next().is_some_and(|p| p.is_ascii_digit()) {
                return false;
            }
        }
        _ => {}
    }

    let mut after = text[end..].chars();
    match after.next() {
        Some(c) if c.is_alphanumeric() || c == '_' => false,
        Some(c) if is_chain_separator(c) => !after.next().is_some_and(|n| n.is_ascii_digit()),
        _ => true,
    }
}

fn is_chain_separator(c: char) -> bool {
    matches!(c, '.' | '/' | '-' | ',')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apostrophe_grouping_parses() {
        assert_eq!(extract_amounts("1'234'567.89", 100.0), vec![1_234_567.89]);
    }

    #[test]
    fn typographic_apostrophe_parses() {
        assert_eq!(extract_amounts("1\u{2019}250\u{2019}000.00", 100.0), vec![1_250_000.0]);
    }

    #[test]
    fn floor_is_exclusive() {
        assert!(extract_amounts("100", 100.0).is_empty());
        assert!(extract_amounts("99", 100.0).is_empty());
        assert!(extract_amounts("100.00", 100.0).is_empty());
        assert_eq!(extract_amounts("100.01", 100.0), vec![100.01]);
        assert_eq!(extract_amounts("999", 100.0), vec![999.0]);
    }

    #[test]
    fn small_values_never_survive() {
        let text = "1 2 3 12 45.50 99.99 100 7";
        assert!(extract_amounts(text, 100.0).is_empty());
    }

    #[test]
    fn digits_inside_identifiers_ignored() {
        let text = "Client: ABC123 CH0012345678 XS1234567890";
        assert!(extract_amounts(text, 100.0).is_empty());
    }

    #[test]
    fn date_fragments_ignored() {
        assert!(extract_amounts("30.09.2025", 100.0).is_empty());
        assert!(extract_amounts("2025-09-30", 100.0).is_empty());
        assert!(extract_amounts("30/09/2025", 100.0).is_empty());
    }

    #[test]
    fn holding_row_in_text_order() {
        let text = "Acme Corp Bond CH0012345678 1000 102.50 104500.00 CHF";
        assert_eq!(extract_amounts(text, 100.0), vec![1000.0, 102.5, 104_500.0]);
    }

    #[test]
    fn sentence_final_period_is_not_a_chain() {
        assert_eq!(extract_amounts("Total value 2500.", 100.0), vec![2500.0]);
        assert_eq!(extract_amounts("(2500)", 100.0), vec![2500.0]);
    }

    #[test]
    fn three_decimal_token_is_malformed() {
        assert!(extract_amounts("1.234", 0.0).is_empty());
    }

    #[test]
    fn comma_grouping_is_malformed() {
        assert!(extract_amounts("1,234,567.89", 100.0).is_empty());
    }

    #[test]
    fn lone_grouping_mark_is_skipped() {
        assert_eq!(parse_amount("''"), None);
        assert_eq!(parse_amount("1'000"), Some(1000.0));
    }

    #[test]
    fn configurable_floor() {
        assert_eq!(extract_amounts("150 250 350", 200.0), vec![250.0, 350.0]);
    }
}
