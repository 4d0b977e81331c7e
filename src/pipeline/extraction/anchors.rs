use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

/// ISIN shape: 2 uppercase letters + 10 uppercase alphanumerics, word-bounded.
/// Shape only: no country-code or check-digit validation.
static ISIN_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[A-Z]{2}[A-Z0-9]{10}\b").expect("valid ISIN pattern"));

/// Distinct ISIN-shaped identifiers in `text`, in order of first appearance.
pub fn extract_anchors(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    ISIN_PATTERN
        .find_iter(text)
        .map(|m| m.as_str())
        .filter(|isin| seen.insert(*isin))
        .map(str::to_string)
        .collect()
}

/// Whether `candidate` as a whole has the ISIN shape.
pub fn is_isin_shape(candidate: &str) -> bool {
    let bytes = candidate.as_bytes();
    bytes.len() == 12
        && bytes[..2].iter().all(|b| b.is_ascii_uppercase())
        && bytes[2..]
            .iter()
            .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_isins() {
        let text = "Nestle SA CH0038863350 100 shares\nApple Inc US0378331005";
        assert_eq!(extract_anchors(text), vec!["CH0038863350", "US0378331005"]);
    }

    #[test]
    fn duplicates_collapse_to_first_appearance() {
        let text = "US0378331005 overview\nCH0038863350\nUS0378331005 detail";
        assert_eq!(extract_anchors(text), vec!["US0378331005", "CH0038863350"]);
    }

    #[test]
    fn no_match_is_empty() {
        assert!(extract_anchors("Total portfolio value 1'234'567.89 CHF").is_empty());
        assert!(extract_anchors("").is_empty());
    }

    #[test]
    fn embedded_identifier_is_not_an_anchor() {
        // 13 characters, or glued to other word characters
        assert!(extract_anchors("XCH0038863350").is_empty());
        assert!(extract_anchors("CH00388633501").is_empty());
        assert!(extract_anchors("CH0038863350_A").is_empty());
    }

    #[test]
    fn lowercase_is_not_an_anchor() {
        assert!(extract_anchors("ch0038863350").is_empty());
    }

    #[test]
    fn shape_only_no_checksum() {
        // Invalid check digit and unknown country code still match
        assert_eq!(extract_anchors("ZZ0000000000"), vec!["ZZ0000000000"]);
    }

    #[test]
    fn isin_shape_check() {
        assert!(is_isin_shape("XS1234567890"));
        assert!(is_isin_shape("CH00388633A0"));
        assert!(!is_isin_shape("X11234567890"));
        assert!(!is_isin_shape("XS123456789"));
        assert!(!is_isin_shape("xs1234567890"));
        assert!(!is_isin_shape("XS12345678-0"));
    }
}
