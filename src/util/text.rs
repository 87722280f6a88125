use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use std::str::FromStr;

/// Tokens the source page uses to mark a value as intentionally unavailable.
const SENTINEL_TOKENS: &[&str] = &["N/A", "NA", "--", "", "NULL"];

static NUMERIC_TOKEN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d+\.?\d*").expect("numeric token regex"));

static PERCENTAGE_TOKEN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d+\.?\d*%").expect("percentage token regex"));

/// Returns true when the text is one of the page's "not available" markers.
pub fn is_sentinel(text: &str) -> bool {
    let trimmed = text.trim().to_uppercase();
    SENTINEL_TOKENS.contains(&trimmed.as_str())
}

/// Converts a raw text fragment into a numeric value.
///
/// Tolerates currency symbols, thousands separators and stray whitespace by
/// dropping every character except digits, `-` and `.` before parsing.
/// Sentinel tokens ("N/A", "--", "NULL", ...) and malformed leftovers yield
/// `None`; this function never fails.
pub fn normalize_numeric(text: &str) -> Option<Decimal> {
    if is_sentinel(text) {
        return None;
    }

    let cleaned: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();

    if cleaned.is_empty() || matches!(cleaned.as_str(), "-" | "." | "-.") {
        return None;
    }

    Decimal::from_str(&cleaned).ok()
}

/// Converts a raw text fragment into a percentage value (percentage points).
///
/// Mechanically identical to [`normalize_numeric`] (the `%` sign falls out of
/// the character filter), but kept as a separate operation so a future
/// unit-aware change only touches callers with percentage semantics.
pub fn normalize_percentage(text: &str) -> Option<Decimal> {
    normalize_numeric(text)
}

/// All free-standing numbers in the text, in order of appearance.
pub fn numeric_tokens(text: &str) -> Vec<&str> {
    NUMERIC_TOKEN_RE.find_iter(text).map(|m| m.as_str()).collect()
}

/// All percentage tokens (number immediately followed by `%`), in order.
pub fn percentage_tokens(text: &str) -> Vec<&str> {
    PERCENTAGE_TOKEN_RE
        .find_iter(text)
        .map(|m| m.as_str())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_normalize_numeric() {
        assert_eq!(normalize_numeric("201.18"), Some(dec!(201.18)));
        assert_eq!(normalize_numeric("$1,234.56"), Some(dec!(1234.56)));
        assert_eq!(normalize_numeric("  28.5 "), Some(dec!(28.5)));
        assert_eq!(normalize_numeric("-4.2"), Some(dec!(-4.2)));
        assert_eq!(normalize_numeric("1.45%"), Some(dec!(1.45)));
        assert_eq!(normalize_numeric("15"), Some(dec!(15)));
    }

    #[test]
    fn test_normalize_numeric_is_idempotent_on_clean_input() {
        for clean in ["201.18", "-3.5", "0.96", "1000"] {
            let first = normalize_numeric(clean).unwrap();
            assert_eq!(normalize_numeric(&first.to_string()), Some(first));
        }
    }

    #[test]
    fn test_sentinel_tokens_yield_absent() {
        for token in ["N/A", "n/a", "NA", "na", "--", "", "NULL", "null", " N/A "] {
            assert_eq!(normalize_numeric(token), None, "token: {:?}", token);
            assert_eq!(normalize_percentage(token), None, "token: {:?}", token);
        }
    }

    #[test]
    fn test_degenerate_residue_yields_absent() {
        assert_eq!(normalize_numeric("-"), None);
        assert_eq!(normalize_numeric("."), None);
        assert_eq!(normalize_numeric("-."), None);
        assert_eq!(normalize_numeric("abc"), None);
        assert_eq!(normalize_numeric("1.2.3"), None);
    }

    #[test]
    fn test_numeric_tokens() {
        assert_eq!(numeric_tokens("PE Ratio (TTM) 28.5"), vec!["28.5"]);
        assert_eq!(numeric_tokens("0.96 (1.45%)"), vec!["0.96", "1.45"]);
        assert!(numeric_tokens("no numbers here").is_empty());
    }

    #[test]
    fn test_percentage_tokens() {
        assert_eq!(percentage_tokens("0.96 (1.45%)"), vec!["1.45%"]);
        assert!(percentage_tokens("0.96").is_empty());
    }
}
