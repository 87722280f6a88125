use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// The per-symbol extraction result.
///
/// Constructed empty at the start of a run, filled field by field as locator
/// chains succeed, and handed back to the caller once both page phases have
/// completed. Every metric is either a validated number or absent; raw page
/// text never leaks through. `error` marks the record as incomplete but is
/// informational only, downstream consumers keep reading the other fields.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct KeyMetrics {
    /// 股票代碼（大寫）
    pub symbol: String,
    pub current_price: Option<Decimal>,
    pub pe_ratio_ttm: Option<Decimal>,
    pub forward_dividend_rate: Option<Decimal>,
    pub forward_dividend_yield: Option<Decimal>,
    pub growth_estimate_next_year: Option<Decimal>,
    pub error: Option<String>,
}

impl KeyMetrics {
    pub fn new(stock_symbol: &str) -> Self {
        KeyMetrics {
            symbol: stock_symbol.to_uppercase(),
            current_price: None,
            pe_ratio_ttm: None,
            forward_dividend_rate: None,
            forward_dividend_yield: None,
            growth_estimate_next_year: None,
            error: None,
        }
    }

    /// Appends a diagnostic message. Earlier phase errors are kept; a later
    /// phase can still fail (or succeed) independently.
    pub fn add_error(&mut self, msg: String) {
        match &mut self.error {
            Some(existing) => {
                existing.push_str("; ");
                existing.push_str(&msg);
            }
            None => self.error = Some(msg),
        }
    }
}

impl fmt::Display for KeyMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Symbol: {}", self.symbol)?;

        match self.current_price {
            Some(price) => writeln!(f, "Current Price: ${:.2}", price)?,
            None => writeln!(f, "Current Price: N/A")?,
        }

        match self.pe_ratio_ttm {
            Some(pe) => writeln!(f, "PE Ratio (TTM): {:.2}", pe)?,
            None => writeln!(f, "PE Ratio (TTM): N/A")?,
        }

        match self.forward_dividend_rate {
            Some(rate) => writeln!(f, "Forward Dividend Rate: ${:.2}", rate)?,
            None => writeln!(f, "Forward Dividend Rate: N/A")?,
        }

        match self.forward_dividend_yield {
            Some(y) => writeln!(f, "Forward Dividend Yield: {:.2}%", y)?,
            None => writeln!(f, "Forward Dividend Yield: N/A")?,
        }

        match self.growth_estimate_next_year {
            Some(g) => writeln!(f, "Growth Estimate Next Year: {:.2}%", g)?,
            None => writeln!(f, "Growth Estimate Next Year: N/A")?,
        }

        if let Some(why) = &self.error {
            writeln!(f, "Error: {}", why)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_new_uppercases_symbol() {
        assert_eq!(KeyMetrics::new("aapl").symbol, "AAPL");
        assert_eq!(KeyMetrics::new("MSFT").symbol, "MSFT");
    }

    #[test]
    fn test_add_error_is_additive() {
        let mut metrics = KeyMetrics::new("AAPL");
        assert_eq!(metrics.error, None);

        metrics.add_error("summary phase failed".to_string());
        metrics.add_error("analysis phase failed".to_string());
        assert_eq!(
            metrics.error.as_deref(),
            Some("summary phase failed; analysis phase failed")
        );
    }

    #[test]
    fn test_display_renders_absent_fields() {
        let mut metrics = KeyMetrics::new("AAPL");
        metrics.current_price = Some(dec!(201.18));

        let rendered = metrics.to_string();
        assert!(rendered.contains("Symbol: AAPL"));
        assert!(rendered.contains("Current Price: $201.18"));
        assert!(rendered.contains("PE Ratio (TTM): N/A"));
        assert!(!rendered.contains("Error:"));
    }
}
