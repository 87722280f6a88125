use std::time::Duration;

use anyhow::{anyhow, Result};
use concat_string::concat_string;
use hashbrown::HashMap;
use scraper::Html;

use crate::{
    config::SETTINGS,
    declare::KeyMetrics,
    logging,
    util::http::PageFetcher,
};

pub mod growth;
pub mod price;
pub mod summary;

pub const HOST: &str = "finance.yahoo.com";

/// Extracts the key metrics for one ticker.
///
/// Two phases: the quote summary page (price, trailing P/E, dividends) and
/// the analysis page (next-year growth estimate), separated by a courtesy
/// pause. A failed phase turns into a diagnostic on the record's `error`
/// field and never stops the other phase; this function does not return
/// `Err` and does not panic.
pub async fn fetch_key_metrics(fetcher: &dyn PageFetcher, stock_symbol: &str) -> KeyMetrics {
    let mut metrics = KeyMetrics::new(stock_symbol);

    if let Err(why) = visit_summary_page(fetcher, &mut metrics).await {
        metrics.add_error(format!(
            "Failed to retrieve summary data for {}: {}",
            metrics.symbol, why
        ));
    }

    tokio::time::sleep(Duration::from_millis(SETTINGS.system.page_delay_millis)).await;

    if let Err(why) = visit_analysis_page(fetcher, &mut metrics).await {
        metrics.add_error(format!(
            "Failed to retrieve analysis data for {}: {}",
            metrics.symbol, why
        ));
    }

    metrics
}

/// Extracts key metrics for a batch of tickers, sequentially with a fixed
/// pause between symbols. Every input symbol gets an entry, keyed by its
/// uppercased form.
pub async fn fetch_batch(
    fetcher: &dyn PageFetcher,
    stock_symbols: &[&str],
) -> HashMap<String, KeyMetrics> {
    let total = stock_symbols.len();
    let mut results = HashMap::with_capacity(total);

    for (i, stock_symbol) in stock_symbols.iter().enumerate() {
        logging::info_file_async(format!(
            "Fetching metrics for {} ({}/{})",
            stock_symbol,
            i + 1,
            total
        ));

        let metrics = fetch_key_metrics(fetcher, stock_symbol).await;
        results.insert(metrics.symbol.clone(), metrics);

        if i + 1 < total {
            tokio::time::sleep(Duration::from_millis(SETTINGS.system.symbol_delay_millis)).await;
        }
    }

    results
}

async fn visit_summary_page(
    fetcher: &dyn PageFetcher,
    metrics: &mut KeyMetrics,
) -> Result<()> {
    let url = summary_url(&metrics.symbol);
    let page = fetcher.get(&url).await?;

    if !page.is_success() {
        return Err(anyhow!("status code {}", page.status));
    }

    let document = Html::parse_document(&page.body);

    metrics.current_price = price::extract_current_price(&document);
    metrics.pe_ratio_ttm = summary::extract_pe_ratio(&document);

    let dividend = summary::extract_dividend(&document);
    metrics.forward_dividend_rate = dividend.rate;
    metrics.forward_dividend_yield = dividend.yield_percent;

    if metrics.current_price.is_none() {
        logging::debug_file_async(format!(
            "No current price located on the summary page for {}",
            metrics.symbol
        ));
    }

    Ok(())
}

async fn visit_analysis_page(
    fetcher: &dyn PageFetcher,
    metrics: &mut KeyMetrics,
) -> Result<()> {
    let url = analysis_url(&metrics.symbol);
    let page = fetcher.get(&url).await?;

    if !page.is_success() {
        return Err(anyhow!("status code {}", page.status));
    }

    let document = Html::parse_document(&page.body);
    metrics.growth_estimate_next_year = growth::extract_growth_estimate(&document, &metrics.symbol);

    if metrics.growth_estimate_next_year.is_none() {
        logging::debug_file_async(format!(
            "No growth estimate table located on the analysis page for {}",
            metrics.symbol
        ));
    }

    Ok(())
}

fn summary_url(stock_symbol: &str) -> String {
    let symbol = urlencoding::encode(stock_symbol);
    concat_string!("https://", HOST, "/quote/", symbol)
}

fn analysis_url(stock_symbol: &str) -> String {
    let symbol = urlencoding::encode(stock_symbol);
    concat_string!("https://", HOST, "/quote/", symbol, "/analysis")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::http::FetchedPage;
    use async_trait::async_trait;
    use reqwest::StatusCode;
    use rust_decimal_macros::dec;

    /// Deterministic [`PageFetcher`]: a url -> (status, body) map. Unknown
    /// urls behave like a transport failure.
    struct FakeFetcher {
        pages: std::collections::HashMap<String, (StatusCode, String)>,
    }

    impl FakeFetcher {
        fn new() -> Self {
            FakeFetcher {
                pages: Default::default(),
            }
        }

        fn with_page(mut self, url: &str, status: StatusCode, body: &str) -> Self {
            self.pages.insert(url.to_string(), (status, body.to_string()));
            self
        }
    }

    #[async_trait]
    impl PageFetcher for FakeFetcher {
        async fn get(&self, url: &str) -> Result<FetchedPage> {
            match self.pages.get(url) {
                Some((status, body)) => Ok(FetchedPage {
                    status: *status,
                    body: body.clone(),
                }),
                None => Err(anyhow!("connection refused: {}", url)),
            }
        }
    }

    const SUMMARY_PAGE: &str = r#"
        <html><body>
            <span data-testid="qsp-price">201.18</span>
            <span data-testid="PE_RATIO-value">28.5</span>
            <span data-testid="FORWARD_DIVIDEND_AND_YIELD-value">0.96 (1.45%)</span>
        </body></html>"#;

    const ANALYSIS_PAGE: &str = r#"
        <html><body>
            <section data-testid="growthEstimate">
                <table>
                    <thead><tr><th>Currency</th><th>Next Year</th></tr></thead>
                    <tbody>
                        <tr><td>S&amp;P 500</td><td>5.0</td></tr>
                        <tr><td>AAPL</td><td>8.4</td></tr>
                    </tbody>
                </table>
            </section>
        </body></html>"#;

    #[test]
    fn test_urls() {
        assert_eq!(summary_url("AAPL"), "https://finance.yahoo.com/quote/AAPL");
        assert_eq!(
            analysis_url("BRK.B"),
            "https://finance.yahoo.com/quote/BRK.B/analysis"
        );
    }

    #[tokio::test]
    async fn test_fetch_key_metrics() {
        dotenv::dotenv().ok();
        let fetcher = FakeFetcher::new()
            .with_page(&summary_url("AAPL"), StatusCode::OK, SUMMARY_PAGE)
            .with_page(&analysis_url("AAPL"), StatusCode::OK, ANALYSIS_PAGE);

        let metrics = fetch_key_metrics(&fetcher, "aapl").await;

        assert_eq!(metrics.symbol, "AAPL");
        assert_eq!(metrics.current_price, Some(dec!(201.18)));
        assert_eq!(metrics.pe_ratio_ttm, Some(dec!(28.5)));
        assert_eq!(metrics.forward_dividend_rate, Some(dec!(0.96)));
        assert_eq!(metrics.forward_dividend_yield, Some(dec!(1.45)));
        assert_eq!(metrics.growth_estimate_next_year, Some(dec!(8.4)));
        assert_eq!(metrics.error, None);
    }

    #[tokio::test]
    async fn test_both_phases_failing_never_raises() {
        dotenv::dotenv().ok();
        let fetcher = FakeFetcher::new()
            .with_page(&summary_url("AAPL"), StatusCode::SERVICE_UNAVAILABLE, "")
            .with_page(&analysis_url("AAPL"), StatusCode::NOT_FOUND, "");

        let metrics = fetch_key_metrics(&fetcher, "AAPL").await;

        assert_eq!(metrics.current_price, None);
        assert_eq!(metrics.pe_ratio_ttm, None);
        assert_eq!(metrics.forward_dividend_rate, None);
        assert_eq!(metrics.forward_dividend_yield, None);
        assert_eq!(metrics.growth_estimate_next_year, None);

        let error = metrics.error.expect("both phases failed");
        assert!(error.contains("503"));
        assert!(error.contains("404"));
    }

    #[tokio::test]
    async fn test_summary_failure_does_not_stop_analysis() {
        dotenv::dotenv().ok();
        // No summary page registered: the fetch is a transport error.
        let fetcher = FakeFetcher::new().with_page(
            &analysis_url("AAPL"),
            StatusCode::OK,
            ANALYSIS_PAGE,
        );

        let metrics = fetch_key_metrics(&fetcher, "AAPL").await;

        assert_eq!(metrics.current_price, None);
        assert_eq!(metrics.growth_estimate_next_year, Some(dec!(8.4)));
        assert!(metrics
            .error
            .as_deref()
            .unwrap_or_default()
            .contains("summary data"));
    }

    #[tokio::test]
    async fn test_fetch_batch_uppercases_keys() {
        dotenv::dotenv().ok();
        let fetcher = FakeFetcher::new()
            .with_page(&summary_url("AAPL"), StatusCode::OK, SUMMARY_PAGE)
            .with_page(&analysis_url("AAPL"), StatusCode::OK, ANALYSIS_PAGE);

        let results = fetch_batch(&fetcher, &["aapl", "MSFT"]).await;

        assert_eq!(results.len(), 2);
        assert!(results.contains_key("AAPL"));
        assert!(results.contains_key("MSFT"));
        // MSFT had no pages registered; its record survives with an error.
        assert!(results["MSFT"].error.is_some());
        assert_eq!(results["AAPL"].current_price, Some(dec!(201.18)));
    }
}
