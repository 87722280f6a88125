use std::env;

use anyhow::{anyhow, Result};

pub mod calculation;
pub mod config;
pub mod crawler;
pub mod declare;
pub mod export;
pub mod logging;
pub mod util;

use crate::{
    calculation::valuation,
    config::SETTINGS,
    util::http::HttpFetcher,
};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let stock_symbols: Vec<String> = env::args().skip(1).collect();
    if stock_symbols.is_empty() {
        return Err(anyhow!("usage: stock_metrics_crawler <SYMBOL> [SYMBOL...]"));
    }

    let fetcher = HttpFetcher::new()?;
    let symbol_refs: Vec<&str> = stock_symbols.iter().map(String::as_str).collect();
    let results = crawler::yahoo::fetch_batch(&fetcher, &symbol_refs).await;

    for stock_symbol in &symbol_refs {
        let key = stock_symbol.to_uppercase();
        let metrics = match results.get(&key) {
            Some(metrics) => metrics,
            None => continue,
        };

        println!("{}", metrics);

        let derived = valuation::additional_metrics(metrics);
        if let Some(peg) = derived.peg_ratio {
            println!("PEG Ratio: {:.2}", peg);
        }
        if let Some(eps) = derived.estimated_eps {
            println!("Estimated EPS: ${:.2}", eps);
        }
        if let Some(coverage) = derived.dividend_coverage_ratio {
            println!("Dividend Coverage Ratio: {:.2}x", coverage);
        }
        if let Some(pb) = derived.estimated_pb_ratio {
            println!("Estimated P/B Ratio: {:.2}", pb);
        }

        let appraisal = valuation::valuation(metrics);
        if let Some(score) = appraisal.valuation_score {
            println!("Valuation Score: {:.2}", score);
        }
        if let Some(status) = appraisal.status {
            println!("Valuation Status: {}", status);
        }

        println!("{}", "-".repeat(40));
    }

    if !SETTINGS.system.output_path.is_empty() {
        export::save_to_json(&SETTINGS.system.output_path, &results)?;
        logging::info_file_async(format!(
            "Metrics saved to {}",
            SETTINGS.system.output_path
        ));
    }

    Ok(())
}
