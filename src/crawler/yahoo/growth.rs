use chrono::{Datelike, Local};
use once_cell::sync::Lazy;
use rust_decimal::Decimal;
use scraper::{ElementRef, Html, Selector};

use crate::util::text;

static GROWTH_SECTION: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"section[data-testid="growthEstimate"]"#).expect("growth section selector")
});

static TABLE: Lazy<Selector> = Lazy::new(|| Selector::parse("table").expect("table selector"));

static THEAD: Lazy<Selector> = Lazy::new(|| Selector::parse("thead").expect("thead selector"));

static TABLE_ROW: Lazy<Selector> = Lazy::new(|| Selector::parse("tr").expect("tr selector"));

static TABLE_CELL: Lazy<Selector> =
    Lazy::new(|| Selector::parse("td, th").expect("td/th selector"));

/// First-cell markers of benchmark comparison rows that must never be read
/// as the company's own row.
const BENCHMARK_MARKERS: &[&str] = &["S&P", "500", "SECTOR", "INDUSTRY"];

/// Locates the next-year growth estimate on the analysis page.
///
/// Three passes over the document, first hit wins: the dedicated growth
/// section's table; any table whose text mentions both "growth" and
/// "next year"; any table with "next year" in its own text or both
/// "estimate" and "growth" in its immediate parent's text.
pub fn extract_growth_estimate(document: &Html, stock_symbol: &str) -> Option<Decimal> {
    if let Some(section) = document.select(&GROWTH_SECTION).next() {
        if let Some(table) = section.select(&TABLE).next() {
            if let Some(growth) = extract_from_growth_table(table, stock_symbol) {
                return Some(growth);
            }
        }
    }

    for table in document.select(&TABLE) {
        let table_text = element_text(table).to_lowercase();
        if table_text.contains("growth") && table_text.contains("next year") {
            if let Some(growth) = extract_from_growth_table(table, stock_symbol) {
                return Some(growth);
            }
        }
    }

    for table in document.select(&TABLE) {
        let parent_text = table
            .parent()
            .and_then(ElementRef::wrap)
            .map(|parent| element_text(parent).to_lowercase())
            .unwrap_or_default();
        let own_text = element_text(table).to_lowercase();

        if (parent_text.contains("estimate") && parent_text.contains("growth"))
            || own_text.contains("next year")
        {
            if let Some(growth) = extract_from_growth_table(table, stock_symbol) {
                return Some(growth);
            }
        }
    }

    None
}

/// Reads the company's next-year cell out of one candidate table.
fn extract_from_growth_table(table: ElementRef<'_>, stock_symbol: &str) -> Option<Decimal> {
    let target_idx = target_column_index(table)?;
    let symbol_upper = stock_symbol.to_uppercase();

    for row in table.select(&TABLE_ROW) {
        let cells: Vec<ElementRef<'_>> = row.select(&TABLE_CELL).collect();
        if cells.len() <= target_idx {
            continue;
        }

        let first_cell = element_text(cells[0]).to_uppercase();
        if first_cell != symbol_upper && !looks_like_ticker(&first_cell) {
            continue;
        }

        let growth_value = element_text(cells[target_idx]);
        if text::is_sentinel(&growth_value) {
            // "Not yet published" cell; a later row may still qualify.
            continue;
        }

        return text::normalize_percentage(&growth_value);
    }

    None
}

/// Finds the column holding the next-year estimate: an explicit "next year"
/// / "next 5 years" header, or one of the two most recent calendar years as
/// a literal 4-digit token. First matching header wins.
fn target_column_index(table: ElementRef<'_>) -> Option<usize> {
    let headers: Vec<String> = match table.select(&THEAD).next() {
        Some(head) => head.select(&TABLE_CELL).map(element_text).collect(),
        None => table
            .select(&TABLE_ROW)
            .next()
            .map(|row| row.select(&TABLE_CELL).map(element_text).collect())
            .unwrap_or_default(),
    };

    let current_year = Local::now().year();
    let year_tokens = [current_year.to_string(), (current_year - 1).to_string()];

    headers.iter().position(|header| {
        let lowered = header.to_lowercase();
        lowered.contains("next year")
            || lowered.contains("next 5 years")
            || year_tokens.iter().any(|year| lowered.contains(year))
    })
}

/// Short all-alphabetic first cells are treated as the company's ticker row;
/// benchmark/sector/industry comparison rows are excluded by marker.
fn looks_like_ticker(first_cell: &str) -> bool {
    !first_cell.is_empty()
        && first_cell.len() <= 6
        && first_cell.chars().all(|c| c.is_alphabetic())
        && !BENCHMARK_MARKERS
            .iter()
            .any(|marker| first_cell.contains(marker))
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}
