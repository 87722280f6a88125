use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use scraper::{ElementRef, Html, Selector};

use crate::{crawler::Located, util::text};

static PE_RATIO_TEST_ID: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"[data-testid="PE_RATIO-value"]"#).expect("pe-ratio selector")
});

/// The dividend value is published under either of these ids depending on the
/// page variant.
static DIVIDEND_TEST_IDS: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(
        r#"[data-testid="FORWARD_DIVIDEND_AND_YIELD-value"], [data-testid="TD_DIVIDEND_AND_YIELD-value"]"#,
    )
    .expect("dividend selector")
});

static QUOTE_STATS: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"div[data-testid*="quote"][data-testid*="stat"]"#)
        .expect("quote-stats selector")
});

static SECTION: Lazy<Selector> =
    Lazy::new(|| Selector::parse("section").expect("section selector"));

static STAT_ITEM: Lazy<Selector> =
    Lazy::new(|| Selector::parse("li, tr, div").expect("stat item selector"));

static TABLE: Lazy<Selector> = Lazy::new(|| Selector::parse("table").expect("table selector"));

static TABLE_ROW: Lazy<Selector> = Lazy::new(|| Selector::parse("tr").expect("tr selector"));

static TABLE_CELL: Lazy<Selector> =
    Lazy::new(|| Selector::parse("td, th").expect("td/th selector"));

/// `<rate> (<yield>%)` as the page prints bundled dividend text,
/// e.g. "0.96 (1.45%)".
static DIVIDEND_RATE_YIELD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+\.?\d*)\s*\((\d+\.?\d*)%?\)").expect("dividend regex"));

/// Forward dividend rate and yield travel together in the page markup, so
/// the sub-routine fills both halves of this pair and later stages only top
/// up whichever half is still missing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DividendInfo {
    pub rate: Option<Decimal>,
    pub yield_percent: Option<Decimal>,
}

impl DividendInfo {
    fn is_complete(&self) -> bool {
        self.rate.is_some() && self.yield_percent.is_some()
    }
}

/// Runs the trailing-P/E locator chain, stopping at the first hit.
pub fn extract_pe_ratio(document: &Html) -> Option<Decimal> {
    let locators: Vec<fn(&Html) -> Located<Decimal>> =
        vec![pe_from_test_id, pe_from_quote_stats, pe_from_tables];

    for locate in locators {
        if let Located::Found(pe) = locate(document) {
            return Some(pe);
        }
    }

    None
}

/// Runs the dividend locator chain; stages merge fill-if-absent and the
/// chain stops once both rate and yield are populated.
pub fn extract_dividend(document: &Html) -> DividendInfo {
    let stages: Vec<fn(&Html, &mut DividendInfo)> = vec![
        dividend_from_test_id,
        dividend_from_quote_stats,
        dividend_from_tables,
    ];

    let mut info = DividendInfo::default();

    for stage in stages {
        stage(document, &mut info);
        if info.is_complete() {
            break;
        }
    }

    info
}

/// Strategy 1: the stable field identifier.
fn pe_from_test_id(document: &Html) -> Located<Decimal> {
    let element = match document.select(&PE_RATIO_TEST_ID).next() {
        Some(element) => element,
        None => return Located::NotFound,
    };

    let raw = element_text(element);
    if text::is_sentinel(&raw) {
        return Located::Ignored;
    }

    match text::normalize_numeric(&raw) {
        Some(pe) => Located::Found(pe),
        None => Located::Ignored,
    }
}

/// Strategy 2: label/value items inside the quote-statistics containers.
/// The last numeric token wins; numbers before it tend to be row labels or
/// footnote markers.
fn pe_from_quote_stats(document: &Html) -> Located<Decimal> {
    let sections = quote_stats_sections(document);
    if sections.is_empty() {
        return Located::NotFound;
    }

    for section in sections {
        for item in section.select(&STAT_ITEM) {
            let raw = element_text(item);
            let lowered = raw.to_lowercase();

            if !(lowered.contains("pe ratio") || lowered.contains("p/e ratio")) {
                continue;
            }
            if !(lowered.contains("ttm") || lowered.contains("trailing")) {
                continue;
            }

            if let Some(token) = text::numeric_tokens(&raw).last() {
                if let Some(pe) = text::normalize_numeric(token) {
                    return Located::Found(pe);
                }
            }
        }
    }

    Located::Ignored
}

/// Strategy 3: label/value table rows anywhere in the document.
fn pe_from_tables(document: &Html) -> Located<Decimal> {
    for (label, value) in labeled_rows(document) {
        if (label.contains("pe ratio") || label.contains("p/e ratio"))
            && (label.contains("ttm") || label.contains("trailing"))
        {
            if let Some(pe) = text::normalize_numeric(&value) {
                return Located::Found(pe);
            }
        }
    }

    Located::NotFound
}

fn dividend_from_test_id(document: &Html, info: &mut DividendInfo) {
    for element in document.select(&DIVIDEND_TEST_IDS) {
        let raw = element_text(element);
        if text::is_sentinel(&raw) {
            continue;
        }

        parse_dividend_info(&raw, info);
        if info.is_complete() {
            return;
        }
    }
}

fn dividend_from_quote_stats(document: &Html, info: &mut DividendInfo) {
    for section in quote_stats_sections(document) {
        for item in section.select(&STAT_ITEM) {
            let raw = element_text(item);
            let lowered = raw.to_lowercase();

            if lowered.contains("dividend") && lowered.contains("yield") {
                parse_dividend_info(&raw, info);
                if info.is_complete() {
                    return;
                }
            }
        }
    }
}

fn dividend_from_tables(document: &Html, info: &mut DividendInfo) {
    for (label, value) in labeled_rows(document) {
        if label == "forward annual dividend rate" {
            if info.rate.is_none() {
                info.rate = text::normalize_numeric(&value);
            }
        } else if label == "forward annual dividend yield" {
            if info.yield_percent.is_none() {
                info.yield_percent = text::normalize_percentage(&value);
            }
        } else if label.contains("dividend") && label.contains("yield") && label.contains("forward")
        {
            parse_dividend_info(&value, info);
        }

        if info.is_complete() {
            return;
        }
    }
}

/// The combined dividend sub-routine.
///
/// Bundled text such as "0.96 (1.45%)" carries the rate before the
/// parenthesis and the yield inside it. When the bundled shape is absent the
/// first free-standing number becomes the rate and the first percentage the
/// yield. Values already populated by a higher-priority stage are never
/// overwritten.
pub fn parse_dividend_info(dividend_text: &str, info: &mut DividendInfo) {
    if let Some(caps) = DIVIDEND_RATE_YIELD_RE.captures(dividend_text) {
        if info.rate.is_none() {
            info.rate = text::normalize_numeric(&caps[1]);
        }
        if info.yield_percent.is_none() {
            info.yield_percent = text::normalize_percentage(&caps[2]);
        }
        return;
    }

    if info.rate.is_none() {
        if let Some(token) = text::numeric_tokens(dividend_text).first() {
            info.rate = text::normalize_numeric(token);
        }
    }

    if info.yield_percent.is_none() {
        if let Some(token) = text::percentage_tokens(dividend_text).first() {
            info.yield_percent = text::normalize_percentage(token);
        }
    }
}

/// Quote-statistics containers: elements whose test id mentions both "quote"
/// and "stat", or failing that any section classed as a quote block.
fn quote_stats_sections(document: &Html) -> Vec<ElementRef<'_>> {
    let sections: Vec<ElementRef<'_>> = document.select(&QUOTE_STATS).collect();
    if !sections.is_empty() {
        return sections;
    }

    document
        .select(&SECTION)
        .filter(|section| {
            section
                .value()
                .attr("class")
                .map(|class| class.to_lowercase().contains("quote"))
                .unwrap_or(false)
        })
        .collect()
}

/// Yields (lower-cased first cell, second cell) for every two-cell table row
/// in the document.
fn labeled_rows(document: &Html) -> Vec<(String, String)> {
    let mut rows = Vec::new();

    for table in document.select(&TABLE) {
        for row in table.select(&TABLE_ROW) {
            let cells: Vec<ElementRef<'_>> = row.select(&TABLE_CELL).collect();
            if cells.len() < 2 {
                continue;
            }

            rows.push((
                element_text(cells[0]).to_lowercase(),
                element_text(cells[1]),
            ));
        }
    }

    rows
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}
