use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;
use strum_macros::Display;

use crate::declare::KeyMetrics;

/// Metrics derived from an extracted record. Every field is optional: a
/// derivation is present only when its inputs exist and its denominators are
/// non-zero. Absent inputs are skipped, never an error.
#[derive(Serialize, Debug, Clone, Default, PartialEq)]
pub struct AdditionalMetrics {
    pub peg_ratio: Option<Decimal>,
    pub estimated_eps: Option<Decimal>,
    pub dividend_coverage_ratio: Option<Decimal>,
    pub estimated_pb_ratio: Option<Decimal>,
}

/// Simple valuation banding over the score (growth + yield) / PE.
#[derive(Serialize, Display, Debug, Clone, Copy, PartialEq)]
pub enum ValuationStatus {
    #[strum(serialize = "Overvalued")]
    Overvalued,
    #[strum(serialize = "Fairly Valued")]
    FairlyValued,
    #[strum(serialize = "Neutral")]
    Neutral,
    #[strum(serialize = "Undervalued")]
    Undervalued,
}

#[derive(Serialize, Debug, Clone, Default, PartialEq)]
pub struct Valuation {
    pub peg_based_fair_value: Option<Decimal>,
    pub dividend_growth_fair_value: Option<Decimal>,
    pub valuation_score: Option<Decimal>,
    pub status: Option<ValuationStatus>,
}

/// Assumed required rate of return for the dividend growth model.
const REQUIRED_RETURN: Decimal = dec!(0.10);

/// Fallback growth assumption when the estimate is exactly zero.
const DEFAULT_GROWTH: Decimal = dec!(0.05);

pub fn additional_metrics(metrics: &KeyMetrics) -> AdditionalMetrics {
    let mut derived = AdditionalMetrics::default();

    // PEG = PE / growth rate.
    if let (Some(pe), Some(growth)) = (metrics.pe_ratio_ttm, metrics.growth_estimate_next_year) {
        if !growth.is_zero() {
            derived.peg_ratio = Some(pe / growth);
        }
    }

    // Estimated EPS = price / PE; coverage = EPS / dividend rate.
    if let (Some(price), Some(pe), Some(rate)) = (
        metrics.current_price,
        metrics.pe_ratio_ttm,
        metrics.forward_dividend_rate,
    ) {
        if !pe.is_zero() {
            let eps = price / pe;
            derived.estimated_eps = Some(eps);
            if !rate.is_zero() {
                derived.dividend_coverage_ratio = Some(eps / rate);
            }
        }
    }

    // Rough P/B estimate: PE * ROE, taking the growth estimate as an ROE
    // stand-in.
    if let (Some(pe), Some(growth)) = (metrics.pe_ratio_ttm, metrics.growth_estimate_next_year) {
        derived.estimated_pb_ratio = Some(pe * (growth / dec!(100)));
    }

    derived
}

/// Fair-value estimations and the valuation banding. Produced only when all
/// four inputs are present; otherwise every field stays absent.
pub fn valuation(metrics: &KeyMetrics) -> Valuation {
    let mut valuation = Valuation::default();

    let (price, pe, growth, dividend_yield) = match (
        metrics.current_price,
        metrics.pe_ratio_ttm,
        metrics.growth_estimate_next_year,
        metrics.forward_dividend_yield,
    ) {
        (Some(price), Some(pe), Some(growth), Some(dividend_yield)) => {
            (price, pe, growth, dividend_yield)
        }
        _ => return valuation,
    };

    // PEG-based fair value under a PEG = 1 assumption.
    if !growth.is_zero() && !pe.is_zero() {
        valuation.peg_based_fair_value = Some((price / pe) * growth);
    }

    // Simplified dividend growth model, valid only while the required return
    // exceeds the growth rate.
    if dividend_yield > dec!(0) {
        let dividend_per_share = price * (dividend_yield / dec!(100));
        let growth_rate = if growth.is_zero() {
            DEFAULT_GROWTH
        } else {
            growth / dec!(100)
        };

        if REQUIRED_RETURN > growth_rate {
            valuation.dividend_growth_fair_value =
                Some(dividend_per_share * (dec!(1) + growth_rate) / (REQUIRED_RETURN - growth_rate));
        }
    }

    let score = if pe.is_zero() {
        Decimal::ZERO
    } else {
        (growth + dividend_yield) / pe
    };
    valuation.valuation_score = Some(score);
    valuation.status = Some(band(score));

    valuation
}

fn band(score: Decimal) -> ValuationStatus {
    if score < dec!(1) {
        ValuationStatus::Overvalued
    } else if score <= dec!(1.5) {
        ValuationStatus::FairlyValued
    } else if score <= dec!(2) {
        ValuationStatus::Neutral
    } else {
        ValuationStatus::Undervalued
    }
}
