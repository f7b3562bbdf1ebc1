use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::threshold::{classify, Flag, RatioColumn};
use crate::data::model::{
    CashflowPoint, PerformanceRecord, RatioRecord, SHEET_CASHFLOW, SHEET_PERFORMANCE,
    SHEET_RATIOS,
};

// ---------------------------------------------------------------------------
// Fixed limits
// ---------------------------------------------------------------------------

pub const REVENUE_MIN: f64 = 100_000.0;
pub const NET_INCOME_MIN: f64 = 10_000.0;
pub const CASH_BALANCE_MIN: f64 = 0.0;

pub const EXPANSION_MIN_SCORE: u8 = 5;
pub const EFFICIENCY_MIN_SCORE: u8 = 3;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ScoreError {
    /// The selection left nothing to average over.
    #[error("no data for this selection ({what})")]
    EmptyInput { what: &'static str },
}

/// How a metric is reduced over the selected months.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregation {
    /// Average over all selected rows.
    #[default]
    Mean,
    /// First selected row only (single-month snapshot).
    Snapshot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recommendation {
    Expansion,
    Efficiency,
    ConservativeRestructuring,
}

impl Recommendation {
    pub fn from_score(score: u8) -> Self {
        if score >= EXPANSION_MIN_SCORE {
            Recommendation::Expansion
        } else if score >= EFFICIENCY_MIN_SCORE {
            Recommendation::Efficiency
        } else {
            Recommendation::ConservativeRestructuring
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Recommendation::Expansion => "Expansion",
            Recommendation::Efficiency => "Efficiency",
            Recommendation::ConservativeRestructuring => "Conservative/Restructuring",
        }
    }

    /// Headline shown on the strategy tab.
    pub fn headline(self) -> &'static str {
        match self {
            Recommendation::Expansion => "Strategi Ekspansi",
            Recommendation::Efficiency => "Strategi Efisiensi",
            Recommendation::ConservativeRestructuring => "Strategi Konservatif / Restrukturisasi",
        }
    }
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Indicator {
    Revenue,
    NetIncome,
    Dscr,
    CurrentRatio,
    Der,
    CashBalance,
}

impl Indicator {
    pub const ALL: [Indicator; 6] = [
        Indicator::Revenue,
        Indicator::NetIncome,
        Indicator::Dscr,
        Indicator::CurrentRatio,
        Indicator::Der,
        Indicator::CashBalance,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Indicator::Revenue => "Pendapatan",
            Indicator::NetIncome => "Laba Bersih",
            Indicator::Dscr => "DSCR",
            Indicator::CurrentRatio => "Current Ratio",
            Indicator::Der => "DER",
            Indicator::CashBalance => "Saldo Kas",
        }
    }

    /// The pass condition, for display.
    pub fn rule(self) -> &'static str {
        match self {
            Indicator::Revenue => "> 100.000",
            Indicator::NetIncome => "> 10.000",
            Indicator::Dscr => ">= 1,2",
            Indicator::CurrentRatio => ">= 1,1",
            Indicator::Der => "<= 1,5",
            Indicator::CashBalance => "> 0 (rata-rata horizon)",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndicatorResult {
    pub indicator: Indicator,
    /// The aggregated metric the rule was applied to.
    pub value: f64,
    pub passed: bool,
}

/// Full outcome of one scoring run.
#[derive(Debug, Clone, PartialEq)]
pub struct Assessment {
    pub indicators: [IndicatorResult; 6],
    pub score: u8,
    pub recommendation: Recommendation,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Score a selection with [`Aggregation::Mean`].
pub fn assess(
    performance: &[&PerformanceRecord],
    ratios: &[&RatioRecord],
    cashflow: &[CashflowPoint],
) -> Result<Assessment, ScoreError> {
    assess_with(performance, ratios, cashflow, Aggregation::Mean)
}

/// Score a selection.
///
/// `performance` and `ratios` are the filtered subsets; `cashflow` is the
/// whole forecast, always averaged regardless of `aggregation`.
pub fn assess_with(
    performance: &[&PerformanceRecord],
    ratios: &[&RatioRecord],
    cashflow: &[CashflowPoint],
    aggregation: Aggregation,
) -> Result<Assessment, ScoreError> {
    if performance.is_empty() {
        return Err(ScoreError::EmptyInput { what: SHEET_PERFORMANCE });
    }
    if ratios.is_empty() {
        return Err(ScoreError::EmptyInput { what: SHEET_RATIOS });
    }

    let revenue = aggregate(performance.iter().map(|r| r.revenue), aggregation)
        .ok_or(ScoreError::EmptyInput { what: SHEET_PERFORMANCE })?;
    let net_income = aggregate(performance.iter().map(|r| r.net_income), aggregation)
        .ok_or(ScoreError::EmptyInput { what: SHEET_PERFORMANCE })?;
    let cash = aggregate(cashflow.iter().map(|p| p.closing_balance), Aggregation::Mean)
        .ok_or(ScoreError::EmptyInput { what: SHEET_CASHFLOW })?;

    let ratio = |column: RatioColumn| -> Result<IndicatorResult, ScoreError> {
        let value = aggregate(ratios.iter().filter_map(|r| column.value(r)), aggregation)
            .ok_or(ScoreError::EmptyInput { what: column.header() })?;
        let indicator = match column {
            RatioColumn::Dscr => Indicator::Dscr,
            RatioColumn::CurrentRatio => Indicator::CurrentRatio,
            RatioColumn::Der => Indicator::Der,
        };
        Ok(IndicatorResult {
            indicator,
            value,
            passed: classify(value, column.threshold(), column.polarity()) == Flag::Ok,
        })
    };

    let indicators = [
        IndicatorResult {
            indicator: Indicator::Revenue,
            value: revenue,
            passed: revenue > REVENUE_MIN,
        },
        IndicatorResult {
            indicator: Indicator::NetIncome,
            value: net_income,
            passed: net_income > NET_INCOME_MIN,
        },
        ratio(RatioColumn::Dscr)?,
        ratio(RatioColumn::CurrentRatio)?,
        ratio(RatioColumn::Der)?,
        IndicatorResult {
            indicator: Indicator::CashBalance,
            value: cash,
            passed: cash > CASH_BALANCE_MIN,
        },
    ];

    let score = indicators.iter().filter(|i| i.passed).count() as u8;
    Ok(Assessment {
        indicators,
        score,
        recommendation: Recommendation::from_score(score),
    })
}

/// Just the label of [`assess`].
pub fn recommend(
    performance: &[&PerformanceRecord],
    ratios: &[&RatioRecord],
    cashflow: &[CashflowPoint],
) -> Result<Recommendation, ScoreError> {
    assess(performance, ratios, cashflow).map(|a| a.recommendation)
}

fn aggregate(values: impl Iterator<Item = f64>, aggregation: Aggregation) -> Option<f64> {
    match aggregation {
        Aggregation::Snapshot => values.into_iter().next(),
        Aggregation::Mean => {
            let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
            (n > 0).then(|| sum / n as f64)
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn perf(month: &str, revenue: f64, net_income: f64) -> PerformanceRecord {
        PerformanceRecord {
            year: 2024,
            month: month.into(),
            revenue,
            ebitda: 0.0,
            fixed_cost: 0.0,
            net_income,
            debt: 0.0,
            extra: Vec::new(),
        }
    }

    fn ratio(month: &str, dscr: f64, current_ratio: f64, der: f64) -> RatioRecord {
        RatioRecord {
            year: 2024,
            month: month.into(),
            dscr: Some(dscr),
            current_ratio: Some(current_ratio),
            der: Some(der),
            unparsed: Vec::new(),
            extra: Vec::new(),
        }
    }

    fn cash(balances: &[f64]) -> Vec<CashflowPoint> {
        let start = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        balances
            .iter()
            .zip(start.iter_days())
            .map(|(&closing_balance, date)| CashflowPoint { date, closing_balance, extra: Vec::new() })
            .collect()
    }

    fn healthy() -> (Vec<PerformanceRecord>, Vec<RatioRecord>, Vec<CashflowPoint>) {
        (
            vec![perf("Jan", 150000.0, 12000.0), perf("Feb", 120000.0, 12000.0)],
            vec![ratio("Jan", 1.2, 1.1, 1.3), ratio("Feb", 1.4, 1.2, 1.5)],
            cash(&[400.0, 600.0]),
        )
    }

    #[test]
    fn all_indicators_pass_is_expansion() {
        let (p, r, c) = healthy();
        let a = assess(&p.iter().collect::<Vec<_>>(), &r.iter().collect::<Vec<_>>(), &c).unwrap();
        assert_eq!(a.indicators[0].value, 135000.0);
        assert_eq!(a.indicators[5].value, 500.0);
        assert!(a.indicators.iter().all(|i| i.passed));
        assert_eq!(a.score, 6);
        assert_eq!(a.recommendation, Recommendation::Expansion);
    }

    #[test]
    fn failing_der_and_cash_is_efficiency() {
        let (p, _, _) = healthy();
        let r = vec![ratio("Jan", 1.2, 1.1, 1.7), ratio("Feb", 1.4, 1.2, 1.9)];
        let c = cash(&[-100.0, 0.0]);
        let a = assess(&p.iter().collect::<Vec<_>>(), &r.iter().collect::<Vec<_>>(), &c).unwrap();
        assert!(!a.indicators[4].passed);
        assert!(!a.indicators[5].passed);
        assert_eq!(a.score, 4);
        assert_eq!(a.recommendation, Recommendation::Efficiency);
    }

    #[test]
    fn score_boundaries() {
        assert_eq!(Recommendation::from_score(6), Recommendation::Expansion);
        assert_eq!(Recommendation::from_score(5), Recommendation::Expansion);
        assert_eq!(Recommendation::from_score(4), Recommendation::Efficiency);
        assert_eq!(Recommendation::from_score(3), Recommendation::Efficiency);
        assert_eq!(Recommendation::from_score(2), Recommendation::ConservativeRestructuring);
        assert_eq!(Recommendation::from_score(0), Recommendation::ConservativeRestructuring);
        assert_eq!(Recommendation::ConservativeRestructuring.to_string(), "Conservative/Restructuring");
    }

    #[test]
    fn empty_selection_is_an_error() {
        let (p, r, c) = healthy();
        let p_refs: Vec<_> = p.iter().collect();
        let r_refs: Vec<_> = r.iter().collect();

        assert_eq!(
            assess(&[], &r_refs, &c),
            Err(ScoreError::EmptyInput { what: SHEET_PERFORMANCE })
        );
        assert_eq!(
            assess(&p_refs, &[], &c),
            Err(ScoreError::EmptyInput { what: SHEET_RATIOS })
        );
        assert_eq!(
            assess(&p_refs, &r_refs, &[]),
            Err(ScoreError::EmptyInput { what: SHEET_CASHFLOW })
        );
    }

    #[test]
    fn ratio_column_without_values_is_an_error() {
        let (p, _, c) = healthy();
        let r = vec![RatioRecord { year: 2024, month: "Jan".into(), dscr: None, current_ratio: Some(1.2), der: Some(1.0), unparsed: Vec::new(), extra: Vec::new() }];
        let err = assess(&p.iter().collect::<Vec<_>>(), &r.iter().collect::<Vec<_>>(), &c).unwrap_err();
        assert_eq!(err, ScoreError::EmptyInput { what: "DSCR" });
    }

    #[test]
    fn missing_ratio_cells_are_skipped_by_the_mean() {
        let (p, _, c) = healthy();
        let r = vec![
            ratio("Jan", 1.3, 1.2, 1.0),
            RatioRecord { year: 2024, month: "Feb".into(), dscr: None, current_ratio: None, der: None, unparsed: Vec::new(), extra: Vec::new() },
        ];
        let a = assess(&p.iter().collect::<Vec<_>>(), &r.iter().collect::<Vec<_>>(), &c).unwrap();
        assert_eq!(a.indicators[2].value, 1.3);
        assert_eq!(a.score, 6);
    }

    #[test]
    fn snapshot_uses_the_first_row() {
        let p = vec![perf("Jan", 90000.0, 12000.0), perf("Feb", 200000.0, 12000.0)];
        let r = vec![ratio("Jan", 1.3, 1.2, 1.0)];
        let c = cash(&[10.0]);
        let p_refs: Vec<_> = p.iter().collect();
        let r_refs: Vec<_> = r.iter().collect();

        let mean = assess_with(&p_refs, &r_refs, &c, Aggregation::Mean).unwrap();
        let snap = assess_with(&p_refs, &r_refs, &c, Aggregation::Snapshot).unwrap();
        assert!(mean.indicators[0].passed);
        assert!(!snap.indicators[0].passed);
        assert_eq!(snap.indicators[0].value, 90000.0);
    }

    #[test]
    fn scoring_is_deterministic() {
        let (p, r, c) = healthy();
        let p_refs: Vec<_> = p.iter().collect();
        let r_refs: Vec<_> = r.iter().collect();
        let first = assess(&p_refs, &r_refs, &c);
        for _ in 0..10 {
            assert_eq!(assess(&p_refs, &r_refs, &c), first);
        }
    }

    #[test]
    fn improving_one_metric_never_lowers_the_score() {
        // Start every metric just on the failing side of its limit.
        let base = || {
            (
                perf("Jan", 100000.0, 10000.0),
                ratio("Jan", 1.19, 1.09, 1.51),
                -1.0,
            )
        };
        let score = |p: &PerformanceRecord, r: &RatioRecord, c: f64| {
            assess(&[p], &[r], &cash(&[c])).unwrap().score
        };

        let (p0, r0, c0) = base();
        let baseline = score(&p0, &r0, c0);
        assert_eq!(baseline, 0);

        for step in [0.001, 0.5, 10.0, 1e6] {
            let (mut p, r, c) = base();
            p.revenue += step;
            assert!(score(&p, &r, c) >= baseline);

            let (mut p, r, c) = base();
            p.net_income += step;
            assert!(score(&p, &r, c) >= baseline);

            let (p, mut r, c) = base();
            r.dscr = r.dscr.map(|v| v + step);
            assert!(score(&p, &r, c) >= baseline);

            let (p, mut r, c) = base();
            r.current_ratio = r.current_ratio.map(|v| v + step);
            assert!(score(&p, &r, c) >= baseline);

            let (p, mut r, c) = base();
            r.der = r.der.map(|v| v - step);
            assert!(score(&p, &r, c) >= baseline);

            let (p, r, c) = base();
            assert!(score(&p, &r, c + step) >= baseline);
        }

        // From a fully healthy state, improvements keep the label at Expansion.
        let (p, r, c) = healthy();
        let mut better = p.clone();
        better[0].revenue *= 2.0;
        let a = assess(&better.iter().collect::<Vec<_>>(), &r.iter().collect::<Vec<_>>(), &c).unwrap();
        assert_eq!(a.recommendation, Recommendation::Expansion);
    }
}
