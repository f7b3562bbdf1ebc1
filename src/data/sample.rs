use chrono::{Datelike, Duration, NaiveDate};

use super::model::{
    CashflowPoint, CellValue, DebtObligation, FinancialTables, PerformanceRecord, RatioRecord,
};

pub const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "Mei", "Jun", "Jul", "Agu", "Sep", "Okt", "Nov", "Des",
];

/// Small deterministic generator (SplitMix64); reproducible fixtures only.
struct SampleRng(u64);

impl SampleRng {
    fn next_u64(&mut self) -> u64 {
        self.0 = self.0.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = self.0;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }

    /// Uniform in `[lo, hi)`.
    fn range(&mut self, lo: f64, hi: f64) -> f64 {
        let unit = (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64;
        lo + (hi - lo) * unit
    }
}

fn round_to(v: f64, places: i32) -> f64 {
    let f = 10f64.powi(places);
    (v * f).round() / f
}

/// Generate a plausible workbook: `years` × 12 months of performance and
/// ratios, a 14-day cashflow forecast starting at `forecast_start`, and a
/// handful of loans.
pub fn sample_tables(seed: u64, years: &[i32], forecast_start: NaiveDate) -> FinancialTables {
    let mut rng = SampleRng(seed);
    let mut performance = Vec::new();
    let mut ratios = Vec::new();

    let mut debt = 2_400_000.0;
    for &year in years {
        for (m, month) in MONTHS.iter().enumerate() {
            // Ferry traffic peaks around the holiday months.
            let season = if matches!(m, 3 | 5 | 11) { 1.25 } else { 1.0 };
            let revenue = round_to(rng.range(80_000.0, 160_000.0) * season, 0);
            let fixed_cost = round_to(rng.range(30_000.0, 45_000.0), 0);
            let ebitda = round_to(revenue - fixed_cost - rng.range(10_000.0, 30_000.0), 0);
            let net_income = round_to(ebitda * rng.range(0.15, 0.45), 0);
            debt = round_to(debt - rng.range(5_000.0, 25_000.0), 0);

            performance.push(PerformanceRecord {
                year,
                month: month.to_string(),
                revenue,
                ebitda,
                fixed_cost,
                net_income,
                debt,
                extra: Vec::new(),
            });
            ratios.push(RatioRecord {
                year,
                month: month.to_string(),
                dscr: Some(round_to(rng.range(0.9, 1.8), 2)),
                current_ratio: Some(round_to(rng.range(0.8, 1.6), 2)),
                der: Some(round_to(rng.range(0.8, 2.2), 2)),
                unparsed: Vec::new(),
                extra: Vec::new(),
            });
        }
    }

    let mut balance = rng.range(-200.0, 1_500.0);
    let cashflow = (0..14)
        .map(|day| {
            balance += rng.range(-400.0, 400.0);
            CashflowPoint {
                date: forecast_start + Duration::days(day),
                closing_balance: round_to(balance, 0),
                extra: Vec::new(),
            }
        })
        .collect();

    let loans = [
        ("KI Kapal Roro 1", "Bank Mandiri", 3, "Investasi", 1_200_000.0),
        ("KMK Operasional", "BRI", 1, "Modal Kerja", 350_000.0),
        ("KI Dermaga", "BNI", 5, "Investasi", 900_000.0),
        ("Obligasi Seri A", "Pasar Modal", 7, "Obligasi", 1_500_000.0),
    ];
    let debts = loans
        .iter()
        .map(|&(name, institution, years_left, kind, plafond)| DebtObligation {
            loan_name: name.to_string(),
            institution: institution.to_string(),
            maturity_date: NaiveDate::from_ymd_opt(forecast_start.year() + years_left, 12, 31)
                .unwrap_or(forecast_start),
            extra: vec![
                ("Jenis".to_string(), CellValue::Text(kind.to_string())),
                ("Plafon".to_string(), CellValue::Number(plafond)),
            ],
        })
        .collect();

    FinancialTables {
        performance,
        ratios,
        cashflow,
        debts,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_has_expected_shape_and_is_reproducible() {
        let start = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let a = sample_tables(42, &[2023, 2024], start);
        let b = sample_tables(42, &[2023, 2024], start);
        assert_eq!(a, b);

        assert_eq!(a.performance.len(), 24);
        assert_eq!(a.ratios.len(), 24);
        assert_eq!(a.cashflow.len(), 14);
        assert_eq!(a.debts.len(), 4);
        assert_eq!(a.years(), vec![2024, 2023]);
        assert_eq!(a.months().len(), 12);
        assert_eq!(
            a.cashflow_range(),
            Some((start, start + Duration::days(13)))
        );
    }
}
