use std::collections::BTreeSet;
use std::fmt;

use chrono::NaiveDate;

// ---------------------------------------------------------------------------
// Workbook layout – sheet and header names
// ---------------------------------------------------------------------------

pub const SHEET_PERFORMANCE: &str = "Kinerja_Keuangan";
pub const SHEET_RATIOS: &str = "Rasio_Keuangan";
pub const SHEET_CASHFLOW: &str = "Cashflow_Forecast";
pub const SHEET_DEBT: &str = "Profil_Hutang";

/// Header strings, matched exactly against the first row of each sheet.
pub mod columns {
    pub const YEAR: &str = "Tahun";
    pub const MONTH: &str = "Bulan";

    pub const REVENUE: &str = "Pendapatan";
    pub const EBITDA: &str = "EBITDA";
    pub const FIXED_COST: &str = "Biaya_Tetap";
    pub const NET_INCOME: &str = "Laba_Bersih";
    pub const DEBT: &str = "Hutang";

    pub const DSCR: &str = "DSCR";
    pub const CURRENT_RATIO: &str = "Current_Ratio";
    pub const DER: &str = "DER";

    pub const DATE: &str = "Tanggal";
    pub const CLOSING_BALANCE: &str = "Saldo_Akhir";

    pub const LOAN_NAME: &str = "Nama_Pinjaman";
    pub const INSTITUTION: &str = "Institusi";
    pub const MATURITY_DATE: &str = "Jatuh_Tempo";

    pub const PERFORMANCE: [&str; 7] = [YEAR, MONTH, REVENUE, EBITDA, FIXED_COST, NET_INCOME, DEBT];
    pub const RATIOS: [&str; 5] = [YEAR, MONTH, DSCR, CURRENT_RATIO, DER];
    pub const CASHFLOW: [&str; 2] = [DATE, CLOSING_BALANCE];
    pub const DEBT_REQUIRED: [&str; 3] = [LOAN_NAME, INSTITUTION, MATURITY_DATE];
}

// ---------------------------------------------------------------------------
// CellValue – an untyped cell carried through for pass-through columns
// ---------------------------------------------------------------------------

/// A loosely typed spreadsheet value, used for columns that have no dedicated
/// field but must survive a load/export cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Number(f64),
    Bool(bool),
    Date(NaiveDate),
    Empty,
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Text(s) => write!(f, "{s}"),
            CellValue::Number(v) if v.fract() == 0.0 && v.abs() < 1e15 => write!(f, "{v:.0}"),
            CellValue::Number(v) => write!(f, "{v:.2}"),
            CellValue::Bool(b) => write!(f, "{b}"),
            CellValue::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            CellValue::Empty => Ok(()),
        }
    }
}

// ---------------------------------------------------------------------------
// Records – one struct per sheet row
// ---------------------------------------------------------------------------

/// Monthly financial performance (sheet `Kinerja_Keuangan`).
#[derive(Debug, Clone, PartialEq)]
pub struct PerformanceRecord {
    pub year: i32,
    pub month: String,
    pub revenue: f64,
    pub ebitda: f64,
    pub fixed_cost: f64,
    pub net_income: f64,
    pub debt: f64,
    /// Unmapped columns of the sheet, in source order.
    pub extra: Vec<(String, CellValue)>,
}

impl PerformanceRecord {
    /// KPI columns in sheet order, paired with their header label.
    pub fn kpis(&self) -> [(&'static str, f64); 5] {
        [
            (columns::REVENUE, self.revenue),
            (columns::EBITDA, self.ebitda),
            (columns::FIXED_COST, self.fixed_cost),
            (columns::NET_INCOME, self.net_income),
            (columns::DEBT, self.debt),
        ]
    }
}

/// Monthly financial ratios (sheet `Rasio_Keuangan`).
///
/// Ratio cells may be blank or non-numeric in the source; those load as `None`.
/// A non-numeric cell is also kept verbatim in `unparsed` so export can write
/// it back.
#[derive(Debug, Clone, PartialEq)]
pub struct RatioRecord {
    pub year: i32,
    pub month: String,
    pub dscr: Option<f64>,
    pub current_ratio: Option<f64>,
    pub der: Option<f64>,
    pub unparsed: Vec<(&'static str, CellValue)>,
    pub extra: Vec<(String, CellValue)>,
}

impl RatioRecord {
    /// The source cell of ratio `column` when it did not hold a number.
    pub fn unparsed_cell(&self, column: &str) -> Option<&CellValue> {
        self.unparsed
            .iter()
            .find(|(name, _)| *name == column)
            .map(|(_, value)| value)
    }
}

/// One day of the cashflow forecast (sheet `Cashflow_Forecast`).
#[derive(Debug, Clone, PartialEq)]
pub struct CashflowPoint {
    pub date: NaiveDate,
    pub closing_balance: f64,
    pub extra: Vec<(String, CellValue)>,
}

/// A loan in the debt profile (sheet `Profil_Hutang`).
#[derive(Debug, Clone, PartialEq)]
pub struct DebtObligation {
    pub loan_name: String,
    pub institution: String,
    pub maturity_date: NaiveDate,
    /// Any further columns of the sheet, in source order.
    pub extra: Vec<(String, CellValue)>,
}

impl DebtObligation {
    /// Days from `today` until maturity; negative once the loan has matured.
    pub fn days_to_maturity(&self, today: NaiveDate) -> i64 {
        (self.maturity_date - today).num_days()
    }
}

// ---------------------------------------------------------------------------
// FinancialTables – the complete loaded workbook
// ---------------------------------------------------------------------------

/// The four tables of one uploaded workbook. Built once by the loader and
/// never mutated afterwards.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FinancialTables {
    pub performance: Vec<PerformanceRecord>,
    pub ratios: Vec<RatioRecord>,
    pub cashflow: Vec<CashflowPoint>,
    pub debts: Vec<DebtObligation>,
}

impl FinancialTables {
    /// Distinct years of the performance table, newest first.
    pub fn years(&self) -> Vec<i32> {
        let years: BTreeSet<i32> = self.performance.iter().map(|r| r.year).collect();
        years.into_iter().rev().collect()
    }

    /// Distinct month labels of the performance table, in order of first
    /// appearance.
    pub fn months(&self) -> Vec<String> {
        let mut seen = BTreeSet::new();
        self.performance
            .iter()
            .filter(|r| seen.insert(r.month.as_str()))
            .map(|r| r.month.clone())
            .collect()
    }

    /// Earliest and latest cashflow date.
    pub fn cashflow_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        let min = self.cashflow.iter().map(|p| p.date).min()?;
        let max = self.cashflow.iter().map(|p| p.date).max()?;
        Some((min, max))
    }

    /// The last row of the cashflow forecast (assumes ascending dates).
    pub fn latest_balance(&self) -> Option<&CashflowPoint> {
        self.cashflow.last()
    }

    /// Total number of rows across all four tables.
    pub fn total_rows(&self) -> usize {
        self.performance.len() + self.ratios.len() + self.cashflow.len() + self.debts.len()
    }
}
