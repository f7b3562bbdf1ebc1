use std::io::Cursor;
use std::path::Path;

use anyhow::{Context, Result, bail};
use calamine::{Data, Range, Reader, Xlsx};
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};
use thiserror::Error;

use super::model::{
    columns, CashflowPoint, CellValue, DebtObligation, FinancialTables, PerformanceRecord,
    RatioRecord, SHEET_CASHFLOW, SHEET_DEBT, SHEET_PERFORMANCE, SHEET_RATIOS,
};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Why an uploaded workbook was rejected. Any of these aborts the whole load.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("not a readable .xlsx workbook: {0}")]
    Workbook(#[from] calamine::XlsxError),

    #[error("sheet '{sheet}' is missing")]
    MissingSheet { sheet: &'static str },

    #[error("sheet '{sheet}' has no header row")]
    EmptySheet { sheet: &'static str },

    #[error("sheet '{sheet}' is missing column '{column}'")]
    MissingColumn {
        sheet: &'static str,
        column: &'static str,
    },

    #[error("sheet '{sheet}', row {row}, column '{column}': expected {expected}, found '{found}'")]
    InvalidCell {
        sheet: &'static str,
        row: usize,
        column: &'static str,
        expected: &'static str,
        found: String,
    },
}

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Load the four financial tables from an `.xlsx` file on disk.
pub fn load_file(path: &Path) -> Result<FinancialTables> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();
    if ext != "xlsx" && ext != "xlsm" {
        bail!("Unsupported file extension: .{ext} (expected .xlsx)");
    }

    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let tables = parse_workbook(&bytes).with_context(|| format!("parsing {}", path.display()))?;
    Ok(tables)
}

/// Parse an in-memory `.xlsx` workbook.
///
/// All four sheets must be present with their required headers; nothing is
/// returned unless every table parses.
pub fn parse_workbook(bytes: &[u8]) -> std::result::Result<FinancialTables, ParseError> {
    let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(bytes))?;

    let names = workbook.sheet_names();
    for sheet in [SHEET_PERFORMANCE, SHEET_RATIOS, SHEET_CASHFLOW, SHEET_DEBT] {
        if !names.iter().any(|n| n == sheet) {
            return Err(ParseError::MissingSheet { sheet });
        }
    }

    let performance = parse_performance(&workbook.worksheet_range(SHEET_PERFORMANCE)?)?;
    let ratios = parse_ratios(&workbook.worksheet_range(SHEET_RATIOS)?)?;
    let cashflow = parse_cashflow(&workbook.worksheet_range(SHEET_CASHFLOW)?)?;
    let debts = parse_debts(&workbook.worksheet_range(SHEET_DEBT)?)?;

    Ok(FinancialTables {
        performance,
        ratios,
        cashflow,
        debts,
    })
}

// ---------------------------------------------------------------------------
// Sheet access helpers
// ---------------------------------------------------------------------------

static EMPTY_CELL: Data = Data::Empty;

/// Years a cell may carry: the span Excel itself can store as a date.
const MIN_YEAR: i32 = 1900;
const MAX_YEAR: i32 = 9999;

const YEAR_EXPECTED: &str = "a year between 1900 and 9999";
const DATE_EXPECTED: &str = "a date between 1900-01-01 and 9999-12-31";

/// Header row of a sheet plus its non-empty data rows.
struct Sheet<'a> {
    name: &'static str,
    headers: Vec<String>,
    rows: Vec<&'a [Data]>,
}

impl<'a> Sheet<'a> {
    fn new(name: &'static str, range: &'a Range<Data>) -> std::result::Result<Self, ParseError> {
        let mut iter = range.rows();
        let headers: Vec<String> = iter
            .next()
            .ok_or(ParseError::EmptySheet { sheet: name })?
            .iter()
            .map(|c| text(c).unwrap_or_default())
            .collect();
        let rows = iter
            .filter(|r| r.iter().any(|c| !matches!(c, Data::Empty)))
            .collect();
        Ok(Sheet {
            name,
            headers,
            rows,
        })
    }

    fn column(&self, column: &'static str) -> std::result::Result<usize, ParseError> {
        self.headers
            .iter()
            .position(|h| h == column)
            .ok_or(ParseError::MissingColumn {
                sheet: self.name,
                column,
            })
    }

    /// Read a mandatory cell, failing with the spreadsheet row number.
    fn required<T>(
        &self,
        row_idx: usize,
        col: usize,
        column: &'static str,
        expected: &'static str,
        parse: fn(&Data) -> Option<T>,
    ) -> std::result::Result<T, ParseError> {
        let cell = self.rows[row_idx].get(col).unwrap_or(&EMPTY_CELL);
        parse(cell).ok_or_else(|| ParseError::InvalidCell {
            sheet: self.name,
            // +1 for the header, +1 for 1-based numbering
            row: row_idx + 2,
            column,
            expected,
            found: text(cell).unwrap_or_default(),
        })
    }

    /// Read an optional numeric cell; blanks and junk become `None`. A
    /// non-blank cell that is not a number is pushed onto `unparsed`.
    fn optional_number(
        &self,
        row_idx: usize,
        col: usize,
        column: &'static str,
        unparsed: &mut Vec<(&'static str, CellValue)>,
    ) -> Option<f64> {
        let cell = self.rows[row_idx].get(col).unwrap_or(&EMPTY_CELL);
        let value = number(cell);
        if value.is_none() && !matches!(cell, Data::Empty) {
            log::warn!(
                "{}: row {} column '{column}' is not numeric ({cell:?}), left unclassified",
                self.name,
                row_idx + 2
            );
            match cell_value(cell) {
                CellValue::Empty => {}
                raw => unparsed.push((column, raw)),
            }
        }
        value
    }

    /// Every headed column not in `mapped`, in sheet order.
    fn extra_columns(&self, mapped: &[usize]) -> Vec<(usize, String)> {
        self.headers
            .iter()
            .enumerate()
            .filter(|(i, h)| !h.is_empty() && !mapped.contains(i))
            .map(|(i, h)| (i, h.clone()))
            .collect()
    }

    fn extras(&self, row_idx: usize, extra_cols: &[(usize, String)]) -> Vec<(String, CellValue)> {
        extra_cols
            .iter()
            .map(|(col, name)| {
                let cell = self.rows[row_idx].get(*col).unwrap_or(&EMPTY_CELL);
                (name.clone(), cell_value(cell))
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Per-sheet parsers
// ---------------------------------------------------------------------------

fn parse_performance(range: &Range<Data>) -> std::result::Result<Vec<PerformanceRecord>, ParseError> {
    let sheet = Sheet::new(SHEET_PERFORMANCE, range)?;
    let [year, month, revenue, ebitda, fixed_cost, net_income, debt] =
        columns::PERFORMANCE.map(|c| sheet.column(c));
    let (year, month, revenue, ebitda, fixed_cost, net_income, debt) =
        (year?, month?, revenue?, ebitda?, fixed_cost?, net_income?, debt?);
    let extra_cols =
        sheet.extra_columns(&[year, month, revenue, ebitda, fixed_cost, net_income, debt]);

    (0..sheet.rows.len())
        .map(|i| {
            Ok(PerformanceRecord {
                year: sheet.required(i, year, columns::YEAR, YEAR_EXPECTED, year_value)?,
                month: sheet.required(i, month, columns::MONTH, "a month label", text)?,
                revenue: sheet.required(i, revenue, columns::REVENUE, "a number", number)?,
                ebitda: sheet.required(i, ebitda, columns::EBITDA, "a number", number)?,
                fixed_cost: sheet.required(i, fixed_cost, columns::FIXED_COST, "a number", number)?,
                net_income: sheet.required(i, net_income, columns::NET_INCOME, "a number", number)?,
                debt: sheet.required(i, debt, columns::DEBT, "a number", number)?,
                extra: sheet.extras(i, &extra_cols),
            })
        })
        .collect()
}

fn parse_ratios(range: &Range<Data>) -> std::result::Result<Vec<RatioRecord>, ParseError> {
    let sheet = Sheet::new(SHEET_RATIOS, range)?;
    let [year, month, dscr, current_ratio, der] = columns::RATIOS.map(|c| sheet.column(c));
    let (year, month, dscr, current_ratio, der) = (year?, month?, dscr?, current_ratio?, der?);
    let extra_cols = sheet.extra_columns(&[year, month, dscr, current_ratio, der]);

    (0..sheet.rows.len())
        .map(|i| {
            let mut unparsed = Vec::new();
            Ok(RatioRecord {
                year: sheet.required(i, year, columns::YEAR, YEAR_EXPECTED, year_value)?,
                month: sheet.required(i, month, columns::MONTH, "a month label", text)?,
                dscr: sheet.optional_number(i, dscr, columns::DSCR, &mut unparsed),
                current_ratio: sheet.optional_number(
                    i,
                    current_ratio,
                    columns::CURRENT_RATIO,
                    &mut unparsed,
                ),
                der: sheet.optional_number(i, der, columns::DER, &mut unparsed),
                unparsed,
                extra: sheet.extras(i, &extra_cols),
            })
        })
        .collect()
}

fn parse_cashflow(range: &Range<Data>) -> std::result::Result<Vec<CashflowPoint>, ParseError> {
    let sheet = Sheet::new(SHEET_CASHFLOW, range)?;
    let date = sheet.column(columns::DATE)?;
    let balance = sheet.column(columns::CLOSING_BALANCE)?;
    let extra_cols = sheet.extra_columns(&[date, balance]);

    (0..sheet.rows.len())
        .map(|i| {
            Ok(CashflowPoint {
                date: sheet.required(i, date, columns::DATE, DATE_EXPECTED, date_value)?,
                closing_balance: sheet.required(
                    i,
                    balance,
                    columns::CLOSING_BALANCE,
                    "a number",
                    number,
                )?,
                extra: sheet.extras(i, &extra_cols),
            })
        })
        .collect()
}

fn parse_debts(range: &Range<Data>) -> std::result::Result<Vec<DebtObligation>, ParseError> {
    let sheet = Sheet::new(SHEET_DEBT, range)?;
    let loan = sheet.column(columns::LOAN_NAME)?;
    let institution = sheet.column(columns::INSTITUTION)?;
    let maturity = sheet.column(columns::MATURITY_DATE)?;

    let extra_cols = sheet.extra_columns(&[loan, institution, maturity]);

    (0..sheet.rows.len())
        .map(|i| {
            Ok(DebtObligation {
                loan_name: sheet.required(i, loan, columns::LOAN_NAME, "a loan name", text)?,
                institution: sheet.required(i, institution, columns::INSTITUTION, "an institution", text)?,
                maturity_date: sheet.required(i, maturity, columns::MATURITY_DATE, DATE_EXPECTED, date_value)?,
                extra: sheet.extras(i, &extra_cols),
            })
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Cell conversions
// ---------------------------------------------------------------------------

fn text(cell: &Data) -> Option<String> {
    let s = match cell {
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => s.trim().to_string(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{f:.0}"),
        Data::Float(f) => f.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(d) => d.date().format("%Y-%m-%d").to_string(),
            None => dt.as_f64().to_string(),
        },
        Data::Error(_) | Data::Empty => return None,
    };
    (!s.is_empty()).then_some(s)
}

fn number(cell: &Data) -> Option<f64> {
    match cell {
        Data::Int(i) => Some(*i as f64),
        Data::Float(f) if f.is_finite() => Some(*f),
        Data::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    }
}

fn year_value(cell: &Data) -> Option<i32> {
    let v = number(cell)?;
    (v.fract() == 0.0 && (f64::from(MIN_YEAR)..=f64::from(MAX_YEAR)).contains(&v)).then_some(v as i32)
}

fn date_value(cell: &Data) -> Option<NaiveDate> {
    let date = match cell {
        Data::DateTime(dt) => dt.as_datetime().map(|d| d.date()),
        Data::Int(_) | Data::Float(_) => number(cell).and_then(excel_serial_to_date),
        Data::String(s) | Data::DateTimeIso(s) => parse_date_text(s.trim()),
        _ => None,
    }?;
    (MIN_YEAR..=MAX_YEAR).contains(&date.year()).then_some(date)
}

/// Excel's 1900 date system, counting from 1899-12-30.
fn excel_serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !(1.0..=2_958_465.0).contains(&serial) {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    epoch.checked_add_signed(Duration::days(serial.floor() as i64))
}

fn parse_date_text(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .or_else(|| {
            ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
                .map(|dt| dt.date())
        })
}

fn cell_value(cell: &Data) -> CellValue {
    match cell {
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Float(f) => CellValue::Number(*f),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTime(_) => date_value(cell)
            .map(CellValue::Date)
            .or_else(|| text(cell).map(CellValue::Text))
            .unwrap_or(CellValue::Empty),
        Data::String(_) | Data::DateTimeIso(_) | Data::DurationIso(_) => {
            text(cell).map(CellValue::Text).unwrap_or(CellValue::Empty)
        }
        Data::Error(e) => CellValue::Text(e.to_string()),
        Data::Empty => CellValue::Empty,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_xlsxwriter::Workbook;

    /// Build an in-memory workbook from (sheet, rows-of-strings-or-numbers).
    enum C {
        S(&'static str),
        N(f64),
    }

    fn workbook(sheets: &[(&str, Vec<Vec<C>>)]) -> Vec<u8> {
        let mut wb = Workbook::new();
        for (name, rows) in sheets {
            let ws = wb.add_worksheet();
            ws.set_name(*name).unwrap();
            for (r, row) in rows.iter().enumerate() {
                for (c, cell) in row.iter().enumerate() {
                    match cell {
                        C::S(s) => ws.write_string(r as u32, c as u16, *s).unwrap(),
                        C::N(n) => ws.write_number(r as u32, c as u16, *n).unwrap(),
                    };
                }
            }
        }
        wb.save_to_buffer().unwrap()
    }

    fn valid_sheets() -> Vec<(&'static str, Vec<Vec<C>>)> {
        use C::*;
        vec![
            (
                SHEET_PERFORMANCE,
                vec![
                    vec![S("Tahun"), S("Bulan"), S("Pendapatan"), S("EBITDA"), S("Biaya_Tetap"), S("Laba_Bersih"), S("Hutang")],
                    vec![N(2024.0), S("Jan"), N(150000.0), N(40000.0), N(20000.0), N(12000.0), N(500000.0)],
                    vec![N(2024.0), S("Feb"), N(120000.0), N(35000.0), N(20000.0), N(12000.0), N(490000.0)],
                ],
            ),
            (
                SHEET_RATIOS,
                vec![
                    vec![S("Tahun"), S("Bulan"), S("DSCR"), S("Current_Ratio"), S("DER")],
                    vec![N(2024.0), S("Jan"), N(1.3), N(1.15), S("n/a")],
                    vec![N(2024.0), S("Feb"), N(1.3), N(1.15), N(1.4)],
                ],
            ),
            (
                SHEET_CASHFLOW,
                vec![
                    vec![S("Tanggal"), S("Saldo_Akhir")],
                    vec![S("2024-03-01"), N(500.0)],
                    vec![N(45353.0), N(-50.0)],
                ],
            ),
            (
                SHEET_DEBT,
                vec![
                    vec![S("Nama_Pinjaman"), S("Institusi"), S("Jatuh_Tempo"), S("Plafon")],
                    vec![S("KI-1"), S("Bank A"), S("2026-06-30"), N(1000000.0)],
                ],
            ),
        ]
    }

    #[test]
    fn parses_all_four_sheets() {
        let tables = parse_workbook(&workbook(&valid_sheets())).unwrap();

        assert_eq!(tables.performance.len(), 2);
        assert_eq!(tables.performance[1].month, "Feb");
        assert_eq!(tables.performance[0].revenue, 150000.0);

        assert_eq!(tables.ratios[0].der, None);
        assert_eq!(
            tables.ratios[0].unparsed_cell(columns::DER),
            Some(&CellValue::Text("n/a".into()))
        );
        assert_eq!(tables.ratios[1].der, Some(1.4));
        assert!(tables.ratios[1].unparsed.is_empty());
        assert!(tables.performance[0].extra.is_empty());

        let d = |m, d| NaiveDate::from_ymd_opt(2024, m, d).unwrap();
        assert_eq!(tables.cashflow[0].date, d(3, 1));
        // serial 45353 is 2024-03-02
        assert_eq!(tables.cashflow[1].date, d(3, 2));

        assert_eq!(tables.debts[0].institution, "Bank A");
        assert_eq!(
            tables.debts[0].extra,
            vec![("Plafon".to_string(), CellValue::Number(1000000.0))]
        );
    }

    #[test]
    fn missing_sheet_is_rejected() {
        let mut sheets = valid_sheets();
        sheets.retain(|(name, _)| *name != SHEET_CASHFLOW);
        let err = parse_workbook(&workbook(&sheets)).unwrap_err();
        assert!(matches!(err, ParseError::MissingSheet { sheet } if sheet == SHEET_CASHFLOW));
    }

    #[test]
    fn missing_column_is_rejected() {
        let mut sheets = valid_sheets();
        sheets[1].1[0][2] = C::S("Dscr");
        let err = parse_workbook(&workbook(&sheets)).unwrap_err();
        assert!(matches!(
            err,
            ParseError::MissingColumn { sheet: SHEET_RATIOS, column: "DSCR" }
        ));
    }

    #[test]
    fn non_numeric_revenue_names_the_row() {
        let mut sheets = valid_sheets();
        sheets[0].1[2][2] = C::S("banyak");
        let err = parse_workbook(&workbook(&sheets)).unwrap_err();
        match err {
            ParseError::InvalidCell { sheet, row, column, found, .. } => {
                assert_eq!(sheet, SHEET_PERFORMANCE);
                assert_eq!(row, 3);
                assert_eq!(column, columns::REVENUE);
                assert_eq!(found, "banyak");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn unmapped_columns_are_kept_per_row() {
        let mut sheets = valid_sheets();
        sheets[0].1[0].push(C::S("Catatan"));
        sheets[0].1[1].push(C::S("audit"));
        sheets[2].1[0].push(C::S("Sumber"));
        sheets[2].1[2].push(C::N(7.0));
        let tables = parse_workbook(&workbook(&sheets)).unwrap();

        assert_eq!(
            tables.performance[0].extra,
            vec![("Catatan".to_string(), CellValue::Text("audit".into()))]
        );
        assert_eq!(
            tables.performance[1].extra,
            vec![("Catatan".to_string(), CellValue::Empty)]
        );
        assert_eq!(tables.cashflow[0].extra[0].1, CellValue::Empty);
        assert_eq!(tables.cashflow[1].extra[0].1, CellValue::Number(7.0));
    }

    #[test]
    fn dates_before_1900_are_rejected() {
        let mut sheets = valid_sheets();
        sheets[3].1[1][2] = C::S("1899-06-30");
        let err = parse_workbook(&workbook(&sheets)).unwrap_err();
        match err {
            ParseError::InvalidCell { sheet, row, expected, .. } => {
                assert_eq!(sheet, SHEET_DEBT);
                assert_eq!(row, 2);
                assert_eq!(expected, DATE_EXPECTED);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(date_value(&Data::Float(1.0)), None);
        assert_eq!(date_value(&Data::String("10000-01-01".into())), None);
        assert_eq!(
            date_value(&Data::String("1900-01-01".into())),
            NaiveDate::from_ymd_opt(1900, 1, 1)
        );
    }

    #[test]
    fn garbage_bytes_are_a_workbook_error() {
        let err = parse_workbook(b"definitely not a zip archive").unwrap_err();
        assert!(matches!(err, ParseError::Workbook(_)));
    }

    #[test]
    fn cell_conversions() {
        assert_eq!(year_value(&Data::Float(2024.0)), Some(2024));
        assert_eq!(year_value(&Data::String("2023".into())), Some(2023));
        assert_eq!(year_value(&Data::Float(2024.5)), None);
        assert_eq!(year_value(&Data::Float(1899.0)), None);
        assert_eq!(text(&Data::Float(3.0)), Some("3".into()));
        assert_eq!(text(&Data::String("  ".into())), None);
        assert_eq!(number(&Data::String(" 1.5 ".into())), Some(1.5));
        assert_eq!(number(&Data::Float(f64::NAN)), None);
        assert_eq!(
            parse_date_text("2024-01-31T00:00:00"),
            NaiveDate::from_ymd_opt(2024, 1, 31)
        );
    }

    #[test]
    fn load_file_rejects_other_extensions() {
        let err = load_file(Path::new("report.csv")).unwrap_err();
        assert!(err.to_string().contains(".csv"));
    }
}
