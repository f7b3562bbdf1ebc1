use std::path::Path;

use anyhow::Context;
use chrono::{Datelike, NaiveDate};
use rust_xlsxwriter::{ExcelDateTime, Format, Workbook, Worksheet, XlsxError};
use thiserror::Error;

use super::model::{
    columns, CellValue, FinancialTables, SHEET_CASHFLOW, SHEET_DEBT, SHEET_PERFORMANCE,
    SHEET_RATIOS,
};

/// MIME type offered alongside the exported bytes.
pub const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Excel rejects longer sheet names.
pub const MAX_SHEET_NAME_LEN: usize = 31;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("writing workbook: {0}")]
    Xlsx(#[from] XlsxError),
}

// ---------------------------------------------------------------------------
// Naming
// ---------------------------------------------------------------------------

/// Clip a sheet name to [`MAX_SHEET_NAME_LEN`] characters.
pub fn sheet_name(name: &str) -> String {
    name.chars().take(MAX_SHEET_NAME_LEN).collect()
}

/// Suggested download name encoding the selection, e.g.
/// `Laporan_Kinerja_Jan-Feb_2024.xlsx`.
pub fn export_file_name(prefix: &str, year: i32, months: &[String]) -> String {
    let months: Vec<String> = months
        .iter()
        .map(|m| {
            m.chars()
                .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
                .collect()
        })
        .collect();
    if months.is_empty() {
        format!("{prefix}_{year}.xlsx")
    } else {
        format!("{prefix}_{}_{year}.xlsx", months.join("-"))
    }
}

// ---------------------------------------------------------------------------
// Workbook writer
// ---------------------------------------------------------------------------

struct Formats {
    header: Format,
    date: Format,
}

/// Serialize all four tables, unfiltered, to `.xlsx` bytes.
///
/// Unmapped columns follow the mapped ones on each sheet, and ratio cells
/// that loaded as non-numeric text are written back verbatim.
pub fn to_xlsx(tables: &FinancialTables) -> Result<Vec<u8>, ExportError> {
    let formats = Formats {
        header: Format::new().set_bold(),
        date: Format::new().set_num_format("yyyy-mm-dd"),
    };
    let mut workbook = Workbook::new();

    // Kinerja_Keuangan
    let extra = extra_headers(tables.performance.iter().map(|r| r.extra.as_slice()));
    let ws = new_sheet(&mut workbook, SHEET_PERFORMANCE, &columns::PERFORMANCE, &extra, &formats)?;
    for (i, r) in tables.performance.iter().enumerate() {
        let row = i as u32 + 1;
        ws.write_number(row, 0, r.year)?;
        ws.write_string(row, 1, &r.month)?;
        for (col, (_, value)) in r.kpis().iter().enumerate() {
            ws.write_number(row, col as u16 + 2, *value)?;
        }
        write_extras(ws, row, columns::PERFORMANCE.len(), &extra, &r.extra, &formats)?;
    }

    // Rasio_Keuangan
    let extra = extra_headers(tables.ratios.iter().map(|r| r.extra.as_slice()));
    let ws = new_sheet(&mut workbook, SHEET_RATIOS, &columns::RATIOS, &extra, &formats)?;
    for (i, r) in tables.ratios.iter().enumerate() {
        let row = i as u32 + 1;
        ws.write_number(row, 0, r.year)?;
        ws.write_string(row, 1, &r.month)?;
        let values = [
            (columns::DSCR, r.dscr),
            (columns::CURRENT_RATIO, r.current_ratio),
            (columns::DER, r.der),
        ];
        for (col, (name, value)) in values.into_iter().enumerate() {
            let col = col as u16 + 2;
            match (value, r.unparsed_cell(name)) {
                (Some(v), _) => {
                    ws.write_number(row, col, v)?;
                }
                (None, Some(raw)) => write_cell(ws, row, col, raw, &formats)?,
                (None, None) => {}
            }
        }
        write_extras(ws, row, columns::RATIOS.len(), &extra, &r.extra, &formats)?;
    }

    // Cashflow_Forecast
    let extra = extra_headers(tables.cashflow.iter().map(|p| p.extra.as_slice()));
    let ws = new_sheet(&mut workbook, SHEET_CASHFLOW, &columns::CASHFLOW, &extra, &formats)?;
    ws.set_column_width(0, 12)?;
    for (i, p) in tables.cashflow.iter().enumerate() {
        let row = i as u32 + 1;
        write_date(ws, row, 0, p.date, &formats.date)?;
        ws.write_number(row, 1, p.closing_balance)?;
        write_extras(ws, row, columns::CASHFLOW.len(), &extra, &p.extra, &formats)?;
    }

    // Profil_Hutang
    let extra = extra_headers(tables.debts.iter().map(|d| d.extra.as_slice()));
    let ws = new_sheet(&mut workbook, SHEET_DEBT, &columns::DEBT_REQUIRED, &extra, &formats)?;
    ws.set_column_width(2, 12)?;
    for (i, d) in tables.debts.iter().enumerate() {
        let row = i as u32 + 1;
        ws.write_string(row, 0, &d.loan_name)?;
        ws.write_string(row, 1, &d.institution)?;
        write_date(ws, row, 2, d.maturity_date, &formats.date)?;
        write_extras(ws, row, columns::DEBT_REQUIRED.len(), &extra, &d.extra, &formats)?;
    }

    let buffer = workbook.save_to_buffer()?;
    log::info!(
        "Exported {} rows across 4 sheets ({} bytes)",
        tables.total_rows(),
        buffer.len()
    );
    Ok(buffer)
}

/// Write exported bytes to disk.
pub fn save_file(path: &Path, bytes: &[u8]) -> anyhow::Result<()> {
    std::fs::write(path, bytes).with_context(|| format!("writing {}", path.display()))
}

fn new_sheet<'a>(
    workbook: &'a mut Workbook,
    name: &str,
    headers: &[&str],
    extra_headers: &[&str],
    formats: &Formats,
) -> Result<&'a mut Worksheet, ExportError> {
    let ws = workbook.add_worksheet();
    ws.set_name(sheet_name(name))?;
    for (col, header) in headers.iter().chain(extra_headers).enumerate() {
        ws.write_string_with_format(0, col as u16, *header, &formats.header)?;
    }
    Ok(ws)
}

/// Union of the pass-through column names over all rows, first seen first.
fn extra_headers<'a>(rows: impl Iterator<Item = &'a [(String, CellValue)]>) -> Vec<&'a str> {
    let mut headers: Vec<&str> = Vec::new();
    for extra in rows {
        for (name, _) in extra {
            if !headers.contains(&name.as_str()) {
                headers.push(name);
            }
        }
    }
    headers
}

/// Write a row's pass-through cells under `headers`, starting at `first_col`.
fn write_extras(
    ws: &mut Worksheet,
    row: u32,
    first_col: usize,
    headers: &[&str],
    extra: &[(String, CellValue)],
    formats: &Formats,
) -> Result<(), ExportError> {
    for (name, value) in extra {
        let Some(pos) = headers.iter().position(|h| *h == name.as_str()) else {
            continue;
        };
        write_cell(ws, row, (first_col + pos) as u16, value, formats)?;
    }
    Ok(())
}

fn write_cell(
    ws: &mut Worksheet,
    row: u32,
    col: u16,
    value: &CellValue,
    formats: &Formats,
) -> Result<(), ExportError> {
    match value {
        CellValue::Text(s) => {
            ws.write_string(row, col, s)?;
        }
        CellValue::Number(n) => {
            ws.write_number(row, col, *n)?;
        }
        CellValue::Bool(b) => {
            ws.write_boolean(row, col, *b)?;
        }
        CellValue::Date(date) => write_date(ws, row, col, *date, &formats.date)?,
        CellValue::Empty => {}
    }
    Ok(())
}

/// Dates Excel cannot represent are written as `yyyy-mm-dd` text.
fn write_date(
    ws: &mut Worksheet,
    row: u32,
    col: u16,
    date: NaiveDate,
    format: &Format,
) -> Result<(), ExportError> {
    match ExcelDateTime::from_ymd(date.year() as u16, date.month() as u8, date.day() as u8) {
        Ok(dt) => {
            ws.write_datetime_with_format(row, col, &dt, format)?;
        }
        Err(_) => {
            ws.write_string(row, col, date.format("%Y-%m-%d").to_string())?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::loader::parse_workbook;
    use crate::data::model::{CashflowPoint, DebtObligation, PerformanceRecord, RatioRecord};

    fn tables() -> FinancialTables {
        let d = |y, m, d| NaiveDate::from_ymd_opt(y, m, d).unwrap();
        FinancialTables {
            performance: vec![PerformanceRecord {
                year: 2024,
                month: "Jan".into(),
                revenue: 150000.0,
                ebitda: 40000.0,
                fixed_cost: 25000.0,
                net_income: 12000.5,
                debt: 800000.0,
                extra: vec![
                    ("Catatan".into(), CellValue::Text("audit Q1".into())),
                    ("Target".into(), CellValue::Number(140000.0)),
                ],
            }],
            ratios: vec![
                RatioRecord {
                    year: 2024,
                    month: "Jan".into(),
                    dscr: Some(1.3),
                    current_ratio: Some(1.15),
                    der: Some(1.4),
                    unparsed: Vec::new(),
                    extra: vec![("Sumber".into(), CellValue::Text("RKAP".into()))],
                },
                RatioRecord {
                    year: 2024,
                    month: "Feb".into(),
                    dscr: None,
                    current_ratio: Some(1.0),
                    der: None,
                    unparsed: vec![(columns::DER, CellValue::Text("n/a".into()))],
                    extra: vec![("Sumber".into(), CellValue::Empty)],
                },
            ],
            cashflow: vec![
                CashflowPoint {
                    date: d(2024, 3, 1),
                    closing_balance: 500.0,
                    extra: vec![("Final".into(), CellValue::Bool(true))],
                },
                CashflowPoint {
                    date: d(2024, 3, 2),
                    closing_balance: -50.0,
                    extra: vec![("Final".into(), CellValue::Bool(false))],
                },
            ],
            debts: vec![DebtObligation {
                loan_name: "KI Kapal".into(),
                institution: "Bank A".into(),
                maturity_date: d(2027, 12, 31),
                extra: vec![
                    ("Plafon".into(), CellValue::Number(1_000_000.0)),
                    ("Jenis".into(), CellValue::Text("Investasi".into())),
                    ("Tanggal_Akad".into(), CellValue::Date(d(2020, 1, 15))),
                ],
            }],
        }
    }

    #[test]
    fn exported_workbook_loads_back_identically() {
        let original = tables();
        let bytes = to_xlsx(&original).unwrap();
        let reloaded = parse_workbook(&bytes).unwrap();
        assert_eq!(reloaded, original);
    }

    #[test]
    fn text_ratio_cells_and_extra_columns_are_written_back() {
        use calamine::{Data, Reader, Xlsx};

        let bytes = to_xlsx(&tables()).unwrap();
        let mut workbook: Xlsx<_> = Xlsx::new(std::io::Cursor::new(bytes)).unwrap();

        let ratios = workbook.worksheet_range(SHEET_RATIOS).unwrap();
        assert_eq!(ratios.get_value((0, 5)), Some(&Data::String("Sumber".into())));
        assert_eq!(ratios.get_value((2, 4)), Some(&Data::String("n/a".into())));
        // blank DSCR stays blank
        assert!(matches!(ratios.get_value((2, 2)), None | Some(Data::Empty)));

        let perf = workbook.worksheet_range(SHEET_PERFORMANCE).unwrap();
        assert_eq!(perf.get_value((0, 7)), Some(&Data::String("Catatan".into())));
        assert_eq!(perf.get_value((1, 7)), Some(&Data::String("audit Q1".into())));
        assert_eq!(perf.get_value((1, 8)), Some(&Data::Float(140000.0)));

        let cash = workbook.worksheet_range(SHEET_CASHFLOW).unwrap();
        assert_eq!(cash.get_value((2, 2)), Some(&Data::Bool(false)));
    }

    #[test]
    fn dates_outside_excel_range_fall_back_to_text() {
        let mut data = tables();
        data.debts[0].maturity_date = NaiveDate::from_ymd_opt(1899, 6, 30).unwrap();
        let bytes = to_xlsx(&data).unwrap();

        use calamine::{Data, Reader, Xlsx};
        let mut workbook: Xlsx<_> = Xlsx::new(std::io::Cursor::new(bytes)).unwrap();
        let debts = workbook.worksheet_range(SHEET_DEBT).unwrap();
        assert_eq!(debts.get_value((1, 2)), Some(&Data::String("1899-06-30".into())));
    }

    #[test]
    fn sheet_names_are_clipped() {
        assert_eq!(sheet_name(SHEET_PERFORMANCE), SHEET_PERFORMANCE);
        let long = "Laporan_Kinerja_Keuangan_Konsolidasi";
        assert_eq!(sheet_name(long).chars().count(), MAX_SHEET_NAME_LEN);
        assert!(long.starts_with(&sheet_name(long)));
    }

    #[test]
    fn file_name_encodes_the_selection() {
        let months = vec!["Jan".to_string(), "Feb".to_string()];
        assert_eq!(
            export_file_name("Laporan_Kinerja", 2024, &months),
            "Laporan_Kinerja_Jan-Feb_2024.xlsx"
        );
        assert_eq!(
            export_file_name("Laporan_Kinerja", 2023, &["Agu/Sep".to_string()]),
            "Laporan_Kinerja_Agu_Sep_2023.xlsx"
        );
        assert_eq!(export_file_name("R", 2022, &[]), "R_2022.xlsx");
    }
}
