use std::path::PathBuf;

use anyhow::Context;
use chrono::Local;
use kinerja_dashboard::data::export::{save_file, to_xlsx};
use kinerja_dashboard::data::sample::sample_tables;

fn main() -> anyhow::Result<()> {
    let out = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("sample_data.xlsx"));

    let today = Local::now().date_naive();
    let tables = sample_tables(42, &[2024, 2025], today);
    let bytes = to_xlsx(&tables).context("Cannot build sample workbook")?;
    save_file(&out, &bytes)?;

    println!(
        "Wrote {} ({} performance rows, {} ratio rows, {} cashflow days, {} loans)",
        out.display(),
        tables.performance.len(),
        tables.ratios.len(),
        tables.cashflow.len(),
        tables.debts.len()
    );
    Ok(())
}
