use chrono::NaiveDate;
use eframe::egui::{self, RichText, Ui};
use egui_extras::{Column, TableBuilder};

use super::{format_amount, format_ratio};
use crate::analysis::threshold::{Flag, RatioColumn};
use crate::color::flag_color;
use crate::data::model::{
    columns, CashflowPoint, DebtObligation, PerformanceRecord, RatioRecord,
};

const ROW_HEIGHT: f32 = 20.0;
/// Loans maturing within this many days are highlighted.
pub const MATURITY_WARNING_DAYS: i64 = 180;

// ---------------------------------------------------------------------------
// Shared table scaffold
// ---------------------------------------------------------------------------

/// Striped table with a bold header row; `add_rows` fills the body.
fn table(
    ui: &mut Ui,
    id: &str,
    headers: &[&str],
    add_rows: impl FnOnce(&mut egui_extras::TableBody<'_>),
) {
    ui.push_id(id, |ui: &mut Ui| {
        TableBuilder::new(ui)
            .striped(true)
            .resizable(true)
            .cell_layout(egui::Layout::left_to_right(egui::Align::Center))
            .columns(Column::auto().at_least(70.0), headers.len())
            .max_scroll_height(260.0)
            .header(ROW_HEIGHT, |mut header| {
                for h in headers {
                    header.col(|ui: &mut Ui| {
                        ui.strong(*h);
                    });
                }
            })
            .body(|mut body| add_rows(&mut body));
    });
}

fn maturity_is_near(days_left: i64) -> bool {
    days_left < MATURITY_WARNING_DAYS
}

// ---------------------------------------------------------------------------
// Per-sheet tables
// ---------------------------------------------------------------------------

pub fn performance_table(ui: &mut Ui, rows: &[&PerformanceRecord]) {
    table(ui, "performance_table", &columns::PERFORMANCE, |body| {
        for r in rows {
            body.row(ROW_HEIGHT, |mut row| {
                row.col(|ui: &mut Ui| {
                    ui.label(r.year.to_string());
                });
                row.col(|ui: &mut Ui| {
                    ui.label(&r.month);
                });
                for (_, value) in r.kpis() {
                    row.col(|ui: &mut Ui| {
                        ui.label(format_amount(value));
                    });
                }
            });
        }
    });
}

/// Ratio rows with each ratio cell coloured by its threshold flag.
pub fn ratio_table(ui: &mut Ui, rows: &[&RatioRecord]) {
    table(ui, "ratio_table", &columns::RATIOS, |body| {
        for r in rows {
            body.row(ROW_HEIGHT, |mut row| {
                row.col(|ui: &mut Ui| {
                    ui.label(r.year.to_string());
                });
                row.col(|ui: &mut Ui| {
                    ui.label(&r.month);
                });
                for column in RatioColumn::ALL {
                    let flag = column.classify(r);
                    row.col(|ui: &mut Ui| {
                        let text = RichText::new(format_ratio(column.value(r))).color(flag_color(flag));
                        let text = if flag == Flag::Flagged { text.strong() } else { text };
                        let hover = match (flag, r.unparsed_cell(column.header())) {
                            (Flag::Ok, _) => "Sesuai ambang batas".to_string(),
                            (Flag::Flagged, _) => "Di luar ambang batas".to_string(),
                            (Flag::Unclassified, Some(raw)) => format!("Bukan angka: '{raw}'"),
                            (Flag::Unclassified, None) => "Nilai tidak tersedia".to_string(),
                        };
                        ui.label(text).on_hover_text(hover);
                    });
                }
            });
        }
    });
}

pub fn cashflow_table(ui: &mut Ui, points: &[&CashflowPoint]) {
    table(ui, "cashflow_table", &columns::CASHFLOW, |body| {
        for p in points {
            body.row(ROW_HEIGHT, |mut row| {
                row.col(|ui: &mut Ui| {
                    ui.label(p.date.format("%Y-%m-%d").to_string());
                });
                row.col(|ui: &mut Ui| {
                    let text = RichText::new(format_amount(p.closing_balance));
                    ui.label(if p.closing_balance < 0.0 {
                        text.color(crate::color::FLAG_RED)
                    } else {
                        text
                    });
                });
            });
        }
    });
}

/// Debt profile, including pass-through columns and days left to maturity.
pub fn debt_table(ui: &mut Ui, debts: &[DebtObligation], today: NaiveDate) {
    let mut headers: Vec<&str> = columns::DEBT_REQUIRED.to_vec();
    let mut extra: Vec<&str> = Vec::new();
    for d in debts {
        for (name, _) in &d.extra {
            if !extra.contains(&name.as_str()) {
                extra.push(name);
            }
        }
    }
    headers.extend(&extra);
    headers.push("Sisa Hari");

    table(ui, "debt_table", &headers, |body| {
        for d in debts {
            body.row(ROW_HEIGHT, |mut row| {
                row.col(|ui: &mut Ui| {
                    ui.label(&d.loan_name);
                });
                row.col(|ui: &mut Ui| {
                    ui.label(&d.institution);
                });
                row.col(|ui: &mut Ui| {
                    ui.label(d.maturity_date.format("%Y-%m-%d").to_string());
                });
                for name in &extra {
                    let value = d
                        .extra
                        .iter()
                        .find(|(n, _)| n.as_str() == *name)
                        .map(|(_, v)| v.to_string())
                        .unwrap_or_default();
                    row.col(|ui: &mut Ui| {
                        ui.label(value);
                    });
                }
                let days = d.days_to_maturity(today);
                row.col(|ui: &mut Ui| {
                    let text = RichText::new(days.to_string());
                    ui.label(if maturity_is_near(days) { text.color(crate::color::FLAG_RED) } else { text });
                });
            });
        }
    });
}
