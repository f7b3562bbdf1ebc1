use chrono::Local;
use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};

use super::{format_amount, panels, plot, tables};
use crate::analysis::scoring::{Assessment, Indicator, Recommendation};
use crate::analysis::threshold::Flag;
use crate::color::{flag_color, ColorMap, FLAG_RED, OK_GREEN};
use crate::data::export::XLSX_MIME;
use crate::data::model::PerformanceRecord;
use crate::state::{AppState, Tab};

// ---------------------------------------------------------------------------
// Central panel: tab strip + active tab
// ---------------------------------------------------------------------------

pub fn central_panel(ui: &mut Ui, state: &mut AppState) {
    if state.tables.is_none() {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading("Upload file Excel untuk memulai  (File → Open…)");
        });
        return;
    }

    ui.horizontal(|ui: &mut Ui| {
        for tab in Tab::ALL {
            ui.selectable_value(&mut state.tab, tab, tab.title());
        }
    });
    ui.separator();

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| match state.tab {
            Tab::Performance => performance_tab(ui, state),
            Tab::Ratios => ratio_tab(ui, state),
            Tab::Cashflow => cashflow_tab(ui, state),
            Tab::Debt => debt_tab(ui, state),
            Tab::Strategy => strategy_tab(ui, state),
            Tab::Export => export_tab(ui, state),
        });
}

fn selection_caption(state: &AppState) -> String {
    let months = state.active_month_labels();
    match state.year {
        Some(year) if !months.is_empty() => format!("{} {year}", months.join(", ")),
        Some(year) => format!("{year} (belum ada bulan dipilih)"),
        None => String::new(),
    }
}

fn no_rows(ui: &mut Ui) {
    ui.label(RichText::new("Tidak ada data untuk pilihan ini.").italics());
}

/// Small framed metric: caption above a large value.
fn metric_card(ui: &mut Ui, caption: &str, value: String, color: Option<Color32>) {
    egui::Frame::group(ui.style()).show(ui, |ui: &mut Ui| {
        ui.set_min_width(150.0);
        ui.vertical(|ui: &mut Ui| {
            ui.label(RichText::new(caption).small());
            let text = RichText::new(value).size(20.0).strong();
            ui.label(match color {
                Some(c) => text.color(c),
                None => text,
            });
        });
    });
}

// ---------------------------------------------------------------------------
// Tabs
// ---------------------------------------------------------------------------

fn performance_tab(ui: &mut Ui, state: &AppState) {
    ui.heading(format!("📈 Ringkasan Kinerja – {}", selection_caption(state)));
    let rows = state.filtered_performance();
    if rows.is_empty() {
        no_rows(ui);
        return;
    }

    let total = |f: fn(&PerformanceRecord) -> f64| rows.iter().map(|r| f(r)).sum::<f64>();
    ui.horizontal_wrapped(|ui: &mut Ui| {
        metric_card(ui, "Pendapatan", format_amount(total(|r| r.revenue)), None);
        metric_card(ui, "EBITDA", format_amount(total(|r| r.ebitda)), None);
        let net = total(|r| r.net_income);
        metric_card(ui, "Laba Bersih", format_amount(net), (net < 0.0).then_some(FLAG_RED));
        if let Some(last) = rows.last() {
            metric_card(ui, "Hutang (akhir periode)", format_amount(last.debt), None);
        }
    });
    ui.add_space(8.0);

    tables::performance_table(ui, &rows);
    ui.add_space(8.0);
    plot::kpi_chart(ui, &rows);
}

fn ratio_tab(ui: &mut Ui, state: &AppState) {
    ui.heading(format!("📊 Rasio Keuangan – {}", selection_caption(state)));
    let rows = state.filtered_ratios();
    if rows.is_empty() {
        no_rows(ui);
        return;
    }
    ui.horizontal(|ui: &mut Ui| {
        ui.label("Ambang batas:");
        ui.colored_label(flag_color(Flag::Ok), "sesuai");
        ui.colored_label(flag_color(Flag::Flagged), "di luar batas");
        ui.colored_label(flag_color(Flag::Unclassified), "n/a");
    });
    tables::ratio_table(ui, &rows);
    ui.add_space(8.0);
    plot::ratio_chart(ui, &rows);
}

fn cashflow_tab(ui: &mut Ui, state: &AppState) {
    ui.heading("💰 Cashflow Forecast");
    let Some(data) = &state.tables else {
        return;
    };
    if let Some(latest) = data.latest_balance() {
        let color = if latest.closing_balance < 0.0 { FLAG_RED } else { OK_GREEN };
        metric_card(
            ui,
            &format!("Saldo terakhir ({})", latest.date.format("%Y-%m-%d")),
            format_amount(latest.closing_balance),
            Some(color),
        );
    }
    let points = state.visible_cashflow();
    if points.is_empty() {
        no_rows(ui);
        return;
    }
    tables::cashflow_table(ui, &points);
    ui.add_space(8.0);
    plot::cashflow_chart(ui, &points);
}

fn debt_tab(ui: &mut Ui, state: &AppState) {
    ui.heading("📄 Profil & Jatuh Tempo Hutang");
    let Some(data) = &state.tables else {
        return;
    };
    if data.debts.is_empty() {
        no_rows(ui);
        return;
    }
    let today = Local::now().date_naive();
    tables::debt_table(ui, &data.debts, today);
    ui.add_space(8.0);
    let fallback;
    let colors = match &state.institution_colors {
        Some(c) => c,
        None => {
            fallback = ColorMap::new(data.debts.iter().map(|d| d.institution.as_str()));
            &fallback
        }
    };
    plot::debt_timeline(ui, &data.debts, today, colors);
}

fn strategy_tab(ui: &mut Ui, state: &AppState) {
    ui.heading(format!("📌 Rekomendasi Strategi – {}", selection_caption(state)));
    match &state.assessment {
        Some(Ok(assessment)) => assessment_view(ui, assessment),
        Some(Err(e)) => {
            ui.label(RichText::new("Tidak ada data untuk pilihan ini.").strong());
            ui.label(RichText::new(e.to_string()).weak());
        }
        None => no_rows(ui),
    }
}

fn recommendation_color(rec: Recommendation) -> Color32 {
    match rec {
        Recommendation::Expansion => OK_GREEN,
        Recommendation::Efficiency => Color32::from_rgb(219, 150, 30),
        Recommendation::ConservativeRestructuring => FLAG_RED,
    }
}

fn assessment_view(ui: &mut Ui, assessment: &Assessment) {
    let color = recommendation_color(assessment.recommendation);
    egui::Frame::group(ui.style()).show(ui, |ui: &mut Ui| {
        ui.label(
            RichText::new(format!("Hasil Analisis: {}", assessment.recommendation.headline()))
                .size(22.0)
                .strong()
                .color(color),
        );
        ui.label(format!(
            "{} · skor {}/{}",
            assessment.recommendation.label(),
            assessment.score,
            Indicator::ALL.len()
        ));
    });
    ui.add_space(8.0);

    ui.horizontal_wrapped(|ui: &mut Ui| {
        for result in &assessment.indicators {
            let value = match result.indicator {
                Indicator::Revenue | Indicator::NetIncome | Indicator::CashBalance => {
                    format_amount(result.value)
                }
                _ => format!("{:.2}", result.value),
            };
            let (mark, c) = if result.passed { ("✔", OK_GREEN) } else { ("✘", FLAG_RED) };
            metric_card(
                ui,
                &format!("{} {}  ({})", mark, result.indicator.name(), result.indicator.rule()),
                value,
                Some(c),
            );
        }
    });
}

fn export_tab(ui: &mut Ui, state: &mut AppState) {
    ui.heading("📤 Export Laporan");
    ui.label("Seluruh data (tanpa filter) dari keempat sheet diekspor ke satu file Excel.");
    ui.add_space(4.0);

    let Some(file_name) = state.export_file_name() else {
        no_rows(ui);
        return;
    };
    egui::Grid::new("export_info").num_columns(2).show(ui, |ui: &mut Ui| {
        ui.label("Nama file");
        ui.monospace(&file_name);
        ui.end_row();
        ui.label("Tipe");
        ui.monospace(XLSX_MIME);
        ui.end_row();
    });
    ui.add_space(8.0);

    if ui.button("💾 Download Laporan Excel").clicked() {
        panels::save_file_dialog(state);
    }
    if let Some(path) = &state.last_export {
        ui.label(RichText::new(format!("Tersimpan: {}", path.display())).color(OK_GREEN));
    }
}
