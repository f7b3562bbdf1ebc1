use chrono::{Datelike, NaiveDate};
use eframe::egui::{Color32, Ui};
use egui_plot::{Bar, BarChart, HLine, Legend, Line, Plot, PlotPoints};

use crate::analysis::threshold::RatioColumn;
use crate::color::{generate_palette, ColorMap};
use crate::data::model::{CashflowPoint, DebtObligation, PerformanceRecord, RatioRecord};

const CHART_HEIGHT: f32 = 280.0;

fn day_number(date: NaiveDate) -> f64 {
    date.num_days_from_ce() as f64
}

fn format_day(x: f64) -> String {
    NaiveDate::from_num_days_from_ce_opt(x.round() as i32)
        .map(|d| d.format("%d %b %y").to_string())
        .unwrap_or_default()
}

/// Label for integer grid marks from `labels`, blank elsewhere.
fn index_label(labels: &[String], x: f64) -> String {
    if (x - x.round()).abs() > 1e-6 || x < 0.0 {
        return String::new();
    }
    labels.get(x.round() as usize).cloned().unwrap_or_default()
}

/// Bars for `series` grouped around each integer x position.
fn grouped_bars(groups: usize, series: &[(&str, Vec<f64>)], colors: &[Color32]) -> Vec<BarChart> {
    let n = series.len().max(1) as f64;
    let width = 0.8 / n;
    series
        .iter()
        .enumerate()
        .map(|(s, (name, values))| {
            let offset = (s as f64 - (n - 1.0) / 2.0) * width;
            let bars = values
                .iter()
                .take(groups)
                .enumerate()
                .map(|(g, &v)| Bar::new(g as f64 + offset, v).width(width * 0.95))
                .collect();
            BarChart::new(bars)
                .name(*name)
                .color(colors.get(s).copied().unwrap_or(Color32::LIGHT_BLUE))
        })
        .collect()
}

// ---------------------------------------------------------------------------
// KPI chart (performance tab)
// ---------------------------------------------------------------------------

/// "KPI Bulanan": one bar group per selected month, one bar per KPI.
pub fn kpi_chart(ui: &mut Ui, rows: &[&PerformanceRecord]) {
    let Some(first) = rows.first() else {
        return;
    };
    let labels: Vec<String> = rows.iter().map(|r| format!("{} {}", r.month, r.year)).collect();
    let series: Vec<(&str, Vec<f64>)> = first
        .kpis()
        .iter()
        .enumerate()
        .map(|(k, (name, _))| (*name, rows.iter().map(|r| r.kpis()[k].1).collect()))
        .collect();
    let palette = generate_palette(series.len());

    ui.strong("KPI Bulanan");
    Plot::new("kpi_chart")
        .legend(Legend::default())
        .height(CHART_HEIGHT)
        .x_axis_formatter(move |mark, _range| index_label(&labels, mark.value))
        .allow_scroll(false)
        .show(ui, |plot_ui| {
            for chart in grouped_bars(rows.len(), &series, &palette) {
                plot_ui.bar_chart(chart);
            }
        });
}

// ---------------------------------------------------------------------------
// Ratio chart (ratio tab)
// ---------------------------------------------------------------------------

/// Ratio values per month with dashed threshold lines.
pub fn ratio_chart(ui: &mut Ui, rows: &[&RatioRecord]) {
    if rows.is_empty() {
        return;
    }
    let labels: Vec<String> = rows.iter().map(|r| format!("{} {}", r.month, r.year)).collect();
    let series: Vec<(&str, Vec<f64>)> = RatioColumn::ALL
        .iter()
        .map(|c| {
            let values = rows.iter().map(|r| c.value(r).unwrap_or(0.0)).collect();
            (c.header(), values)
        })
        .collect();
    let palette = generate_palette(series.len());

    ui.strong("Komposisi Rasio");
    Plot::new("ratio_chart")
        .legend(Legend::default())
        .height(CHART_HEIGHT)
        .x_axis_formatter(move |mark, _range| index_label(&labels, mark.value))
        .allow_scroll(false)
        .show(ui, |plot_ui| {
            for chart in grouped_bars(rows.len(), &series, &palette) {
                plot_ui.bar_chart(chart);
            }
            for (column, color) in RatioColumn::ALL.iter().zip(&palette) {
                plot_ui.hline(
                    HLine::new(column.threshold())
                        .name(format!("Batas {}", column.header()))
                        .color(*color)
                        .style(egui_plot::LineStyle::dashed_loose()),
                );
            }
        });
}

// ---------------------------------------------------------------------------
// Cashflow line (cashflow tab)
// ---------------------------------------------------------------------------

/// "Proyeksi Saldo Harian": daily closing balance over the visible window.
pub fn cashflow_chart(ui: &mut Ui, points: &[&CashflowPoint]) {
    let series: PlotPoints = points
        .iter()
        .map(|p| [day_number(p.date), p.closing_balance])
        .collect();

    ui.strong("Proyeksi Saldo Harian");
    Plot::new("cashflow_chart")
        .legend(Legend::default())
        .height(CHART_HEIGHT)
        .x_axis_formatter(|mark, _range| format_day(mark.value))
        .allow_boxed_zoom(true)
        .allow_drag(true)
        .allow_zoom(true)
        .show(ui, |plot_ui| {
            plot_ui.hline(HLine::new(0.0).color(Color32::GRAY));
            plot_ui.line(
                Line::new(series)
                    .name("Saldo_Akhir")
                    .color(Color32::LIGHT_BLUE)
                    .width(2.0),
            );
        });
}

// ---------------------------------------------------------------------------
// Debt timeline (debt tab)
// ---------------------------------------------------------------------------

/// Gantt-style bars from `today` to each maturity date, one colour per
/// institution.
pub fn debt_timeline(ui: &mut Ui, debts: &[DebtObligation], today: NaiveDate, colors: &ColorMap) {
    if debts.is_empty() {
        return;
    }
    // Listed top to bottom in sheet order.
    let n = debts.len();
    let names: Vec<String> = debts.iter().rev().map(|d| d.loan_name.clone()).collect();

    let mut institutions: Vec<&str> = Vec::new();
    for d in debts {
        if !institutions.contains(&d.institution.as_str()) {
            institutions.push(&d.institution);
        }
    }
    let start = day_number(today);
    let charts: Vec<BarChart> = institutions
        .iter()
        .map(|inst| {
            let bars = debts
                .iter()
                .enumerate()
                .filter(|(_, d)| d.institution == *inst)
                .map(|(i, d)| {
                    Bar::new((n - 1 - i) as f64, day_number(d.maturity_date) - start)
                        .base_offset(start)
                        .width(0.6)
                        .name(&d.loan_name)
                })
                .collect();
            BarChart::new(bars)
                .horizontal()
                .name(*inst)
                .color(colors.color_for(inst))
        })
        .collect();

    ui.strong("Jatuh Tempo Hutang");
    Plot::new("debt_timeline")
        .legend(Legend::default())
        .height(CHART_HEIGHT.max(40.0 * n as f32))
        .x_axis_formatter(|mark, _range| format_day(mark.value))
        .y_axis_formatter(move |mark, _range| index_label(&names, mark.value))
        .allow_scroll(false)
        .show(ui, |plot_ui| {
            for chart in charts {
                plot_ui.bar_chart(chart);
            }
        });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn day_numbers_round_trip_to_dates() {
        let d = NaiveDate::from_ymd_opt(2025, 7, 4).unwrap();
        assert_eq!(format_day(day_number(d)), "04 Jul 25");
    }

    #[test]
    fn index_labels_only_on_integer_marks() {
        let labels = vec!["Jan 2024".to_string(), "Feb 2024".to_string()];
        assert_eq!(index_label(&labels, 1.0), "Feb 2024");
        assert_eq!(index_label(&labels, 0.5), "");
        assert_eq!(index_label(&labels, 7.0), "");
        assert_eq!(index_label(&labels, -1.0), "");
    }
}
