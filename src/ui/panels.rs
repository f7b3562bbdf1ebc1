use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};
use egui_extras::DatePickerButton;

use crate::data::export::save_file;
use crate::state::{AppState, MonthMode};

// ---------------------------------------------------------------------------
// Left side panel – selection widgets
// ---------------------------------------------------------------------------

/// Render the left filter panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Filter");
    ui.separator();

    if state.tables.is_none() {
        ui.label("Belum ada file dimuat.");
        if ui.button("Upload file Excel…").clicked() {
            open_file_dialog(state);
        }
        return;
    }

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            // ---- Year ----
            ui.strong("Pilih Tahun");
            let current = state.year.map(|y| y.to_string()).unwrap_or_default();
            let mut picked = None;
            egui::ComboBox::from_id_salt("year")
                .selected_text(current)
                .show_ui(ui, |ui: &mut Ui| {
                    for &year in &state.years {
                        if ui
                            .selectable_label(state.year == Some(year), year.to_string())
                            .clicked()
                        {
                            picked = Some(year);
                        }
                    }
                });
            if let Some(year) = picked {
                state.set_year(year);
            }
            ui.separator();

            // ---- Months ----
            ui.strong("Pilih Bulan");
            let mut mode = state.month_mode;
            ui.horizontal(|ui: &mut Ui| {
                ui.radio_value(&mut mode, MonthMode::Single, "Satu bulan");
                ui.radio_value(&mut mode, MonthMode::Multi, "Beberapa");
            });
            state.set_month_mode(mode);

            let months = state.months.clone();
            match state.month_mode {
                MonthMode::Single => {
                    let current = state.single_month.clone().unwrap_or_default();
                    egui::ComboBox::from_id_salt("month")
                        .selected_text(&current)
                        .show_ui(ui, |ui: &mut Ui| {
                            for m in &months {
                                if ui.selectable_label(current == *m, m).clicked() {
                                    state.set_single_month(m.clone());
                                }
                            }
                        });
                }
                MonthMode::Multi => {
                    let header = format!(
                        "Bulan  ({}/{})",
                        state.selected_months.len(),
                        months.len()
                    );
                    egui::CollapsingHeader::new(RichText::new(header).strong())
                        .id_salt("months")
                        .default_open(true)
                        .show(ui, |ui: &mut Ui| {
                            ui.horizontal(|ui: &mut Ui| {
                                if ui.small_button("All").clicked() {
                                    state.select_all_months();
                                }
                                if ui.small_button("None").clicked() {
                                    state.select_no_months();
                                }
                            });
                            for m in &months {
                                let mut checked = state.selected_months.contains(m);
                                if ui.checkbox(&mut checked, m).changed() {
                                    state.toggle_month(m);
                                }
                            }
                        });
                }
            }
            ui.separator();

            // ---- Cashflow window ----
            let bounds = state.tables.as_ref().and_then(|t| t.cashflow_range());
            if let (Some((min, max)), Some((mut from, mut to))) = (bounds, state.date_range) {
                ui.strong("Rentang Cashflow");
                let mut changed = false;
                egui::Grid::new("cash_range").num_columns(2).show(ui, |ui: &mut Ui| {
                    ui.label("Dari");
                    changed |= ui.add(DatePickerButton::new(&mut from).id_salt("cash_from")).changed();
                    ui.end_row();
                    ui.label("Sampai");
                    changed |= ui.add(DatePickerButton::new(&mut to).id_salt("cash_to")).changed();
                    ui.end_row();
                });
                if changed {
                    state.set_date_range(from, to);
                }
                if ui.small_button("Reset").clicked() {
                    state.set_date_range(min, max);
                }
                ui.label(
                    RichText::new(format!(
                        "{} – {}",
                        min.format("%Y-%m-%d"),
                        max.format("%Y-%m-%d")
                    ))
                    .small()
                    .weak(),
                );
            }
        });
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open…").clicked() {
                open_file_dialog(state);
                ui.close_menu();
            }
            if ui
                .add_enabled(state.tables.is_some(), egui::Button::new("Export…"))
                .clicked()
            {
                save_file_dialog(state);
                ui.close_menu();
            }
        });

        ui.separator();

        if let (Some(tables), Some(name)) = (&state.tables, &state.source_name) {
            ui.label(format!(
                "{name}: {} baris kinerja, {} rasio, {} hari cashflow, {} pinjaman",
                tables.performance.len(),
                tables.ratios.len(),
                tables.cashflow.len(),
                tables.debts.len()
            ));
        }

        if let Some(msg) = &state.status_message {
            ui.separator();
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

// ---------------------------------------------------------------------------
// File dialogs
// ---------------------------------------------------------------------------

pub fn open_file_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Upload file Excel")
        .add_filter("Excel", &["xlsx", "xlsm"])
        .pick_file();

    if let Some(path) = file {
        match crate::data::loader::load_file(&path) {
            Ok(tables) => {
                log::info!(
                    "Loaded {} ({} performance rows, {} ratio rows, {} cashflow days, {} loans)",
                    path.display(),
                    tables.performance.len(),
                    tables.ratios.len(),
                    tables.cashflow.len(),
                    tables.debts.len()
                );
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned());
                state.set_tables(tables, name);
            }
            Err(e) => {
                log::error!("Failed to load file: {e:#}");
                state.set_load_error(format!("Gagal membaca file: {e:#}"));
            }
        }
    }
}

pub fn save_file_dialog(state: &mut AppState) {
    let Some(file_name) = state.export_file_name() else {
        return;
    };
    let mut dialog = rfd::FileDialog::new()
        .set_title("Download Laporan Excel")
        .set_file_name(&file_name)
        .add_filter("Excel", &["xlsx"]);
    if let Some(dir) = &state.config.export_dir {
        dialog = dialog.set_directory(dir);
    }
    let Some(path) = dialog.save_file() else {
        return;
    };

    let result = match state.export_bytes() {
        Some(Ok(bytes)) => save_file(&path, &bytes),
        Some(Err(e)) => Err(e.into()),
        None => return,
    };
    match result {
        Ok(()) => {
            log::info!("Exported report to {}", path.display());
            state.status_message = None;
            state.last_export = Some(path);
        }
        Err(e) => {
            log::error!("Export failed: {e:#}");
            state.status_message = Some(format!("Export gagal: {e:#}"));
        }
    }
}
