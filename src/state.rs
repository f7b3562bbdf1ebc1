use std::path::PathBuf;

use chrono::NaiveDate;

use crate::analysis::scoring::{assess_with, Aggregation, Assessment, ScoreError};
use crate::color::ColorMap;
use crate::config::DashboardConfig;
use crate::data::export::{export_file_name, to_xlsx, ExportError};
use crate::data::filter::{filter_period, MonthSet};
use crate::data::model::{CashflowPoint, FinancialTables, PerformanceRecord, RatioRecord};

// ---------------------------------------------------------------------------
// Tabs and selection modes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Tab {
    #[default]
    Performance,
    Ratios,
    Cashflow,
    Debt,
    Strategy,
    Export,
}

impl Tab {
    pub const ALL: [Tab; 6] = [
        Tab::Performance,
        Tab::Ratios,
        Tab::Cashflow,
        Tab::Debt,
        Tab::Strategy,
        Tab::Export,
    ];

    pub fn title(self) -> &'static str {
        match self {
            Tab::Performance => "Ringkasan Kinerja",
            Tab::Ratios => "Rasio Keuangan",
            Tab::Cashflow => "Cashflow Forecast",
            Tab::Debt => "Profil Hutang",
            Tab::Strategy => "Strategi",
            Tab::Export => "Export",
        }
    }
}

/// Whether the month picker selects one month or a set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MonthMode {
    Single,
    #[default]
    Multi,
}

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// One dashboard session, independent of rendering.
pub struct AppState {
    pub config: DashboardConfig,

    /// Loaded workbook (None until a file loads successfully).
    pub tables: Option<FinancialTables>,
    /// File name of the loaded workbook.
    pub source_name: Option<String>,

    /// Year choices, newest first.
    pub years: Vec<i32>,
    /// Month choices, in sheet order.
    pub months: Vec<String>,

    pub year: Option<i32>,
    pub month_mode: MonthMode,
    pub single_month: Option<String>,
    pub selected_months: MonthSet,

    /// Visible window of the cashflow chart; always inside the table's dates.
    pub date_range: Option<(NaiveDate, NaiveDate)>,

    /// Strategy result for the current selection (cached).
    pub assessment: Option<Result<Assessment, ScoreError>>,

    pub institution_colors: Option<ColorMap>,
    pub tab: Tab,

    /// Where the last export was written.
    pub last_export: Option<PathBuf>,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,
}

impl AppState {
    pub fn new(config: DashboardConfig) -> Self {
        Self {
            config,
            tables: None,
            source_name: None,
            years: Vec::new(),
            months: Vec::new(),
            year: None,
            month_mode: MonthMode::default(),
            single_month: None,
            selected_months: MonthSet::new(),
            date_range: None,
            assessment: None,
            institution_colors: None,
            tab: Tab::default(),
            last_export: None,
            status_message: None,
        }
    }

    /// Replace the session with a freshly loaded workbook and reset the
    /// selection to the newest year and the first month.
    pub fn set_tables(&mut self, tables: FinancialTables, source_name: Option<String>) {
        self.years = tables.years();
        self.months = tables.months();
        self.year = self.years.first().copied();
        self.single_month = self.months.first().cloned();
        self.selected_months = self.single_month.iter().cloned().collect();
        self.date_range = tables.cashflow_range();
        self.institution_colors = Some(ColorMap::new(
            tables.debts.iter().map(|d| d.institution.as_str()),
        ));

        self.tables = Some(tables);
        self.source_name = source_name;
        self.status_message = None;
        self.rescore();
    }

    /// Drop everything loaded so far and show `message`.
    pub fn set_load_error(&mut self, message: String) {
        let config = std::mem::take(&mut self.config);
        let tab = self.tab;
        *self = AppState::new(config);
        self.tab = tab;
        self.status_message = Some(message);
    }

    // ---- selection ----

    pub fn set_year(&mut self, year: i32) {
        self.year = Some(year);
        self.rescore();
    }

    pub fn set_month_mode(&mut self, mode: MonthMode) {
        if self.month_mode == mode {
            return;
        }
        // Carry the selection across: Single keeps one of the chosen months.
        match mode {
            MonthMode::Single => {
                let first = self
                    .months
                    .iter()
                    .find(|m| self.selected_months.contains(*m))
                    .or(self.months.first())
                    .cloned();
                self.single_month = first;
            }
            MonthMode::Multi => {
                self.selected_months = self.single_month.iter().cloned().collect();
            }
        }
        self.month_mode = mode;
        self.rescore();
    }

    pub fn set_single_month(&mut self, month: String) {
        self.single_month = Some(month);
        self.rescore();
    }

    /// Toggle one month in multi-month mode.
    pub fn toggle_month(&mut self, month: &str) {
        if !self.selected_months.remove(month) {
            self.selected_months.insert(month.to_string());
        }
        self.rescore();
    }

    pub fn select_all_months(&mut self) {
        self.selected_months = self.months.iter().cloned().collect();
        self.rescore();
    }

    pub fn select_no_months(&mut self) {
        self.selected_months.clear();
        self.rescore();
    }

    /// Months in effect for the current mode.
    pub fn active_months(&self) -> MonthSet {
        match self.month_mode {
            MonthMode::Single => self.single_month.iter().cloned().collect(),
            MonthMode::Multi => self.selected_months.clone(),
        }
    }

    /// [`Self::active_months`] in sheet order, for labels and file names.
    pub fn active_month_labels(&self) -> Vec<String> {
        let active = self.active_months();
        self.months
            .iter()
            .filter(|m| active.contains(*m))
            .cloned()
            .collect()
    }

    pub fn filtered_performance(&self) -> Vec<&PerformanceRecord> {
        match (&self.tables, self.year) {
            (Some(t), Some(year)) => filter_period(&t.performance, year, &self.active_months()),
            _ => Vec::new(),
        }
    }

    pub fn filtered_ratios(&self) -> Vec<&RatioRecord> {
        match (&self.tables, self.year) {
            (Some(t), Some(year)) => filter_period(&t.ratios, year, &self.active_months()),
            _ => Vec::new(),
        }
    }

    /// Single-month mode scores the month's own figures; multi-month mode
    /// uses the configured aggregation.
    pub fn aggregation(&self) -> Aggregation {
        match self.month_mode {
            MonthMode::Single => Aggregation::Snapshot,
            MonthMode::Multi => self.config.aggregation,
        }
    }

    /// Recompute the cached assessment after a selection change.
    pub fn rescore(&mut self) {
        let Some(tables) = &self.tables else {
            self.assessment = None;
            return;
        };
        let result = assess_with(
            &self.filtered_performance(),
            &self.filtered_ratios(),
            &tables.cashflow,
            self.aggregation(),
        );
        match &result {
            Ok(a) => log::debug!("Score {} → {}", a.score, a.recommendation),
            Err(e) => log::warn!("Strategy not computed: {e}"),
        }
        self.assessment = Some(result);
    }

    // ---- cashflow window ----

    /// Set the visible cashflow window, clamped to the table's dates.
    pub fn set_date_range(&mut self, from: NaiveDate, to: NaiveDate) {
        let Some((min, max)) = self.tables.as_ref().and_then(|t| t.cashflow_range()) else {
            return;
        };
        let (from, to) = if from <= to { (from, to) } else { (to, from) };
        self.date_range = Some((from.clamp(min, max), to.clamp(min, max)));
    }

    pub fn visible_cashflow(&self) -> Vec<&CashflowPoint> {
        let (Some(tables), Some((from, to))) = (&self.tables, self.date_range) else {
            return Vec::new();
        };
        tables
            .cashflow
            .iter()
            .filter(|p| p.date >= from && p.date <= to)
            .collect()
    }

    // ---- export ----

    pub fn export_file_name(&self) -> Option<String> {
        let year = self.year?;
        Some(export_file_name(
            &self.config.report_prefix,
            year,
            &self.active_month_labels(),
        ))
    }

    /// The whole workbook, regardless of the current filter.
    pub fn export_bytes(&self) -> Option<Result<Vec<u8>, ExportError>> {
        self.tables.as_ref().map(to_xlsx)
    }
}
