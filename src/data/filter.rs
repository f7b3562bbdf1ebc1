use std::collections::BTreeSet;

use super::model::{PerformanceRecord, RatioRecord};

// ---------------------------------------------------------------------------
// Period selection
// ---------------------------------------------------------------------------

/// Set of selected month labels.
pub type MonthSet = BTreeSet<String>;

/// Rows addressable by (year, month).
pub trait Periodic {
    fn year(&self) -> i32;
    fn month(&self) -> &str;
}

impl Periodic for PerformanceRecord {
    fn year(&self) -> i32 {
        self.year
    }

    fn month(&self) -> &str {
        &self.month
    }
}

impl Periodic for RatioRecord {
    fn year(&self) -> i32 {
        self.year
    }

    fn month(&self) -> &str {
        &self.month
    }
}

/// Return the rows of `rows` falling in `year` and any of `months`.
///
/// * Source order is preserved.
/// * A year that does not occur in the table yields an empty result.
/// * An empty month set yields an empty result.
pub fn filter_period<'a, R: Periodic>(rows: &'a [R], year: i32, months: &MonthSet) -> Vec<&'a R> {
    if months.is_empty() {
        return Vec::new();
    }
    rows.iter()
        .filter(|r| r.year() == year && months.contains(r.month()))
        .collect()
}

/// Single-month shape of [`filter_period`].
pub fn filter_month<'a, R: Periodic>(rows: &'a [R], year: i32, month: &str) -> Vec<&'a R> {
    let months: MonthSet = std::iter::once(month.to_string()).collect();
    filter_period(rows, year, &months)
}
