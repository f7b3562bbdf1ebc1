use crate::data::model::{columns, RatioRecord};

// ---------------------------------------------------------------------------
// Threshold classification for ratio cells
// ---------------------------------------------------------------------------

/// Which side of the threshold is unhealthy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarity {
    /// Values under the threshold are flagged (DSCR, Current Ratio).
    LowIsBad,
    /// Values over the threshold are flagged (DER).
    HighIsBad,
}

/// Outcome of checking one cell against its threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flag {
    Ok,
    Flagged,
    /// The cell holds no number (blank, text or NaN).
    Unclassified,
}

/// Classify `value` against `threshold`. The threshold itself is healthy.
pub fn classify(value: f64, threshold: f64, polarity: Polarity) -> Flag {
    if value.is_nan() {
        return Flag::Unclassified;
    }
    let bad = match polarity {
        Polarity::LowIsBad => value < threshold,
        Polarity::HighIsBad => value > threshold,
    };
    if bad {
        Flag::Flagged
    } else {
        Flag::Ok
    }
}

/// [`classify`] for a cell that may be missing.
pub fn classify_cell(value: Option<f64>, threshold: f64, polarity: Polarity) -> Flag {
    value.map_or(Flag::Unclassified, |v| classify(v, threshold, polarity))
}

// ---------------------------------------------------------------------------
// RatioColumn – the three ratios with their fixed limits
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RatioColumn {
    Dscr,
    CurrentRatio,
    Der,
}

impl RatioColumn {
    pub const ALL: [RatioColumn; 3] = [RatioColumn::Dscr, RatioColumn::CurrentRatio, RatioColumn::Der];

    pub fn threshold(self) -> f64 {
        match self {
            RatioColumn::Dscr => 1.2,
            RatioColumn::CurrentRatio => 1.1,
            RatioColumn::Der => 1.5,
        }
    }

    pub fn polarity(self) -> Polarity {
        match self {
            RatioColumn::Dscr | RatioColumn::CurrentRatio => Polarity::LowIsBad,
            RatioColumn::Der => Polarity::HighIsBad,
        }
    }

    /// Sheet header of the column.
    pub fn header(self) -> &'static str {
        match self {
            RatioColumn::Dscr => columns::DSCR,
            RatioColumn::CurrentRatio => columns::CURRENT_RATIO,
            RatioColumn::Der => columns::DER,
        }
    }

    pub fn value(self, record: &RatioRecord) -> Option<f64> {
        match self {
            RatioColumn::Dscr => record.dscr,
            RatioColumn::CurrentRatio => record.current_ratio,
            RatioColumn::Der => record.der,
        }
    }

    /// Classify this column's cell of `record`.
    pub fn classify(self, record: &RatioRecord) -> Flag {
        classify_cell(self.value(record), self.threshold(), self.polarity())
    }
}
