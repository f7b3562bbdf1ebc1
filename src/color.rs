use std::collections::BTreeMap;

use eframe::egui::Color32;
use palette::{Hsl, IntoColor, Srgb};

use crate::analysis::threshold::Flag;

// ---------------------------------------------------------------------------
// Color palette generator
// ---------------------------------------------------------------------------

/// `n` colours on evenly spaced hues, starting at blue. Neighbouring entries
/// alternate between a darker and a lighter shade so adjacent bars in a
/// grouped chart stay apart even when `n` is large.
pub fn generate_palette(n: usize) -> Vec<Color32> {
    const START_HUE: f32 = 210.0;
    const SHADES: [(f32, f32); 2] = [(0.70, 0.50), (0.55, 0.62)];

    (0..n)
        .map(|i| {
            let hue = (START_HUE + i as f32 * 360.0 / n as f32) % 360.0;
            let (saturation, lightness) = SHADES[i % SHADES.len()];
            let rgb: Srgb = Hsl::new(hue, saturation, lightness).into_color();
            let [r, g, b] = [rgb.red, rgb.green, rgb.blue].map(|c| (c.clamp(0.0, 1.0) * 255.0).round() as u8);
            Color32::from_rgb(r, g, b)
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Series colours: label → Color32
// ---------------------------------------------------------------------------

/// Assigns a distinct colour to each chart series label (KPI name,
/// institution, ...).
#[derive(Debug, Clone)]
pub struct ColorMap {
    mapping: BTreeMap<String, Color32>,
    default_color: Color32,
}

impl ColorMap {
    /// Build a colour map over `labels`, ignoring duplicates.
    pub fn new<'a>(labels: impl IntoIterator<Item = &'a str>) -> Self {
        let mut unique: Vec<&str> = Vec::new();
        for label in labels {
            if !unique.contains(&label) {
                unique.push(label);
            }
        }
        let mapping = unique
            .iter()
            .zip(generate_palette(unique.len()))
            .map(|(label, c)| (label.to_string(), c))
            .collect();

        ColorMap {
            mapping,
            default_color: Color32::GRAY,
        }
    }

    pub fn color_for(&self, label: &str) -> Color32 {
        self.mapping
            .get(label)
            .copied()
            .unwrap_or(self.default_color)
    }
}

// ---------------------------------------------------------------------------
// Threshold flag colours
// ---------------------------------------------------------------------------

pub const OK_GREEN: Color32 = Color32::from_rgb(46, 160, 67);
pub const FLAG_RED: Color32 = Color32::from_rgb(218, 54, 51);

/// Text colour for a classified ratio cell.
pub fn flag_color(flag: Flag) -> Color32 {
    match flag {
        Flag::Ok => OK_GREEN,
        Flag::Flagged => FLAG_RED,
        Flag::Unclassified => Color32::GRAY,
    }
}
