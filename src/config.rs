use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::analysis::scoring::Aggregation;

/// Environment variable naming an optional JSON settings file.
pub const CONFIG_ENV: &str = "KINERJA_DASHBOARD_CONFIG";

/// User-tunable presentation settings. Scoring limits are fixed and live in
/// [`crate::analysis`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub window_size: [f32; 2],
    /// Prefix of the suggested export file name.
    pub report_prefix: String,
    /// How the strategy tab reduces a multi-month selection.
    pub aggregation: Aggregation,
    /// Start directory of the save dialog.
    pub export_dir: Option<PathBuf>,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            window_size: [1280.0, 820.0],
            report_prefix: "Laporan_Kinerja".into(),
            aggregation: Aggregation::Mean,
            export_dir: None,
        }
    }
}

impl DashboardConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot read {}", path.display()))?;
        let config = serde_json::from_str(&content)
            .with_context(|| format!("Invalid config {}", path.display()))?;
        Ok(config)
    }

    /// Load from [`CONFIG_ENV`] if set, otherwise defaults.
    pub fn from_env() -> Result<Self> {
        match std::env::var_os(CONFIG_ENV) {
            Some(path) => Self::load(Path::new(&path)),
            None => Ok(Self::default()),
        }
    }
}
