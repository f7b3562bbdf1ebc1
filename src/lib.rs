//! Financial performance dashboard: loads a four-sheet workbook, filters it
//! by period, scores the selection and exports the tables back to xlsx.

pub mod analysis;
pub mod app;
pub mod color;
pub mod config;
pub mod data;
pub mod state;
pub mod ui;
