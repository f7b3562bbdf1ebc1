/// Data layer: core types, loading, filtering and export.
///
/// Architecture:
/// ```text
///   .xlsx (4 sheets)
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse workbook → FinancialTables (all-or-nothing)
///   └──────────┘
///        │
///        ▼
///   ┌─────────────────┐
///   │ FinancialTables  │  typed rows per sheet, immutable
///   └─────────────────┘
///        │                          │
///        ▼                          ▼
///   ┌──────────┐              ┌──────────┐
///   │  filter   │ year+months │  export   │  unfiltered tables → .xlsx bytes
///   └──────────┘              └──────────┘
/// ```

pub mod export;
pub mod filter;
pub mod loader;
pub mod model;
pub mod sample;
