// MDRM Explorer - Core Library
// Exposes all modules for use in the CLI, the web server, and tests

pub mod aggregate;  // Counts, group-bys, percentages, date bounds
pub mod catalog;    // Data model + CSV loader
pub mod charts;     // Chart series + SVG rendering
pub mod config;     // Environment configuration + logging setup
pub mod error;      // Typed library errors
pub mod explorer;   // Handlers behind the interactive explorer
pub mod filter;     // Filter engine
pub mod report;     // Console analysis + summary report

// Re-export commonly used types
pub use aggregate::{
    distribution_stats, percentage, ActiveSummary, Aggregator, CrossMnemonicItem, DateRange,
    DistributionStats, GroupCount, ValueCount,
};
pub use catalog::{parse_date, Catalog, CatalogEntry, Column, Confidentiality, ItemType};
pub use charts::{ChartKind, ChartPoint, ChartSeries};
pub use config::{init_logging, AppConfig};
pub use error::{CatalogError, ConfigError};
pub use explorer::{
    distribution_charts, filter_options, handle, item_details, Action, DistributionCharts,
    ExplorerInput, ExplorerView, FilterOptions, ResultRow, SelectOption, NO_SELECTION_MESSAGE,
};
pub use filter::{
    ConfidentialityFilter, FilterMode, FilterQuery, FilterResult, ResultKind, RESET_PREVIEW_ROWS,
    RESULT_LIMIT,
};
pub use report::{run_analysis, write_analysis, AnalysisOutputs, SummaryReport};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
