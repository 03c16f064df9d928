//! Bed Occupancy Library
//!
//! Date-keyed store of daily hospital bed occupancy and the views derived from
//! it: status levels, chart series, comparisons and statistics. Also exposes
//! share-link encoding, bootstrap of the initial data and CSV export.

pub mod analytics;
pub mod api;
pub mod bootstrap;
pub mod capacity;
pub mod chart;
pub mod codec;
pub mod config;
pub mod error;
pub mod export;
pub mod model;
pub mod session;
pub mod status;
pub mod store;
pub mod traits;

// Re-export commonly used types
pub use analytics::{
    // Comparison
    ComparisonResult,
    ComparisonRow,
    // Date filtering
    DateFilter,
    DeltaDirection,
    // Statistics
    StatisticsResult,
    TRACKED_CATEGORIES,
    available_months,
    column_totals,
    compare,
    compute_extremes,
    filter_dates,
    tracked_statistics,
};
pub use api::PublicDataClient;
pub use bootstrap::{Bootstrap, bootstrap, bootstrap_remote};
pub use capacity::{CapacityConfig, CategoryLimits};
pub use chart::{SeriesPoint, StatusCard, build_series, status_cards};
pub use codec::{
    Compressor, LzStringCompressor, ShareScope, SharingCodec, encode_legacy, share_url,
    token_from_input,
};
pub use config::AppConfig;
pub use error::{DataOrigin, DecodeError, LoadError, StorageError};
pub use export::{Table, comparison_table, export_to_csv, history_table};
pub use model::{BedCategory, BedSnapshot, DateKey, HistoricalData};
pub use session::{AdminGate, OverwriteFlow, Session};
pub use status::{StatusLevel, Thresholds, classify};
pub use store::{OccupancyStore, StoreMutationOutcome};
pub use traits::{Clock, FileStorage, MemoryStorage, MockClock, Storage, SystemClock};
