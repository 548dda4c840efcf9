//! # Shared Constants
//!
//! Endpoint defaults, page sizes, and output file names shared by the library
//! and the `idsflow` CLI.

/// The default root of the statistical API.
pub const DEFAULT_BASE_URL: &str = "https://api.worldbank.org/v2";

/// The API source id of International Debt Statistics.
pub const IDS_SOURCE_ID: &str = "6";

/// Page size for concept metadata requests.
pub const METADATA_PAGE_SIZE: u32 = 1000;

/// Page size for bulk series requests.
///
/// Bulk requests are single-page, so this must exceed
/// `countries x counterpart areas x years` for every configured series.
pub const BULK_PAGE_SIZE: u32 = 10_000_000;

/// Default per-request timeout, in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;

/// Default number of series fetched and flattened at once.
pub const DEFAULT_CONCURRENCY: usize = 4;

/// The default directory for all persisted files.
pub const DEFAULT_OUTPUT_DIR: &str = "data";

/// File name of the consolidated wide-format table.
pub const WIDE_DATASET_FILE: &str = "ids_bilateral_wide.csv";

/// File name of the consolidated long-format table.
pub const LONG_DATASET_FILE: &str = "ids_bilateral_long.csv";

/// File name of the per-series last-updated report.
pub const LAST_UPDATED_FILE: &str = "last_updated.csv";

/// Subdirectory holding one lookup file per metadata concept.
pub const METADATA_DIR: &str = "metadata";
