//! # Query Builder
//!
//! Pure URL construction for the bulk-data and concept-metadata endpoints.
//! Nothing here performs I/O or checks that a series code exists.

use crate::constants::{BULK_PAGE_SIZE, DEFAULT_BASE_URL, IDS_SOURCE_ID};
use crate::types::Concept;

/// The root of the API plus the statistical source being queried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiEndpoint {
    pub base_url: String,
    pub source_id: String,
}

impl Default for ApiEndpoint {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

impl ApiEndpoint {
    /// Creates an endpoint for the International Debt Statistics source at `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            source_id: IDS_SOURCE_ID.to_string(),
        }
    }

    /// Overrides the source id.
    pub fn with_source_id(mut self, source_id: impl Into<String>) -> Self {
        self.source_id = source_id.into();
        self
    }

    fn source_root(&self) -> String {
        format!("{}/sources/{}", self.base_url, self.source_id)
    }

    /// URL requesting every debtor, counterpart area and year of one series.
    pub fn bulk_query_url(&self, series_code: &str, per_page: u32) -> String {
        format!(
            "{}/country/all/series/{series_code}/counterpart-area/all/time/all?per_page={per_page}&format=JSON",
            self.source_root()
        )
    }

    /// URL for one page of a concept's enumerated values.
    pub fn metadata_url(&self, concept: &Concept, page: u32, per_page: u32) -> String {
        format!(
            "{}/{concept}?per_page={per_page}&page={page}&format=JSON",
            self.source_root()
        )
    }
}

/// Builds the bulk URL for `series_code` against the default endpoint.
pub fn build_bulk_query_url(series_code: &str) -> String {
    ApiEndpoint::default().bulk_query_url(series_code, BULK_PAGE_SIZE)
}
