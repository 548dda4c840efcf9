//! # idsflow: International Debt Statistics Extraction
//!
//! This crate fetches bilateral external-debt series from the International
//! Debt Statistics source of a public statistical API, flattens the nested JSON
//! responses into observation rows, and reshapes them between long and wide
//! tabular layouts for CSV persistence.
//!
//! The pipeline is linear: build URLs ([`query`]), fetch ([`client`]),
//! flatten ([`flatten`]), consolidate ([`pipeline`]) and persist
//! ([`dataset`], [`persist`]). Concept lookups live in [`metadata`].

pub mod client;
pub mod constants;
pub mod dataset;
pub mod errors;
pub mod flatten;
pub mod metadata;
pub mod persist;
pub mod pipeline;
pub mod query;
pub mod types;

pub use client::{Fetcher, IdsClient, IdsClientBuilder};
pub use dataset::{
    pivot_long, pivot_wide, DatasetLong, DatasetWide, DuplicatePolicy, ObservationKey, WideRow,
};
pub use errors::IdsError;
pub use flatten::{extract_last_updated, flatten};
pub use metadata::fetch_metadata;
pub use pipeline::{run_pipeline, FailurePolicy, Pipeline, PipelineOptions, PipelineOutput};
pub use query::{build_bulk_query_url, ApiEndpoint};
pub use types::{Concept, MetadataEntry, Observation, RawApiResponse, SeriesFailure, SeriesSpec};
