//! # Pipeline Driver
//!
//! Runs the extraction over a list of [`SeriesSpec`]s in two passes:
//!
//! 1. build every bulk URL and fetch every response;
//! 2. flatten each response and read its last-updated date.
//!
//! Both passes run with a bounded number of series in flight. Keeping them
//! separate means a network failure is reported before any processing starts.
//! Results are folded into one sorted [`DatasetLong`].

use crate::client::Fetcher;
use crate::constants::{BULK_PAGE_SIZE, DEFAULT_CONCURRENCY};
use crate::dataset::DatasetLong;
use crate::errors::IdsError;
use crate::flatten::{extract_last_updated, flatten};
use crate::query::ApiEndpoint;
use crate::types::{Observation, RawApiResponse, SeriesFailure, SeriesSpec};
use chrono::NaiveDate;
use futures::stream::{self, StreamExt};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use tracing::{error, info, warn};

/// What the pipeline does when one series fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Fail the whole run.
    #[default]
    Abort,
    /// Drop the failed series and report it in [`PipelineOutput::failures`].
    Continue,
}

/// Tuning for a pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOptions {
    /// Maximum number of series fetched or flattened at once.
    pub concurrency: usize,
    pub bulk_page_size: u32,
    pub failure_policy: FailurePolicy,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            bulk_page_size: BULK_PAGE_SIZE,
            failure_policy: FailurePolicy::default(),
        }
    }
}

/// The consolidated result of a run.
#[derive(Debug, Default)]
pub struct PipelineOutput {
    pub dataset: DatasetLong,
    /// Last-updated date per series short name.
    pub last_updated: BTreeMap<String, NaiveDate>,
    /// Series dropped under [`FailurePolicy::Continue`], in input order.
    pub failures: Vec<SeriesFailure>,
}

type Processed = (Vec<Observation>, NaiveDate);

/// Fetches, flattens and consolidates a set of series.
pub struct Pipeline {
    fetcher: Arc<dyn Fetcher>,
    endpoint: ApiEndpoint,
    options: PipelineOptions,
}

impl Pipeline {
    /// Creates a pipeline against the default endpoint with default options.
    pub fn new(fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            fetcher,
            endpoint: ApiEndpoint::default(),
            options: PipelineOptions::default(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: ApiEndpoint) -> Self {
        self.endpoint = endpoint;
        self
    }

    pub fn with_options(mut self, options: PipelineOptions) -> Self {
        self.options = options;
        self
    }

    pub fn endpoint(&self) -> &ApiEndpoint {
        &self.endpoint
    }

    /// The bulk URL each series will be fetched from.
    pub fn bulk_url(&self, spec: &SeriesSpec) -> String {
        self.endpoint
            .bulk_query_url(&spec.api_code, self.options.bulk_page_size)
    }

    /// Runs the pipeline to completion.
    pub async fn run(&self, specs: &[SeriesSpec]) -> Result<PipelineOutput, IdsError> {
        self.run_until(specs, std::future::pending::<()>()).await
    }

    /// Runs the pipeline, abandoning it with [`IdsError::Cancelled`] as soon as
    /// `shutdown` completes.
    pub async fn run_until<F>(
        &self,
        specs: &[SeriesSpec],
        shutdown: F,
    ) -> Result<PipelineOutput, IdsError>
    where
        F: Future<Output = ()>,
    {
        tokio::select! {
            result = self.execute(specs) => result,
            _ = shutdown => {
                warn!("Pipeline run cancelled before completion.");
                Err(IdsError::Cancelled)
            }
        }
    }

    async fn execute(&self, specs: &[SeriesSpec]) -> Result<PipelineOutput, IdsError> {
        let concurrency = self.options.concurrency.max(1);
        info!(series = specs.len(), concurrency, "Starting pipeline run");

        // --- Pass 1: fetch every series ---
        let fetches = specs.iter().map(|spec| {
            let url = self.bulk_url(spec);
            let fetcher = Arc::clone(&self.fetcher);
            async move { fetcher.fetch(&url).await }
        });
        let fetched: Vec<Result<RawApiResponse, IdsError>> =
            stream::iter(fetches).buffered(concurrency).collect().await;

        let mut output = PipelineOutput::default();
        let mut responses = Vec::with_capacity(specs.len());
        for (spec, result) in specs.iter().zip(fetched) {
            match result {
                Ok(response) => responses.push((spec.clone(), response)),
                Err(e) => self.record_failure(&mut output, spec, e)?,
            }
        }

        // --- Pass 2: flatten every fetched response ---
        let jobs = responses.into_iter().map(|(spec, response)| async move {
            let short_name = spec.short_name.clone();
            let result =
                tokio::task::spawn_blocking(move || process_response(&short_name, &response))
                    .await
                    .unwrap_or_else(|e| {
                        Err(IdsError::Task {
                            target: spec.short_name.clone(),
                            message: e.to_string(),
                        })
                    });
            (spec, result)
        });
        let processed: Vec<(SeriesSpec, Result<Processed, IdsError>)> =
            stream::iter(jobs).buffered(concurrency).collect().await;

        let mut observations = Vec::new();
        for (spec, result) in processed {
            match result {
                Ok((series_observations, updated)) => {
                    info!(
                        series = %spec.short_name,
                        observations = series_observations.len(),
                        %updated,
                        "Series processed"
                    );
                    observations.extend(series_observations);
                    output.last_updated.insert(spec.short_name, updated);
                }
                Err(e) => self.record_failure(&mut output, &spec, e)?,
            }
        }

        output.dataset = DatasetLong::from_observations(observations);
        info!(
            observations = output.dataset.len(),
            failed = output.failures.len(),
            "Pipeline run complete"
        );
        Ok(output)
    }

    /// Applies the failure policy: returns the error under `Abort`, records it
    /// under `Continue`.
    fn record_failure(
        &self,
        output: &mut PipelineOutput,
        spec: &SeriesSpec,
        error: IdsError,
    ) -> Result<(), IdsError> {
        error!(series = %spec.short_name, code = %spec.api_code, "Series failed: {error}");
        match self.options.failure_policy {
            FailurePolicy::Abort => Err(error),
            FailurePolicy::Continue => {
                output.failures.push(SeriesFailure {
                    short_name: spec.short_name.clone(),
                    error,
                });
                Ok(())
            }
        }
    }
}

fn process_response(short_name: &str, response: &RawApiResponse) -> Result<Processed, IdsError> {
    let observations = flatten(response, short_name)?;
    let updated = extract_last_updated(response)?;
    Ok((observations, updated))
}

/// Runs the pipeline against the default endpoint with default options.
pub async fn run_pipeline(
    fetcher: Arc<dyn Fetcher>,
    specs: &[SeriesSpec],
) -> Result<PipelineOutput, IdsError> {
    Pipeline::new(fetcher).run(specs).await
}
