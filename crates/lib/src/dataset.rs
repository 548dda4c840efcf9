//! # Long and Wide Datasets
//!
//! [`DatasetLong`] is the canonical table: one row per observation, sorted by
//! `(year, series, debtor name, creditor name)`. [`DatasetWide`] pivots the
//! year dimension into columns for compact storage. The two are lossless
//! inverses of each other up to row ordering.

use crate::errors::IdsError;
use crate::types::Observation;
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::warn;

/// How [`pivot_wide`] resolves two observations for the same key and year.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Fail with [`IdsError::DuplicateObservation`].
    #[default]
    Error,
    /// Keep the observation that appears last in the long table.
    LatestWins,
}

/// The columns that identify a row of the wide table.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObservationKey {
    pub series_short_name: String,
    pub debtor_country_id: String,
    pub debtor_country_name: String,
    pub creditor_id: String,
    pub creditor_name: String,
}

impl From<&Observation> for ObservationKey {
    fn from(obs: &Observation) -> Self {
        Self {
            series_short_name: obs.series_short_name.clone(),
            debtor_country_id: obs.debtor_country_id.clone(),
            debtor_country_name: obs.debtor_country_name.clone(),
            creditor_id: obs.creditor_id.clone(),
            creditor_name: obs.creditor_name.clone(),
        }
    }
}

impl ObservationKey {
    fn observation(&self, year: i32, value: f64) -> Observation {
        Observation {
            series_short_name: self.series_short_name.clone(),
            debtor_country_id: self.debtor_country_id.clone(),
            debtor_country_name: self.debtor_country_name.clone(),
            creditor_id: self.creditor_id.clone(),
            creditor_name: self.creditor_name.clone(),
            year,
            value,
        }
    }
}

/// The consolidated, sorted observation table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DatasetLong {
    observations: Vec<Observation>,
}

impl DatasetLong {
    /// Builds a dataset, sorting the observations into canonical order.
    pub fn from_observations(mut observations: Vec<Observation>) -> Self {
        observations.sort_by(|a, b| {
            (
                a.year,
                &a.series_short_name,
                &a.debtor_country_name,
                &a.creditor_name,
                &a.debtor_country_id,
                &a.creditor_id,
            )
                .cmp(&(
                    b.year,
                    &b.series_short_name,
                    &b.debtor_country_name,
                    &b.creditor_name,
                    &b.debtor_country_id,
                    &b.creditor_id,
                ))
        });
        Self { observations }
    }

    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    pub fn into_observations(self) -> Vec<Observation> {
        self.observations
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// The distinct years present, ascending.
    pub fn years(&self) -> Vec<i32> {
        let years: BTreeSet<i32> = self.observations.iter().map(|o| o.year).collect();
        years.into_iter().collect()
    }
}

/// One row of the wide table: the key columns plus one cell per year.
#[derive(Debug, Clone, PartialEq)]
pub struct WideRow {
    pub key: ObservationKey,
    /// Aligned with [`DatasetWide::years`]; `None` where no observation exists.
    pub values: Vec<Option<f64>>,
}

/// The long table with years pivoted into columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DatasetWide {
    years: Vec<i32>,
    rows: Vec<WideRow>,
}

impl DatasetWide {
    /// Builds a wide table. Every row must carry one cell per year.
    pub(crate) fn new(years: Vec<i32>, rows: Vec<WideRow>) -> Self {
        debug_assert!(rows.iter().all(|r| r.values.len() == years.len()));
        Self { years, rows }
    }

    pub fn years(&self) -> &[i32] {
        &self.years
    }

    pub fn rows(&self) -> &[WideRow] {
        &self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Pivots the year dimension into columns.
///
/// Rows are ordered by key; year columns ascend.
pub fn pivot_wide(long: &DatasetLong, policy: DuplicatePolicy) -> Result<DatasetWide, IdsError> {
    let years = long.years();
    let mut grouped: BTreeMap<ObservationKey, BTreeMap<i32, f64>> = BTreeMap::new();

    for obs in long.observations() {
        let key = ObservationKey::from(obs);
        let cells = grouped.entry(key).or_default();
        if let Some(previous) = cells.insert(obs.year, obs.value) {
            match policy {
                DuplicatePolicy::Error => {
                    return Err(IdsError::DuplicateObservation {
                        series: obs.series_short_name.clone(),
                        debtor: obs.debtor_country_id.clone(),
                        creditor: obs.creditor_id.clone(),
                        year: obs.year,
                    });
                }
                DuplicatePolicy::LatestWins => {
                    warn!(
                        series = %obs.series_short_name,
                        debtor = %obs.debtor_country_id,
                        creditor = %obs.creditor_id,
                        year = obs.year,
                        previous,
                        latest = obs.value,
                        "Duplicate observation replaced"
                    );
                }
            }
        }
    }

    let rows = grouped
        .into_iter()
        .map(|(key, cells)| WideRow {
            values: years.iter().map(|y| cells.get(y).copied()).collect(),
            key,
        })
        .collect();

    Ok(DatasetWide::new(years, rows))
}

/// Collapses year columns back into `(year, value)` observations.
pub fn pivot_long(wide: &DatasetWide) -> DatasetLong {
    let observations = wide
        .rows()
        .iter()
        .flat_map(|row| {
            wide.years()
                .iter()
                .zip(&row.values)
                .filter_map(move |(year, value)| value.map(|v| row.key.observation(*year, v)))
        })
        .collect();
    DatasetLong::from_observations(observations)
}
