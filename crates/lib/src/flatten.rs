//! # Response Flattener
//!
//! Parses one bulk-data response into typed structures and expands each
//! observation's dimension list (series, country, counterpart area, time) into
//! a flat [`Observation`]. Also extracts the source's last-updated date.

use crate::errors::IdsError;
use crate::types::{Concept, NumberOrText, Observation, OneOrMany, RawApiResponse};
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::{debug, warn};

/// Date format of the `lastupdated` field.
const LAST_UPDATED_FORMAT: &str = "%Y-%m-%d";

// --- Bulk response structures ---

#[derive(Deserialize, Debug)]
struct BulkResponse {
    #[serde(default)]
    pages: Option<NumberOrText>,
    source: BulkSource,
}

#[derive(Deserialize, Debug)]
struct BulkSource {
    data: Vec<BulkEntry>,
}

#[derive(Deserialize, Debug)]
struct BulkEntry {
    #[serde(default)]
    variable: Vec<Dimension>,
    #[serde(default)]
    value: Option<NumberOrText>,
}

#[derive(Deserialize, Debug)]
struct Dimension {
    concept: String,
    id: String,
    #[serde(default)]
    value: Option<String>,
}

impl Dimension {
    fn label(&self) -> String {
        self.value.clone().unwrap_or_default()
    }
}

impl BulkEntry {
    /// The observed value, or `None` when the API reports no data point.
    fn observed_value(&self, target: &str, index: usize) -> Result<Option<f64>, IdsError> {
        match &self.value {
            None => Ok(None),
            Some(raw) => raw
                .as_f64()
                .map_err(|message| IdsError::shape(target, index, message)),
        }
    }

    fn dimension(
        &self,
        concept: &Concept,
        target: &str,
        index: usize,
    ) -> Result<&Dimension, IdsError> {
        self.variable
            .iter()
            .find(|d| concept.matches(&d.concept))
            .ok_or_else(|| {
                IdsError::shape(target, index, format!("missing '{concept}' dimension"))
            })
    }

    /// Requires exactly one dimension per known concept and nothing else.
    fn check_dimensions(&self, target: &str, index: usize) -> Result<(), IdsError> {
        let mut seen = [false; Concept::KNOWN.len()];
        for dimension in &self.variable {
            let Some(slot) = Concept::KNOWN
                .iter()
                .position(|c| c.matches(&dimension.concept))
            else {
                return Err(IdsError::shape(
                    target,
                    index,
                    format!("unexpected '{}' dimension", dimension.concept),
                ));
            };
            if std::mem::replace(&mut seen[slot], true) {
                return Err(IdsError::shape(
                    target,
                    index,
                    format!("duplicate '{}' dimension", Concept::KNOWN[slot]),
                ));
            }
        }
        Ok(())
    }

    fn into_observation(
        self,
        series_short_name: &str,
        index: usize,
        value: f64,
    ) -> Result<Observation, IdsError> {
        self.check_dimensions(series_short_name, index)?;
        // The series id is already known from the caller, but its absence still
        // means the entry is not shaped like a bulk observation.
        self.dimension(&Concept::Series, series_short_name, index)?;
        let country = self.dimension(&Concept::Country, series_short_name, index)?;
        let counterpart = self.dimension(&Concept::CounterpartArea, series_short_name, index)?;
        let time = self.dimension(&Concept::Time, series_short_name, index)?;

        let year = parse_year(time).ok_or_else(|| {
            IdsError::shape(
                series_short_name,
                index,
                format!("invalid year (id '{}', value '{}')", time.id, time.label()),
            )
        })?;

        Ok(Observation {
            series_short_name: series_short_name.to_string(),
            debtor_country_id: country.id.clone(),
            debtor_country_name: country.label(),
            creditor_id: counterpart.id.clone(),
            creditor_name: counterpart.label(),
            year,
            value,
        })
    }
}

/// Reads a four-digit year from the time dimension's display value, falling
/// back to its id (`YR2020`).
fn parse_year(time: &Dimension) -> Option<i32> {
    let from_value = time.value.as_deref().map(str::trim);
    let from_id = time.id.trim().trim_start_matches("YR");
    [from_value, Some(from_id)]
        .into_iter()
        .flatten()
        .filter_map(|candidate| candidate.parse::<i32>().ok())
        .find(|year| (1000..=9999).contains(year))
}

/// Flattens one bulk response into observations for `series_short_name`.
///
/// Entries with a null or missing value are dropped. Any remaining entry whose
/// dimensions are not exactly the four known concepts fails the whole batch.
pub fn flatten(
    response: &RawApiResponse,
    series_short_name: &str,
) -> Result<Vec<Observation>, IdsError> {
    let parsed: BulkResponse = response.parse_json(series_short_name)?;

    if let Some(pages) = parsed.pages.as_ref().and_then(NumberOrText::as_u32) {
        if pages > 1 {
            warn!(
                series = series_short_name,
                pages,
                "Bulk response spans several pages; only the first was read. Increase the bulk page size."
            );
        }
    }

    let total = parsed.source.data.len();
    let mut observations = Vec::with_capacity(total);
    for (index, entry) in parsed.source.data.into_iter().enumerate() {
        let Some(value) = entry.observed_value(series_short_name, index)? else {
            continue;
        };
        observations.push(entry.into_observation(series_short_name, index, value)?);
    }

    debug!(
        series = series_short_name,
        kept = observations.len(),
        dropped = total - observations.len(),
        "Flattened bulk response"
    );
    Ok(observations)
}

// --- Last-updated extraction ---

#[derive(Deserialize, Debug)]
struct UpdateEnvelope {
    #[serde(default)]
    lastupdated: Option<String>,
    #[serde(default)]
    source: Option<OneOrMany<UpdateSource>>,
}

#[derive(Deserialize, Debug)]
struct UpdateSource {
    #[serde(default)]
    lastupdated: Option<String>,
}

/// Reads the API's self-reported last-update date from a bulk response.
///
/// The date is taken from the `source` block when present, otherwise from the
/// top level.
pub fn extract_last_updated(response: &RawApiResponse) -> Result<NaiveDate, IdsError> {
    let envelope: UpdateEnvelope = response.parse_json(&response.url)?;

    let from_source = envelope
        .source
        .map(OneOrMany::into_vec)
        .unwrap_or_default()
        .into_iter()
        .find_map(|s| s.lastupdated);

    let raw = from_source
        .or(envelope.lastupdated)
        .ok_or_else(|| IdsError::parse(&response.url, "missing 'lastupdated' field"))?;

    NaiveDate::parse_from_str(raw.trim(), LAST_UPDATED_FORMAT).map_err(|e| {
        IdsError::parse(
            &response.url,
            format!("invalid 'lastupdated' date '{raw}': {e}"),
        )
    })
}
