use crate::errors::IdsError;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// One valid value of a metadata concept, e.g. a country code and its name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataEntry {
    pub code: String,
    pub name: String,
}

/// A dimension of the International Debt Statistics source.
///
/// Names other than the four known concepts are passed through to the API
/// unvalidated.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Concept {
    Country,
    Series,
    CounterpartArea,
    Time,
    Other(String),
}

impl Concept {
    /// The four concepts every bulk observation is identified by.
    pub const KNOWN: [Concept; 4] = [
        Concept::Country,
        Concept::Series,
        Concept::CounterpartArea,
        Concept::Time,
    ];

    /// The path segment (and lookup file stem) for this concept.
    pub fn as_str(&self) -> &str {
        match self {
            Concept::Country => "country",
            Concept::Series => "series",
            Concept::CounterpartArea => "counterpart-area",
            Concept::Time => "time",
            Concept::Other(name) => name,
        }
    }

    /// Whether a concept label from a response (e.g. `Counterpart-Area`) names this concept.
    pub fn matches(&self, label: &str) -> bool {
        label.trim().eq_ignore_ascii_case(self.as_str())
    }
}

impl FromStr for Concept {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let known = Concept::KNOWN.into_iter().find(|c| c.matches(s));
        Ok(known.unwrap_or_else(|| Concept::Other(s.trim().to_string())))
    }
}

impl fmt::Display for Concept {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A statistical series to pull, identified by a local short name and its API code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesSpec {
    pub short_name: String,
    pub api_code: String,
}

impl SeriesSpec {
    pub fn new(short_name: impl Into<String>, api_code: impl Into<String>) -> Self {
        Self {
            short_name: short_name.into(),
            api_code: api_code.into(),
        }
    }
}

/// The raw result of one GET request. Transient: discarded once flattened.
#[derive(Debug, Clone)]
pub struct RawApiResponse {
    pub url: String,
    pub status: u16,
    pub body: String,
}

impl RawApiResponse {
    /// Deserializes the body into `T`, naming `target` in the error.
    pub(crate) fn parse_json<T>(&self, target: &str) -> Result<T, IdsError>
    where
        T: for<'de> Deserialize<'de>,
    {
        serde_json::from_str(&self.body).map_err(|e| IdsError::parse(target, e))
    }
}

/// One data point: the value of a series for a debtor, creditor and year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub series_short_name: String,
    pub debtor_country_id: String,
    pub debtor_country_name: String,
    pub creditor_id: String,
    pub creditor_name: String,
    pub year: i32,
    pub value: f64,
}

/// A series that failed while the pipeline ran with `FailurePolicy::Continue`.
#[derive(Debug)]
pub struct SeriesFailure {
    pub short_name: String,
    pub error: IdsError,
}

// --- Wire helpers shared by the response parsers ---

/// A JSON field the API sends either as a number or as a numeric string.
#[derive(Deserialize, Debug, Clone)]
#[serde(untagged)]
pub(crate) enum NumberOrText {
    Number(f64),
    Text(String),
}

impl NumberOrText {
    /// The numeric value; `Ok(None)` for an empty string. `NaN` and infinities are rejected.
    pub(crate) fn as_f64(&self) -> Result<Option<f64>, String> {
        let n = match self {
            NumberOrText::Number(n) => *n,
            NumberOrText::Text(s) if s.trim().is_empty() => return Ok(None),
            NumberOrText::Text(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|e| format!("'{s}' is not a number: {e}"))?,
        };
        if !n.is_finite() {
            return Err(format!("'{n}' is not a finite number"));
        }
        Ok(Some(n))
    }

    pub(crate) fn as_u32(&self) -> Option<u32> {
        match self.as_f64() {
            Ok(Some(n)) if n >= 0.0 && n.fract() == 0.0 && n <= u32::MAX as f64 => Some(n as u32),
            _ => None,
        }
    }
}

/// A JSON field the API sends either as a single object or as an array of them.
#[derive(Deserialize, Debug)]
#[serde(untagged)]
pub(crate) enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    pub(crate) fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::One(item) => vec![item],
            OneOrMany::Many(items) => items,
        }
    }
}
