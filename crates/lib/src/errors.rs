use std::path::PathBuf;
use thiserror::Error;

/// Custom error types for the extraction pipeline.
///
/// Every variant names the series, concept, URL or file it concerns, so a
/// failure reported at the top of a run still says which input caused it.
#[derive(Error, Debug)]
pub enum IdsError {
    #[error("Failed to build HTTP client: {0}")]
    Client(String),

    #[error("Request for '{target}' failed: {message}")]
    Network { target: String, message: String },

    #[error("Failed to parse response for '{target}': {message}")]
    Parse { target: String, message: String },

    #[error("Observation {index} of '{target}' has an unexpected shape: {message}")]
    Shape {
        target: String,
        index: usize,
        message: String,
    },

    #[error("Processing task for '{target}' failed: {message}")]
    Task { target: String, message: String },

    #[error("Duplicate observation for series '{series}', debtor '{debtor}', creditor '{creditor}', year {year}")]
    DuplicateObservation {
        series: String,
        debtor: String,
        creditor: String,
        year: i32,
    },

    #[error("I/O error on '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error on '{}': {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("The pipeline run was cancelled")]
    Cancelled,
}

impl IdsError {
    pub(crate) fn network(target: impl Into<String>, message: impl ToString) -> Self {
        IdsError::Network {
            target: target.into(),
            message: message.to_string(),
        }
    }

    pub(crate) fn parse(target: impl Into<String>, message: impl ToString) -> Self {
        IdsError::Parse {
            target: target.into(),
            message: message.to_string(),
        }
    }

    pub(crate) fn shape(target: impl Into<String>, index: usize, message: impl ToString) -> Self {
        IdsError::Shape {
            target: target.into(),
            index,
            message: message.to_string(),
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        IdsError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn csv(path: impl Into<PathBuf>, source: csv::Error) -> Self {
        IdsError::Csv {
            path: path.into(),
            source,
        }
    }
}
