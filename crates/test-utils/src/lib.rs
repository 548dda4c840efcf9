use async_trait::async_trait;
use idsflow::{Fetcher, IdsError, RawApiResponse};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex, Once};

static INIT: Once = Once::new();

/// Initializes tracing for tests. Honors `RUST_LOG`.
pub fn setup_tracing() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

// --- Response Fixtures ---

/// One bulk-data entry with the four dimensions the API always sends.
///
/// `value` is passed through verbatim so tests can use strings, numbers or null.
pub fn bulk_entry(
    series_code: &str,
    debtor: (&str, &str),
    creditor: (&str, &str),
    year: i32,
    value: Value,
) -> Value {
    json!({
        "variable": [
            { "concept": "Country", "id": debtor.0, "value": debtor.1 },
            { "concept": "Series", "id": series_code, "value": format!("{series_code} description") },
            { "concept": "Counterpart-Area", "id": creditor.0, "value": creditor.1 },
            { "concept": "Time", "id": format!("YR{year}"), "value": year.to_string() }
        ],
        "value": value
    })
}

/// A bulk-data response body as served by `.../series/{code}/.../time/all`.
pub fn bulk_response_json(last_updated: &str, entries: Vec<Value>) -> String {
    json!({
        "page": 1,
        "pages": 1,
        "per_page": 10000000,
        "total": entries.len(),
        "source": {
            "id": "6",
            "name": "International Debt Statistics",
            "lastupdated": last_updated,
            "data": entries
        }
    })
    .to_string()
}

/// One page of a concept-metadata response, nested as `source -> concept -> variable`.
pub fn metadata_response_json(
    concept_id: &str,
    entries: &[(&str, &str)],
    page: u32,
    pages: u32,
) -> String {
    let variables: Vec<Value> = entries
        .iter()
        .map(|(id, value)| json!({ "id": id, "value": value }))
        .collect();
    json!({
        "page": page,
        "pages": pages,
        "per_page": "1000",
        "total": entries.len(),
        "source": [{
            "id": "6",
            "name": "International Debt Statistics",
            "concept": [{ "id": concept_id, "variable": variables }]
        }]
    })
    .to_string()
}

// --- Stub Fetcher ---

#[derive(Clone, Debug)]
enum StubReply {
    Body(String),
    Status(u16),
}

/// A `Fetcher` that serves pre-programmed bodies and records every URL it was asked for.
#[derive(Clone, Debug, Default)]
pub struct StubFetcher {
    replies: Arc<Mutex<Vec<(String, StubReply)>>>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl StubFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serves `body` for any URL containing `key`. Earlier keys take precedence.
    pub fn add_response(&self, key: &str, body: &str) {
        let mut replies = self.replies.lock().unwrap();
        replies.push((key.to_string(), StubReply::Body(body.to_string())));
    }

    /// Fails any URL containing `key` as if the server answered with `status`.
    pub fn add_failure(&self, key: &str, status: u16) {
        let mut replies = self.replies.lock().unwrap();
        replies.push((key.to_string(), StubReply::Status(status)));
    }

    /// Retrieves the requested URLs, in request order.
    pub fn get_calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Fetcher for StubFetcher {
    async fn fetch(&self, url: &str) -> Result<RawApiResponse, IdsError> {
        self.calls.lock().unwrap().push(url.to_string());

        let reply = {
            let replies = self.replies.lock().unwrap();
            replies
                .iter()
                .find(|(key, _)| url.contains(key.as_str()))
                .map(|(_, reply)| reply.clone())
        };

        match reply {
            Some(StubReply::Body(body)) => Ok(RawApiResponse {
                url: url.to_string(),
                status: 200,
                body,
            }),
            Some(StubReply::Status(status)) => Err(IdsError::Network {
                target: url.to_string(),
                message: format!("Request failed with status {status}"),
            }),
            None => Err(IdsError::Network {
                target: url.to_string(),
                message: "StubFetcher: no response programmed".to_string(),
            }),
        }
    }
}
