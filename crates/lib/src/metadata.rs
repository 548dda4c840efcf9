//! # Metadata Resolver
//!
//! Fetches the enumerated `(code, name)` values of a concept, such as every
//! debtor country or every series code the source publishes.
//!
//! Responses nest entries as `source -> concept -> variable`. Paging is
//! followed until the reported page count is exhausted.

use crate::client::Fetcher;
use crate::constants::METADATA_PAGE_SIZE;
use crate::errors::IdsError;
use crate::query::ApiEndpoint;
use crate::types::{Concept, MetadataEntry, NumberOrText, OneOrMany};
use serde::Deserialize;
use std::collections::HashSet;
use tracing::{debug, info};

#[derive(Deserialize, Debug)]
struct MetadataResponse {
    #[serde(default)]
    pages: Option<NumberOrText>,
    source: OneOrMany<MetadataSource>,
}

#[derive(Deserialize, Debug)]
struct MetadataSource {
    #[serde(default)]
    concept: Vec<ConceptBlock>,
}

#[derive(Deserialize, Debug)]
struct ConceptBlock {
    #[serde(default, alias = "value")]
    variable: Vec<VariableEntry>,
}

#[derive(Deserialize, Debug)]
struct VariableEntry {
    id: String,
    #[serde(default)]
    value: Option<String>,
}

impl MetadataResponse {
    fn page_count(&self) -> u32 {
        self.pages
            .as_ref()
            .and_then(NumberOrText::as_u32)
            .unwrap_or(1)
    }

    fn into_entries(self) -> impl Iterator<Item = MetadataEntry> {
        self.source
            .into_vec()
            .into_iter()
            .flat_map(|source| source.concept)
            .flat_map(|block| block.variable)
            .map(|variable| MetadataEntry {
                code: variable.id,
                name: variable.value.unwrap_or_default(),
            })
    }
}

/// Fetches every enumerated value of `concept`.
///
/// Codes repeated across pages are kept once, at their first position.
pub async fn fetch_metadata(
    fetcher: &dyn Fetcher,
    endpoint: &ApiEndpoint,
    concept: &Concept,
) -> Result<Vec<MetadataEntry>, IdsError> {
    let mut entries = Vec::new();
    let mut seen = HashSet::new();
    let mut page = 1;

    loop {
        let url = endpoint.metadata_url(concept, page, METADATA_PAGE_SIZE);
        let response = fetcher.fetch(&url).await?;
        let target = format!("concept '{concept}' page {page}");
        let parsed: MetadataResponse = response.parse_json(&target)?;

        let pages = parsed.page_count();
        let page_entries: Vec<MetadataEntry> = parsed.into_entries().collect();
        let received = page_entries.len();
        for entry in page_entries {
            if seen.insert(entry.code.clone()) {
                entries.push(entry);
            }
        }
        debug!(%concept, page, pages, received, "Read metadata page");

        // An empty page means the reported page count overstates the data.
        if page >= pages || received == 0 {
            break;
        }
        page += 1;
    }

    info!(%concept, entries = entries.len(), "Resolved concept metadata");
    Ok(entries)
}

/// Fetches several concepts one after another, keeping their order.
pub async fn fetch_all_metadata(
    fetcher: &dyn Fetcher,
    endpoint: &ApiEndpoint,
    concepts: &[Concept],
) -> Result<Vec<(Concept, Vec<MetadataEntry>)>, IdsError> {
    let mut resolved = Vec::with_capacity(concepts.len());
    for concept in concepts {
        let entries = fetch_metadata(fetcher, endpoint, concept).await?;
        resolved.push((concept.clone(), entries));
    }
    Ok(resolved)
}
