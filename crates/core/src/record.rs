//! Record and search result types.
//!
//! A [`Record`] is one row inserted into a collection. A [`SearchHit`] is what
//! the store returns for a match, and a [`SearchResult`] is the hit as exposed
//! to API clients, with a display filename derived from the URL.

use serde::{Deserialize, Serialize};

/// One ingested item. The primary key is assigned by the store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    #[serde(rename = "vec")]
    pub vector: Vec<f32>,
    pub url: String,
}

/// A raw match returned by the vector store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub url: String,
    pub score: f32,
}

/// A ranked search result.
///
/// `score` follows the collection's metric: larger is better for `IP` and
/// `COSINE`, smaller is better for `L2`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub url: String,
    pub score: f32,
    pub filename: String,
}

impl From<SearchHit> for SearchResult {
    fn from(hit: SearchHit) -> Self {
        let filename = file_name(&hit.url).to_string();
        Self {
            url: hit.url,
            score: hit.score,
            filename,
        }
    }
}

/// Last path segment of a URL or file path. Trailing separators are ignored.
pub fn file_name(url: &str) -> &str {
    url.trim_end_matches(['/', '\\'])
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or("")
}
