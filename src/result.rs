use serde::{ Deserialize, Serialize };
use serde_json::{ Map, Value };
use std::fmt;

/// The outcome of one successful search.
///
/// Instances are only produced by a completed retrieval and cannot be
/// modified afterwards; every field is exposed through an accessor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    query: String,
    urls: Vec<String>,
    answer: Option<String>,
    total_results: u64,
    search_time: f64,
}

impl SearchResult {
    pub(crate) fn new(
        query: String,
        urls: Vec<String>,
        answer: Option<String>,
        total_results: u64,
        search_time: f64
    ) -> Self {
        SearchResult {
            query,
            urls,
            answer,
            total_results,
            search_time: search_time.max(0.0),
        }
    }

    /// The submitted query text with surrounding whitespace trimmed.
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Organic result URLs in page rank order, without duplicates.
    pub fn urls(&self) -> &[String] {
        &self.urls
    }

    /// Featured snippet text, if one was requested and found.
    pub fn answer(&self) -> Option<&str> {
        self.answer.as_deref()
    }

    /// The provider's estimate of the total number of matches, `0` when the
    /// count could not be read.
    pub fn total_results(&self) -> u64 {
        self.total_results
    }

    /// Wall-clock seconds spent on the retrieval.
    pub fn search_time(&self) -> f64 {
        self.search_time
    }

    pub fn into_urls(self) -> Vec<String> {
        self.urls
    }

    /// Projects the result onto a plain key-value map with the keys
    /// `query`, `urls`, `answer`, `total_results` and `search_time`.
    pub fn to_map(&self) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("query".to_string(), Value::from(self.query.clone()));
        map.insert("urls".to_string(), Value::from(self.urls.clone()));
        map.insert(
            "answer".to_string(),
            self.answer.clone().map_or(Value::Null, Value::from)
        );
        map.insert("total_results".to_string(), Value::from(self.total_results));
        map.insert("search_time".to_string(), Value::from(self.search_time));
        map
    }

    /// Rebuilds a result from a map produced by [`SearchResult::to_map`].
    pub fn from_map(map: Map<String, Value>) -> Result<Self, serde_json::Error> {
        serde_json::from_value(Value::Object(map))
    }
}

impl fmt::Display for SearchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?}: {} urls, ~{} total results in {:.2}s",
            self.query,
            self.urls.len(),
            self.total_results,
            self.search_time
        )
    }
}
