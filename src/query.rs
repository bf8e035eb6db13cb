use std::time::Duration;
use url::Url;

use crate::config::{ ScraperConfig, MAX_QUERY_LENGTH };
use crate::driver::SessionOptions;
use crate::error::{ Result, SearchError };

/// A validated, immutable description of one search.
///
/// The only way to obtain one is through [`SearchQuery::new`] or
/// [`SearchQuery::from_config`], both of which reject invalid input with
/// [`SearchError::InvalidQuery`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    text: String,
    max_results: usize,
    timeout: Duration,
    headless: bool,
    stealth_mode: bool,
    extract_answer: bool,
    lang: String,
    region: Option<String>,
    safe_search: bool,
    user_agent: Option<String>,
}

impl SearchQuery {
    /// Builds a query using the default configuration.
    pub fn new(text: &str) -> Result<Self> {
        Self::from_config(text, &ScraperConfig::default())
    }

    /// Builds a query from `text` and the (already merged) `config`.
    pub fn from_config(text: &str, config: &ScraperConfig) -> Result<Self> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(SearchError::invalid_query(text, "query must not be empty or whitespace-only"));
        }
        let length = trimmed.chars().count();
        if length > MAX_QUERY_LENGTH {
            return Err(
                SearchError::invalid_query(
                    text,
                    format!("query is {} characters long, the maximum is {}", length, MAX_QUERY_LENGTH)
                )
            );
        }
        if trimmed.chars().any(char::is_control) {
            return Err(SearchError::invalid_query(text, "query must not contain control characters"));
        }
        config.validate().map_err(|message| SearchError::invalid_query(text, message))?;

        Ok(SearchQuery {
            text: trimmed.to_string(),
            max_results: config.max_results,
            timeout: Duration::from_millis(config.timeout_ms),
            headless: config.headless,
            stealth_mode: config.stealth_mode,
            extract_answer: config.extract_answer,
            lang: config.lang.clone(),
            region: config.region.clone(),
            safe_search: config.safe_search,
            user_agent: config.user_agent.clone(),
        })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn max_results(&self) -> usize {
        self.max_results
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn headless(&self) -> bool {
        self.headless
    }

    pub fn stealth_mode(&self) -> bool {
        self.stealth_mode
    }

    pub fn extract_answer(&self) -> bool {
        self.extract_answer
    }

    pub fn lang(&self) -> &str {
        &self.lang
    }

    pub fn region(&self) -> Option<&str> {
        self.region.as_deref()
    }

    pub fn safe_search(&self) -> bool {
        self.safe_search
    }

    /// Options for the driver session that will serve this query.
    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            headless: self.headless,
            stealth_mode: self.stealth_mode,
            user_agent: self.user_agent.clone(),
            lang: self.lang.clone(),
        }
    }

    /// Appends the query parameters to `endpoint`.
    ///
    /// `num` asks for two results more than needed, since some links are
    /// dropped during extraction (ads, provider-internal links).
    pub fn search_url(&self, endpoint: &str) -> Result<Url> {
        let mut url = Url::parse(endpoint).map_err(|e|
            SearchError::invalid_query(&self.text, format!("endpoint {:?} is not a valid URL: {}", endpoint, e))
        )?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs
                .append_pair("q", &self.text)
                .append_pair("num", &(self.max_results + 2).to_string())
                .append_pair("hl", &self.lang)
                .append_pair("safe", if self.safe_search { "active" } else { "off" });
            if let Some(region) = &self.region {
                pairs.append_pair("gl", region);
            }
        }
        Ok(url)
    }
}
