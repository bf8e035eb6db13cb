//! # Config Module
//!
//! [`ScraperConfig`] holds the defaults a scraper applies to every search.
//! [`SearchOptions`] carries the optional per-call overrides that are layered
//! on top of them.

use serde::{ Deserialize, Serialize };
use url::Url;

use crate::profile::PageProfile;

pub const DEFAULT_ENDPOINT: &str = "https://www.google.com/search";
pub const DEFAULT_MAX_RESULTS: usize = 10;
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// Google will not return more than this many results for one page.
pub const MAX_RESULTS_LIMIT: usize = 100;

/// Longest query Google accepts.
pub const MAX_QUERY_LENGTH: usize = 2048;

/// Defaults applied to each search issued through a scraper.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScraperConfig {
    pub max_results: usize,
    /// Budget for the whole retrieval, in milliseconds.
    pub timeout_ms: u64,
    pub headless: bool,
    pub stealth_mode: bool,
    pub extract_answer: bool,
    /// Interface language, sent as `hl`.
    pub lang: String,
    /// Country bias, sent as `gl`.
    pub region: Option<String>,
    pub safe_search: bool,
    /// Fixed User-Agent. When `None` a realistic one is picked per session.
    pub user_agent: Option<String>,
    /// Search endpoint the query parameters are appended to.
    pub endpoint: String,
    pub profile: PageProfile,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        ScraperConfig {
            max_results: DEFAULT_MAX_RESULTS,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            headless: true,
            stealth_mode: true,
            extract_answer: true,
            lang: "en".to_string(),
            region: None,
            safe_search: false,
            user_agent: None,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            profile: PageProfile::default(),
        }
    }
}

impl ScraperConfig {
    /// Returns a copy of these defaults with every option set in `options`
    /// replacing the stored value.
    pub fn with_overrides(&self, options: &SearchOptions) -> ScraperConfig {
        let mut merged = self.clone();
        if let Some(max_results) = options.max_results {
            merged.max_results = max_results;
        }
        if let Some(timeout_ms) = options.timeout {
            merged.timeout_ms = timeout_ms;
        }
        if let Some(headless) = options.headless {
            merged.headless = headless;
        }
        if let Some(stealth_mode) = options.stealth_mode {
            merged.stealth_mode = stealth_mode;
        }
        if let Some(extract_answer) = options.extract_answer {
            merged.extract_answer = extract_answer;
        }
        if let Some(lang) = &options.lang {
            merged.lang = lang.clone();
        }
        if let Some(region) = &options.region {
            merged.region = Some(region.clone());
        }
        if let Some(safe_search) = options.safe_search {
            merged.safe_search = safe_search;
        }
        merged
    }

    /// Checks every option, returning a description of the first invalid one.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_results == 0 || self.max_results > MAX_RESULTS_LIMIT {
            return Err(
                format!(
                    "max_results must be between 1 and {} (Google's per-page `num` ceiling), got {}",
                    MAX_RESULTS_LIMIT,
                    self.max_results
                )
            );
        }
        if self.timeout_ms == 0 {
            return Err("timeout must be greater than 0 ms".to_string());
        }
        if self.lang.is_empty() || !self.lang.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err(format!("lang must be a language tag such as \"en\", got {:?}", self.lang));
        }
        if let Some(region) = &self.region {
            if region.len() != 2 || !region.chars().all(|c| c.is_ascii_alphabetic()) {
                return Err(format!("region must be a two-letter country code, got {:?}", region));
            }
        }
        if let Some(user_agent) = &self.user_agent {
            if user_agent.trim().is_empty() {
                return Err("user_agent must not be blank".to_string());
            }
        }
        match Url::parse(&self.endpoint) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            Ok(url) => {
                return Err(format!("endpoint must use http or https, got {}", url.scheme()));
            }
            Err(e) => {
                return Err(format!("endpoint {:?} is not a valid URL: {}", self.endpoint, e));
            }
        }
        self.profile.validate()
    }
}

/// Per-call overrides. Every field left as `None` falls back to the
/// scraper's stored default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchOptions {
    pub max_results: Option<usize>,
    /// Timeout in milliseconds.
    pub timeout: Option<u64>,
    pub headless: Option<bool>,
    pub stealth_mode: Option<bool>,
    pub extract_answer: Option<bool>,
    pub lang: Option<String>,
    pub region: Option<String>,
    pub safe_search: Option<bool>,
}

impl SearchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_results(mut self, max_results: usize) -> Self {
        self.max_results = Some(max_results);
        self
    }

    pub fn timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout = Some(timeout_ms);
        self
    }

    pub fn headless(mut self, headless: bool) -> Self {
        self.headless = Some(headless);
        self
    }

    pub fn stealth_mode(mut self, stealth_mode: bool) -> Self {
        self.stealth_mode = Some(stealth_mode);
        self
    }

    pub fn extract_answer(mut self, extract_answer: bool) -> Self {
        self.extract_answer = Some(extract_answer);
        self
    }

    pub fn lang(mut self, lang: impl Into<String>) -> Self {
        self.lang = Some(lang.into());
        self
    }

    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn safe_search(mut self, safe_search: bool) -> Self {
        self.safe_search = Some(safe_search);
        self
    }
}
