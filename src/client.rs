//! # Client Module
//!
//! [`GoogleSearchScraper`] is the configurable entry point. It keeps an
//! immutable set of defaults and, for every call, layers the per-call
//! [`SearchOptions`] on top, validates the outcome and hands it to the
//! [`QueryExecutor`].

use rand::Rng;
use std::time::Duration;
use tracing::warn;

use crate::config::{ ScraperConfig, SearchOptions };
use crate::driver::{ ChromeDriver, PageDriver };
use crate::error::Result;
use crate::executor::QueryExecutor;
use crate::profile::PageProfile;
use crate::query::SearchQuery;
use crate::result::SearchResult;

/// Searches Google through a [`PageDriver`], one session per call.
///
/// # Examples
///
/// ```no_run
/// use google_search_scraper::{ GoogleSearchScraper, SearchOptions };
///
/// # async fn run() -> google_search_scraper::Result<()> {
/// let scraper = GoogleSearchScraper::builder().max_results(5).timeout(20_000).build();
/// let result = scraper.search("rust async runtime", SearchOptions::new()).await?;
/// for url in result.urls() {
///     println!("{}", url);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct GoogleSearchScraper<D: PageDriver = ChromeDriver> {
    config: ScraperConfig,
    executor: QueryExecutor<D>,
}

impl GoogleSearchScraper<ChromeDriver> {
    pub fn builder() -> ScraperBuilder<ChromeDriver> {
        ScraperBuilder::default()
    }

    /// A Chrome-backed scraper with the given defaults.
    pub fn new(config: ScraperConfig) -> Self {
        Self::with_driver(config, ChromeDriver::default())
    }
}

impl Default for GoogleSearchScraper<ChromeDriver> {
    fn default() -> Self {
        Self::new(ScraperConfig::default())
    }
}

impl<D: PageDriver> GoogleSearchScraper<D> {
    pub fn with_driver(config: ScraperConfig, driver: D) -> Self {
        let executor = QueryExecutor::new(driver)
            .with_profile(config.profile.clone())
            .with_endpoint(config.endpoint.clone());
        GoogleSearchScraper { config, executor }
    }

    /// The stored defaults.
    pub fn config(&self) -> &ScraperConfig {
        &self.config
    }

    pub fn driver(&self) -> &D {
        self.executor.driver()
    }

    /// Runs one search. Options set in `options` override the stored
    /// defaults for this call only.
    pub async fn search(&self, query: &str, options: SearchOptions) -> Result<SearchResult> {
        let config = self.config.with_overrides(&options);
        let query = SearchQuery::from_config(query, &config)?;
        self.executor.execute(&query).await
    }

    /// Like [`GoogleSearchScraper::search`] but returns only the URLs.
    pub async fn search_urls(&self, query: &str, options: SearchOptions) -> Result<Vec<String>> {
        Ok(self.search(query, options).await?.into_urls())
    }

    /// Runs the search, retrying transient failures (timeouts and driver
    /// errors) according to `policy`. Blocked, unparseable and invalid
    /// searches fail on the first attempt.
    pub async fn search_with_retry(
        &self,
        query: &str,
        options: SearchOptions,
        policy: RetryPolicy
    ) -> Result<SearchResult> {
        let mut retries = 0;
        loop {
            match self.search(query, options.clone()).await {
                Ok(result) => {
                    return Ok(result);
                }
                Err(e) => {
                    if !e.is_transient() {
                        return Err(e);
                    }
                    if retries >= policy.max_retries {
                        warn!(max_retries = policy.max_retries, error = %e, "giving up after retries");
                        return Err(e);
                    }
                    let delay = policy.delay_for(retries);
                    warn!(
                        attempt = retries + 1,
                        max_retries = policy.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "transient search failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    retries += 1;
                }
            }
        }
    }
}

/// How [`GoogleSearchScraper::search_with_retry`] spaces out its attempts.
///
/// The delay before retry `n` (counting from zero) is
/// `base_delay * 2^n` plus a random jitter of up to `max_jitter`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_retries: 2,
            base_delay: Duration::from_secs(1),
            max_jitter: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32) -> Self {
        RetryPolicy { max_retries, ..Default::default() }
    }

    pub fn base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    pub fn max_jitter(mut self, jitter: Duration) -> Self {
        self.max_jitter = jitter;
        self
    }

    fn delay_for(&self, retry: u32) -> Duration {
        let backoff = self.base_delay.saturating_mul(2u32.saturating_pow(retry));
        let jitter_ms = self.max_jitter.as_millis() as u64;
        let jitter = if jitter_ms == 0 { 0 } else { rand::thread_rng().gen_range(0..=jitter_ms) };
        backoff.saturating_add(Duration::from_millis(jitter))
    }
}

/// Collects defaults for a [`GoogleSearchScraper`].
#[derive(Debug, Clone)]
pub struct ScraperBuilder<D = ChromeDriver> {
    config: ScraperConfig,
    driver: D,
}

impl Default for ScraperBuilder<ChromeDriver> {
    fn default() -> Self {
        ScraperBuilder { config: ScraperConfig::default(), driver: ChromeDriver::default() }
    }
}

impl<D: PageDriver> ScraperBuilder<D> {
    pub fn max_results(mut self, max_results: usize) -> Self {
        self.config.max_results = max_results;
        self
    }

    /// Timeout for each search, in milliseconds.
    pub fn timeout(mut self, timeout_ms: u64) -> Self {
        self.config.timeout_ms = timeout_ms;
        self
    }

    pub fn headless(mut self, headless: bool) -> Self {
        self.config.headless = headless;
        self
    }

    pub fn stealth_mode(mut self, stealth_mode: bool) -> Self {
        self.config.stealth_mode = stealth_mode;
        self
    }

    pub fn extract_answer(mut self, extract_answer: bool) -> Self {
        self.config.extract_answer = extract_answer;
        self
    }

    pub fn lang(mut self, lang: impl Into<String>) -> Self {
        self.config.lang = lang.into();
        self
    }

    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.config.region = Some(region.into());
        self
    }

    pub fn safe_search(mut self, safe_search: bool) -> Self {
        self.config.safe_search = safe_search;
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = Some(user_agent.into());
        self
    }

    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.config.endpoint = endpoint.into();
        self
    }

    pub fn profile(mut self, profile: PageProfile) -> Self {
        self.config.profile = profile;
        self
    }

    /// Replaces every default at once.
    pub fn config(mut self, config: ScraperConfig) -> Self {
        self.config = config;
        self
    }

    /// Swaps the backend, keeping the defaults collected so far.
    pub fn driver<E: PageDriver>(self, driver: E) -> ScraperBuilder<E> {
        ScraperBuilder { config: self.config, driver }
    }

    /// Invalid defaults are reported as
    /// [`SearchError::InvalidQuery`](crate::SearchError::InvalidQuery) by
    /// each search.
    pub fn build(self) -> GoogleSearchScraper<D> {
        GoogleSearchScraper::with_driver(self.config, self.driver)
    }
}
