//! Single-query Google search retrieval.
//!
//! A search opens one browser (or HTTP) session, loads the result page,
//! waits for it to render, extracts the organic result URLs, the featured
//! answer and the estimated result count, and closes the session again.
//! Every failure is reported as one [`SearchError`] tagged with the query.
//!
//! ```no_run
//! use google_search_scraper::{ search, SearchOptions };
//!
//! # async fn run() -> google_search_scraper::Result<()> {
//! let result = search("python tutorial", SearchOptions::new().max_results(5)).await?;
//! println!("{} ({} results)", result.query(), result.total_results());
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod driver;
pub mod error;
pub mod executor;
pub mod extract;
pub mod profile;
pub mod query;
pub mod result;
pub mod stealth;
pub mod user_agents;

pub use client::{ GoogleSearchScraper, RetryPolicy, ScraperBuilder };
pub use config::{ ScraperConfig, SearchOptions };
pub use driver::{ ChromeDriver, DriverFailure, DriverSession, HttpDriver, PageDriver, RawPage, SessionOptions };
pub use error::{ ErrorKind, Result, SearchError };
pub use executor::{ Phase, QueryExecutor };
pub use profile::{ BlockRules, PageProfile };
pub use query::SearchQuery;
pub use result::SearchResult;

/// Searches with the default configuration and a headless Chrome session.
pub async fn search(query: &str, options: SearchOptions) -> Result<SearchResult> {
    GoogleSearchScraper::new(ScraperConfig::default()).search(query, options).await
}

/// Like [`search`] but returns only the result URLs.
pub async fn search_urls(query: &str, options: SearchOptions) -> Result<Vec<String>> {
    GoogleSearchScraper::new(ScraperConfig::default()).search_urls(query, options).await
}
