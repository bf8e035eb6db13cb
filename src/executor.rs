//! # Executor Module
//!
//! Runs one [`SearchQuery`] end to end against a [`PageDriver`]:
//!
//! ```text
//! Init -> Navigating -> WaitingForResults -> Extracting -> Done
//!            \                 \                  \
//!             +-----------------+------------------+--> Failed
//! ```
//!
//! The whole run shares a single deadline derived from the query timeout.
//! The session opened for the query is closed exactly once on every path,
//! including when the caller drops the future half way through.

use std::fmt;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{ debug, info, warn };

use crate::config::DEFAULT_ENDPOINT;
use crate::driver::{ DriverFailure, DriverSession, PageDriver };
use crate::error::{ Result, SearchError };
use crate::extract;
use crate::profile::PageProfile;
use crate::query::SearchQuery;
use crate::result::SearchResult;

/// How long a session may take to shut down once the query is finished.
/// Not charged against the query timeout.
pub const CLOSE_GRACE: Duration = Duration::from_secs(5);

/// Where a run currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Init,
    Navigating,
    WaitingForResults,
    Extracting,
    Done,
    Failed,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Phase::Init => "INIT",
            Phase::Navigating => "NAVIGATING",
            Phase::WaitingForResults => "WAITING_FOR_RESULTS",
            Phase::Extracting => "EXTRACTING",
            Phase::Done => "DONE",
            Phase::Failed => "FAILED",
        };
        f.write_str(name)
    }
}

/// Executes queries one session at a time.
#[derive(Debug, Clone)]
pub struct QueryExecutor<D> {
    driver: D,
    profile: PageProfile,
    endpoint: String,
}

impl<D: PageDriver> QueryExecutor<D> {
    pub fn new(driver: D) -> Self {
        QueryExecutor {
            driver,
            profile: PageProfile::default(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
        }
    }

    pub fn with_profile(mut self, profile: PageProfile) -> Self {
        self.profile = profile;
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn profile(&self) -> &PageProfile {
        &self.profile
    }

    /// Runs `query` to completion.
    ///
    /// Fails with [`SearchError::Timeout`] when the deadline passes before
    /// results are extracted, [`SearchError::Blocked`] when the provider
    /// serves a CAPTCHA or consent page, [`SearchError::Parse`] when the page
    /// loaded but no organic result could be read, and
    /// [`SearchError::Driver`] for any other session failure.
    pub async fn execute(&self, query: &SearchQuery) -> Result<SearchResult> {
        let started = Instant::now();
        let deadline = started + query.timeout();
        let mut run = Run { query, phase: Phase::Init, deadline };

        let url = query.search_url(&self.endpoint)?;
        debug!(query = %query.text(), %url, "search url built");
        info!(max_results = query.max_results(), timeout_ms = query.timeout().as_millis() as u64, "starting search");

        let session = run
            .within("opening a session", self.driver.open(&query.session_options())).await
            .map_err(|failure| run.fail(failure))?;
        let guard = SessionGuard::new(session);

        let outcome = self.drive(&mut run, guard.session(), url.as_str()).await;
        guard.release().await;

        let (links, answer, stats) = outcome?;
        let search_time = started.elapsed().as_secs_f64();
        let total_results = stats.as_deref().map(extract::parse_total_results).unwrap_or(0);

        run.enter(Phase::Done);
        info!(urls = links.len(), total_results, search_time, "search finished");
        Ok(SearchResult::new(query.text().to_string(), links, answer, total_results, search_time))
    }

    async fn drive<S: DriverSession>(
        &self,
        run: &mut Run<'_>,
        session: &S,
        url: &str
    ) -> Result<(Vec<String>, Option<String>, Option<String>)> {
        run.enter(Phase::Navigating);
        let budget = run.remaining();
        run.within("navigating", session.navigate(url, budget)).await.map_err(|f| run.fail(f))?;

        run.enter(Phase::WaitingForResults);
        let budget = run.remaining();
        run
            .within("waiting for results", session.wait_for_selector(&self.profile.ready_selector, budget)).await
            .map_err(|f| run.fail(f))?;

        run.enter(Phase::Extracting);
        let page = run.within("extracting results", session.extract(&self.profile)).await.map_err(|f| run.fail(f))?;

        if let Some(reason) = self.profile.block_reason(&page) {
            run.enter(Phase::Failed);
            warn!(%reason, "search was blocked");
            return Err(SearchError::blocked(run.query.text(), reason));
        }

        let found = page.links.len();
        let links = extract::dedupe_links(page.links, run.query.max_results());
        debug!(found, kept = links.len(), "organic links extracted");
        if links.is_empty() {
            run.enter(Phase::Failed);
            return Err(SearchError::parse(run.query.text(), format!("no organic results found on {}", page.url)));
        }

        let answer = if run.query.extract_answer() { page.answer } else { None };
        Ok((links, answer, page.result_stats))
    }
}

/// Bookkeeping for one execution.
struct Run<'q> {
    query: &'q SearchQuery,
    phase: Phase,
    deadline: Instant,
}

impl Run<'_> {
    fn enter(&mut self, phase: Phase) {
        debug!(from = %self.phase, to = %phase, "phase change");
        self.phase = phase;
    }

    fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    /// Races `step` against the run deadline.
    async fn within<T>(
        &self,
        what: &str,
        step: impl Future<Output = std::result::Result<T, DriverFailure>>
    ) -> std::result::Result<T, DriverFailure> {
        let budget = self.remaining();
        if budget.is_zero() {
            return Err(DriverFailure::timeout(what, self.query.timeout()));
        }
        match tokio::time::timeout_at(self.deadline, step).await {
            Ok(result) => result,
            Err(_) => Err(DriverFailure::timeout(what, self.query.timeout())),
        }
    }

    /// Records the failure and converts it into the error for this query.
    fn fail(&mut self, failure: DriverFailure) -> SearchError {
        let phase = self.phase;
        self.enter(Phase::Failed);
        warn!(%phase, error = %failure, "search failed");
        let text = self.query.text();
        match failure {
            DriverFailure::Timeout { .. } => SearchError::timeout(text, failure.to_string()),
            other => SearchError::driver(text, other.to_string()),
        }
    }
}

/// Owns a session and makes sure it is closed exactly once.
///
/// [`SessionGuard::release`] closes it in place. If the guard is dropped
/// without being released, which happens when the search future is
/// cancelled, the close is handed to the runtime instead.
pub struct SessionGuard<S: DriverSession> {
    session: Option<S>,
}

impl<S: DriverSession> SessionGuard<S> {
    pub fn new(session: S) -> Self {
        SessionGuard { session: Some(session) }
    }

    pub fn session(&self) -> &S {
        // Only `release` and `drop` take the session, and both consume the guard.
        self.session.as_ref().expect("session guard already released")
    }

    /// Closes the session, logging rather than returning any failure.
    pub async fn release(mut self) {
        if let Some(session) = self.session.take() {
            close_quietly(session).await;
        }
    }
}

impl<S: DriverSession> Drop for SessionGuard<S> {
    fn drop(&mut self) {
        if let Some(session) = self.session.take() {
            match tokio::runtime::Handle::try_current() {
                Ok(handle) => {
                    debug!("search abandoned, closing session in the background");
                    handle.spawn(close_quietly(session));
                }
                Err(_) => {
                    warn!("no async runtime available to close an abandoned session");
                }
            }
        }
    }
}

async fn close_quietly<S: DriverSession>(session: S) {
    match tokio::time::timeout(CLOSE_GRACE, session.close()).await {
        Ok(Ok(())) => debug!("session closed"),
        Ok(Err(e)) => warn!(error = %e, "failed to close session"),
        Err(_) => warn!(grace_ms = CLOSE_GRACE.as_millis() as u64, "session did not close in time"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScraperConfig;
    use crate::driver::{ RawPage, SessionOptions };
    use crate::error::ErrorKind;
    use std::sync::atomic::{ AtomicUsize, Ordering };
    use std::sync::Arc;

    #[derive(Clone, Default)]
    struct StubDriver {
        page: RawPage,
        fail_open: bool,
        closes: Arc<AtomicUsize>,
    }

    struct StubSession {
        page: RawPage,
        closes: Arc<AtomicUsize>,
    }

    impl PageDriver for StubDriver {
        type Session = StubSession;

        async fn open(&self, _options: &SessionOptions) -> std::result::Result<StubSession, DriverFailure> {
            if self.fail_open {
                return Err(DriverFailure::Launch("no browser".to_string()));
            }
            Ok(StubSession { page: self.page.clone(), closes: Arc::clone(&self.closes) })
        }
    }

    impl DriverSession for StubSession {
        async fn navigate(&self, _url: &str, _timeout: Duration) -> std::result::Result<(), DriverFailure> {
            Ok(())
        }

        async fn wait_for_selector(&self, _selector: &str, _timeout: Duration) -> std::result::Result<(), DriverFailure> {
            Ok(())
        }

        async fn extract(&self, _profile: &PageProfile) -> std::result::Result<RawPage, DriverFailure> {
            Ok(self.page.clone())
        }

        fn close(self) -> impl Future<Output = std::result::Result<(), DriverFailure>> + Send + 'static {
            self.closes.fetch_add(1, Ordering::SeqCst);
            async { Ok(()) }
        }
    }

    fn page(links: &[&str]) -> RawPage {
        RawPage {
            url: "https://www.google.com/search?q=rust".to_string(),
            links: links.iter().map(|l| l.to_string()).collect(),
            answer: Some("A systems programming language.".to_string()),
            result_stats: Some("About 1,230,000 results (0.31 seconds)".to_string()),
            block_markers: Vec::new(),
        }
    }

    #[test]
    fn phase_names() {
        assert_eq!(Phase::WaitingForResults.to_string(), "WAITING_FOR_RESULTS");
        assert_eq!(Phase::Failed.to_string(), "FAILED");
    }

    #[tokio::test]
    async fn successful_run_builds_result() {
        let driver = StubDriver { page: page(&["https://a.example/", "https://b.example/"]), ..Default::default() };
        let closes = Arc::clone(&driver.closes);
        let executor = QueryExecutor::new(driver);

        let result = executor.execute(&SearchQuery::new("rust").unwrap()).await.unwrap();
        assert_eq!(result.urls(), ["https://a.example/", "https://b.example/"]);
        assert_eq!(result.answer(), Some("A systems programming language."));
        assert_eq!(result.total_results(), 1_230_000);
        assert!(result.search_time() >= 0.0);
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn answer_dropped_when_not_requested() {
        let driver = StubDriver { page: page(&["https://a.example/"]), ..Default::default() };
        let config = ScraperConfig { extract_answer: false, ..Default::default() };
        let query = SearchQuery::from_config("rust", &config).unwrap();
        let result = QueryExecutor::new(driver).execute(&query).await.unwrap();
        assert_eq!(result.answer(), None);
    }

    #[tokio::test]
    async fn launch_failure_is_a_driver_error_without_close() {
        let driver = StubDriver { fail_open: true, ..Default::default() };
        let closes = Arc::clone(&driver.closes);
        let err = QueryExecutor::new(driver).execute(&SearchQuery::new("rust").unwrap()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Driver);
        assert!(err.message().contains("no browser"));
        assert_eq!(closes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn no_links_is_a_parse_error() {
        let driver = StubDriver { page: page(&[]), ..Default::default() };
        let closes = Arc::clone(&driver.closes);
        let err = QueryExecutor::new(driver).execute(&SearchQuery::new("rust").unwrap()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Parse);
        assert_eq!(err.query(), "rust");
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn invalid_endpoint_fails_before_opening() {
        let driver = StubDriver { fail_open: true, ..Default::default() };
        let executor = QueryExecutor::new(driver).with_endpoint("not a url");
        let err = executor.execute(&SearchQuery::new("rust").unwrap()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidQuery);
    }
}
