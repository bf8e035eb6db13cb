//! Shared test doubles for the integration tests.

use google_search_scraper::{ DriverFailure, DriverSession, PageDriver, PageProfile, RawPage, SessionOptions };
use std::future::Future;
use std::sync::atomic::{ AtomicUsize, Ordering };
use std::sync::{ Arc, Mutex };
use std::time::Duration;

pub const SEARCH_PAGE_URL: &str = "https://www.google.com/search?q=python+tutorial";

/// Call counters shared between a [`FakeDriver`] and all of its sessions.
#[derive(Debug, Clone, Default)]
pub struct Counters {
    opens: Arc<AtomicUsize>,
    navigations: Arc<AtomicUsize>,
    waits: Arc<AtomicUsize>,
    extracts: Arc<AtomicUsize>,
    closes: Arc<AtomicUsize>,
}

#[allow(dead_code)]
impl Counters {
    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn navigations(&self) -> usize {
        self.navigations.load(Ordering::SeqCst)
    }

    pub fn waits(&self) -> usize {
        self.waits.load(Ordering::SeqCst)
    }

    pub fn extracts(&self) -> usize {
        self.extracts.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

/// A scripted driver. Every session serves the same [`RawPage`] after the
/// configured delays, which run on tokio's clock so paused-time tests
/// finish instantly.
#[derive(Debug, Clone)]
pub struct FakeDriver {
    page: RawPage,
    navigate_delay: Duration,
    wait_delay: Duration,
    open_failure: Option<DriverFailure>,
    open_failures_left: Arc<AtomicUsize>,
    navigate_failure: Option<DriverFailure>,
    pub counters: Counters,
    pub navigated: Arc<Mutex<Vec<String>>>,
    pub sessions: Arc<Mutex<Vec<SessionOptions>>>,
}

#[allow(dead_code)]
impl FakeDriver {
    pub fn new(page: RawPage) -> Self {
        FakeDriver {
            page,
            navigate_delay: Duration::ZERO,
            wait_delay: Duration::ZERO,
            open_failure: None,
            open_failures_left: Arc::new(AtomicUsize::new(0)),
            navigate_failure: None,
            counters: Counters::default(),
            navigated: Arc::new(Mutex::new(Vec::new())),
            sessions: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn navigate_delay(mut self, delay: Duration) -> Self {
        self.navigate_delay = delay;
        self
    }

    pub fn wait_delay(mut self, delay: Duration) -> Self {
        self.wait_delay = delay;
        self
    }

    /// The first `times` calls to `open` fail with `failure`.
    pub fn fail_open(mut self, failure: DriverFailure, times: usize) -> Self {
        self.open_failure = Some(failure);
        self.open_failures_left = Arc::new(AtomicUsize::new(times));
        self
    }

    pub fn fail_navigation(mut self, failure: DriverFailure) -> Self {
        self.navigate_failure = Some(failure);
        self
    }

    pub fn navigated_urls(&self) -> Vec<String> {
        self.navigated.lock().unwrap().clone()
    }

    pub fn session_options(&self) -> Vec<SessionOptions> {
        self.sessions.lock().unwrap().clone()
    }
}

pub struct FakeSession {
    driver: FakeDriver,
}

impl PageDriver for FakeDriver {
    type Session = FakeSession;

    async fn open(&self, options: &SessionOptions) -> Result<FakeSession, DriverFailure> {
        self.counters.opens.fetch_add(1, Ordering::SeqCst);
        self.sessions.lock().unwrap().push(options.clone());
        if let Some(failure) = &self.open_failure {
            let left = self.open_failures_left.load(Ordering::SeqCst);
            if left > 0 {
                self.open_failures_left.store(left - 1, Ordering::SeqCst);
                return Err(failure.clone());
            }
        }
        Ok(FakeSession { driver: self.clone() })
    }
}

impl DriverSession for FakeSession {
    async fn navigate(&self, url: &str, _timeout: Duration) -> Result<(), DriverFailure> {
        self.driver.counters.navigations.fetch_add(1, Ordering::SeqCst);
        self.driver.navigated.lock().unwrap().push(url.to_string());
        tokio::time::sleep(self.driver.navigate_delay).await;
        match &self.driver.navigate_failure {
            Some(failure) => Err(failure.clone()),
            None => Ok(()),
        }
    }

    async fn wait_for_selector(&self, _selector: &str, _timeout: Duration) -> Result<(), DriverFailure> {
        self.driver.counters.waits.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.driver.wait_delay).await;
        Ok(())
    }

    async fn extract(&self, _profile: &PageProfile) -> Result<RawPage, DriverFailure> {
        self.driver.counters.extracts.fetch_add(1, Ordering::SeqCst);
        Ok(self.driver.page.clone())
    }

    fn close(self) -> impl Future<Output = Result<(), DriverFailure>> + Send + 'static {
        self.driver.counters.closes.fetch_add(1, Ordering::SeqCst);
        async { Ok(()) }
    }
}

/// A result page with the given organic links and the usual counter.
#[allow(dead_code)]
pub fn result_page(links: &[&str]) -> RawPage {
    RawPage {
        url: SEARCH_PAGE_URL.to_string(),
        links: links.iter().map(|link| link.to_string()).collect(),
        answer: None,
        result_stats: Some("About 1,230,000 results (0.42 seconds)".to_string()),
        block_markers: Vec::new(),
    }
}

/// A CAPTCHA interstitial.
#[allow(dead_code)]
pub fn captcha_page() -> RawPage {
    RawPage {
        url: "https://www.google.com/sorry/index?continue=https://www.google.com/search".to_string(),
        block_markers: vec!["selector form#captcha-form".to_string()],
        ..Default::default()
    }
}

/// Wraps a real driver and counts opened and closed sessions.
#[allow(dead_code)]
#[derive(Debug, Clone)]
pub struct Counted<D> {
    inner: D,
    pub counters: Counters,
}

#[allow(dead_code)]
impl<D: PageDriver> Counted<D> {
    pub fn new(inner: D) -> Self {
        Counted { inner, counters: Counters::default() }
    }
}

#[allow(dead_code)]
pub struct CountedSession<S> {
    inner: S,
    counters: Counters,
}

impl<D: PageDriver> PageDriver for Counted<D> {
    type Session = CountedSession<D::Session>;

    async fn open(&self, options: &SessionOptions) -> Result<Self::Session, DriverFailure> {
        self.counters.opens.fetch_add(1, Ordering::SeqCst);
        let inner = self.inner.open(options).await?;
        Ok(CountedSession { inner, counters: self.counters.clone() })
    }
}

impl<S: DriverSession> DriverSession for CountedSession<S> {
    async fn navigate(&self, url: &str, timeout: Duration) -> Result<(), DriverFailure> {
        self.counters.navigations.fetch_add(1, Ordering::SeqCst);
        self.inner.navigate(url, timeout).await
    }

    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> Result<(), DriverFailure> {
        self.counters.waits.fetch_add(1, Ordering::SeqCst);
        self.inner.wait_for_selector(selector, timeout).await
    }

    async fn extract(&self, profile: &PageProfile) -> Result<RawPage, DriverFailure> {
        self.counters.extracts.fetch_add(1, Ordering::SeqCst);
        self.inner.extract(profile).await
    }

    fn close(self) -> impl Future<Output = Result<(), DriverFailure>> + Send + 'static {
        self.counters.closes.fetch_add(1, Ordering::SeqCst);
        self.inner.close()
    }
}
