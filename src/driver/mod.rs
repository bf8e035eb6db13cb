//! # Driver Module
//!
//! A [`PageDriver`] launches sessions; a [`DriverSession`] is one live page
//! owned by exactly one query for its whole lifetime. Two backends ship with
//! the crate: [`ChromeDriver`], which drives a real headless Chrome, and
//! [`HttpDriver`], which fetches the result page without running scripts.

pub mod chrome;
pub mod http;

pub use chrome::{ ChromeDriver, ChromeSession };
pub use http::{ HttpDriver, HttpSession };

use std::future::Future;
use std::time::Duration;

use crate::profile::PageProfile;

/// How a session should be launched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOptions {
    pub headless: bool,
    /// Suppress automation flags and randomise fingerprint signals.
    pub stealth_mode: bool,
    /// Fixed User-Agent; a rotated one is used when `None`.
    pub user_agent: Option<String>,
    pub lang: String,
}

impl Default for SessionOptions {
    fn default() -> Self {
        SessionOptions {
            headless: true,
            stealth_mode: true,
            user_agent: None,
            lang: "en".to_string(),
        }
    }
}

/// Best-effort data read from a loaded page. Missing fields are left empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawPage {
    /// URL of the page after redirects.
    pub url: String,
    /// Organic result links in document order. May contain duplicates.
    pub links: Vec<String>,
    pub answer: Option<String>,
    /// Raw text of the result counter, e.g. "About 1,230,000 results".
    pub result_stats: Option<String>,
    /// Human-readable descriptions of every block heuristic that fired.
    pub block_markers: Vec<String>,
}

/// Failures reported by a driver. The executor turns them into
/// [`crate::SearchError`] values tagged with the query.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DriverFailure {
    #[error("failed to launch session: {0}")]
    Launch(String),

    #[error("navigation failed: {0}")]
    Navigation(String),

    #[error("timed out after {}ms while {what}", .elapsed.as_millis())]
    Timeout {
        what: String,
        elapsed: Duration,
    },

    #[error("session error: {0}")]
    Session(String),
}

impl DriverFailure {
    pub fn timeout(what: impl Into<String>, elapsed: Duration) -> Self {
        DriverFailure::Timeout { what: what.into(), elapsed }
    }
}

/// Launches sessions. Implementations must be cheap to share between
/// concurrent searches; every call to [`PageDriver::open`] yields an
/// independent session.
pub trait PageDriver: Send + Sync {
    type Session: DriverSession;

    fn open(
        &self,
        options: &SessionOptions
    ) -> impl Future<Output = Result<Self::Session, DriverFailure>> + Send;
}

/// One live browser (or HTTP) context.
///
/// Every method that waits takes the time it is allowed to spend. The
/// executor additionally races each call against its own deadline.
pub trait DriverSession: Send + Sync + 'static {
    fn navigate(
        &self,
        url: &str,
        timeout: Duration
    ) -> impl Future<Output = Result<(), DriverFailure>> + Send;

    /// Suspends until an element matching `selector` (a selector group is
    /// allowed) is present, or fails with [`DriverFailure::Timeout`].
    fn wait_for_selector(
        &self,
        selector: &str,
        timeout: Duration
    ) -> impl Future<Output = Result<(), DriverFailure>> + Send;

    fn extract(
        &self,
        profile: &PageProfile
    ) -> impl Future<Output = Result<RawPage, DriverFailure>> + Send;

    /// Tears the session down. Called exactly once per session.
    fn close(self) -> impl Future<Output = Result<(), DriverFailure>> + Send + 'static;
}

/// Sorts a driver backend's error text into a timeout or, failing that, the
/// failure built by `otherwise`.
pub(crate) fn classify_backend_error(
    what: &str,
    message: String,
    budget: Duration,
    otherwise: fn(String) -> DriverFailure
) -> DriverFailure {
    let lower = message.to_lowercase();
    if lower.contains("timeout") || lower.contains("timed out") || lower.contains("never came") {
        DriverFailure::timeout(what, budget)
    } else {
        otherwise(format!("{}: {}", what, message))
    }
}
