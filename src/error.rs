//! # Error Module
//!
//! Every failure of a search is reported as exactly one [`SearchError`].
//! Each variant carries the query that was being executed and a message
//! meant for humans. Cookies, session tokens and page bodies never end up
//! in an error.

use std::fmt;

/// The failure taxonomy for a single search.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SearchError {
    /// The query or one of its options was rejected before any browser or
    /// network activity took place.
    #[error("invalid query {query:?}: {message}")]
    InvalidQuery { query: String, message: String },

    /// The configured timeout elapsed before the results rendered.
    #[error("search for {query:?} timed out: {message}")]
    Timeout { query: String, message: String },

    /// The provider answered with a CAPTCHA, consent or block page.
    #[error("search for {query:?} was blocked: {message}")]
    Blocked { query: String, message: String },

    /// The page loaded but the expected result markers were missing.
    #[error("could not parse results for {query:?}: {message}")]
    Parse { query: String, message: String },

    /// The browser session failed to start, crashed or lost its connection.
    #[error("driver failure while searching {query:?}: {message}")]
    Driver { query: String, message: String },
}

/// Discriminant of a [`SearchError`], useful for matching without
/// destructuring and for stable names in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidQuery,
    Timeout,
    Blocked,
    Parse,
    Driver,
}

impl ErrorKind {
    /// Stable, human-readable name of the error kind.
    pub fn name(&self) -> &'static str {
        match self {
            Self::InvalidQuery => "InvalidQueryError",
            Self::Timeout => "TimeoutError",
            Self::Blocked => "BlockedError",
            Self::Parse => "ParseError",
            Self::Driver => "DriverError",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl SearchError {
    pub fn invalid_query(query: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidQuery { query: query.into(), message: message.into() }
    }

    pub fn timeout(query: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Timeout { query: query.into(), message: message.into() }
    }

    pub fn blocked(query: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Blocked { query: query.into(), message: message.into() }
    }

    pub fn parse(query: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Parse { query: query.into(), message: message.into() }
    }

    pub fn driver(query: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Driver { query: query.into(), message: message.into() }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidQuery { .. } => ErrorKind::InvalidQuery,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::Blocked { .. } => ErrorKind::Blocked,
            Self::Parse { .. } => ErrorKind::Parse,
            Self::Driver { .. } => ErrorKind::Driver,
        }
    }

    /// The query that was being executed when the error occurred.
    pub fn query(&self) -> &str {
        match self {
            Self::InvalidQuery { query, .. }
            | Self::Timeout { query, .. }
            | Self::Blocked { query, .. }
            | Self::Parse { query, .. }
            | Self::Driver { query, .. } => query,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::InvalidQuery { message, .. }
            | Self::Timeout { message, .. }
            | Self::Blocked { message, .. }
            | Self::Parse { message, .. }
            | Self::Driver { message, .. } => message,
        }
    }

    /// Whether retrying the same query later has a reasonable chance to
    /// succeed.
    ///
    /// Timeouts and driver failures are transient. A block page means the
    /// request rate or stealth configuration has to change first, a parse
    /// failure means the selectors are stale, and an invalid query will stay
    /// invalid.
    pub fn is_transient(&self) -> bool {
        matches!(self.kind(), ErrorKind::Timeout | ErrorKind::Driver)
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, SearchError>;
