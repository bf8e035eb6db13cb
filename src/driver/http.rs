//! Plain HTTP backend.
//!
//! Fetches the result page with `reqwest` and parses it as served, without
//! running any scripts. Useful where no Chrome binary is available, and as a
//! fast path for endpoints that render server-side.

use reqwest::header::{ HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE };
use reqwest::Client;
use std::sync::Mutex;
use std::time::Duration;
use tracing::debug;

use super::{ DriverFailure, DriverSession, PageDriver, RawPage, SessionOptions };
use crate::extract;
use crate::profile::PageProfile;
use crate::user_agents;

const CLIENT_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Builds a cookie-keeping HTTP client per session.
#[derive(Debug, Clone)]
pub struct HttpDriver {
    ssl_verify: bool,
    proxy: Option<String>,
}

impl Default for HttpDriver {
    fn default() -> Self {
        HttpDriver { ssl_verify: true, proxy: None }
    }
}

impl HttpDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ssl_verify(mut self, verify: bool) -> Self {
        self.ssl_verify = verify;
        self
    }

    /// Routes every request through `proxy_url`.
    pub fn proxy(mut self, proxy_url: impl Into<String>) -> Self {
        self.proxy = Some(proxy_url.into());
        self
    }
}

impl PageDriver for HttpDriver {
    type Session = HttpSession;

    async fn open(&self, options: &SessionOptions) -> Result<HttpSession, DriverFailure> {
        let user_agent = match (&options.user_agent, options.stealth_mode) {
            (Some(user_agent), _) => user_agent.clone(),
            (None, true) => user_agents::random_user_agent().to_string(),
            (None, false) => CLIENT_USER_AGENT.to_string(),
        };

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("text/html,application/xhtml+xml"));
        let accept_language = HeaderValue::from_str(&user_agents::accept_language(&options.lang)).map_err(|e|
            DriverFailure::Launch(format!("invalid language {:?}: {}", options.lang, e))
        )?;
        headers.insert(ACCEPT_LANGUAGE, accept_language);

        let client_builder = Client::builder()
            .cookie_store(true)
            .user_agent(user_agent)
            .default_headers(headers)
            .danger_accept_invalid_certs(!self.ssl_verify);

        let client_builder = if let Some(proxy_url) = &self.proxy {
            let proxy = reqwest::Proxy::all(proxy_url)
                .map_err(|e| DriverFailure::Launch(format!("invalid proxy {:?}: {}", proxy_url, e)))?;
            client_builder.proxy(proxy)
        } else {
            client_builder
        };

        let client = client_builder.build().map_err(|e| DriverFailure::Launch(e.to_string()))?;
        Ok(HttpSession { client, page: Mutex::new(None) })
    }
}

#[derive(Debug, Clone)]
struct LoadedPage {
    url: String,
    html: String,
}

/// One HTTP client plus the last page it loaded.
pub struct HttpSession {
    client: Client,
    page: Mutex<Option<LoadedPage>>,
}

impl HttpSession {
    fn loaded(&self) -> Result<LoadedPage, DriverFailure> {
        self.page
            .lock()
            .map_err(|_| DriverFailure::Session("page state lock poisoned".to_string()))?
            .clone()
            .ok_or_else(|| DriverFailure::Session("no page has been loaded".to_string()))
    }

    fn store(&self, page: LoadedPage) -> Result<(), DriverFailure> {
        let mut slot = self.page
            .lock()
            .map_err(|_| DriverFailure::Session("page state lock poisoned".to_string()))?;
        *slot = Some(page);
        Ok(())
    }

    #[cfg(test)]
    fn with_page(url: &str, html: &str) -> Self {
        HttpSession {
            client: Client::new(),
            page: Mutex::new(Some(LoadedPage { url: url.to_string(), html: html.to_string() })),
        }
    }
}

fn request_failure(error: reqwest::Error, timeout: Duration) -> DriverFailure {
    if error.is_timeout() {
        DriverFailure::timeout("navigating", timeout)
    } else {
        DriverFailure::Navigation(error.to_string())
    }
}

impl DriverSession for HttpSession {
    async fn navigate(&self, url: &str, timeout: Duration) -> Result<(), DriverFailure> {
        let response = self.client
            .get(url)
            .timeout(timeout)
            .send().await
            .map_err(|e| request_failure(e, timeout))?;

        // Block and consent pages come back as 4xx and still need parsing.
        let status = response.status();
        if status.is_server_error() {
            return Err(DriverFailure::Navigation(format!("server responded with {}", status)));
        }

        let final_url = response.url().to_string();
        let html = response.text().await.map_err(|e| request_failure(e, timeout))?;
        debug!(%status, url = %final_url, bytes = html.len(), "result page fetched");

        self.store(LoadedPage { url: final_url, html })
    }

    /// The fetched document never changes, so a selector that is absent
    /// now will never appear and the wait fails straight away.
    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> Result<(), DriverFailure> {
        let page = self.loaded()?;
        if extract::contains_selector(&page.html, selector)? {
            Ok(())
        } else {
            Err(DriverFailure::timeout(format!("waiting for {:?}", selector), timeout))
        }
    }

    async fn extract(&self, profile: &PageProfile) -> Result<RawPage, DriverFailure> {
        let page = self.loaded()?;
        extract::parse_page(&page.html, &page.url, profile)
    }

    fn close(self) -> impl std::future::Future<Output = Result<(), DriverFailure>> + Send + 'static {
        async move {
            drop(self);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use std::io::Write;

    const PAGE: &str =
        r#"<html><body><div id="search">
        <div class="g"><a href="https://www.rust-lang.org/"><h3>Rust</h3></a></div>
        <div class="g"><a href="https://doc.rust-lang.org/book/"><h3>The Book</h3></a></div>
    </div><div id="result-stats">About 5,000 results</div></body></html>"#;

    #[tokio::test]
    async fn wait_succeeds_when_selector_present() {
        let session = HttpSession::with_page("https://www.google.com/search?q=rust", PAGE);
        session.wait_for_selector("#search", Duration::from_secs(1)).await.unwrap();
    }

    #[tokio::test]
    async fn wait_times_out_when_selector_absent() {
        let session = HttpSession::with_page("https://www.google.com/search?q=rust", PAGE);
        let err = session.wait_for_selector("#rso", Duration::from_secs(1)).await.unwrap_err();
        assert!(matches!(err, DriverFailure::Timeout { .. }));
    }

    #[tokio::test]
    async fn extract_before_navigate_is_a_session_error() {
        let session = HttpDriver::new().open(&SessionOptions::default()).await.unwrap();
        let err = session.extract(&PageProfile::default()).await.unwrap_err();
        assert!(matches!(err, DriverFailure::Session(_)));
    }

    #[tokio::test]
    async fn navigate_sends_configured_headers_and_keeps_page() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/search")
            .match_query(Matcher::UrlEncoded("q".into(), "rust".into()))
            .match_header("user-agent", "TestAgent/1.0")
            .match_header("accept-language", "de,en;q=0.9")
            .with_status(200)
            .with_header("content-type", "text/html; charset=utf-8")
            .with_body(PAGE)
            .create_async().await;

        let options = SessionOptions {
            user_agent: Some("TestAgent/1.0".to_string()),
            lang: "de".to_string(),
            ..Default::default()
        };
        let session = HttpDriver::new().open(&options).await.unwrap();
        let url = format!("{}/search?q=rust", server.url());
        session.navigate(&url, Duration::from_secs(5)).await.unwrap();

        let page = session.extract(&PageProfile::default()).await.unwrap();
        mock.assert_async().await;
        assert_eq!(page.url, url);
        assert_eq!(page.links, vec!["https://www.rust-lang.org/", "https://doc.rust-lang.org/book/"]);
        assert_eq!(page.result_stats.as_deref(), Some("About 5,000 results"));
        session.close().await.unwrap();
    }

    #[tokio::test]
    async fn server_errors_fail_navigation() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server.mock("GET", "/search").with_status(503).create_async().await;

        let session = HttpDriver::new().open(&SessionOptions::default()).await.unwrap();
        let err = session
            .navigate(&format!("{}/search", server.url()), Duration::from_secs(5)).await
            .unwrap_err();
        assert!(matches!(err, DriverFailure::Navigation(_)));
    }

    #[tokio::test]
    async fn slow_responses_fail_with_timeout() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/search")
            .with_status(200)
            .with_chunked_body(|w| {
                std::thread::sleep(Duration::from_secs(2));
                w.write_all(PAGE.as_bytes())
            })
            .create_async().await;

        let session = HttpDriver::new().open(&SessionOptions::default()).await.unwrap();
        let err = session
            .navigate(&format!("{}/search", server.url()), Duration::from_millis(200)).await
            .unwrap_err();
        assert!(matches!(err, DriverFailure::Timeout { .. }), "{:?}", err);
    }

    #[tokio::test]
    async fn block_pages_are_kept_for_inspection() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/search")
            .with_status(429)
            .with_body(
                "<html><body><form id=\"captcha-form\"></form>Our systems have detected unusual traffic</body></html>"
            )
            .create_async().await;

        let session = HttpDriver::new().open(&SessionOptions::default()).await.unwrap();
        session.navigate(&format!("{}/search", server.url()), Duration::from_secs(5)).await.unwrap();
        let page = session.extract(&PageProfile::default()).await.unwrap();
        assert!(!page.block_markers.is_empty());
    }
}
