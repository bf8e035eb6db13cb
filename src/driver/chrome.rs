//! Headless Chrome backend.
//!
//! `headless_chrome` is a blocking client, so every call into it runs on the
//! blocking thread pool. The calls are bounded by the timeout handed to the
//! session method, and the executor races them against the query deadline
//! on top of that.

use anyhow::{ anyhow, Context };
use headless_chrome::protocol::cdp::Page::AddScriptToEvaluateOnNewDocument;
use headless_chrome::{ Browser, LaunchOptions, Tab };
use std::ffi::OsString;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{ debug, info };

use super::{ classify_backend_error, DriverFailure, DriverSession, PageDriver, RawPage, SessionOptions };
use crate::extract;
use crate::profile::PageProfile;
use crate::stealth::StealthProfile;

const NON_STEALTH_WINDOW_SIZE: (u32, u32) = (1366, 768);

/// Launches one Chrome process per session.
#[derive(Debug, Clone)]
pub struct ChromeDriver {
    executable: Option<PathBuf>,
    sandbox: bool,
    idle_timeout: Duration,
}

impl Default for ChromeDriver {
    fn default() -> Self {
        ChromeDriver {
            executable: None,
            sandbox: true,
            idle_timeout: Duration::from_secs(120),
        }
    }
}

impl ChromeDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses the Chrome binary at `path` instead of auto-detecting one.
    pub fn executable(mut self, path: impl Into<PathBuf>) -> Self {
        self.executable = Some(path.into());
        self
    }

    /// Disabling the sandbox is needed when running as root in containers.
    pub fn sandbox(mut self, enabled: bool) -> Self {
        self.sandbox = enabled;
        self
    }

    /// How long the browser may go without any DevTools traffic before it
    /// is considered dead.
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }
}

/// A Chrome process with one tab. Dropping it kills the process.
pub struct ChromeSession {
    browser: Browser,
    tab: Arc<Tab>,
}

impl PageDriver for ChromeDriver {
    type Session = ChromeSession;

    async fn open(&self, options: &SessionOptions) -> Result<ChromeSession, DriverFailure> {
        let settings = self.clone();
        let options = options.clone();
        info!(headless = options.headless, stealth = options.stealth_mode, "launching Chrome session");

        tokio::task::spawn_blocking(move || launch(&settings, &options))
            .await
            .map_err(|e| DriverFailure::Launch(format!("launch task failed: {}", e)))?
            .map_err(|e| DriverFailure::Launch(format!("{:#}", e)))
    }
}

fn launch(settings: &ChromeDriver, options: &SessionOptions) -> anyhow::Result<ChromeSession> {
    let stealth = options.stealth_mode.then(|| StealthProfile::for_session(options));

    let args: Vec<OsString> = match &stealth {
        Some(profile) => profile.launch_args(&options.lang),
        None => vec![OsString::from(format!("--lang={}", options.lang))],
    };
    let window_size = stealth.as_ref().map_or(NON_STEALTH_WINDOW_SIZE, |profile| profile.window_size);

    let launch_options = LaunchOptions::default_builder()
        .headless(options.headless)
        .sandbox(settings.sandbox)
        .window_size(Some(window_size))
        .idle_browser_timeout(settings.idle_timeout)
        .path(settings.executable.clone())
        .args(args.iter().map(OsString::as_os_str).collect())
        .build()
        .map_err(|e| anyhow!("Failed to build launch options: {}", e))?;

    let browser = Browser::new(launch_options).context("Failed to start Chrome")?;
    let tab = browser.new_tab().context("Failed to open a tab")?;

    match (&stealth, &options.user_agent) {
        (Some(profile), _) => {
            tab.set_user_agent(
                &profile.user_agent,
                Some(&profile.accept_language),
                Some(&profile.platform)
            ).context("Failed to override the user agent")?;
            tab.call_method(AddScriptToEvaluateOnNewDocument {
                source: profile.init_script(),
                world_name: None,
                include_command_line_api: None,
                run_immediately: None,
            }).context("Failed to install the stealth script")?;
            debug!(user_agent = %profile.user_agent, ?window_size, "stealth profile applied");
        }
        (None, Some(user_agent)) => {
            tab.set_user_agent(user_agent, None, None).context("Failed to override the user agent")?;
        }
        (None, None) => {}
    }

    Ok(ChromeSession { browser, tab })
}

/// Runs a blocking tab operation off the async runtime.
async fn on_tab<T, F>(
    tab: &Arc<Tab>,
    what: &'static str,
    budget: Duration,
    otherwise: fn(String) -> DriverFailure,
    operation: F
) -> Result<T, DriverFailure>
    where T: Send + 'static, F: FnOnce(&Tab) -> anyhow::Result<T> + Send + 'static
{
    let tab = Arc::clone(tab);
    tokio::task::spawn_blocking(move || operation(&tab))
        .await
        .map_err(|e| DriverFailure::Session(format!("{} task failed: {}", what, e)))?
        .map_err(|e| classify_backend_error(what, format!("{:#}", e), budget, otherwise))
}

impl DriverSession for ChromeSession {
    async fn navigate(&self, url: &str, timeout: Duration) -> Result<(), DriverFailure> {
        let url = url.to_string();
        debug!(%url, "navigating");
        on_tab(&self.tab, "navigating", timeout, DriverFailure::Navigation, move |tab| {
            tab.set_default_timeout(timeout);
            tab.navigate_to(&url).context("Failed to navigate to URL")?;
            tab.wait_until_navigated().context("Page did not finish loading")?;
            Ok(())
        }).await
    }

    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> Result<(), DriverFailure> {
        let selector = selector.to_string();
        on_tab(&self.tab, "waiting for results", timeout, DriverFailure::Session, move |tab| {
            tab.wait_for_element_with_custom_timeout(&selector, timeout)
                .with_context(|| format!("Element {:?} never appeared", selector))?;
            Ok(())
        }).await
    }

    async fn extract(&self, profile: &PageProfile) -> Result<RawPage, DriverFailure> {
        let (url, html) = on_tab(
            &self.tab,
            "reading page content",
            Duration::ZERO,
            DriverFailure::Session,
            |tab| {
                let html = tab.get_content().context("Failed to get page content")?;
                Ok((tab.get_url(), html))
            }
        ).await?;
        debug!(%url, bytes = html.len(), "page content read");

        let profile = profile.clone();
        tokio::task::spawn_blocking(move || extract::parse_page(&html, &url, &profile))
            .await
            .map_err(|e| DriverFailure::Session(format!("extraction task failed: {}", e)))?
    }

    fn close(self) -> impl std::future::Future<Output = Result<(), DriverFailure>> + Send + 'static {
        async move {
            tokio::task::spawn_blocking(move || {
                let ChromeSession { browser, tab } = self;
                let closed = tab.close(true);
                drop(tab);
                drop(browser);
                closed.map(|_| ())
            })
                .await
                .map_err(|e| DriverFailure::Session(format!("close task failed: {}", e)))?
                .map_err(|e| DriverFailure::Session(format!("failed to close tab: {:#}", e)))
        }
    }
}
