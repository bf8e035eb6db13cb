//! # Page Profile Module
//!
//! Everything that depends on the provider's markup lives here as data: the
//! selectors used to find organic results, the featured answer and the result
//! counter, plus the heuristics that recognise CAPTCHA and consent pages.
//! Google changes its layout often, so none of this is hard-wired into the
//! executor.

use scraper::Selector;
use serde::{ Deserialize, Serialize };
use url::Url;

use crate::driver::RawPage;

/// Selectors and heuristics for one provider's result page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageProfile {
    /// Appears once the page is ready for extraction, either as a result
    /// page or as a block page.
    pub ready_selector: String,
    /// Candidate result links, in document order.
    pub result_links: String,
    /// A link only counts as an organic result if it contains this element.
    pub result_title: String,
    /// Links inside any of these containers are advertisements.
    pub ad_containers: String,
    /// Tried in order; the first element with non-empty text wins.
    pub answer_selectors: Vec<String>,
    /// Element holding the "About N results" text.
    pub result_stats: String,
    /// Present on every page that serves results. Block phrases are only
    /// looked for when it is missing, since a result page echoes the query.
    pub result_container: String,
    pub block: BlockRules,
}

/// Heuristics for recognising a page that refuses to serve results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockRules {
    /// Case-insensitive substrings of the final page URL's host and path.
    /// The query string is never inspected.
    pub url_patterns: Vec<String>,
    pub selectors: Vec<String>,
    /// Case-insensitive substrings of the page markup, checked only on
    /// pages without a result container.
    pub phrases: Vec<String>,
}

impl Default for PageProfile {
    fn default() -> Self {
        PageProfile {
            ready_selector: [
                "#search",
                "#rso",
                "#main",
                "#result-stats",
                "form#captcha-form",
                "form[action*='consent.google']",
            ].join(", "),
            result_links: "#search a[href], #main a[href]".to_string(),
            result_title: "h3".to_string(),
            ad_containers: "#tads, #tadsb, #bottomads, [data-text-ad]".to_string(),
            answer_selectors: vec![
                ".hgKElc".to_string(),
                "[data-attrid='wa:/description']".to_string(),
                ".IZ6rdc".to_string(),
                ".Z0LcW".to_string(),
                "[data-tts='answers']".to_string(),
                ".kno-rdesc span".to_string()
            ],
            result_stats: "#result-stats".to_string(),
            result_container: "#search, #rso".to_string(),
            block: BlockRules::default(),
        }
    }
}

impl Default for BlockRules {
    fn default() -> Self {
        BlockRules {
            url_patterns: vec![
                "/sorry/".to_string(),
                "consent.google.".to_string()
            ],
            selectors: vec![
                "form#captcha-form".to_string(),
                "#recaptcha".to_string(),
                "iframe[src*='recaptcha']".to_string(),
                "form[action*='consent.google']".to_string()
            ],
            phrases: vec![
                "unusual traffic from your computer network".to_string(),
                "our systems have detected unusual traffic".to_string(),
                "before you continue to google".to_string()
            ],
        }
    }
}

impl PageProfile {
    /// Parses every selector so that a typo surfaces before a browser is
    /// launched.
    pub fn validate(&self) -> Result<(), String> {
        let single = [
            ("ready_selector", &self.ready_selector),
            ("result_links", &self.result_links),
            ("result_title", &self.result_title),
            ("ad_containers", &self.ad_containers),
            ("result_stats", &self.result_stats),
            ("result_container", &self.result_container),
        ];
        for (name, selector) in single {
            check_selector(name, selector)?;
        }
        for selector in &self.answer_selectors {
            check_selector("answer_selectors", selector)?;
        }
        for selector in &self.block.selectors {
            check_selector("block.selectors", selector)?;
        }
        Ok(())
    }

    /// Explains why `page` looks like a block page, or `None` if it does not.
    pub fn block_reason(&self, page: &RawPage) -> Option<String> {
        if let Some(location) = host_and_path(&page.url) {
            let pattern = self.block.url_patterns.iter().find(|p| location.contains(&p.to_lowercase()));
            if let Some(pattern) = pattern {
                return Some(format!("page URL {} matches block pattern {:?}", location, pattern));
            }
        }
        page.block_markers.first().map(|marker| format!("block marker present: {}", marker))
    }
}

fn host_and_path(page_url: &str) -> Option<String> {
    let url = Url::parse(page_url).ok()?;
    Some(format!("{}{}", url.host_str().unwrap_or_default(), url.path()).to_lowercase())
}

fn check_selector(name: &str, selector: &str) -> Result<(), String> {
    Selector::parse(selector)
        .map(|_| ())
        .map_err(|e| format!("{} selector {:?} is invalid: {}", name, selector, e))
}
