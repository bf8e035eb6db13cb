//! # Extraction Module
//!
//! Turns result page markup into a [`RawPage`]. Both driver backends feed
//! their HTML through [`parse_page`], so the rules for what counts as an
//! organic result are the same regardless of how the page was loaded.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ ElementRef, Html, Selector };
use url::Url;

use crate::driver::{ DriverFailure, RawPage };
use crate::profile::PageProfile;

/// The first number in a result counter. Digit groups may be separated by
/// a comma, a dot, a space, a (narrow) no-break space or an apostrophe,
/// which covers "1,230,000", "1.230.000", "1 230 000" and "1'230'000".
static COUNT_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\d{1,3}(?:[,. \u{a0}\u{202f}']\d{3})+|\d+").expect("count regex is valid")
});

static WHITESPACE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\s+").expect("whitespace regex is valid")
});

/// Parses `html` loaded from `page_url` according to `profile`.
pub fn parse_page(html: &str, page_url: &str, profile: &PageProfile) -> Result<RawPage, DriverFailure> {
    let document = Html::parse_document(html);
    let links_selector = selector(&profile.result_links)?;
    let title_selector = selector(&profile.result_title)?;
    let ad_selector = selector(&profile.ad_containers)?;
    let stats_selector = selector(&profile.result_stats)?;

    let base = Url::parse(page_url).ok();
    let links = document
        .select(&links_selector)
        .filter(|link| link.select(&title_selector).next().is_some())
        .filter(|link| !inside(link, &ad_selector))
        .filter_map(|link| link.value().attr("href"))
        .filter_map(|href| normalize_link(href, base.as_ref()))
        .collect();

    let mut answer = None;
    for css in &profile.answer_selectors {
        let answer_selector = selector(css)?;
        if let Some(text) = document.select(&answer_selector).map(|el| element_text(&el)).find(|t| !t.is_empty()) {
            answer = Some(text);
            break;
        }
    }

    let result_stats = document
        .select(&stats_selector)
        .map(|el| element_text(&el))
        .find(|t| !t.is_empty());

    let mut block_markers = Vec::new();
    for css in &profile.block.selectors {
        if document.select(&selector(css)?).next().is_some() {
            block_markers.push(format!("selector {}", css));
        }
    }
    // Result pages repeat the query in the title, the search box and the
    // snippets, so phrases only count on pages that serve no results.
    let has_results = document.select(&selector(&profile.result_container)?).next().is_some();
    if !has_results {
        let lowered = html.to_lowercase();
        for phrase in &profile.block.phrases {
            if lowered.contains(&phrase.to_lowercase()) {
                block_markers.push(format!("phrase {:?}", phrase));
            }
        }
    }

    Ok(RawPage {
        url: page_url.to_string(),
        links,
        answer,
        result_stats,
        block_markers,
    })
}

/// Whether `html` contains an element matching `css`.
pub fn contains_selector(html: &str, css: &str) -> Result<bool, DriverFailure> {
    let document = Html::parse_document(html);
    Ok(document.select(&selector(css)?).next().is_some())
}

/// Resolves a result `href` to the absolute URL of the target page.
///
/// Redirect wrappers (`/url?q=...`) are unwrapped, scroll-to-text fragments
/// are dropped, and links that point back into the search provider itself
/// are rejected.
pub fn normalize_link(href: &str, base: Option<&Url>) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') || href.starts_with("javascript:") {
        return None;
    }
    let mut url = match Url::parse(href) {
        Ok(url) => url,
        Err(url::ParseError::RelativeUrlWithoutBase) => base?.join(href).ok()?,
        Err(_) => {
            return None;
        }
    };

    if is_redirect_wrapper(&url) {
        let target = url
            .query_pairs()
            .find(|(key, _)| key == "q" || key == "url")
            .map(|(_, value)| value.into_owned())?;
        url = Url::parse(&target).ok()?;
    }

    if !matches!(url.scheme(), "http" | "https") || is_provider_internal(&url) {
        return None;
    }
    if url.fragment().is_some_and(|f| f.starts_with(":~:")) {
        url.set_fragment(None);
    }
    Some(url.to_string())
}

/// Reads the total result count from a counter such as
/// "About 1,230,000 results (0.42 seconds)". Returns `0` when no number can
/// be found or it does not fit.
pub fn parse_total_results(text: &str) -> u64 {
    COUNT_REGEX.find(text)
        .map(|m| m.as_str().chars().filter(char::is_ascii_digit).collect::<String>())
        .and_then(|digits| digits.parse().ok())
        .unwrap_or(0)
}

/// Keeps the first occurrence of every link and at most `max` of them.
pub fn dedupe_links(links: Vec<String>, max: usize) -> Vec<String> {
    let mut unique: Vec<String> = Vec::with_capacity(max.min(links.len()));
    for link in links {
        if unique.len() >= max {
            break;
        }
        if !unique.contains(&link) {
            unique.push(link);
        }
    }
    unique
}

pub fn collapse_whitespace(text: &str) -> String {
    WHITESPACE_REGEX.replace_all(text.trim(), " ").into_owned()
}

fn selector(css: &str) -> Result<Selector, DriverFailure> {
    Selector::parse(css).map_err(|e| DriverFailure::Session(format!("invalid selector {:?}: {}", css, e)))
}

fn element_text(element: &ElementRef) -> String {
    collapse_whitespace(&element.text().collect::<String>())
}

fn inside(element: &ElementRef, containers: &Selector) -> bool {
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .any(|ancestor| containers.matches(&ancestor))
}

fn is_redirect_wrapper(url: &Url) -> bool {
    url.path() == "/url" && url.host_str().is_some_and(is_provider_host)
}

fn is_provider_host(host: &str) -> bool {
    host.starts_with("www.google.") || host.starts_with("google.")
}

fn is_provider_internal(url: &Url) -> bool {
    let Some(host) = url.host_str() else {
        return true;
    };
    is_provider_host(host) ||
        host == "webcache.googleusercontent.com" ||
        (host.contains(".google.") && url.path() == "/search")
}
