//! # User Agents Module
//!
//! Realistic desktop User-Agent strings for stealth sessions, plus the
//! matching `Accept-Language` and `navigator.platform` values so that the
//! headers and the JavaScript environment tell the same story.

use rand::seq::SliceRandom;

/// Returns a randomly selected User-Agent string from the predefined list.
///
/// # Examples
///
/// ```rust
/// use google_search_scraper::user_agents::random_user_agent;
/// let ua = random_user_agent();
/// assert!(ua.starts_with("Mozilla/5.0"));
/// ```
pub fn random_user_agent() -> &'static str {
    USER_AGENT_LIST.choose(&mut rand::thread_rng()).copied().unwrap_or(USER_AGENT_LIST[0])
}

/// The `navigator.platform` value a browser with `user_agent` would report.
pub fn platform_for(user_agent: &str) -> &'static str {
    if user_agent.contains("Windows") {
        "Win32"
    } else if user_agent.contains("Macintosh") {
        "MacIntel"
    } else {
        "Linux x86_64"
    }
}

/// An `Accept-Language` header preferring `lang`, e.g. `"de"` becomes
/// `"de,en;q=0.9"`.
pub fn accept_language(lang: &str) -> String {
    let primary = lang.split('-').next().unwrap_or(lang);
    if primary.eq_ignore_ascii_case("en") {
        format!("{},en;q=0.9", if lang.contains('-') { lang } else { "en-US" })
    } else {
        format!("{},en;q=0.9", lang)
    }
}

const USER_AGENT_LIST: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36 Edg/124.0.2478.80",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36",
];
