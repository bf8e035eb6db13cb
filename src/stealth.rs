//! Automation-flag suppression and fingerprint randomisation for browser
//! sessions.

use rand::seq::SliceRandom;
use std::ffi::OsString;

use crate::driver::SessionOptions;
use crate::user_agents;

/// Common desktop viewport sizes; one is picked per stealth session.
const WINDOW_SIZES: &[(u32, u32)] = &[
    (1920, 1080),
    (1536, 864),
    (1440, 900),
    (1366, 768),
    (1280, 800),
];

const DEFAULT_WINDOW_SIZE: (u32, u32) = (1366, 768);

/// Everything a browser backend needs to disguise one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StealthProfile {
    pub user_agent: String,
    pub accept_language: String,
    pub platform: String,
    pub window_size: (u32, u32),
}

impl StealthProfile {
    /// Picks a consistent set of fingerprint values for one session.
    /// A fixed `user_agent` in `options` is honoured.
    pub fn for_session(options: &SessionOptions) -> Self {
        let user_agent = options.user_agent
            .clone()
            .unwrap_or_else(|| user_agents::random_user_agent().to_string());
        let window_size = WINDOW_SIZES.choose(&mut rand::thread_rng()).copied().unwrap_or(DEFAULT_WINDOW_SIZE);
        StealthProfile {
            platform: user_agents::platform_for(&user_agent).to_string(),
            accept_language: user_agents::accept_language(&options.lang),
            user_agent,
            window_size,
        }
    }

    /// Extra command-line flags for the browser process.
    pub fn launch_args(&self, lang: &str) -> Vec<OsString> {
        vec![
            OsString::from("--disable-blink-features=AutomationControlled"),
            OsString::from("--disable-infobars"),
            OsString::from("--no-first-run"),
            OsString::from("--no-default-browser-check"),
            OsString::from(format!("--lang={}", lang)),
            OsString::from(format!("--user-agent={}", self.user_agent))
        ]
    }

    /// Script evaluated before any page script on every new document.
    pub fn init_script(&self) -> String {
        let languages = self.accept_language
            .split(',')
            .map(|part| part.split(';').next().unwrap_or(part).trim())
            .filter(|tag| !tag.is_empty())
            .map(|tag| format!("'{}'", tag))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            r#"(() => {{
    Object.defineProperty(Navigator.prototype, 'webdriver', {{ get: () => undefined }});
    Object.defineProperty(Navigator.prototype, 'languages', {{ get: () => [{languages}] }});
    Object.defineProperty(Navigator.prototype, 'platform', {{ get: () => '{platform}' }});
    Object.defineProperty(Navigator.prototype, 'plugins', {{
        get: () => [{{ name: 'PDF Viewer' }}, {{ name: 'Chrome PDF Viewer' }}, {{ name: 'Chromium PDF Viewer' }}]
    }});
    if (!window.chrome) {{
        window.chrome = {{ runtime: {{}}, app: {{ isInstalled: false }} }};
    }}
    const query = window.navigator.permissions && window.navigator.permissions.query;
    if (query) {{
        window.navigator.permissions.query = (parameters) => parameters.name === 'notifications'
            ? Promise.resolve({{ state: Notification.permission }})
            : query.call(window.navigator.permissions, parameters);
    }}
}})();"#,
            languages = languages,
            platform = self.platform
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(user_agent: Option<&str>, lang: &str) -> SessionOptions {
        SessionOptions {
            user_agent: user_agent.map(str::to_string),
            lang: lang.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn fixed_user_agent_is_honoured() {
        let ua = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) Test";
        let profile = StealthProfile::for_session(&options(Some(ua), "en"));
        assert_eq!(profile.user_agent, ua);
        assert_eq!(profile.platform, "MacIntel");
        assert_eq!(profile.accept_language, "en-US,en;q=0.9");
    }

    #[test]
    fn window_size_comes_from_known_list() {
        let profile = StealthProfile::for_session(&SessionOptions::default());
        assert!(WINDOW_SIZES.contains(&profile.window_size));
    }

    #[test]
    fn launch_args_suppress_automation_flags() {
        let profile = StealthProfile::for_session(&options(Some("UA/1.0"), "de"));
        let args = profile.launch_args("de");
        assert!(args.contains(&OsString::from("--disable-blink-features=AutomationControlled")));
        assert!(args.contains(&OsString::from("--lang=de")));
        assert!(args.contains(&OsString::from("--user-agent=UA/1.0")));
    }

    #[test]
    fn init_script_hides_webdriver_and_sets_languages() {
        let profile = StealthProfile::for_session(&options(Some("Windows UA"), "de"));
        let script = profile.init_script();
        assert!(script.contains("'webdriver', { get: () => undefined }"));
        assert!(script.contains("['de', 'en']"));
        assert!(script.contains("'Win32'"));
    }
}
