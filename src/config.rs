use std::time::Duration;

use tracing::warn;

pub const DEFAULT_ENDPOINT: &str = "https://chrome.browserless.io";
pub const DESKTOP_UA: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122 Safari/537.36";

const DEFAULT_DIRECT_TIMEOUT_MS: u64 = 10_000;
const DEFAULT_HEADLESS_TIMEOUT_MS: u64 = 35_000;
const HEADLESS_REQUEST_MARGIN_MS: u64 = 1_000;
const DEFAULT_MAX_REDIRECTS: usize = 5;

pub(crate) fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.is_empty())
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    match env_var(name) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!(variable = name, value = %raw, "ignoring unparsable value");
            default
        }),
        None => default,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub direct_timeout: Duration,
    pub headless_timeout: Duration,
    pub user_agent: String,
    pub max_redirects: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key: None,
            direct_timeout: Duration::from_millis(DEFAULT_DIRECT_TIMEOUT_MS),
            headless_timeout: Duration::from_millis(DEFAULT_HEADLESS_TIMEOUT_MS),
            user_agent: DESKTOP_UA.to_string(),
            max_redirects: DEFAULT_MAX_REDIRECTS,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            endpoint: env_var("BROWSERLESS_ENDPOINT")
                .map(|e| e.trim_end_matches('/').to_string())
                .unwrap_or(defaults.endpoint),
            api_key: env_var("BROWSERLESS_API_KEY"),
            direct_timeout: Duration::from_millis(env_parse(
                "SCRAPER_DIRECT_TIMEOUT_MS",
                DEFAULT_DIRECT_TIMEOUT_MS,
            )),
            headless_timeout: Duration::from_millis(env_parse(
                "SCRAPER_HEADLESS_TIMEOUT_MS",
                DEFAULT_HEADLESS_TIMEOUT_MS,
            )),
            user_agent: env_var("SCRAPER_USER_AGENT").unwrap_or(defaults.user_agent),
            max_redirects: env_parse("SCRAPER_MAX_REDIRECTS", DEFAULT_MAX_REDIRECTS),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into()).filter(|k| !k.is_empty());
        self
    }

    pub fn with_direct_timeout(mut self, timeout: Duration) -> Self {
        self.direct_timeout = timeout;
        self
    }

    pub fn with_headless_timeout(mut self, timeout: Duration) -> Self {
        self.headless_timeout = timeout;
        self
    }

    pub fn with_max_redirects(mut self, max_redirects: usize) -> Self {
        self.max_redirects = max_redirects;
        self
    }

    /// Outer timeout for the headless request. Always exceeds the render
    /// budget so the service reports its own timeout first.
    pub fn headless_request_timeout(&self) -> Duration {
        self.headless_timeout + Duration::from_millis(HEADLESS_REQUEST_MARGIN_MS)
    }

    pub fn key_tail(&self) -> Option<String> {
        self.api_key.as_deref().map(|key| {
            let chars: Vec<char> = key.chars().collect();
            chars[chars.len().saturating_sub(6)..].iter().collect()
        })
    }
}
