use serde::Serialize;
use tokio::time::timeout;
use tracing::{debug, warn};
use url::Url;

use crate::config::Config;
use crate::error::{ClientBuildError, FetchFailure};

const ACCEPT_HTML: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";
const ACCEPT_LANGUAGE: &str = "en-US,en;q=0.9";

// ==================== OUTCOMES ====================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PathUsed {
    Direct,
    Browserless,
}

impl PathUsed {
    pub fn as_str(&self) -> &'static str {
        match self {
            PathUsed::Direct => "direct",
            PathUsed::Browserless => "browserless",
        }
    }
}

/// What a single fetch phase observed. `status` is the last HTTP status seen;
/// it stays `None` when the phase timed out or never reached the server.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PhaseReport {
    pub attempted: bool,
    pub ok: bool,
    pub status: Option<u16>,
    pub content_type: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchStrategy {
    #[default]
    Auto,
    ForceHeadless,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    pub html: String,
    pub path_used: PathUsed,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchOutcome {
    pub html: Option<String>,
    pub path_used: Option<PathUsed>,
    pub direct: PhaseReport,
    pub headless: PhaseReport,
}

impl FetchOutcome {
    pub fn into_page(self) -> Result<FetchedPage, FetchFailure> {
        match (self.html, self.path_used) {
            (Some(html), Some(path_used)) => Ok(FetchedPage { html, path_used }),
            _ => Err(FetchFailure {
                direct: self.direct,
                headless: self.headless,
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthReport {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<&'static str>,
}

impl HealthReport {
    fn failed(reason: &'static str) -> Self {
        Self {
            ok: false,
            status: None,
            reason: Some(reason),
        }
    }
}

// ==================== FETCHER ====================

#[derive(Clone)]
pub struct PageFetcher {
    client: wreq::Client,
    config: Config,
}

impl PageFetcher {
    pub fn new(config: Config) -> Result<Self, ClientBuildError> {
        let client = wreq::Client::builder()
            .emulation(wreq_util::Emulation::Chrome131)
            .build()?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub async fn fetch_page(&self, url: &str, strategy: FetchStrategy) -> FetchOutcome {
        let mut outcome = FetchOutcome::default();

        if strategy == FetchStrategy::Auto {
            let (html, report) = self.fetch_direct(url).await;
            outcome.direct = report;
            if let Some(html) = html {
                outcome.html = Some(html);
                outcome.path_used = Some(PathUsed::Direct);
                return outcome;
            }
        }

        let (html, report) = self.fetch_headless(url).await;
        outcome.headless = report;
        if let Some(html) = html {
            outcome.html = Some(html);
            outcome.path_used = Some(PathUsed::Browserless);
        }
        outcome
    }

    /// GET with desktop headers. Yields HTML only for a 2xx `text/html`
    /// response; errors and timeouts degrade to `None`.
    pub async fn fetch_direct(&self, url: &str) -> (Option<String>, PhaseReport) {
        let mut report = PhaseReport {
            attempted: true,
            ..Default::default()
        };
        let html = match timeout(self.config.direct_timeout, self.direct_attempt(url, &mut report)).await {
            Ok(html) => html,
            Err(_) => {
                debug!(url, timeout_ms = self.config.direct_timeout.as_millis() as u64, "direct fetch timed out");
                None
            }
        };
        report.ok = html.is_some();
        (html, report)
    }

    async fn direct_attempt(&self, original_url: &str, report: &mut PhaseReport) -> Option<String> {
        let mut current_url = original_url.to_string();

        for _ in 0..=self.config.max_redirects {
            let resp = match self
                .client
                .get(&current_url)
                .header("User-Agent", self.config.user_agent.as_str())
                .header("Accept", ACCEPT_HTML)
                .header("Accept-Language", ACCEPT_LANGUAGE)
                .header("Cache-Control", "no-store")
                .send()
                .await
            {
                Ok(resp) => resp,
                Err(err) => {
                    debug!(url = %current_url, error = %err, "direct fetch failed");
                    return None;
                }
            };

            let status = resp.status();
            let content_type = resp
                .headers()
                .get("content-type")
                .and_then(|v| v.to_str().ok())
                .map(String::from);
            report.status = Some(status.as_u16());
            report.content_type = content_type.clone();

            if status.is_redirection() {
                let next_url = resp
                    .headers()
                    .get("location")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|loc| Url::parse(&current_url).ok()?.join(loc).ok());
                match next_url {
                    Some(next_url) => {
                        debug!(from = %current_url, to = %next_url, "following redirect");
                        current_url = next_url.to_string();
                        continue;
                    }
                    None => {
                        debug!(url = %current_url, status = status.as_u16(), "redirect without usable Location");
                        return None;
                    }
                }
            }

            let is_html = content_type
                .as_deref()
                .map(|ct| ct.contains("text/html"))
                .unwrap_or(false);
            if !status.is_success() || !is_html {
                debug!(
                    url = %current_url,
                    status = status.as_u16(),
                    content_type = content_type.as_deref().unwrap_or(""),
                    "direct fetch rejected"
                );
                return None;
            }

            return match resp.text().await {
                Ok(text) => {
                    debug!(url = %current_url, bytes = text.len(), "direct fetch ok");
                    Some(text)
                }
                Err(err) => {
                    debug!(url = %current_url, error = %err, "direct body read failed");
                    None
                }
            };
        }

        debug!(url = original_url, max_redirects = self.config.max_redirects, "exceeded redirect limit");
        None
    }

    /// POSTs the URL to the headless `/content` endpoint. Without an API key
    /// the phase is skipped and reports nothing.
    pub async fn fetch_headless(&self, url: &str) -> (Option<String>, PhaseReport) {
        let mut report = PhaseReport::default();
        let Some(key) = self.config.api_key.as_deref() else {
            debug!(url, "no headless API key configured");
            return (None, report);
        };
        report.attempted = true;

        let endpoint = format!(
            "{}/content?token={}",
            self.config.endpoint,
            urlencoding::encode(key)
        );
        let payload = serde_json::json!({
            "url": url,
            "waitFor": "domcontentloaded",
            "gotoOptions": {
                "waitUntil": "domcontentloaded",
                "timeout": self.config.headless_timeout.as_millis() as u64,
            },
            "options": {
                "userAgent": self.config.user_agent,
                "locale": "en-US",
            },
        });

        let request = async {
            let resp = self
                .client
                .post(&endpoint)
                .header("Cache-Control", "no-store")
                .json(&payload)
                .send()
                .await
                .map_err(|err| debug!(url, error = %err, "headless fetch failed"))
                .ok()?;
            let status = resp.status();
            Some((status, resp.text().await.ok()))
        };

        let html = match timeout(self.config.headless_request_timeout(), request).await {
            Ok(Some((status, body))) => {
                report.status = Some(status.as_u16());
                if status.is_success() {
                    body
                } else {
                    if status.as_u16() == 403 {
                        warn!(url, "headless endpoint rejected credentials");
                    }
                    None
                }
            }
            Ok(None) => None,
            Err(_) => {
                debug!(url, "headless fetch timed out");
                None
            }
        };
        report.ok = html.is_some();
        (html, report)
    }

    pub async fn headless_health(&self) -> HealthReport {
        let Some(key) = self.config.api_key.as_deref() else {
            return HealthReport::failed("no_key");
        };
        let probe = format!(
            "{}/versions?token={}",
            self.config.endpoint,
            urlencoding::encode(key)
        );
        match timeout(self.config.direct_timeout, self.client.get(&probe).send()).await {
            Ok(Ok(resp)) => HealthReport {
                ok: resp.status().is_success(),
                status: Some(resp.status().as_u16()),
                reason: None,
            },
            Ok(Err(err)) => {
                debug!(error = %err, "headless health probe failed");
                HealthReport::failed("network")
            }
            Err(_) => HealthReport::failed("network"),
        }
    }
}

pub async fn headless_health(config: &Config) -> HealthReport {
    if config.api_key.is_none() {
        return HealthReport::failed("no_key");
    }
    match PageFetcher::new(config.clone()) {
        Ok(fetcher) => fetcher.headless_health().await,
        Err(err) => {
            warn!(error = %err, "could not build client for health probe");
            HealthReport::failed("network")
        }
    }
}
