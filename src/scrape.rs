use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use url::Url;

use crate::config::Config;
use crate::consolidate::{consolidate, ScrapedProduct};
use crate::error::ScrapeError;
use crate::fetcher::{FetchStrategy, PageFetcher, PathUsed};

lazy_static! {
    static ref HTTP_SCHEME: Regex = Regex::new(r"(?i)^https?://").unwrap();
}

const FORCE_HEADLESS: &str = "browserless";

// ==================== REQUEST / RESPONSE ====================

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ScrapeRequest {
    pub url: Option<String>,
    pub force: Option<String>,
}

impl ScrapeRequest {
    pub fn strategy(&self) -> FetchStrategy {
        match self.force.as_deref() {
            Some(FORCE_HEADLESS) => FetchStrategy::ForceHeadless,
            _ => FetchStrategy::Auto,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScrapeSuccess {
    pub product: ScrapedProduct,
    pub path_used: PathUsed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ScrapeResponse {
    Ok {
        ok: bool,
        product: ScrapedProduct,
        #[serde(rename = "pathUsed")]
        path_used: PathUsed,
    },
    Err {
        error: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        hint: Option<&'static str>,
        #[serde(skip)]
        status: u16,
    },
}

impl ScrapeResponse {
    pub fn status_code(&self) -> u16 {
        match self {
            ScrapeResponse::Ok { .. } => 200,
            ScrapeResponse::Err { status, .. } => *status,
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, ScrapeResponse::Ok { .. })
    }
}

impl From<Result<ScrapeSuccess, ScrapeError>> for ScrapeResponse {
    fn from(result: Result<ScrapeSuccess, ScrapeError>) -> Self {
        match result {
            Ok(success) => ScrapeResponse::Ok {
                ok: true,
                product: success.product,
                path_used: success.path_used,
            },
            Err(err) => ScrapeResponse::Err {
                error: err.to_string(),
                hint: err.hint(),
                status: err.status_code(),
            },
        }
    }
}

/// Accepts only absolute http(s) URLs and returns them in canonical form.
pub fn validate_url(raw: &str) -> Result<String, ScrapeError> {
    let raw = raw.trim();
    if !HTTP_SCHEME.is_match(raw) {
        return Err(ScrapeError::InvalidUrl);
    }
    Url::parse(raw)
        .map(|url| url.to_string())
        .map_err(|_| ScrapeError::InvalidUrl)
}

// ==================== SCRAPER ====================

#[derive(Clone)]
pub struct Scraper {
    fetcher: PageFetcher,
}

impl Scraper {
    pub fn new(config: Config) -> Result<Self, ScrapeError> {
        Ok(Self {
            fetcher: PageFetcher::new(config)?,
        })
    }

    pub fn from_env() -> Result<Self, ScrapeError> {
        Self::new(Config::from_env())
    }

    pub fn fetcher(&self) -> &PageFetcher {
        &self.fetcher
    }

    pub async fn scrape(&self, url: &str, strategy: FetchStrategy) -> Result<ScrapeSuccess, ScrapeError> {
        let url = validate_url(url)?;
        let outcome = self.fetcher.fetch_page(&url, strategy).await;

        info!(
            url = %url,
            direct_ok = outcome.direct.ok,
            direct_status = ?outcome.direct.status,
            direct_content_type = ?outcome.direct.content_type,
            headless_ok = outcome.headless.ok,
            headless_status = ?outcome.headless.status,
            key_tail = ?self.fetcher.config().key_tail(),
            "scrape fetch finished"
        );

        let page = outcome.into_page()?;
        let product = consolidate(&url, &page.html);
        if !product.is_extractable() {
            debug!(url = %url, "no name or image found");
            return Err(ScrapeError::NoMetadata);
        }

        Ok(ScrapeSuccess {
            product,
            path_used: page.path_used,
        })
    }

    pub async fn handle(&self, request: ScrapeRequest) -> ScrapeResponse {
        let strategy = request.strategy();
        let Some(url) = request.url else {
            return Err::<ScrapeSuccess, _>(ScrapeError::InvalidUrl).into();
        };
        self.scrape(&url, strategy).await.into()
    }
}
