pub mod ai;
pub mod article;
pub mod color;
pub mod config;
pub mod consolidate;
pub mod error;
pub mod fetcher;
pub mod freeform;
pub mod html_extractor;
pub mod images;
pub mod logging;
pub mod normalize;
pub mod patch;
pub mod scrape;
pub mod vocab;

#[cfg(feature = "python")]
mod python;

pub use config::Config;
pub use consolidate::{consolidate, ScrapedProduct};
pub use error::{AiError, ScrapeError};
pub use fetcher::{headless_health, FetchStrategy, HealthReport, PageFetcher, PathUsed};
pub use freeform::{parse_freeform, parse_from_product, Confidence, ParseResult, ProductText};
pub use patch::{ItemAttributesPatch, Patch, ResolvedAttributes};
pub use scrape::{validate_url, ScrapeRequest, ScrapeResponse, ScrapeSuccess, Scraper};
pub use vocab::{
    derive_color_std, normalize_multi_color, remap_legacy_article, remap_legacy_color, to_canon_article,
    to_canon_color, to_multi_color, CanonArticle, CanonColor, MultiColor,
};
