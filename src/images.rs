use std::collections::HashSet;

use lazy_static::lazy_static;
use regex::Regex;
use url::Url;

lazy_static! {
    static ref EXTENSION_BLOCK: Regex = Regex::new(r"(?i)\.(svg|ico)(\?|$)").unwrap();
    static ref NAME_BLOCK: Regex =
        Regex::new(r"(?i)(logo|favicon|sprite|icon|placeholder|thumb|swatch|sample)").unwrap();
    static ref GOOD_EXTENSION: Regex = Regex::new(r"(?i)\.(png|jpe?g|webp)(\?|#|$)").unwrap();
    static ref THUMBNAIL: Regex =
        Regex::new(r"(?i)(_UX\d+_|_SX\d+_|thumb|sprite|icon|placeholder)").unwrap();
    static ref AMAZON_HOST: Regex = Regex::new(r"(?i)amazon\.").unwrap();
    static ref AMAZON_SIZED: Regex = Regex::new(r"\._[A-Z]{2}_[A-Z]+[0-9A-Z_]*_\.").unwrap();
    static ref AMAZON_CODED: Regex = Regex::new(r"\._[A-Z]{2}_[0-9A-Z_]+_\.").unwrap();
    static ref AMAZON_TAIL: Regex = Regex::new(r"(?i)(\._[^.]+_)?\.(jpg|jpeg|png|webp)$").unwrap();
    static ref RESIZE_SUFFIX: Regex = Regex::new(r"(?i)\._[A-Z]{2}\d+_\.([a-z]+)$").unwrap();
}

pub fn to_absolute_url(possible: &str, page_url: &str) -> Option<String> {
    let possible = possible.trim();
    if possible.is_empty() {
        return None;
    }
    let base = Url::parse(page_url).ok()?;
    base.join(possible).ok().map(|u| u.to_string())
}

/// Rewrites Amazon media URLs to the 1500px rendition. Other hosts pass through.
pub fn normalize_amazon_image(raw: &str) -> String {
    let Ok(mut parsed) = Url::parse(raw) else {
        return raw.to_string();
    };
    let is_amazon = parsed
        .host_str()
        .map(|host| AMAZON_HOST.is_match(host))
        .unwrap_or(false);
    if !is_amazon {
        return raw.to_string();
    }

    let path = parsed.path().to_string();
    let path = AMAZON_SIZED.replace_all(&path, "._SL1500_.");
    let path = AMAZON_CODED.replace_all(&path, "._SL1500_.");
    let path = AMAZON_TAIL.replace_all(&path, "._SL1500_.${2}");
    parsed.set_path(&path);
    parsed.to_string()
}

/// Strips a trailing CDN resize code (`._SX300_.jpg` -> `.jpg`).
pub fn upgrade_resolution(url: &str) -> String {
    RESIZE_SUFFIX.replace(url, ".${1}").into_owned()
}

/// Resolves `raw` against the page and rejects vector/icon assets and
/// logo-like names. Accepted URLs come back CDN-normalized.
pub fn accept_candidate(raw: &str, page_url: &str) -> Option<String> {
    let absolute = to_absolute_url(raw, page_url)?;
    if EXTENSION_BLOCK.is_match(&absolute) || NAME_BLOCK.is_match(&absolute) {
        return None;
    }
    Some(normalize_amazon_image(&absolute))
}

#[derive(Debug, Default, Clone)]
pub struct ImageCandidates {
    urls: Vec<String>,
    seen: HashSet<String>,
}

impl ImageCandidates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, raw: &str, page_url: &str) -> bool {
        match accept_candidate(raw, page_url) {
            Some(url) => self.push_accepted(url),
            None => false,
        }
    }

    fn push_accepted(&mut self, url: String) -> bool {
        if !self.seen.insert(url.clone()) {
            return false;
        }
        self.urls.push(url);
        true
    }

    pub fn first(&self) -> Option<&String> {
        self.urls.first()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.urls
    }

    pub fn into_vec(self) -> Vec<String> {
        self.urls
    }
}

pub fn score_image(url: &str) -> u8 {
    let extension = if GOOD_EXTENSION.is_match(url) { 2 } else { 0 };
    let full_size = if THUMBNAIL.is_match(url) { 0 } else { 1 };
    extension + full_size
}

/// Best image from `candidates`: de-duplicated, ranked by [`score_image`]
/// with input order breaking ties, and upgraded to full resolution.
pub fn pick_best<S: AsRef<str>>(candidates: &[S]) -> Option<String> {
    let mut seen = HashSet::new();
    let mut ranked: Vec<(&str, u8)> = candidates
        .iter()
        .map(|candidate| candidate.as_ref())
        .filter(|url| seen.insert(*url))
        .map(|url| (url, score_image(url)))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    ranked.first().map(|(url, _)| upgrade_resolution(url))
}
