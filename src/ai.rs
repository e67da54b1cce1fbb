//! Guard rails around an external need-based attribute extractor.
//!
//! The extractor itself (typically an LLM call) is opaque. [`GuardedExtractor`]
//! validates requests, applies a per-caller rate limit, caches results, and
//! re-canonicalizes whatever the extractor returns so only vocabulary values
//! leave this module.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::error::AiError;
use crate::vocab::{to_canon_article, to_multi_color};

pub const DEFAULT_RATE_WINDOW: Duration = Duration::from_secs(60);
pub const DEFAULT_RATE_MAX: u32 = 20;
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(60);

// ==================== REQUEST / RESULT ====================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NeedField {
    Name,
    Brand,
    Type,
    Color,
}

impl NeedField {
    pub fn as_str(&self) -> &'static str {
        match self {
            NeedField::Name => "name",
            NeedField::Brand => "brand",
            NeedField::Type => "type",
            NeedField::Color => "color",
        }
    }

    fn max_len(&self) -> usize {
        match self {
            NeedField::Name | NeedField::Brand => 120,
            NeedField::Type | NeedField::Color => 60,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NeedRequest {
    pub text: String,
    pub need: Vec<NeedField>,
}

impl NeedRequest {
    pub fn new(text: impl Into<String>, need: impl IntoIterator<Item = NeedField>) -> Self {
        Self {
            text: text.into(),
            need: need.into_iter().collect(),
        }
    }

    pub fn validate(&self) -> Result<(), AiError> {
        if self.text.trim().is_empty() {
            return Err(AiError::InvalidInput("text must not be empty".into()));
        }
        if self.need.is_empty() {
            return Err(AiError::InvalidInput("need must list at least one field".into()));
        }
        Ok(())
    }

    /// Hex SHA-256 over the sorted need list and the text; independent of
    /// the order fields were requested in.
    pub fn cache_key(&self) -> String {
        let mut fields: Vec<&str> = self.need.iter().map(NeedField::as_str).collect();
        fields.sort_unstable();
        fields.dedup();
        let mut hasher = Sha256::new();
        hasher.update(fields.join(","));
        hasher.update("::");
        hasher.update(&self.text);
        hex::encode(hasher.finalize())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NeedResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub article_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl NeedResult {
    pub fn get(&self, field: NeedField) -> Option<&str> {
        match field {
            NeedField::Name => self.name.as_deref(),
            NeedField::Brand => self.brand.as_deref(),
            NeedField::Type => self.article_type.as_deref(),
            NeedField::Color => self.color.as_deref(),
        }
    }

    pub fn set(&mut self, field: NeedField, value: String) {
        let slot = match field {
            NeedField::Name => &mut self.name,
            NeedField::Brand => &mut self.brand,
            NeedField::Type => &mut self.article_type,
            NeedField::Color => &mut self.color,
        };
        *slot = Some(value);
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Keeps only requested fields, trimmed and within length limits, with
    /// `type` and `color` mapped onto the canonical vocabulary. Values that
    /// fail any of these checks are dropped.
    pub fn sanitize(&self, need: &[NeedField]) -> NeedResult {
        let mut clean = NeedResult::default();
        for &field in need {
            let Some(value) = self.get(field).map(str::trim).filter(|v| !v.is_empty()) else {
                continue;
            };
            if value.chars().count() > field.max_len() {
                debug!(field = field.as_str(), "dropping over-long extractor value");
                continue;
            }
            let value = match field {
                NeedField::Type => to_canon_article(value).map(|article| article.as_str().to_string()),
                NeedField::Color => to_multi_color(value),
                NeedField::Name | NeedField::Brand => Some(value.to_string()),
            };
            match value {
                Some(value) => clean.set(field, value),
                None => debug!(field = field.as_str(), "dropping non-canonical extractor value"),
            }
        }
        clean
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GuardedResult {
    pub result: NeedResult,
    pub cached: bool,
}

/// The external collaborator. Implementations may return any subset of
/// fields; the guard filters and canonicalizes.
#[async_trait]
pub trait NeedBasedExtractor: Send + Sync {
    async fn extract(&self, request: &NeedRequest) -> Result<NeedResult, AiError>;
}

// ==================== STORES ====================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateBucket {
    pub count: u32,
    pub window_end: Instant,
}

#[async_trait]
pub trait RateLimitStore: Send + Sync {
    /// Atomically counts one request for `key`, opening a fresh window when
    /// none exists or the current one has ended. Returns the updated bucket.
    async fn hit(&self, key: &str, now: Instant, window: Duration) -> RateBucket;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub value: NeedResult,
    pub expires_at: Instant,
}

#[async_trait]
pub trait ResultCache: Send + Sync {
    /// Live entry for `key`; expired entries are evicted and reported as misses.
    async fn get(&self, key: &str, now: Instant) -> Option<NeedResult>;
    async fn put(&self, key: &str, entry: CacheEntry);
}

pub const SWEEP_THRESHOLD: usize = 256;

#[derive(Debug, Default)]
pub struct MemoryRateLimitStore {
    buckets: Mutex<HashMap<String, RateBucket>>,
}

impl MemoryRateLimitStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.buckets.lock().await.len()
    }
}

#[async_trait]
impl RateLimitStore for MemoryRateLimitStore {
    async fn hit(&self, key: &str, now: Instant, window: Duration) -> RateBucket {
        let mut buckets = self.buckets.lock().await;
        if buckets.len() >= SWEEP_THRESHOLD {
            buckets.retain(|_, bucket| now < bucket.window_end);
        }
        let bucket = buckets
            .entry(key.to_string())
            .and_modify(|bucket| {
                if now >= bucket.window_end {
                    *bucket = RateBucket {
                        count: 0,
                        window_end: now + window,
                    };
                }
            })
            .or_insert(RateBucket {
                count: 0,
                window_end: now + window,
            });
        bucket.count = bucket.count.saturating_add(1);
        *bucket
    }
}

#[derive(Debug, Default)]
pub struct MemoryResultCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl MemoryResultCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }
}

#[async_trait]
impl ResultCache for MemoryResultCache {
    async fn get(&self, key: &str, now: Instant) -> Option<NeedResult> {
        let mut entries = self.entries.lock().await;
        if entries.len() >= SWEEP_THRESHOLD {
            entries.retain(|_, entry| now < entry.expires_at);
        }
        match entries.get(key) {
            Some(entry) if now < entry.expires_at => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    async fn put(&self, key: &str, entry: CacheEntry) {
        self.entries.lock().await.insert(key.to_string(), entry);
    }
}

// ==================== GUARD ====================

#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<dyn RateLimitStore>,
    window: Duration,
    max_requests: u32,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn RateLimitStore>, window: Duration, max_requests: u32) -> Self {
        Self {
            store,
            window,
            max_requests,
        }
    }

    pub async fn check(&self, key: &str) -> Result<(), AiError> {
        self.check_at(key, Instant::now()).await
    }

    pub async fn check_at(&self, key: &str, now: Instant) -> Result<(), AiError> {
        let bucket = self.store.hit(key, now, self.window).await;
        if bucket.count <= self.max_requests {
            return Ok(());
        }
        let remaining = bucket.window_end.saturating_duration_since(now);
        // Round up so callers never retry inside the window.
        let retry_after_secs = remaining.as_secs() + u64::from(remaining.subsec_nanos() > 0);
        Err(AiError::RateLimited { retry_after_secs })
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(
            Arc::new(MemoryRateLimitStore::new()),
            DEFAULT_RATE_WINDOW,
            DEFAULT_RATE_MAX,
        )
    }
}

pub struct GuardedExtractor<E> {
    inner: E,
    limiter: RateLimiter,
    cache: Arc<dyn ResultCache>,
    ttl: Duration,
}

impl<E: NeedBasedExtractor> GuardedExtractor<E> {
    pub fn new(inner: E) -> Self {
        Self::with_stores(
            inner,
            RateLimiter::default(),
            Arc::new(MemoryResultCache::new()),
            DEFAULT_CACHE_TTL,
        )
    }

    pub fn with_stores(inner: E, limiter: RateLimiter, cache: Arc<dyn ResultCache>, ttl: Duration) -> Self {
        Self {
            inner,
            limiter,
            cache,
            ttl,
        }
    }

    pub fn inner(&self) -> &E {
        &self.inner
    }

    /// `caller` keys the rate limit (a user id or similar).
    pub async fn extract(&self, caller: &str, request: &NeedRequest) -> Result<GuardedResult, AiError> {
        self.extract_at(caller, request, Instant::now()).await
    }

    pub async fn extract_at(
        &self,
        caller: &str,
        request: &NeedRequest,
        now: Instant,
    ) -> Result<GuardedResult, AiError> {
        request.validate()?;
        self.limiter.check_at(caller, now).await.inspect_err(|_| {
            warn!(caller, "need-based extraction rate limited");
        })?;

        let key = request.cache_key();
        if let Some(result) = self.cache.get(&key, now).await {
            debug!(caller, "need-based extraction served from cache");
            return Ok(GuardedResult { result, cached: true });
        }

        let raw = self.inner.extract(request).await.inspect_err(|err| {
            warn!(caller, error = %err, "need-based extractor failed");
        })?;
        let result = raw.sanitize(&request.need);
        self.cache
            .put(
                &key,
                CacheEntry {
                    value: result.clone(),
                    expires_at: now + self.ttl,
                },
            )
            .await;

        Ok(GuardedResult { result, cached: false })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedExtractor {
        calls: AtomicUsize,
        result: NeedResult,
    }

    impl FixedExtractor {
        fn new(result: NeedResult) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                result,
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl NeedBasedExtractor for FixedExtractor {
        async fn extract(&self, _request: &NeedRequest) -> Result<NeedResult, AiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.result.clone())
        }
    }

    struct FailingExtractor;

    #[async_trait]
    impl NeedBasedExtractor for FailingExtractor {
        async fn extract(&self, _request: &NeedRequest) -> Result<NeedResult, AiError> {
            Err(AiError::Upstream("model returned prose".into()))
        }
    }

    fn noisy_result() -> NeedResult {
        NeedResult {
            name: Some("  Everyday Pullover  ".into()),
            brand: Some("H&M".into()),
            article_type: Some("hooded sweatshirt".into()),
            color: Some("navy blue and heather grey".into()),
        }
    }

    #[test]
    fn validation_rejects_empty_input() {
        assert!(NeedRequest::new("  ", [NeedField::Name]).validate().is_err());
        assert!(NeedRequest::new("tee", []).validate().is_err());
        assert!(NeedRequest::new("tee", [NeedField::Type]).validate().is_ok());
    }

    #[test]
    fn need_list_deserializes_lowercase() {
        let request: NeedRequest = serde_json::from_str(r#"{"text":"navy tee","need":["type","color"]}"#).unwrap();
        assert_eq!(request.need, vec![NeedField::Type, NeedField::Color]);
        assert!(serde_json::from_str::<NeedRequest>(r#"{"text":"x","need":["size"]}"#).is_err());
    }

    #[test]
    fn cache_key_ignores_need_order() {
        let a = NeedRequest::new("navy tee", [NeedField::Type, NeedField::Color]);
        let b = NeedRequest::new("navy tee", [NeedField::Color, NeedField::Type]);
        let c = NeedRequest::new("navy tees", [NeedField::Color, NeedField::Type]);
        assert_eq!(a.cache_key(), b.cache_key());
        assert_ne!(a.cache_key(), c.cache_key());
        assert_eq!(a.cache_key().len(), 64);
    }

    #[test]
    fn sanitize_filters_and_canonicalizes() {
        let clean = noisy_result().sanitize(&[NeedField::Name, NeedField::Type, NeedField::Color]);
        assert_eq!(clean.name.as_deref(), Some("Everyday Pullover"));
        assert_eq!(clean.brand, None);
        assert_eq!(clean.article_type.as_deref(), Some("Hoodie"));
        assert_eq!(clean.color.as_deref(), Some("Navy / Light Gray"));

        let junk = NeedResult {
            name: Some("x".repeat(121)),
            article_type: Some("scarf".into()),
            color: Some("chartreuse".into()),
            ..Default::default()
        };
        assert!(junk
            .sanitize(&[NeedField::Name, NeedField::Type, NeedField::Color])
            .is_empty());
    }

    #[tokio::test]
    async fn second_identical_request_is_cached() {
        let guard = GuardedExtractor::new(FixedExtractor::new(noisy_result()));
        let request = NeedRequest::new("H&M hoodie, Hale Navy", [NeedField::Brand]);

        let first = guard.extract("user-1", &request).await.unwrap();
        assert!(!first.cached);
        assert_eq!(first.result.brand.as_deref(), Some("H&M"));

        let second = guard.extract("user-1", &request).await.unwrap();
        assert!(second.cached);
        assert_eq!(second.result, first.result);
        assert_eq!(guard.inner().calls(), 1);
    }

    #[tokio::test]
    async fn cache_entries_expire() {
        let cache = Arc::new(MemoryResultCache::new());
        let guard = GuardedExtractor::with_stores(
            FixedExtractor::new(noisy_result()),
            RateLimiter::default(),
            cache.clone(),
            Duration::from_secs(60),
        );
        let request = NeedRequest::new("hoodie", [NeedField::Type]);
        let start = Instant::now();

        guard.extract_at("u", &request, start).await.unwrap();
        let later = guard
            .extract_at("u", &request, start + Duration::from_secs(61))
            .await
            .unwrap();
        assert!(!later.cached);
        assert_eq!(guard.inner().calls(), 2);
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn expired_entries_are_swept() {
        let cache = MemoryResultCache::new();
        let start = Instant::now();
        for i in 0..1000 {
            cache
                .put(
                    &format!("key-{i}"),
                    CacheEntry {
                        value: NeedResult::default(),
                        expires_at: start + Duration::from_secs(60),
                    },
                )
                .await;
        }
        assert_eq!(cache.len().await, 1000);
        assert_eq!(cache.get("key-0", start + Duration::from_secs(3600)).await, None);
        assert_eq!(cache.len().await, 0);

        let store = MemoryRateLimitStore::new();
        let window = Duration::from_secs(60);
        for i in 0..1000 {
            store.hit(&format!("caller-{i}"), start, window).await;
        }
        assert_eq!(store.len().await, 1000);
        store.hit("late", start + Duration::from_secs(3600), window).await;
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn rate_limit_is_per_caller_and_resets() {
        let limiter = RateLimiter::new(Arc::new(MemoryRateLimitStore::new()), Duration::from_secs(60), 2);
        let start = Instant::now();

        assert!(limiter.check_at("a", start).await.is_ok());
        assert!(limiter.check_at("a", start).await.is_ok());
        assert_eq!(
            limiter.check_at("a", start + Duration::from_millis(500)).await,
            Err(AiError::RateLimited { retry_after_secs: 60 })
        );
        assert!(limiter.check_at("b", start).await.is_ok());
        assert!(limiter.check_at("a", start + Duration::from_secs(60)).await.is_ok());
    }

    #[tokio::test]
    async fn rejected_requests_never_reach_extractor() {
        let limiter = RateLimiter::new(Arc::new(MemoryRateLimitStore::new()), Duration::from_secs(60), 1);
        let guard = GuardedExtractor::with_stores(
            FixedExtractor::new(noisy_result()),
            limiter,
            Arc::new(MemoryResultCache::new()),
            DEFAULT_CACHE_TTL,
        );

        let invalid = NeedRequest::new("", [NeedField::Name]);
        assert!(matches!(
            guard.extract("u", &invalid).await,
            Err(AiError::InvalidInput(_))
        ));

        let request = NeedRequest::new("tee", [NeedField::Type]);
        guard.extract("u", &request).await.unwrap();
        let other = NeedRequest::new("polo", [NeedField::Type]);
        assert!(matches!(
            guard.extract("u", &other).await,
            Err(AiError::RateLimited { .. })
        ));
        assert_eq!(guard.inner().calls(), 1);
    }

    #[tokio::test]
    async fn upstream_errors_are_not_cached() {
        let cache = Arc::new(MemoryResultCache::new());
        let guard = GuardedExtractor::with_stores(
            FailingExtractor,
            RateLimiter::default(),
            cache.clone(),
            DEFAULT_CACHE_TTL,
        );
        let request = NeedRequest::new("tee", [NeedField::Type]);
        assert!(matches!(
            guard.extract("u", &request).await,
            Err(AiError::Upstream(_))
        ));
        assert_eq!(cache.len().await, 0);
    }
}
