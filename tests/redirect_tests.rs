//! Redirect service tests
//!
//! End-to-end coverage of the critical path: short code in, redirect out.
//! Unknown, disabled and expired codes must all be indistinguishable 404s.

use std::sync::Arc;

use actix_web::http::StatusCode;
use actix_web::test::{self, TestRequest};
use actix_web::{web, App};
use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};

use snaplink::analytics::{ClickEvent, ClickRecorder, ClickSink};
use snaplink::api::services::{RedirectService, RedirectSettings};
use snaplink::cache::{MokaCache, ResolutionCache};
use snaplink::config::{CacheConfig, ClicksConfig};
use snaplink::errors::{Result, SnaplinkError};
use snaplink::services::{CachedResolver, Resolver};
use snaplink::storage::{Link, LinkFilter, LinkStore, MemoryStore};

// =============================================================================
// Test setup
// =============================================================================

struct NullSink;

#[async_trait]
impl ClickSink for NullSink {
    async fn flush_events(&self, _events: Vec<ClickEvent>) -> anyhow::Result<()> {
        Ok(())
    }
}

fn test_cache_config() -> CacheConfig {
    CacheConfig {
        enabled: true,
        max_capacity: 1000,
        default_ttl_secs: 60,
        negative_ttl_secs: 1,
        negative_max_capacity: 1000,
    }
}

fn recorder() -> Arc<ClickRecorder> {
    Arc::new(ClickRecorder::spawn(
        Arc::new(NullSink),
        &ClicksConfig::default(),
    ))
}

fn settings() -> RedirectSettings {
    RedirectSettings {
        status: StatusCode::FOUND,
        default_url: "https://fallback.example.org".to_string(),
    }
}

macro_rules! redirect_app {
    ($store:expr) => {{
        let resolver: Arc<dyn Resolver> = Arc::new(CachedResolver::new(
            Arc::new(MokaCache::new(&test_cache_config())),
            $store.clone() as Arc<dyn LinkStore>,
            60,
        ));
        test::init_service(
            App::new()
                .app_data(web::Data::new(resolver))
                .app_data(web::Data::new(recorder()))
                .app_data(web::Data::new(settings()))
                .route("/", web::get().to(RedirectService::handle_default))
                .route("/{code}", web::get().to(RedirectService::handle_redirect)),
        )
        .await
    }};
}

fn link(code: &str, destination: &str) -> Link {
    Link::new(
        code.to_string(),
        destination.to_string(),
        "7".to_string(),
        None,
    )
}

// =============================================================================
// Tests
// =============================================================================

#[actix_rt::test]
async fn test_known_code_redirects_with_location() {
    let store = Arc::new(MemoryStore::new());
    store
        .insert_if_absent(link("abc1234", "https://example.com/article/42"))
        .await
        .unwrap();
    let app = redirect_app!(store);

    let resp = TestRequest::get()
        .uri("/abc1234")
        .send_request(&app)
        .await;

    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(
        resp.headers().get("Location").unwrap(),
        "https://example.com/article/42"
    );
}

#[actix_rt::test]
async fn test_unknown_code_is_404() {
    let store = Arc::new(MemoryStore::new());
    let app = redirect_app!(store);

    let resp = TestRequest::get().uri("/nosuch1").send_request(&app).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    // 负缓存生效后的第二次请求行为一致
    let resp = TestRequest::get().uri("/nosuch1").send_request(&app).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_rt::test]
async fn test_disabled_code_is_404() {
    let store = Arc::new(MemoryStore::new());
    store
        .insert_if_absent(link("offed00", "https://example.com"))
        .await
        .unwrap();
    store.disable("offed00").await.unwrap();
    let app = redirect_app!(store);

    let resp = TestRequest::get().uri("/offed00").send_request(&app).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_rt::test]
async fn test_expired_code_is_404() {
    let store = Arc::new(MemoryStore::new());
    let mut expired = link("expired", "https://example.com");
    expired.expires_at = Some(Utc::now() - ChronoDuration::seconds(10));
    store.insert_if_absent(expired).await.unwrap();
    let app = redirect_app!(store);

    let resp = TestRequest::get().uri("/expired").send_request(&app).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_rt::test]
async fn test_syntactically_invalid_code_is_404() {
    let store = Arc::new(MemoryStore::new());
    let app = redirect_app!(store);

    let resp = TestRequest::get()
        .uri("/bad%20code")
        .send_request(&app)
        .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_rt::test]
async fn test_empty_path_redirects_to_default_url() {
    let store = Arc::new(MemoryStore::new());
    let app = redirect_app!(store);

    let resp = TestRequest::get().uri("/").send_request(&app).await;
    assert_eq!(resp.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(
        resp.headers().get("Location").unwrap(),
        "https://fallback.example.org"
    );
}

#[actix_rt::test]
async fn test_disable_visible_after_cache_invalidation() {
    let store = Arc::new(MemoryStore::new());
    store
        .insert_if_absent(link("livecode", "https://example.com"))
        .await
        .unwrap();

    let cache = Arc::new(MokaCache::new(&test_cache_config()));
    let resolver: Arc<dyn Resolver> = Arc::new(CachedResolver::new(
        cache.clone(),
        store.clone() as Arc<dyn LinkStore>,
        60,
    ));
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(resolver))
            .app_data(web::Data::new(recorder()))
            .app_data(web::Data::new(settings()))
            .route("/{code}", web::get().to(RedirectService::handle_redirect)),
    )
    .await;

    // 预热正缓存
    let resp = TestRequest::get().uri("/livecode").send_request(&app).await;
    assert_eq!(resp.status(), StatusCode::FOUND);

    // 管理动作：存储先行，缓存失效随后
    store.disable("livecode").await.unwrap();
    cache.invalidate("livecode").await;

    let resp = TestRequest::get().uri("/livecode").send_request(&app).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// =============================================================================
// Store outage degradation
// =============================================================================

/// Store that fails everything: simulates a dead backend behind a warm cache.
struct DeadStore;

#[async_trait]
impl LinkStore for DeadStore {
    async fn insert_if_absent(&self, _link: Link) -> Result<()> {
        Err(SnaplinkError::store_unavailable("backend offline"))
    }
    async fn get(&self, _code: &str) -> Result<Option<Link>> {
        Err(SnaplinkError::store_unavailable("backend offline"))
    }
    async fn disable(&self, _code: &str) -> Result<()> {
        Err(SnaplinkError::store_unavailable("backend offline"))
    }
    async fn set_expiry(&self, _code: &str, _expires_at: Option<DateTime<Utc>>) -> Result<()> {
        Err(SnaplinkError::store_unavailable("backend offline"))
    }
    async fn list(
        &self,
        _filter: LinkFilter,
        _page: u64,
        _page_size: u64,
    ) -> Result<(Vec<Link>, u64)> {
        Err(SnaplinkError::store_unavailable("backend offline"))
    }
    async fn count(&self) -> Result<u64> {
        Err(SnaplinkError::store_unavailable("backend offline"))
    }
    fn backend_name(&self) -> &'static str {
        "dead"
    }
}

#[actix_rt::test]
async fn test_store_outage_serves_cached_hit_and_503_on_miss() {
    let cache = Arc::new(MokaCache::new(&test_cache_config()));
    cache
        .put("warmhit", link("warmhit", "https://example.com/warm"), Some(60))
        .await;

    let resolver: Arc<dyn Resolver> = Arc::new(CachedResolver::new(
        cache,
        Arc::new(DeadStore) as Arc<dyn LinkStore>,
        60,
    ));
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(resolver))
            .app_data(web::Data::new(recorder()))
            .app_data(web::Data::new(settings()))
            .route("/{code}", web::get().to(RedirectService::handle_redirect)),
    )
    .await;

    // 缓存命中照常重定向
    let resp = TestRequest::get().uri("/warmhit").send_request(&app).await;
    assert_eq!(resp.status(), StatusCode::FOUND);

    // 未命中降级为 503 而不是整体失败
    let resp = TestRequest::get().uri("/coldmiss").send_request(&app).await;
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
}
