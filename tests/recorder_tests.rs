//! Recorder isolation tests
//!
//! The contract under test: click recording never delays or fails a
//! redirect, no matter how unhealthy the sink is.

use std::sync::Arc;
use std::time::{Duration, Instant};

use actix_web::http::StatusCode;
use actix_web::test::{self, TestRequest};
use actix_web::{web, App};
use async_trait::async_trait;

use snaplink::analytics::{ClickEvent, ClickRecorder, ClickSink};
use snaplink::api::services::{RedirectService, RedirectSettings};
use snaplink::cache::MokaCache;
use snaplink::config::{CacheConfig, ClicksConfig};
use snaplink::services::{CachedResolver, Resolver};
use snaplink::storage::{Link, LinkStore, MemoryStore};

/// Sink that blocks forever, simulating a wedged analytics backend.
struct StuckSink;

#[async_trait]
impl ClickSink for StuckSink {
    async fn flush_events(&self, _events: Vec<ClickEvent>) -> anyhow::Result<()> {
        futures_util::future::pending::<()>().await;
        unreachable!()
    }
}

struct CountingSink {
    count: std::sync::atomic::AtomicUsize,
}

#[async_trait]
impl ClickSink for CountingSink {
    async fn flush_events(&self, events: Vec<ClickEvent>) -> anyhow::Result<()> {
        self.count
            .fetch_add(events.len(), std::sync::atomic::Ordering::SeqCst);
        Ok(())
    }
}

macro_rules! redirect_app {
    ($recorder:expr) => {{
        let store = Arc::new(MemoryStore::new());
        store
            .insert_if_absent(Link::new(
                "hotlink1".to_string(),
                "https://example.com/hot".to_string(),
                "1".to_string(),
                None,
            ))
            .await
            .unwrap();

        let resolver: Arc<dyn Resolver> = Arc::new(CachedResolver::new(
            Arc::new(MokaCache::new(&CacheConfig::default())),
            store as Arc<dyn LinkStore>,
            60,
        ));

        test::init_service(
            App::new()
                .app_data(web::Data::new(resolver))
                .app_data(web::Data::new($recorder))
                .app_data(web::Data::new(RedirectSettings {
                    status: StatusCode::FOUND,
                    default_url: "https://example.com".to_string(),
                }))
                .route("/{code}", web::get().to(RedirectService::handle_redirect)),
        )
        .await
    }};
}

#[actix_rt::test]
async fn test_redirects_unaffected_by_stuck_sink() {
    // 极小队列 + 卡死的 sink：溢出立即发生
    let recorder = Arc::new(ClickRecorder::spawn(
        Arc::new(StuckSink),
        &ClicksConfig {
            queue_capacity: 4,
            flush_interval_secs: 1,
            flush_batch_size: 2,
            shutdown_timeout_secs: 1,
        },
    ));
    let app = redirect_app!(recorder.clone());

    const REQUESTS: usize = 200;
    let start = Instant::now();
    for _ in 0..REQUESTS {
        let resp = TestRequest::get().uri("/hotlink1").send_request(&app).await;
        assert_eq!(resp.status(), StatusCode::FOUND);
    }
    let elapsed = start.elapsed();

    // 粗粒度上限：200 次重定向必须远快于任何阻塞式实现
    assert!(
        elapsed < Duration::from_secs(5),
        "{} redirects took {:?} with a stuck sink",
        REQUESTS,
        elapsed
    );
    // 队列早已塞满，丢弃计数必须在增长，而重定向从未失败
    assert!(recorder.dropped_count() > 0);
}

#[actix_rt::test]
async fn test_clicks_reach_sink_when_healthy() {
    let sink = Arc::new(CountingSink {
        count: std::sync::atomic::AtomicUsize::new(0),
    });
    let recorder = Arc::new(ClickRecorder::spawn(
        sink.clone(),
        &ClicksConfig {
            queue_capacity: 100,
            flush_interval_secs: 3600,
            flush_batch_size: 5,
            shutdown_timeout_secs: 2,
        },
    ));
    let app = redirect_app!(recorder.clone());

    for _ in 0..10 {
        let resp = TestRequest::get()
            .uri("/hotlink1")
            .insert_header(("user-agent", "Mozilla/5.0 (Windows NT 10.0; Win64; x64)"))
            .insert_header(("referer", "https://news.example.org/front"))
            .send_request(&app)
            .await;
        assert_eq!(resp.status(), StatusCode::FOUND);
    }

    recorder.shutdown(Duration::from_secs(2)).await;

    assert_eq!(
        sink.count.load(std::sync::atomic::Ordering::SeqCst),
        10,
        "all clicks must reach the sink after drain"
    );
    assert_eq!(recorder.dropped_count(), 0);
}
