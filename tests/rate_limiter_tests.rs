//! 限流集成测试

mod common;

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use linkpulse::config::{CREATE_LINK_ENDPOINT, RateLimitConfig, RateLimitRule};
use linkpulse::RequestContext;
use linkpulse::errors::LinkPulseError;
use linkpulse::services::{CreateLinkRequest, RateLimiter};

use common::{FlakyCache, test_app, test_config};

fn limiter(cache: Arc<FlakyCache>, max: u64, window_secs: u64) -> RateLimiter {
    RateLimiter::new(
        cache,
        RateLimitConfig {
            default: RateLimitRule::new(max, Duration::from_secs(window_secs)),
            endpoints: Default::default(),
        },
    )
}

#[tokio::test(start_paused = true)]
async fn test_max_plus_one_is_rejected_until_window_ends() {
    let cache = Arc::new(FlakyCache::new());
    let limiter = limiter(cache.clone(), 5, 300);

    for _ in 0..5 {
        limiter.admit("10.0.0.1", CREATE_LINK_ENDPOINT).await.unwrap();
    }
    let err = limiter
        .admit("10.0.0.1", CREATE_LINK_ENDPOINT)
        .await
        .unwrap_err();
    assert!(matches!(err, LinkPulseError::RateLimited(_)));
    assert_eq!(err.http_status(), 429);

    // 窗口内仍然拒绝
    tokio::time::advance(Duration::from_secs(299)).await;
    assert!(limiter.admit("10.0.0.1", CREATE_LINK_ENDPOINT).await.is_err());

    tokio::time::advance(Duration::from_secs(2)).await;
    let admission = limiter.admit("10.0.0.1", CREATE_LINK_ENDPOINT).await.unwrap();
    assert_eq!(admission.count, 1);
}

#[tokio::test]
async fn test_incr_failure_fails_closed() {
    let cache = Arc::new(FlakyCache::new());
    let limiter = limiter(cache.clone(), 5, 300);
    cache.fail_incr.store(true, Ordering::SeqCst);

    let err = limiter.admit("10.0.0.1", "/x").await.unwrap_err();
    assert!(matches!(err, LinkPulseError::Internal(_)));
    assert!(err.is_retriable());
}

#[tokio::test]
async fn test_expire_failure_fails_closed_and_drops_counter() {
    let cache = Arc::new(FlakyCache::new());
    let limiter = limiter(cache.clone(), 5, 300);
    cache.fail_expire.store(true, Ordering::SeqCst);

    let err = limiter.admit("10.0.0.1", "/x").await.unwrap_err();
    assert!(matches!(err, LinkPulseError::Internal(_)));
    // 没有过期时间的计数器被删除
    assert!(!cache.inner.contains("ratelimit:10.0.0.1:/x"));

    cache.fail_expire.store(false, Ordering::SeqCst);
    assert_eq!(limiter.admit("10.0.0.1", "/x").await.unwrap().count, 1);
    assert_eq!(
        cache.inner.ttl("ratelimit:10.0.0.1:/x").map(|d| d.as_secs() <= 300),
        Some(true)
    );
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_admit_still_sets_window() {
    let t = test_app(&test_config(2));
    t.cache.expire_delay_ms.store(5_000, Ordering::SeqCst);
    let key = "ratelimit:9.9.9.9:/api/v1/links";

    // 请求在 EXPIRE 返回前超时
    let ctx = RequestContext::new("9.9.9.9", "test", Duration::from_secs(1));
    let err = t.app.admit(&ctx, CREATE_LINK_ENDPOINT).await.unwrap_err();
    assert!(matches!(err, LinkPulseError::Internal(_)));

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert!(t.cache.inner.ttl(key).is_some());

    t.cache.expire_delay_ms.store(0, Ordering::SeqCst);
    let ctx = t.app.request("9.9.9.9", "test");
    assert_eq!(t.app.admit(&ctx, CREATE_LINK_ENDPOINT).await.unwrap().count, 2);
    assert!(matches!(
        t.app.admit(&ctx, CREATE_LINK_ENDPOINT).await,
        Err(LinkPulseError::RateLimited(_))
    ));

    // 窗口结束后恢复
    tokio::time::advance(Duration::from_secs(61)).await;
    let ctx = t.app.request("9.9.9.9", "test");
    assert_eq!(t.app.admit(&ctx, CREATE_LINK_ENDPOINT).await.unwrap().count, 1);
}

#[tokio::test]
async fn test_create_link_gated_per_client_ip() {
    let t = test_app(&test_config(2));
    let first = t.app.request("10.0.0.1", "test");
    let other = t.app.request("10.0.0.2", "test");
    let req = |code: &str| CreateLinkRequest {
        original_url: "https://example.com".into(),
        short_code: Some(code.to_string()),
    };

    t.app.create_link(&first, req("a1")).await.unwrap();
    t.app.create_link(&first, req("a2")).await.unwrap();
    assert!(matches!(
        t.app.create_link(&first, req("a3")).await,
        Err(LinkPulseError::RateLimited(_))
    ));
    // 被拒绝的请求不会写入
    assert!(matches!(
        t.app.resolve(&first, "a3").await,
        Err(LinkPulseError::NotFound(_))
    ));

    t.app.create_link(&other, req("b1")).await.unwrap();
}

#[tokio::test]
async fn test_create_link_denied_when_cache_down() {
    let t = test_app(&test_config(100));
    let ctx = t.app.request("10.0.0.1", "test");
    t.cache.fail_incr.store(true, Ordering::SeqCst);

    let err = t
        .app
        .create_link(
            &ctx,
            CreateLinkRequest {
                original_url: "https://example.com".into(),
                short_code: Some("abc".into()),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, LinkPulseError::Internal(_)));
}
