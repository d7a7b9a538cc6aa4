//! Short-code resolution (cache-aside)
//!
//! A miss is served from the durable store and the cache is refilled by a
//! detached task, so a slow or failing cache write never delays the caller.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::sync::Notify;
use tracing::{debug, trace};

use crate::cache::{self, CacheKey, CacheStore};
use crate::errors::{LinkPulseError, Result};
use crate::storage::{DurableStore, ShortLink};

/// 尚未完成的缓存回填
#[derive(Default)]
struct PendingFills {
    count: AtomicUsize,
    idle: Notify,
}

struct FillGuard(Arc<PendingFills>);

impl Drop for FillGuard {
    fn drop(&mut self) {
        if self.0.count.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.0.idle.notify_waiters();
        }
    }
}

pub struct Resolver {
    store: Arc<dyn DurableStore>,
    cache: Arc<dyn CacheStore>,
    destination_ttl: Duration,
    fills: Arc<PendingFills>,
}

impl Resolver {
    pub fn new(
        store: Arc<dyn DurableStore>,
        cache: Arc<dyn CacheStore>,
        destination_ttl: Duration,
    ) -> Self {
        Self {
            store,
            cache,
            destination_ttl,
            fills: Arc::new(PendingFills::default()),
        }
    }

    /// 解析短码
    ///
    /// 缓存读取失败或内容损坏按未命中处理；回源后在后台回填缓存，回填失败或变慢都不影响结果。
    /// 状态检查在每次解析时执行，包括缓存命中。
    pub async fn resolve(&self, code: &str) -> Result<ShortLink> {
        if code.is_empty() || !code.bytes().all(|b| b.is_ascii_alphanumeric()) {
            return Err(LinkPulseError::not_found(format!("Unknown short code: {}", code)));
        }

        let key = CacheKey::Destination(code);
        let link = match cache::get_json::<ShortLink>(self.cache.as_ref(), &key).await {
            Some(link) => link,
            None => {
                let link = self
                    .store
                    .get_link_by_code(code)
                    .await
                    .map_err(|e| e.or_internal("lookup short code"))?
                    .ok_or_else(|| {
                        LinkPulseError::not_found(format!("Unknown short code: {}", code))
                    })?;
                debug!("Resolver: loaded '{}' from {}", code, self.store.backend_name());
                self.spawn_fill(code, &link);
                link
            }
        };

        if !link.status.is_active() {
            trace!("Resolver: '{}' is inactive", code);
            return Err(LinkPulseError::inactive(format!("Link is inactive: {}", code)));
        }

        Ok(link)
    }

    fn spawn_fill(&self, code: &str, link: &ShortLink) {
        self.fills.count.fetch_add(1, Ordering::AcqRel);
        let guard = FillGuard(self.fills.clone());
        let cache = self.cache.clone();
        let ttl = self.destination_ttl;
        let code = code.to_string();
        let link = link.clone();

        tokio::spawn(async move {
            let _guard = guard;
            let key = CacheKey::Destination(code.as_str());
            cache::put_json(cache.as_ref(), &key, &link, ttl).await;
        });
    }

    /// 等待所有已发起的缓存回填完成
    pub async fn flush(&self) {
        loop {
            let notified = self.fills.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.fills.count.load(Ordering::Acquire) == 0 {
                return;
            }
            notified.await;
        }
    }
}
