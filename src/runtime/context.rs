//! Application context
//!
//! [`LinkPulse`] wires every component to one store handle and one cache
//! handle, created once at startup and passed down explicitly.
//! [`RequestContext`] carries what the HTTP layer knows about a request.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::cache::{CacheStore, create_cache_store};
use crate::config::{CREATE_LINK_ENDPOINT, StaticConfig};
use crate::errors::{LinkPulseError, Result};
use crate::services::{
    Admission, ClickJob, ClickRecorder, CreateLinkRequest, LinkService, ProfileCache, RateLimiter,
    Resolver, StatsAggregator, UpdateLinkRequest,
};
use crate::storage::{
    DashboardStats, DurableStore, LinkPage, ShortLink, StatsScope, StorageFactory, UserId,
};

/// 关闭时等待后台任务的上限
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

/// 单个入站请求的上下文，由认证/路由层构造
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub client_ip: String,
    pub user_agent: String,
    /// 已认证用户；匿名请求为 `None`
    pub user: Option<UserId>,
    pub deadline: Instant,
}

impl RequestContext {
    pub fn new(
        client_ip: impl Into<String>,
        user_agent: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            client_ip: client_ip.into(),
            user_agent: user_agent.into(),
            user: None,
            deadline: Instant::now() + timeout,
        }
    }

    pub fn with_user(mut self, user: UserId) -> Self {
        self.user = Some(user);
        self
    }

    fn require_user(&self) -> Result<UserId> {
        self.user
            .ok_or_else(|| LinkPulseError::forbidden("Authentication required"))
    }
}

fn deadline_exceeded(op: &str) -> LinkPulseError {
    warn!("{} exceeded the request deadline", op);
    LinkPulseError::internal(format!("{} exceeded the request deadline", op))
}

/// 在请求截止时间内执行；已过期的请求不再开始
async fn within<T>(
    ctx: &RequestContext,
    op: &str,
    fut: impl Future<Output = Result<T>>,
) -> Result<T> {
    if Instant::now() >= ctx.deadline {
        return Err(deadline_exceeded(op));
    }
    tokio::time::timeout_at(ctx.deadline, fut)
        .await
        .unwrap_or_else(|_| Err(deadline_exceeded(op)))
}

pub struct LinkPulse {
    store: Arc<dyn DurableStore>,
    cache: Arc<dyn CacheStore>,
    resolver: Resolver,
    recorder: ClickRecorder,
    stats: StatsAggregator,
    limiter: RateLimiter,
    links: LinkService,
    profiles: ProfileCache,
    request_timeout: Duration,
}

impl LinkPulse {
    /// 组装所有组件（需要在 Tokio 运行时内调用）
    pub fn new(
        store: Arc<dyn DurableStore>,
        cache: Arc<dyn CacheStore>,
        config: &StaticConfig,
    ) -> Self {
        let ttl = &config.cache;
        Self {
            resolver: Resolver::new(store.clone(), cache.clone(), ttl.destination_ttl()),
            recorder: ClickRecorder::start(
                store.clone(),
                cache.clone(),
                config.click_recorder.clone(),
            ),
            stats: StatsAggregator::new(store.clone(), cache.clone(), ttl.stats_ttl()),
            limiter: RateLimiter::new(cache.clone(), config.rate_limit.clone()),
            links: LinkService::new(store.clone(), cache.clone(), config.links.clone()),
            profiles: ProfileCache::new(cache.clone(), ttl.profile_ttl()),
            request_timeout: config.links.request_timeout(),
            store,
            cache,
        }
    }

    /// 根据配置连接存储与缓存
    ///
    /// 缓存不可达只记录警告：解析路径会回源，限流路径会拒绝请求。
    pub async fn connect(config: &StaticConfig) -> Result<Self> {
        let store =
            StorageFactory::create(&config.database.database_url, config.database.pool_size)
                .await?;
        info!("Using storage backend: {}", store.backend_name());

        let cache = create_cache_store(&config.cache)?;
        match cache.ping().await {
            Ok(()) => info!("Using cache backend: {}", cache.backend_name()),
            Err(e) => error!("Cache backend '{}' unreachable: {}", cache.backend_name(), e),
        }

        Ok(Self::new(store, cache, config))
    }

    /// 以默认请求超时构造上下文
    pub fn request(
        &self,
        client_ip: impl Into<String>,
        user_agent: impl Into<String>,
    ) -> RequestContext {
        RequestContext::new(client_ip, user_agent, self.request_timeout)
    }

    pub async fn resolve(&self, ctx: &RequestContext, code: &str) -> Result<ShortLink> {
        within(ctx, "resolve", self.resolver.resolve(code)).await
    }

    /// 提交点击记录，立即返回
    pub fn record_click(&self, ctx: &RequestContext, link: &ShortLink) -> bool {
        self.recorder.record(ClickJob::for_link(
            link,
            ctx.client_ip.as_str(),
            ctx.user_agent.as_str(),
        ))
    }

    /// 解析后提交点击记录；记录任务不受请求截止时间约束
    pub async fn resolve_and_record(
        &self,
        ctx: &RequestContext,
        code: &str,
    ) -> Result<ShortLink> {
        let link = self.resolve(ctx, code).await?;
        self.record_click(ctx, &link);
        Ok(link)
    }

    pub async fn admit(&self, ctx: &RequestContext, endpoint: &str) -> Result<Admission> {
        within(ctx, "admit", self.limiter.admit(&ctx.client_ip, endpoint)).await
    }

    /// 创建链接（先经过限流）
    pub async fn create_link(
        &self,
        ctx: &RequestContext,
        req: CreateLinkRequest,
    ) -> Result<ShortLink> {
        within(ctx, "create link", async {
            self.limiter
                .admit(&ctx.client_ip, CREATE_LINK_ENDPOINT)
                .await?;
            self.links.create_link(ctx.user, req).await
        })
        .await
    }

    pub async fn update_link(
        &self,
        ctx: &RequestContext,
        code: &str,
        req: UpdateLinkRequest,
    ) -> Result<ShortLink> {
        let user = ctx.require_user()?;
        within(ctx, "update link", self.links.update_link(user, code, req)).await
    }

    pub async fn delete_link(&self, ctx: &RequestContext, code: &str) -> Result<()> {
        let user = ctx.require_user()?;
        within(ctx, "delete link", self.links.delete_link(user, code)).await
    }

    pub async fn list_links(
        &self,
        ctx: &RequestContext,
        page: u64,
        limit: u64,
    ) -> Result<LinkPage> {
        let user = ctx.require_user()?;
        within(ctx, "list links", self.links.list_links(user, page, limit)).await
    }

    pub async fn stats(&self, ctx: &RequestContext, scope: StatsScope) -> Result<DashboardStats> {
        within(ctx, "stats", self.stats.get_stats(scope)).await
    }

    /// 当前用户的仪表盘
    pub async fn dashboard(&self, ctx: &RequestContext) -> Result<DashboardStats> {
        let user = ctx.require_user()?;
        self.stats(ctx, StatsScope::Owner(user)).await
    }

    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    pub fn recorder(&self) -> &ClickRecorder {
        &self.recorder
    }

    pub fn stats_aggregator(&self) -> &StatsAggregator {
        &self.stats
    }

    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    pub fn links(&self) -> &LinkService {
        &self.links
    }

    pub fn profiles(&self) -> &ProfileCache {
        &self.profiles
    }

    pub fn store(&self) -> &Arc<dyn DurableStore> {
        &self.store
    }

    pub fn cache(&self) -> &Arc<dyn CacheStore> {
        &self.cache
    }

    /// 停止接收点击并等待队列排空
    pub async fn shutdown(&self) {
        match tokio::time::timeout(SHUTDOWN_TIMEOUT, self.recorder.shutdown()).await {
            Ok(()) => debug!("LinkPulse shut down cleanly"),
            Err(_) => error!(
                "Click recorder did not drain within {}s; pending clicks lost",
                SHUTDOWN_TIMEOUT.as_secs()
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCacheStore;
    use crate::storage::MemoryStore;

    fn app() -> LinkPulse {
        LinkPulse::new(
            Arc::new(MemoryStore::new()),
            Arc::new(MemoryCacheStore::new()),
            &StaticConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_mutations_require_user() {
        let app = app();
        let ctx = app.request("10.0.0.1", "test");
        assert!(matches!(
            app.delete_link(&ctx, "abc").await,
            Err(LinkPulseError::Forbidden(_))
        ));
        assert!(matches!(
            app.dashboard(&ctx).await,
            Err(LinkPulseError::Forbidden(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_elapsed_deadline_is_internal() {
        let app = app();
        let ctx = RequestContext::new("10.0.0.1", "test", Duration::from_millis(10));
        tokio::time::advance(Duration::from_millis(20)).await;

        let err = app.resolve(&ctx, "abc123").await.unwrap_err();
        assert!(matches!(err, LinkPulseError::Internal(_)));
        assert!(err.is_retriable());
    }
}
