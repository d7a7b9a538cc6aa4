//! Link management service
//!
//! Create / update / delete / list over the durable store, followed by the
//! cache invalidations each mutation implies. Admission control for creation
//! is applied by the caller before `create_link`.

use std::sync::Arc;

use tracing::{info, warn};

use crate::cache::{self, CacheKey, CacheStore};
use crate::config::LinksConfig;
use crate::errors::{LinkPulseError, Result};
use crate::storage::{DurableStore, LinkPage, LinkStatus, NewShortLink, ShortLink, UserId};
use crate::utils::{generate_random_code, is_valid_short_code, validate_destination};

/// 生成短码冲突时的最大尝试次数
const MAX_GENERATE_ATTEMPTS: usize = 5;

pub const DEFAULT_PAGE_LIMIT: u64 = 10;
pub const MAX_PAGE_LIMIT: u64 = 100;

/// Request to create a new link
#[derive(Debug, Clone, Default)]
pub struct CreateLinkRequest {
    pub original_url: String,
    /// 为空时自动生成
    pub short_code: Option<String>,
}

/// Request to update an existing link; `None` fields keep their value
#[derive(Debug, Clone, Default)]
pub struct UpdateLinkRequest {
    pub original_url: Option<String>,
    pub short_code: Option<String>,
    pub status: Option<LinkStatus>,
}

pub struct LinkService {
    store: Arc<dyn DurableStore>,
    cache: Arc<dyn CacheStore>,
    settings: LinksConfig,
}

impl LinkService {
    pub fn new(
        store: Arc<dyn DurableStore>,
        cache: Arc<dyn CacheStore>,
        settings: LinksConfig,
    ) -> Self {
        Self {
            store,
            cache,
            settings,
        }
    }

    fn check_code(&self, code: &str) -> Result<()> {
        if is_valid_short_code(code, self.settings.max_code_length) {
            Ok(())
        } else {
            Err(LinkPulseError::validation(format!(
                "Invalid short code '{}': 1-{} ASCII letters or digits",
                code, self.settings.max_code_length
            )))
        }
    }

    /// 读取并校验所有权
    async fn owned_link(&self, owner: UserId, code: &str) -> Result<ShortLink> {
        let link = self
            .store
            .get_link_by_code(code)
            .await
            .map_err(|e| e.or_internal("lookup short code"))?
            .ok_or_else(|| LinkPulseError::not_found(format!("Link '{}' not found", code)))?;

        if link.owner != Some(owner) {
            return Err(LinkPulseError::forbidden(format!(
                "Link '{}' does not belong to user {}",
                code, owner
            )));
        }
        Ok(link)
    }

    /// 统计键：所有者（如有）+ 全局
    fn stats_keys(owner: Option<UserId>) -> Vec<CacheKey<'static>> {
        match owner {
            Some(owner) => vec![CacheKey::OwnerStats(owner), CacheKey::GlobalStats],
            None => vec![CacheKey::GlobalStats],
        }
    }

    /// Create a new short link
    pub async fn create_link(
        &self,
        owner: Option<UserId>,
        req: CreateLinkRequest,
    ) -> Result<ShortLink> {
        let original_url = validate_destination(&req.original_url)?;

        let link = match req.short_code.filter(|c| !c.is_empty()) {
            Some(code) => {
                self.check_code(&code)?;
                self.store
                    .insert_link(NewShortLink {
                        owner,
                        original_url,
                        short_code: code,
                        status: LinkStatus::Active,
                    })
                    .await
                    .map_err(|e| e.or_internal("insert link"))?
            }
            None => self.insert_generated(owner, original_url).await?,
        };

        cache::invalidate(self.cache.as_ref(), &Self::stats_keys(owner)).await;
        info!(
            "LinkService: created '{}' -> '{}'",
            link.short_code, link.original_url
        );
        Ok(link)
    }

    async fn insert_generated(
        &self,
        owner: Option<UserId>,
        original_url: String,
    ) -> Result<ShortLink> {
        for attempt in 1..=MAX_GENERATE_ATTEMPTS {
            let code = generate_random_code(self.settings.code_length);
            if self
                .store
                .code_exists(&code)
                .await
                .map_err(|e| e.or_internal("check short code"))?
            {
                continue;
            }

            let new_link = NewShortLink {
                owner,
                original_url: original_url.clone(),
                short_code: code,
                status: LinkStatus::Active,
            };
            match self.store.insert_link(new_link).await {
                Ok(link) => return Ok(link),
                // 并发创建抢占了同一个短码
                Err(LinkPulseError::Conflict(msg)) => {
                    warn!("Generated code collided (attempt {}): {}", attempt, msg);
                }
                Err(e) => return Err(e.or_internal("insert link")),
            }
        }

        Err(LinkPulseError::conflict(format!(
            "Could not generate a unique short code after {} attempts",
            MAX_GENERATE_ATTEMPTS
        )))
    }

    /// Update an existing link owned by `owner`
    pub async fn update_link(
        &self,
        owner: UserId,
        code: &str,
        req: UpdateLinkRequest,
    ) -> Result<ShortLink> {
        let existing = self.owned_link(owner, code).await?;
        let mut changed = existing.clone();

        if let Some(url) = req.original_url {
            changed.original_url = validate_destination(&url)?;
        }
        if let Some(status) = req.status {
            changed.status = status;
        }
        if let Some(new_code) = req.short_code.filter(|c| !c.is_empty() && c != code) {
            self.check_code(&new_code)?;
            if self
                .store
                .code_exists(&new_code)
                .await
                .map_err(|e| e.or_internal("check short code"))?
            {
                return Err(LinkPulseError::conflict(format!(
                    "Short code already in use: {}",
                    new_code
                )));
            }
            changed.short_code = new_code;
        }

        let updated = self
            .store
            .update_link(&changed)
            .await
            .map_err(|e| e.or_internal("update link"))?;

        {
            let mut keys = vec![CacheKey::Destination(code)];
            if updated.short_code != code {
                keys.push(CacheKey::Destination(&updated.short_code));
            }
            keys.extend(Self::stats_keys(existing.owner));
            cache::invalidate(self.cache.as_ref(), &keys).await;
        }

        info!("LinkService: updated '{}'", code);
        Ok(updated)
    }

    /// Delete a link owned by `owner`
    pub async fn delete_link(&self, owner: UserId, code: &str) -> Result<()> {
        let existing = self.owned_link(owner, code).await?;

        let removed = self
            .store
            .delete_link(code)
            .await
            .map_err(|e| e.or_internal("delete link"))?;
        if !removed {
            return Err(LinkPulseError::not_found(format!("Link '{}' not found", code)));
        }

        let mut keys = vec![CacheKey::Destination(code)];
        keys.extend(Self::stats_keys(existing.owner));
        cache::invalidate(self.cache.as_ref(), &keys).await;

        info!("LinkService: deleted '{}'", code);
        Ok(())
    }

    /// List `owner`'s links, newest first
    ///
    /// `page` starts at 1; zero values fall back to page 1 / limit 10.
    pub async fn list_links(&self, owner: UserId, page: u64, limit: u64) -> Result<LinkPage> {
        let page = page.max(1);
        let limit = match limit {
            0 => DEFAULT_PAGE_LIMIT,
            n => n.min(MAX_PAGE_LIMIT),
        };
        let offset = (page - 1).saturating_mul(limit);

        let (items, total) = self
            .store
            .list_links(owner, limit, offset)
            .await
            .map_err(|e| e.or_internal("list links"))?;
        Ok(LinkPage::new(items, total, limit, page))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCacheStore;
    use crate::storage::MemoryStore;
    use std::time::Duration;

    fn service() -> (LinkService, Arc<MemoryStore>, Arc<MemoryCacheStore>) {
        let store = Arc::new(MemoryStore::new());
        let cache = Arc::new(MemoryCacheStore::new());
        let service = LinkService::new(store.clone(), cache.clone(), LinksConfig::default());
        (service, store, cache)
    }

    fn create(url: &str, code: Option<&str>) -> CreateLinkRequest {
        CreateLinkRequest {
            original_url: url.to_string(),
            short_code: code.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn test_create_generates_code() {
        let (service, _store, _cache) = service();
        let link = service
            .create_link(None, create("https://example.com", None))
            .await
            .unwrap();
        assert_eq!(link.short_code.len(), 6);
        assert!(link.short_code.bytes().all(|b| b.is_ascii_alphanumeric()));
        assert_eq!(link.status, LinkStatus::Active);
    }

    #[tokio::test]
    async fn test_create_validation() {
        let (service, _store, _cache) = service();
        assert!(matches!(
            service.create_link(None, create("ftp://x.org", None)).await,
            Err(LinkPulseError::Validation(_))
        ));
        assert!(matches!(
            service
                .create_link(None, create("https://x.org", Some("bad-code")))
                .await,
            Err(LinkPulseError::Validation(_))
        ));

        service
            .create_link(None, create("https://x.org", Some("taken")))
            .await
            .unwrap();
        assert!(matches!(
            service
                .create_link(Some(UserId(1)), create("https://y.org", Some("taken")))
                .await,
            Err(LinkPulseError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_generation_gives_up_with_conflict() {
        let store = Arc::new(MemoryStore::new());
        let settings = LinksConfig {
            code_length: 1,
            ..LinksConfig::default()
        };
        let service = LinkService::new(store, Arc::new(MemoryCacheStore::new()), settings);

        // 单字符短码全部占满
        for c in ('A'..='Z').chain('a'..='z').chain('0'..='9') {
            service
                .create_link(None, create("https://x.org", Some(&c.to_string())))
                .await
                .unwrap();
        }

        let err = service
            .create_link(None, create("https://y.org", None))
            .await
            .unwrap_err();
        assert!(matches!(err, LinkPulseError::Conflict(_)));
        assert_eq!(err.http_status(), 409);
    }

    #[tokio::test]
    async fn test_create_invalidates_stats() {
        let (service, _store, cache) = service();
        let ttl = Duration::from_secs(3600);
        cache.set_ex("analytics:user:1:7d", "{}", ttl).await.unwrap();
        cache.set_ex("analytics:global:7d", "{}", ttl).await.unwrap();

        service
            .create_link(Some(UserId(1)), create("https://example.com", Some("abc")))
            .await
            .unwrap();
        assert!(!cache.contains("analytics:user:1:7d"));
        assert!(!cache.contains("analytics:global:7d"));
    }

    #[tokio::test]
    async fn test_update_ownership_and_conflict() {
        let (service, _store, _cache) = service();
        service
            .create_link(Some(UserId(1)), create("https://a.org", Some("mine")))
            .await
            .unwrap();
        service
            .create_link(Some(UserId(2)), create("https://b.org", Some("theirs")))
            .await
            .unwrap();

        let rename = UpdateLinkRequest {
            short_code: Some("theirs".into()),
            ..Default::default()
        };
        assert!(matches!(
            service.update_link(UserId(1), "mine", rename).await,
            Err(LinkPulseError::Conflict(_))
        ));
        assert!(matches!(
            service
                .update_link(UserId(1), "theirs", UpdateLinkRequest::default())
                .await,
            Err(LinkPulseError::Forbidden(_))
        ));
        assert!(matches!(
            service.delete_link(UserId(1), "ghost").await,
            Err(LinkPulseError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_rename_invalidates_both_codes() {
        let (service, store, cache) = service();
        service
            .create_link(Some(UserId(1)), create("https://a.org", Some("old")))
            .await
            .unwrap();
        let ttl = Duration::from_secs(60);
        cache.set_ex("link:old:destination", "{}", ttl).await.unwrap();
        cache.set_ex("link:new:destination", "{}", ttl).await.unwrap();

        let req = UpdateLinkRequest {
            short_code: Some("new".into()),
            ..Default::default()
        };
        let updated = service.update_link(UserId(1), "old", req).await.unwrap();
        assert_eq!(updated.short_code, "new");
        assert!(!cache.contains("link:old:destination"));
        assert!(!cache.contains("link:new:destination"));
        assert!(store.get_link_by_code("old").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_pagination() {
        let (service, _store, _cache) = service();
        for i in 0..12 {
            service
                .create_link(
                    Some(UserId(1)),
                    create("https://a.org", Some(&format!("code{i}"))),
                )
                .await
                .unwrap();
        }
        service
            .create_link(Some(UserId(2)), create("https://b.org", None))
            .await
            .unwrap();

        let first = service.list_links(UserId(1), 0, 0).await.unwrap();
        assert_eq!(first.items.len(), 10);
        assert_eq!(first.total, 12);
        assert_eq!(first.pages, 2);
        assert!(first.next);
        assert!(!first.back);

        let second = service.list_links(UserId(1), 2, 10).await.unwrap();
        assert_eq!(second.items.len(), 2);
        assert!(!second.next);
        assert!(second.back);
    }
}
