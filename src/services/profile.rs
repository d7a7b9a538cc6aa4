//! Cache-aside for user profiles
//!
//! The profile itself belongs to the account service; this only keeps a
//! disposable copy under `user:<id>:profile`.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::cache::{self, CacheKey, CacheStore};
use crate::errors::Result;
use crate::storage::UserId;

pub struct ProfileCache {
    cache: Arc<dyn CacheStore>,
    ttl: Duration,
}

impl ProfileCache {
    pub fn new(cache: Arc<dyn CacheStore>, ttl: Duration) -> Self {
        Self { cache, ttl }
    }

    /// 命中直接返回；未命中时调用 `loader`，成功后回填
    pub async fn get_or_load<T, F, Fut>(&self, user: UserId, loader: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(UserId) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let key = CacheKey::Profile(user);
        if let Some(profile) = cache::get_json::<T>(self.cache.as_ref(), &key).await {
            return Ok(profile);
        }

        let profile = loader(user).await?;
        cache::put_json(self.cache.as_ref(), &key, &profile, self.ttl).await;
        Ok(profile)
    }

    /// 资料变更后调用
    pub async fn invalidate(&self, user: UserId) {
        cache::invalidate(self.cache.as_ref(), &[CacheKey::Profile(user)]).await;
    }
}
