//! Typed cache key builder
//!
//! Every key the core writes is rendered here. Owner-scoped and global
//! stats keys are separate variants, so a scope can never render into the
//! other's key.

use std::fmt;

use crate::storage::{StatsScope, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheKey<'a> {
    /// `link:<code>:destination`
    Destination(&'a str),
    /// `analytics:user:<id>:7d`
    OwnerStats(UserId),
    /// `analytics:global:7d`
    GlobalStats,
    /// `user:<id>:profile`
    Profile(UserId),
    /// `ratelimit:<identity>:<endpoint>`
    RateLimit {
        identity: &'a str,
        endpoint: &'a str,
    },
}

impl CacheKey<'_> {
    pub fn stats(scope: StatsScope) -> CacheKey<'static> {
        match scope {
            StatsScope::Global => CacheKey::GlobalStats,
            StatsScope::Owner(owner) => CacheKey::OwnerStats(owner),
        }
    }

    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for CacheKey<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheKey::Destination(code) => write!(f, "link:{}:destination", code),
            CacheKey::OwnerStats(owner) => write!(f, "analytics:user:{}:7d", owner),
            CacheKey::GlobalStats => f.write_str("analytics:global:7d"),
            CacheKey::Profile(user) => write!(f, "user:{}:profile", user),
            CacheKey::RateLimit { identity, endpoint } => {
                write!(f, "ratelimit:{}:{}", identity, endpoint)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_schema() {
        assert_eq!(
            CacheKey::Destination("abc123").render(),
            "link:abc123:destination"
        );
        assert_eq!(
            CacheKey::OwnerStats(UserId(42)).render(),
            "analytics:user:42:7d"
        );
        assert_eq!(CacheKey::GlobalStats.render(), "analytics:global:7d");
        assert_eq!(CacheKey::Profile(UserId(42)).render(), "user:42:profile");
        assert_eq!(
            CacheKey::RateLimit {
                identity: "10.0.0.1",
                endpoint: "/api/v1/links"
            }
            .render(),
            "ratelimit:10.0.0.1:/api/v1/links"
        );
    }

    #[test]
    fn test_stats_scope_keys_differ() {
        assert_eq!(CacheKey::stats(StatsScope::Global), CacheKey::GlobalStats);
        assert_eq!(
            CacheKey::stats(StatsScope::Owner(UserId(1))).render(),
            "analytics:user:1:7d"
        );
        assert_ne!(
            CacheKey::stats(StatsScope::Global).render(),
            CacheKey::stats(StatsScope::Owner(UserId(0))).render()
        );
    }
}
