mod memory;
mod redis;

pub use self::memory::MemoryCacheStore;
pub use self::redis::RedisCacheStore;
