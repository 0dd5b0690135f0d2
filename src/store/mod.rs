//! Key-value store backends
//!
//! Provides the TTL-capable mapping store behind the user registry and the
//! OAuth exchange, with a unified trait interface:
//! - `RedisKv`: production backend over a pooled Redis connection
//! - `MemoryKv`: in-process backend for tests and redis-less development
//!
//! Operations are independently atomic per key but never transactional
//! across keys; the registry documents the resulting consistency windows.

pub mod memory;
pub mod redis;

pub use memory::MemoryKv;
pub use redis::RedisKv;

use crate::Result;
use async_trait::async_trait;

/// TTL-capable key-value store
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Get a value by key
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Set a value with no expiry
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Set a value that expires after `ttl_secs`
    async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> Result<()>;

    /// Delete a key, returning whether it existed
    async fn delete(&self, key: &str) -> Result<bool>;

    /// Cursor-based scan over keys matching a `prefix*` pattern
    ///
    /// Returns the next cursor (0 when the scan is complete) and a batch of
    /// matching keys. `count` is a batch-size hint, not a guarantee.
    async fn scan(&self, pattern: &str, cursor: u64, count: usize) -> Result<(u64, Vec<String>)>;

    /// Atomically increment a counter, returning the new value
    async fn incr(&self, key: &str) -> Result<i64>;

    /// Atomically decrement a counter, returning the new value
    async fn decr(&self, key: &str) -> Result<i64>;
}
