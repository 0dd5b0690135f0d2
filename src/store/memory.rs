//! In-memory key-value store
//!
//! Backs tests and redis-less local development. Expiry is checked lazily on
//! read, which is enough to make an expired code indistinguishable from one
//! that never existed.

use super::KvStore;
use crate::Result;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::time::{Duration, Instant};

struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| Instant::now() >= at)
    }
}

/// In-process key-value store behind a `RwLock`
#[derive(Default)]
pub struct MemoryKv {
    entries: RwLock<HashMap<String, Entry>>,
}

impl MemoryKv {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

/// `prefix*` glob used by SCAN; anything else is an exact match
fn key_matches(pattern: &str, key: &str) -> bool {
    match pattern.strip_suffix('*') {
        Some(prefix) => key.starts_with(prefix),
        None => key == pattern,
    }
}

#[async_trait]
impl KvStore for MemoryKv {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        // Drop expired entries on read so a later SCAN doesn't resurrect them
        let expired = {
            let entries = self.entries.read();
            match entries.get(key) {
                Some(entry) if entry.is_expired() => true,
                Some(entry) => return Ok(Some(entry.value.clone())),
                None => return Ok(None),
            }
        };
        if expired {
            self.entries.write().remove(key);
        }
        Ok(None)
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries.write().insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: None,
            },
        );
        Ok(())
    }

    async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> Result<()> {
        self.entries.write().insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: Some(Instant::now() + Duration::from_secs(ttl_secs)),
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        match self.entries.write().remove(key) {
            Some(entry) => Ok(!entry.is_expired()),
            None => Ok(false),
        }
    }

    async fn scan(&self, pattern: &str, cursor: u64, count: usize) -> Result<(u64, Vec<String>)> {
        let entries = self.entries.read();
        let mut matching: Vec<String> = entries
            .iter()
            .filter(|(key, entry)| key_matches(pattern, key) && !entry.is_expired())
            .map(|(key, _)| key.clone())
            .collect();
        // Stable order so the cursor (an offset here) pages deterministically
        matching.sort();

        let offset = cursor as usize;
        let batch: Vec<String> = matching.iter().skip(offset).take(count).cloned().collect();
        let next = offset + batch.len();
        let next_cursor = if next >= matching.len() { 0 } else { next as u64 };
        Ok((next_cursor, batch))
    }

    async fn incr(&self, key: &str) -> Result<i64> {
        let mut entries = self.entries.write();
        let current = entries
            .get(key)
            .filter(|e| !e.is_expired())
            .and_then(|e| e.value.parse::<i64>().ok())
            .unwrap_or(0);
        let next = current + 1;
        entries.insert(
            key.to_string(),
            Entry {
                value: next.to_string(),
                expires_at: None,
            },
        );
        Ok(next)
    }

    async fn decr(&self, key: &str) -> Result<i64> {
        let mut entries = self.entries.write();
        let current = entries
            .get(key)
            .filter(|e| !e.is_expired())
            .and_then(|e| e.value.parse::<i64>().ok())
            .unwrap_or(0);
        let next = current - 1;
        entries.insert(
            key.to_string(),
            Entry {
                value: next.to_string(),
                expires_at: None,
            },
        );
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_get_delete() {
        let store = MemoryKv::new();
        store.set("a", "1").await.unwrap();
        assert_eq!(store.get("a").await.unwrap().as_deref(), Some("1"));
        assert!(store.delete("a").await.unwrap());
        assert!(!store.delete("a").await.unwrap());
        assert_eq!(store.get("a").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_set_ex_expires() {
        let store = MemoryKv::new();
        store.set_ex("code", "tok", 0).await.unwrap();
        assert_eq!(store.get("code").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_scan_pages_in_order() {
        let store = MemoryKv::new();
        for i in 0..5 {
            store.set(&format!("user:{i}"), "x").await.unwrap();
        }
        store.set("other:0", "x").await.unwrap();

        let (cursor, first) = store.scan("user:*", 0, 2).await.unwrap();
        assert_eq!(first, vec!["user:0", "user:1"]);
        let (cursor, second) = store.scan("user:*", cursor, 2).await.unwrap();
        assert_eq!(second, vec!["user:2", "user:3"]);
        let (cursor, third) = store.scan("user:*", cursor, 2).await.unwrap();
        assert_eq!(third, vec!["user:4"]);
        assert_eq!(cursor, 0);
    }

    #[tokio::test]
    async fn test_incr_decr() {
        let store = MemoryKv::new();
        assert_eq!(store.incr("n").await.unwrap(), 1);
        assert_eq!(store.incr("n").await.unwrap(), 2);
        assert_eq!(store.decr("n").await.unwrap(), 1);
    }
}
