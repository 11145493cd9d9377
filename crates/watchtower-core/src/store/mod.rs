//! Key-value store seam.
//!
//! Every persisted blob goes through [`KeyValueStore`]: string keys, JSON
//! string values, per-key TTLs. Production talks to a Redis-over-HTTP
//! endpoint ([`RestStore`]); tests and the CLI's offline mode use
//! [`MemoryStore`].

mod memory;
mod pattern;
mod rest;

pub use memory::MemoryStore;
pub use pattern::glob_match;
pub use rest::RestStore;

use std::time::Duration;

use async_trait::async_trait;

use crate::error::StoreError;

#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Value stored under `key`, if present and not expired.
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Store `value` under `key`, expiring after `ttl`.
    async fn set_ex(&self, key: &str, ttl: Duration, value: String) -> Result<(), StoreError>;

    /// Keys matching a Redis glob pattern.
    async fn keys(&self, pattern: &str) -> Result<Vec<String>, StoreError>;

    /// Remove `key`. Returns whether a key was removed.
    async fn del(&self, key: &str) -> Result<bool, StoreError>;
}
