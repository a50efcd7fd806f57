//! Result cache for flux reports.
//!
//! The cache is advisory: callers treat every [`CacheError`] as a miss (on
//! read) or ignore it (on write). Two stores are provided:
//!
//! - [`SqliteCache`] keeps gzip-compressed JSON reports in a SQLite table,
//!   either in memory or in a file shared between runs.
//! - [`MemoryCache`] keeps report snapshots in a `HashMap`.
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use uravu_cache::{ReportCache, SqliteCache};
//! # async fn demo(key: uravu_core::query::Fingerprint, report: uravu_core::report::FluxReport) -> Result<(), uravu_cache::CacheError> {
//! let cache = SqliteCache::open_in_memory()?;
//! cache.set(&key, &report, Duration::from_secs(3600)).await?;
//! assert_eq!(cache.get(&key).await?, Some(report));
//! # Ok(())
//! # }
//! ```

pub mod schema;
mod memory;
mod sqlite;

pub use memory::MemoryCache;
pub use sqlite::SqliteCache;

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use uravu_core::query::Fingerprint;
use uravu_core::report::FluxReport;

/// Default time-to-live for cached reports.
pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);

/// Cache read/write failure. Never fatal to a request.
#[derive(Error, Debug)]
pub enum CacheError {
    /// SQLite failed to open, prepare or execute
    #[error("Cache storage failed: {0}")]
    Storage(#[from] rusqlite::Error),

    /// Report could not be encoded or a stored payload decoded
    #[error("Cache payload serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Gzip stream failed
    #[error("Cache payload compression failed: {0}")]
    Compression(#[from] std::io::Error),

    /// A previous holder of the store lock panicked
    #[error("Cache lock poisoned")]
    Poisoned,
}

/// Key/value store of report snapshots with per-entry expiry.
#[async_trait]
pub trait ReportCache: Send + Sync {
    /// The stored report if present and unexpired.
    async fn get(&self, key: &Fingerprint) -> Result<Option<FluxReport>, CacheError>;

    /// Store `report` under `key` until `ttl` has elapsed.
    async fn set(&self, key: &Fingerprint, report: &FluxReport, ttl: Duration)
        -> Result<(), CacheError>;
}

/// Expiry instant `ttl` from now, in Unix milliseconds.
pub(crate) fn expires_at_millis(now_millis: i64, ttl: Duration) -> i64 {
    let ttl_millis = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
    now_millis.saturating_add(ttl_millis)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expiry_saturates() {
        assert_eq!(expires_at_millis(1_000, Duration::from_secs(1)), 2_000);
        assert_eq!(expires_at_millis(1_000, Duration::MAX), i64::MAX);
    }
}
