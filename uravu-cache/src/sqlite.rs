use crate::{expires_at_millis, schema, CacheError, ReportCache};
use async_trait::async_trait;
use chrono::Utc;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use rusqlite::{params, Connection, OptionalExtension};
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use uravu_core::query::Fingerprint;
use uravu_core::report::FluxReport;

/// SQLite-backed report cache.
///
/// Cheaply cloneable; clones share one connection.
#[derive(Clone)]
pub struct SqliteCache {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteCache {
    /// Private cache living as long as this process.
    pub fn open_in_memory() -> Result<Self, CacheError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    /// File-backed cache, created if missing, shared across runs.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, CacheError> {
        Self::with_connection(Connection::open(path)?)
    }

    fn with_connection(conn: Connection) -> Result<Self, CacheError> {
        conn.execute_batch(schema::create_schema())?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, CacheError> {
        self.conn.lock().map_err(|_| CacheError::Poisoned)
    }

    /// Delete every expired row. Returns how many were removed.
    pub fn purge_expired(&self) -> Result<usize, CacheError> {
        let conn = self.lock()?;
        let removed = conn.execute(
            "DELETE FROM flux_reports WHERE expires_at <= ?1",
            params![Utc::now().timestamp_millis()],
        )?;
        log::debug!("cache: purged {} expired reports", removed);
        Ok(removed)
    }

    /// Number of rows, expired or not.
    pub fn len(&self) -> Result<usize, CacheError> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM flux_reports", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    pub fn is_empty(&self) -> Result<bool, CacheError> {
        Ok(self.len()? == 0)
    }
}

fn encode(report: &FluxReport) -> Result<Vec<u8>, CacheError> {
    let json = serde_json::to_vec(report)?;
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&json)?;
    Ok(encoder.finish()?)
}

fn decode(payload: &[u8]) -> Result<FluxReport, CacheError> {
    Ok(serde_json::from_reader(GzDecoder::new(payload))?)
}

#[async_trait]
impl ReportCache for SqliteCache {
    async fn get(&self, key: &Fingerprint) -> Result<Option<FluxReport>, CacheError> {
        let payload: Option<Vec<u8>> = {
            let conn = self.lock()?;
            conn.query_row(
                "SELECT payload FROM flux_reports WHERE fingerprint = ?1 AND expires_at > ?2",
                params![key.as_str(), Utc::now().timestamp_millis()],
                |row| row.get(0),
            )
            .optional()?
        };
        payload.as_deref().map(decode).transpose()
    }

    async fn set(
        &self,
        key: &Fingerprint,
        report: &FluxReport,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        let payload = encode(report)?;
        let now = Utc::now().timestamp_millis();
        let conn = self.lock()?;
        conn.execute(
            "INSERT OR REPLACE INTO flux_reports (fingerprint, payload, created_at, expires_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![key.as_str(), payload, now, expires_at_millis(now, ttl)],
        )?;
        log::debug!("cache: stored {} ({} bytes)", key, payload.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uravu_core::fakes::sample_report;
    use uravu_core::query::{CityQuery, Interval};

    fn key(city: &str) -> Fingerprint {
        CityQuery::new(city, "2024-12-15", "2024-12-15", Interval::Daily)
            .normalize()
            .unwrap()
            .fingerprint()
    }

    #[tokio::test]
    async fn round_trips_report() {
        let cache = SqliteCache::open_in_memory().unwrap();
        let report = sample_report("Bangalore");
        cache
            .set(&key("Bangalore"), &report, Duration::from_secs(3600))
            .await
            .unwrap();
        assert_eq!(cache.get(&key("Bangalore")).await.unwrap(), Some(report));
        assert_eq!(cache.get(&key("Chennai")).await.unwrap(), None);
    }

    #[tokio::test]
    async fn expired_entries_are_misses() {
        let cache = SqliteCache::open_in_memory().unwrap();
        cache
            .set(&key("Pune"), &sample_report("Pune"), Duration::ZERO)
            .await
            .unwrap();
        assert_eq!(cache.get(&key("Pune")).await.unwrap(), None);
        assert_eq!(cache.len().unwrap(), 1);
        assert_eq!(cache.purge_expired().unwrap(), 1);
        assert!(cache.is_empty().unwrap());
    }

    #[tokio::test]
    async fn set_replaces_existing_entry() {
        let cache = SqliteCache::open_in_memory().unwrap();
        let mut report = sample_report("Delhi");
        cache.set(&key("Delhi"), &report, Duration::from_secs(60)).await.unwrap();
        report.net_flux_l = 1.0;
        cache.set(&key("Delhi"), &report, Duration::from_secs(60)).await.unwrap();
        assert_eq!(cache.len().unwrap(), 1);
        let stored = cache.get(&key("Delhi")).await.unwrap().unwrap();
        assert_eq!(stored.net_flux_l, 1.0);
    }

    #[tokio::test]
    async fn corrupt_payload_is_an_error() {
        let cache = SqliteCache::open_in_memory().unwrap();
        {
            let conn = cache.lock().unwrap();
            conn.execute(
                "INSERT INTO flux_reports (fingerprint, payload, created_at, expires_at)
                 VALUES (?1, ?2, 0, ?3)",
                params![key("Goa").as_str(), b"not gzip".to_vec(), i64::MAX],
            )
            .unwrap();
        }
        assert!(cache.get(&key("Goa")).await.is_err());
    }

    #[tokio::test]
    async fn file_cache_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flux-cache.sqlite");
        let report = sample_report("Mumbai");
        {
            let cache = SqliteCache::open(&path).unwrap();
            cache
                .set(&key("Mumbai"), &report, Duration::from_secs(3600))
                .await
                .unwrap();
        }
        let reopened = SqliteCache::open(&path).unwrap();
        assert_eq!(reopened.get(&key("Mumbai")).await.unwrap(), Some(report));
    }
}
