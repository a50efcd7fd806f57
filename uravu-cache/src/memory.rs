use crate::{expires_at_millis, CacheError, ReportCache};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use uravu_core::query::Fingerprint;
use uravu_core::report::FluxReport;

/// Process-local report cache. Expired entries are dropped on read.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<Fingerprint, (i64, FluxReport)>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ReportCache for MemoryCache {
    async fn get(&self, key: &Fingerprint) -> Result<Option<FluxReport>, CacheError> {
        let mut entries = self.entries.lock().map_err(|_| CacheError::Poisoned)?;
        let now = Utc::now().timestamp_millis();
        match entries.get(key) {
            Some((expires_at, report)) if *expires_at > now => Ok(Some(report.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set(
        &self,
        key: &Fingerprint,
        report: &FluxReport,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        let expires_at = expires_at_millis(Utc::now().timestamp_millis(), ttl);
        self.entries
            .lock()
            .map_err(|_| CacheError::Poisoned)?
            .insert(key.clone(), (expires_at, report.clone()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uravu_core::fakes::sample_report;
    use uravu_core::query::{CityQuery, Interval};

    fn key(city: &str) -> Fingerprint {
        CityQuery::new(city, "2024-12", "2024-12", Interval::Monthly)
            .normalize()
            .unwrap()
            .fingerprint()
    }

    #[tokio::test]
    async fn stores_and_returns_snapshot() {
        let cache = MemoryCache::new();
        let report = sample_report("Chennai");
        cache.set(&key("Chennai"), &report, Duration::from_secs(60)).await.unwrap();
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&key("Chennai")).await.unwrap(), Some(report));
    }

    #[tokio::test]
    async fn expired_entry_is_evicted_on_read() {
        let cache = MemoryCache::new();
        cache
            .set(&key("Kochi"), &sample_report("Kochi"), Duration::ZERO)
            .await
            .unwrap();
        assert_eq!(cache.get(&key("Kochi")).await.unwrap(), None);
        assert!(cache.is_empty());
    }
}
