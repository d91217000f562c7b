//! In-memory record store for challenges and authentications.
//!
//! Challenge keys are 64-char hex hashes and authentication keys are
//! UUIDv4 strings, so both record kinds share one map without collisions.

mod sweeper;

pub use sweeper::sweeper_worker;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;

/// Request binding shared by both record kinds
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordData {
    /// Cookie domain (`example.com` or wildcard `.example.com`)
    pub domain: String,
    /// User-Agent of the request that created the record
    pub user_agent: String,
    /// Client address (X-Real-IP)
    pub client_addr: String,
    /// Absolute expiry
    pub expires: DateTime<Utc>,
}

impl RecordData {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires < now
    }
}

/// Stored record, tagged by kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record {
    /// Unsolved CAPTCHA, keyed by answer hash
    Challenge(RecordData),
    /// Issued cookie, keyed by its UUID value
    Authentication(RecordData),
}

impl Record {
    pub fn data(&self) -> &RecordData {
        match self {
            Self::Challenge(data) | Self::Authentication(data) => data,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Challenge(_) => "challenge",
            Self::Authentication(_) => "authentication",
        }
    }
}

/// Concurrent key -> record map
///
/// Single operations are linearizable per key. Cloning shares the map.
#[derive(Debug, Clone, Default)]
pub struct RecordStore {
    records: Arc<DashMap<String, Record>>,
}

impl RecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the record under `key`
    pub fn store(&self, key: impl Into<String>, record: Record) {
        self.records.insert(key.into(), record);
    }

    /// Copy of the record under `key`
    pub fn load(&self, key: &str) -> Option<Record> {
        self.records.get(key).map(|r| r.value().clone())
    }

    /// Remove `key`, returning the record if present
    pub fn delete(&self, key: &str) -> Option<Record> {
        self.records.remove(key).map(|(_, record)| record)
    }

    /// Atomically remove `key` only if it holds a challenge.
    ///
    /// At most one caller receives the record for a given challenge.
    pub fn take_challenge(&self, key: &str) -> Option<RecordData> {
        self.records
            .remove_if(key, |_, record| matches!(record, Record::Challenge(_)))
            .and_then(|(_, record)| match record {
                Record::Challenge(data) => Some(data),
                Record::Authentication(_) => None,
            })
    }

    /// Visit every entry until `f` returns false
    pub fn range<F>(&self, mut f: F)
    where
        F: FnMut(&str, &Record) -> bool,
    {
        for entry in self.records.iter() {
            if !f(entry.key(), entry.value()) {
                break;
            }
        }
    }

    /// Drop every record that expired before `now`, returning the evicted keys.
    ///
    /// Each shard is write-locked while it is scanned, so a concurrent `store`
    /// of the same key lands either before the check or after the removal.
    pub fn evict_expired(&self, now: DateTime<Utc>) -> Vec<(String, &'static str)> {
        let mut evicted = Vec::new();
        self.records.retain(|key, record| {
            if record.data().is_expired_at(now) {
                evicted.push((key.clone(), record.kind()));
                false
            } else {
                true
            }
        });
        evicted
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn data(expires: DateTime<Utc>) -> RecordData {
        RecordData {
            domain: "example.com".to_string(),
            user_agent: "Mozilla/5.0".to_string(),
            client_addr: "10.0.0.1".to_string(),
            expires,
        }
    }

    #[test]
    fn test_store_load_delete() {
        let store = RecordStore::new();
        let record = Record::Challenge(data(Utc::now() + Duration::seconds(60)));

        store.store("abc", record.clone());
        assert_eq!(store.load("abc"), Some(record.clone()));
        assert_eq!(store.len(), 1);

        assert_eq!(store.delete("abc"), Some(record));
        assert_eq!(store.load("abc"), None);
        assert!(store.is_empty());
    }

    #[test]
    fn test_take_challenge_once() {
        let store = RecordStore::new();
        let expires = Utc::now() + Duration::seconds(60);
        store.store("abc", Record::Challenge(data(expires)));

        assert_eq!(store.take_challenge("abc"), Some(data(expires)));
        assert_eq!(store.take_challenge("abc"), None);
    }

    #[test]
    fn test_take_challenge_ignores_authentication() {
        let store = RecordStore::new();
        let record = Record::Authentication(data(Utc::now() + Duration::seconds(60)));
        store.store("id", record.clone());

        assert_eq!(store.take_challenge("id"), None);
        assert_eq!(store.load("id"), Some(record));
    }

    #[test]
    fn test_take_challenge_concurrent() {
        let store = RecordStore::new();
        store.store(
            "abc",
            Record::Challenge(data(Utc::now() + Duration::seconds(60))),
        );

        let winners: usize = std::thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|_| s.spawn(|| store.take_challenge("abc").is_some() as usize))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).sum()
        });

        assert_eq!(winners, 1);
    }

    #[test]
    fn test_range_stops_early() {
        let store = RecordStore::new();
        for i in 0..10 {
            store.store(
                format!("k{i}"),
                Record::Challenge(data(Utc::now() + Duration::seconds(60))),
            );
        }

        let mut visited = 0;
        store.range(|_, _| {
            visited += 1;
            visited < 3
        });
        assert_eq!(visited, 3);
    }

    #[test]
    fn test_evict_expired() {
        let store = RecordStore::new();
        let now = Utc::now();
        store.store("old-challenge", Record::Challenge(data(now - Duration::seconds(1))));
        store.store("old-auth", Record::Authentication(data(now - Duration::seconds(5))));
        store.store("live", Record::Authentication(data(now + Duration::seconds(60))));

        let mut evicted = store.evict_expired(now);
        evicted.sort();

        assert_eq!(
            evicted,
            vec![
                ("old-auth".to_string(), "authentication"),
                ("old-challenge".to_string(), "challenge"),
            ]
        );
        assert_eq!(store.len(), 1);
        assert!(store.load("live").is_some());
    }
}
