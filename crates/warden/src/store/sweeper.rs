//! Background eviction of expired records.

use chrono::Utc;
use std::time::Duration;
use tracing::{debug, info};

use warden_common::Reason;

use super::{Record, RecordStore};

/// Periodically evict expired records for the lifetime of the process
pub async fn sweeper_worker(records: RecordStore, period: Duration) {
    info!(period = ?period, "Record sweeper started");

    let mut interval = tokio::time::interval(period);
    // The first tick completes immediately
    interval.tick().await;

    loop {
        interval.tick().await;
        sweep(&records);
    }
}

/// One eviction pass, returning the number of evicted records
pub fn sweep(records: &RecordStore) -> usize {
    if records.is_empty() {
        return 0;
    }

    let evicted = records.evict_expired(Utc::now());
    for (key, kind) in &evicted {
        info!(key = %key, kind, "{}", Reason::ExpiredRecord);
    }

    let (mut challenges, mut authentications) = (0usize, 0usize);
    records.range(|_, record| {
        match record {
            Record::Challenge(_) => challenges += 1,
            Record::Authentication(_) => authentications += 1,
        }
        true
    });
    debug!(evicted = evicted.len(), challenges, authentications, "Sweep complete");

    evicted.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::RecordData;
    use chrono::Duration as ChronoDuration;

    fn record(offset_secs: i64) -> Record {
        Record::Challenge(RecordData {
            domain: "example.com".to_string(),
            user_agent: "ua".to_string(),
            client_addr: "10.0.0.1".to_string(),
            expires: Utc::now() + ChronoDuration::seconds(offset_secs),
        })
    }

    #[test]
    fn test_sweep_once() {
        let records = RecordStore::new();
        records.store("expired", record(-1));
        records.store("live", record(60));

        assert_eq!(sweep(&records), 1);
        assert!(records.load("expired").is_none());
        assert!(records.load("live").is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_worker_evicts_after_period() {
        let records = RecordStore::new();
        records.store("expired", record(-1));

        let handle = tokio::spawn(sweeper_worker(records.clone(), Duration::from_secs(15)));

        // Nothing happens before the first period elapses
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(records.load("expired").is_some());

        tokio::time::sleep(Duration::from_secs(6)).await;
        assert!(records.load("expired").is_none());

        handle.abort();
    }
}
