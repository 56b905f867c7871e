//! In-memory ledger store
//!
//! Backed by a [`DashMap`]; a commit holds the shard lock for its key while
//! it checks the version, replaces the counters and appends to the log.

use super::{LedgerStore, RecordFilter};
use crate::error::{StoreError, StoreResult};
use crate::types::{EmployeeId, LedgerRecord, Transaction};
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};

/// Counters plus log for one employee
#[derive(Debug, Clone)]
struct StoredLedger {
    record: LedgerRecord,
    log: Vec<Transaction>,
}

/// Ledger store held in process memory
#[derive(Debug, Default)]
pub struct InMemoryLedgerStore {
    ledgers: DashMap<EmployeeId, StoredLedger>,
    fail_on_load: AtomicBool,
    fail_on_commit: AtomicBool,
}

impl InMemoryLedgerStore {
    /// Create empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every `load` fail with a backend error
    pub fn set_fail_on_load(&self, fail: bool) {
        self.fail_on_load.store(fail, Ordering::SeqCst);
    }

    /// Make every `commit` fail with a backend error
    pub fn set_fail_on_commit(&self, fail: bool) {
        self.fail_on_commit.store(fail, Ordering::SeqCst);
    }

    /// Number of ledgers held
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.ledgers.len()
    }

    /// Whether no ledger is held
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ledgers.is_empty()
    }

    /// Full log for an employee, oldest first
    #[must_use]
    pub fn log(&self, employee_id: &EmployeeId) -> Vec<Transaction> {
        self.ledgers
            .get(employee_id)
            .map(|stored| stored.log.clone())
            .unwrap_or_default()
    }

    /// Overwrite a record without a version check, bumping its version
    ///
    /// Simulates a writer outside this process.
    pub fn force_write(&self, record: LedgerRecord) {
        match self.ledgers.entry(record.employee_id.clone()) {
            Entry::Occupied(mut occupied) => {
                let stored = occupied.get_mut();
                let version = stored.record.version + 1;
                stored.record = LedgerRecord { version, ..record };
            }
            Entry::Vacant(vacant) => {
                vacant.insert(StoredLedger {
                    record,
                    log: Vec::new(),
                });
            }
        }
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn load(&self, employee_id: &EmployeeId) -> StoreResult<Option<LedgerRecord>> {
        if self.fail_on_load.load(Ordering::SeqCst) {
            return Err(StoreError::backend("load failed (injected)"));
        }
        Ok(self
            .ledgers
            .get(employee_id)
            .map(|stored| stored.record.clone()))
    }

    async fn create(&self, record: LedgerRecord) -> StoreResult<LedgerRecord> {
        match self.ledgers.entry(record.employee_id.clone()) {
            Entry::Occupied(_) => Err(StoreError::DuplicateKey(record.employee_id)),
            Entry::Vacant(vacant) => {
                let record = LedgerRecord {
                    version: 0,
                    transaction_count: 0,
                    ..record
                };
                vacant.insert(StoredLedger {
                    record: record.clone(),
                    log: Vec::new(),
                });
                Ok(record)
            }
        }
    }

    async fn commit(
        &self,
        record: LedgerRecord,
        expected_version: u64,
        appended: Option<Transaction>,
    ) -> StoreResult<LedgerRecord> {
        if self.fail_on_commit.load(Ordering::SeqCst) {
            return Err(StoreError::backend("commit failed (injected)"));
        }

        let mut stored = self
            .ledgers
            .get_mut(&record.employee_id)
            .ok_or_else(|| StoreError::NotFound(record.employee_id.clone()))?;

        if stored.record.version != expected_version {
            return Err(StoreError::VersionConflict {
                employee_id: record.employee_id,
                expected: expected_version,
                actual: stored.record.version,
            });
        }

        let mut transaction_count = stored.record.transaction_count;
        if let Some(transaction) = appended {
            stored.log.push(transaction);
            transaction_count += 1;
        }

        stored.record = LedgerRecord {
            version: expected_version + 1,
            transaction_count,
            ..record
        };
        Ok(stored.record.clone())
    }

    async fn transactions(
        &self,
        employee_id: &EmployeeId,
        limit: usize,
    ) -> StoreResult<Vec<Transaction>> {
        if self.fail_on_load.load(Ordering::SeqCst) {
            return Err(StoreError::backend("load failed (injected)"));
        }
        Ok(self
            .ledgers
            .get(employee_id)
            .map(|stored| stored.log.iter().rev().take(limit).cloned().collect())
            .unwrap_or_default())
    }

    async fn list(&self, filter: RecordFilter) -> StoreResult<Vec<LedgerRecord>> {
        if self.fail_on_load.load(Ordering::SeqCst) {
            return Err(StoreError::backend("load failed (injected)"));
        }
        Ok(self
            .ledgers
            .iter()
            .filter(|entry| filter.matches(&entry.record))
            .map(|entry| entry.record.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TransactionMetadata;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, 1, 9, 0, 0).unwrap()
    }

    fn open(id: &str) -> LedgerRecord {
        LedgerRecord::open(EmployeeId::new(id), now(), Duration::days(720))
    }

    fn tx(points: i64) -> Transaction {
        Transaction::new(
            TransactionMetadata::Penalty {
                reason: "test".to_string(),
            },
            points,
            format!("tx {points}"),
            now(),
        )
    }

    #[tokio::test]
    async fn create_rejects_duplicates() {
        let store = InMemoryLedgerStore::new();
        store.create(open("a")).await.unwrap();

        let err = store.create(open("a")).await.unwrap_err();
        assert_eq!(err, StoreError::DuplicateKey(EmployeeId::new("a")));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn commit_bumps_version_and_appends() {
        let store = InMemoryLedgerStore::new();
        let mut record = store.create(open("a")).await.unwrap();
        record.total_points = 7;

        let stored = store.commit(record, 0, Some(tx(7))).await.unwrap();
        assert_eq!(stored.version, 1);
        assert_eq!(stored.transaction_count, 1);
        assert_eq!(stored.total_points, 7);
        assert_eq!(store.log(&EmployeeId::new("a")).len(), 1);
    }

    #[tokio::test]
    async fn commit_without_transaction_keeps_count() {
        let store = InMemoryLedgerStore::new();
        let record = store.create(open("a")).await.unwrap();
        let stored = store.commit(record, 0, None).await.unwrap();
        assert_eq!(stored.version, 1);
        assert_eq!(stored.transaction_count, 0);
    }

    #[tokio::test]
    async fn stale_commit_is_rejected_without_side_effects() {
        let store = InMemoryLedgerStore::new();
        let record = store.create(open("a")).await.unwrap();
        store.commit(record.clone(), 0, Some(tx(1))).await.unwrap();

        let err = store.commit(record, 0, Some(tx(2))).await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::VersionConflict { expected: 0, actual: 1, .. }
        ));
        assert_eq!(store.log(&EmployeeId::new("a")).len(), 1);
    }

    #[tokio::test]
    async fn commit_to_missing_ledger() {
        let store = InMemoryLedgerStore::new();
        let err = store.commit(open("ghost"), 0, None).await.unwrap_err();
        assert_eq!(err, StoreError::NotFound(EmployeeId::new("ghost")));
    }

    #[tokio::test]
    async fn transactions_newest_first_and_limited() {
        let store = InMemoryLedgerStore::new();
        let mut record = store.create(open("a")).await.unwrap();
        for points in 1..=5 {
            record = store.commit(record.clone(), record.version, Some(tx(points))).await.unwrap();
        }

        let recent = store.transactions(&EmployeeId::new("a"), 3).await.unwrap();
        let points: Vec<i64> = recent.iter().map(|t| t.points).collect();
        assert_eq!(points, vec![5, 4, 3]);

        assert!(store.transactions(&EmployeeId::new("a"), 0).await.unwrap().is_empty());
        assert!(store.transactions(&EmployeeId::new("b"), 3).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn list_filters_on_stored_flag() {
        let store = InMemoryLedgerStore::new();
        store.create(open("a")).await.unwrap();
        let mut inactive = open("b");
        inactive.is_active = false;
        store.create(inactive).await.unwrap();

        assert_eq!(store.list(RecordFilter::All).await.unwrap().len(), 2);
        let active = store.list(RecordFilter::Active).await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].employee_id, EmployeeId::new("a"));
    }

    #[tokio::test]
    async fn active_at_excludes_expired_records() {
        let store = InMemoryLedgerStore::new();
        store.create(open("a")).await.unwrap();
        let mut short = open("b");
        short.expiry_date = now() + Duration::days(10);
        store.create(short).await.unwrap();

        let later = now() + Duration::days(10);
        assert_eq!(store.list(RecordFilter::Active).await.unwrap().len(), 2);
        let active = store.list(RecordFilter::ActiveAt(later)).await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].employee_id, EmployeeId::new("a"));
        assert_eq!(store.list(RecordFilter::ActiveAt(now())).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn injected_failures() {
        let store = InMemoryLedgerStore::new();
        let record = store.create(open("a")).await.unwrap();

        store.set_fail_on_load(true);
        assert!(matches!(
            store.load(&EmployeeId::new("a")).await,
            Err(StoreError::Backend(_))
        ));
        store.set_fail_on_load(false);

        store.set_fail_on_commit(true);
        assert!(matches!(
            store.commit(record, 0, None).await,
            Err(StoreError::Backend(_))
        ));
    }

    #[tokio::test]
    async fn force_write_moves_version() {
        let store = InMemoryLedgerStore::new();
        let record = store.create(open("a")).await.unwrap();
        store.force_write(LedgerRecord {
            total_points: 42,
            ..record.clone()
        });

        let loaded = store.load(&EmployeeId::new("a")).await.unwrap().unwrap();
        assert_eq!(loaded.version, 1);
        assert_eq!(loaded.total_points, 42);
        assert!(store.commit(record, 0, None).await.is_err());
    }
}
