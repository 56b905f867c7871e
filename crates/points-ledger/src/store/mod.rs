//! Persistence collaborator for ledgers
//!
//! A store keeps two structures per employee: the [`LedgerRecord`] counters
//! and an append-only transaction log. [`LedgerStore::commit`] writes both in
//! one atomic step and enforces optimistic concurrency on `version`.

use crate::error::StoreResult;
use crate::types::{EmployeeId, LedgerRecord, Transaction};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

mod memory;

pub use memory::InMemoryLedgerStore;

/// Which records a listing returns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecordFilter {
    /// Every record
    #[default]
    All,
    /// Records whose stored `is_active` flag is set
    Active,
    /// Records flagged active and not yet expired at the given instant
    ActiveAt(DateTime<Utc>),
}

impl RecordFilter {
    /// Whether `record` passes the filter
    #[inline]
    #[must_use]
    pub fn matches(&self, record: &LedgerRecord) -> bool {
        match self {
            Self::All => true,
            Self::Active => record.is_active,
            Self::ActiveAt(now) => record.is_active_at(*now),
        }
    }
}

/// Ledger persistence
///
/// # Contract
/// - `create` fails with `DuplicateKey` if the employee already has a ledger.
/// - `commit` fails with `VersionConflict` unless the stored version equals
///   `expected_version`; on success the stored version is
///   `expected_version + 1`, `transaction_count` grows by one if a
///   transaction was appended, and both writes are visible together.
/// - `transactions` returns at most `limit` entries, newest first.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Load the counters record
    async fn load(&self, employee_id: &EmployeeId) -> StoreResult<Option<LedgerRecord>>;

    /// Insert a new record
    async fn create(&self, record: LedgerRecord) -> StoreResult<LedgerRecord>;

    /// Replace the counters and optionally append one transaction
    async fn commit(
        &self,
        record: LedgerRecord,
        expected_version: u64,
        appended: Option<Transaction>,
    ) -> StoreResult<LedgerRecord>;

    /// Most recent transactions, newest first
    async fn transactions(
        &self,
        employee_id: &EmployeeId,
        limit: usize,
    ) -> StoreResult<Vec<Transaction>>;

    /// Records passing `filter`, in no particular order
    async fn list(&self, filter: RecordFilter) -> StoreResult<Vec<LedgerRecord>>;
}
