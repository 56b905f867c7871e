//! Testing utilities for the points ledger workspace
//!
//! Shared fixtures: pinned clocks, a ledger over the in-memory store, and
//! helpers to seed ledgers with known counters.

#![allow(missing_docs)]

use chrono::{DateTime, TimeZone, Utc};
use points_ledger::{
    EmployeeDirectory, EmployeeId, EmployeeProfile, FixedClock, InMemoryLedgerStore,
    LedgerRecord, PointsConfig, PointsLedger, StaticDirectory,
};
use std::sync::Arc;

/// Ledger wired to handles the test can poke at
pub struct TestLedger {
    pub ledger: Arc<PointsLedger>,
    pub store: Arc<InMemoryLedgerStore>,
    pub clock: Arc<FixedClock>,
    pub directory: Arc<StaticDirectory>,
}

pub fn at(year: i32, month: u32, day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, 0, 0).unwrap()
}

/// 2026-01-15 09:00 UTC
pub fn jan_2026() -> DateTime<Utc> {
    at(2026, 1, 15, 9)
}

pub fn fixed_clock_at(now: DateTime<Utc>) -> Arc<FixedClock> {
    Arc::new(FixedClock::new(now))
}

pub fn setup_ledger() -> TestLedger {
    setup_ledger_with(PointsConfig::default(), jan_2026())
}

pub fn setup_ledger_with(config: PointsConfig, now: DateTime<Utc>) -> TestLedger {
    let store = Arc::new(InMemoryLedgerStore::new());
    let clock = fixed_clock_at(now);
    let directory = Arc::new(StaticDirectory::new());

    let ledger = PointsLedger::new(config, store.clone(), clock.clone())
        .unwrap()
        .with_directory(directory.clone() as Arc<dyn EmployeeDirectory>);

    TestLedger {
        ledger: Arc::new(ledger),
        store,
        clock,
        directory,
    }
}

impl TestLedger {
    /// Create a ledger and overwrite its counters
    pub async fn seed(&self, id: &str, total_points: i64, monthly_points: i64) -> LedgerRecord {
        let employee_id = EmployeeId::new(id);
        let record = self.ledger.ensure_record(&employee_id).await.unwrap();
        self.store.force_write(LedgerRecord {
            total_points,
            monthly_points,
            ..record
        });
        self.record(id).await
    }

    /// Current stored record
    pub async fn record(&self, id: &str) -> LedgerRecord {
        use points_ledger::LedgerStore;
        self.store
            .load(&EmployeeId::new(id))
            .await
            .unwrap()
            .expect("ledger exists")
    }

    pub fn add_profile(&self, id: &str, first: &str, last: &str) {
        let email = format!("{}@example.com", first.to_lowercase());
        self.directory
            .insert(EmployeeId::new(id), EmployeeProfile::new(first, last, email));
    }
}

pub fn ids(raw: &[&str]) -> Vec<EmployeeId> {
    raw.iter().copied().map(EmployeeId::new).collect()
}
