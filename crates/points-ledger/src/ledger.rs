//! Points ledger service
//!
//! Owns every business rule around an employee's points:
//! - Lazy ledger creation and monthly rollover
//! - Per-activity scoring with cap enforcement and flooring
//! - Summary, leaderboard, history and administrative views
//!
//! # Concurrency
//!
//! Writes for one employee run under that employee's writer lock, so
//! callers in this process are serialized. Writers in other processes are
//! caught by the store's version check: a stale commit is reloaded,
//! re-rolled and re-clamped, up to [`MAX_COMMIT_ATTEMPTS`] times.

use crate::clock::Clock;
use crate::config::PointsConfig;
use crate::directory::{EmployeeDirectory, EmployeeProfile, StaticDirectory};
use crate::error::{LedgerError, LedgerResult, StoreError};
use crate::rules::{self, Nominal};
use crate::store::{LedgerStore, RecordFilter};
use crate::types::{
    AttendanceStatus, Award, EmployeeId, LedgerRecord, MilestoneTier, MonthKey, TaskPriority,
    TaskStatus, Transaction, TransactionMetadata, UpdateKind,
};
use crate::views::{
    EmployeeDetail, LeaderboardEntry, LedgerSummary, ProjectAward, StandingEntry, SystemSummary,
};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info, warn};

/// Commit attempts before a conflict is surfaced
pub const MAX_COMMIT_ATTEMPTS: u32 = 5;

/// Transactions shown per leaderboard row
pub const RECENT_ACTIVITY_LEN: usize = 3;

/// Transactions shown in the administrative detail view
pub const DETAIL_HISTORY_LEN: usize = 50;

/// Whether a mutation may open a missing ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Access {
    CreateIfMissing,
    ExistingOnly,
}

/// What a mutation did to a loaded record
struct Mutation<T> {
    output: T,
    appended: Option<Transaction>,
    changed: bool,
}

/// Per-employee points ledger
pub struct PointsLedger {
    config: Arc<PointsConfig>,
    store: Arc<dyn LedgerStore>,
    clock: Arc<dyn Clock>,
    directory: Arc<dyn EmployeeDirectory>,
    writers: DashMap<EmployeeId, Arc<Mutex<()>>>,
}

impl fmt::Debug for PointsLedger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PointsLedger")
            .field("config", &self.config)
            .field("writers", &self.writers.len())
            .finish_non_exhaustive()
    }
}

impl PointsLedger {
    /// Create ledger service
    ///
    /// # Errors
    /// `Config` if the point table fails validation
    pub fn new(
        config: PointsConfig,
        store: Arc<dyn LedgerStore>,
        clock: Arc<dyn Clock>,
    ) -> LedgerResult<Self> {
        config.validate()?;
        Ok(Self {
            config: Arc::new(config),
            store,
            clock,
            directory: Arc::new(StaticDirectory::new()),
            writers: DashMap::new(),
        })
    }

    /// With employee directory for read views
    #[must_use]
    pub fn with_directory(mut self, directory: Arc<dyn EmployeeDirectory>) -> Self {
        self.directory = directory;
        self
    }

    /// Point table in use
    #[inline]
    #[must_use]
    pub fn config(&self) -> &PointsConfig {
        &self.config
    }

    // ------------------------------------------------------------------
    // Record access
    // ------------------------------------------------------------------

    /// Load the ledger, creating a zeroed one if absent
    ///
    /// A concurrent creation is resolved by reloading.
    ///
    /// # Errors
    /// `Persistence` on store failure
    pub async fn ensure_record(&self, employee_id: &EmployeeId) -> LedgerResult<LedgerRecord> {
        if let Some(record) = self.store.load(employee_id).await? {
            return Ok(record);
        }

        let record = LedgerRecord::open(
            employee_id.clone(),
            self.clock.now(),
            self.config.retention(),
        );
        match self.store.create(record).await {
            Ok(created) => {
                debug!(employee_id = %employee_id, expiry = %created.expiry_date, "opened points ledger");
                Ok(created)
            }
            Err(StoreError::DuplicateKey(_)) => {
                debug!(employee_id = %employee_id, "ledger opened concurrently, reloading");
                self.store
                    .load(employee_id)
                    .await?
                    .ok_or_else(|| StoreError::NotFound(employee_id.clone()).into())
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Persist a monthly reset if `record` belongs to an earlier month
    ///
    /// Returns `record` untouched when no rollover is due.
    ///
    /// # Errors
    /// `Persistence`, `NotFound` if the ledger vanished, or
    /// `ConcurrentUpdateConflict`
    pub async fn rollover_if_needed(&self, record: LedgerRecord) -> LedgerResult<LedgerRecord> {
        if record.current_month == MonthKey::of(self.clock.now()) {
            return Ok(record);
        }

        let ((), stored) = self
            .mutate(&record.employee_id, Access::ExistingOnly, |_, _| {
                Ok(Mutation {
                    output: (),
                    appended: None,
                    changed: false,
                })
            })
            .await?;
        Ok(stored)
    }

    // ------------------------------------------------------------------
    // Scoring
    // ------------------------------------------------------------------

    /// Score a marked attendance
    ///
    /// Returns `None` for statuses with no rule (absent, on leave); nothing
    /// is recorded for them.
    ///
    /// # Errors
    /// `Persistence` or `ConcurrentUpdateConflict`
    pub async fn award_attendance(
        &self,
        employee_id: &EmployeeId,
        status: AttendanceStatus,
        on_time: bool,
    ) -> LedgerResult<Option<Award>> {
        let Some(nominal) = rules::attendance(&self.config, status, on_time) else {
            debug!(employee_id = %employee_id, status = %status, "attendance status earns no points");
            return Ok(None);
        };
        self.post(employee_id, nominal).await.map(Some)
    }

    /// Score a submitted daily update
    ///
    /// # Errors
    /// `Persistence` or `ConcurrentUpdateConflict`
    pub async fn award_daily_update(
        &self,
        employee_id: &EmployeeId,
        kind: UpdateKind,
    ) -> LedgerResult<Award> {
        self.post(employee_id, rules::daily_update(&self.config, kind))
            .await
    }

    /// Score a completed task
    ///
    /// # Errors
    /// `Persistence` or `ConcurrentUpdateConflict`
    pub async fn award_task_completion(
        &self,
        employee_id: &EmployeeId,
        task_id: &str,
        priority: TaskPriority,
    ) -> LedgerResult<Award> {
        self.post(
            employee_id,
            rules::task_completion(&self.config, task_id, priority),
        )
        .await
    }

    /// Score a task status change, only when it moves into `completed`
    ///
    /// # Errors
    /// `Persistence` or `ConcurrentUpdateConflict`
    pub async fn award_task_transition(
        &self,
        employee_id: &EmployeeId,
        task_id: &str,
        priority: TaskPriority,
        from: TaskStatus,
        to: TaskStatus,
    ) -> LedgerResult<Option<Award>> {
        if !TaskStatus::completes(from, to) {
            return Ok(None);
        }
        self.award_task_completion(employee_id, task_id, priority)
            .await
            .map(Some)
    }

    /// Score a completed project for each employee in `employee_ids`
    ///
    /// Every employee is attempted; a failure for one does not stop the rest.
    /// Duplicate ids are scored once.
    pub async fn award_project_completion(
        &self,
        employee_ids: &[EmployeeId],
        project_id: &str,
        early: bool,
    ) -> Vec<ProjectAward> {
        let mut seen = HashSet::with_capacity(employee_ids.len());
        let mut awards = Vec::with_capacity(employee_ids.len());

        for employee_id in employee_ids {
            if !seen.insert(employee_id) {
                continue;
            }
            let nominal = rules::project_completion(&self.config, project_id, early);
            let outcome = self.post(employee_id, nominal).await;
            if let Err(err) = &outcome {
                warn!(employee_id = %employee_id, project_id, error = %err, "project completion award failed");
            }
            awards.push(ProjectAward {
                employee_id: employee_id.clone(),
                outcome,
            });
        }

        awards
    }

    /// Score a milestone; `text` is kept in the description
    ///
    /// # Errors
    /// `Persistence` or `ConcurrentUpdateConflict`
    pub async fn award_milestone(
        &self,
        employee_id: &EmployeeId,
        tier: MilestoneTier,
        text: &str,
    ) -> LedgerResult<Award> {
        self.post(employee_id, rules::milestone(&self.config, tier, text))
            .await
    }

    /// Apply a penalty between 20 and 100 points, ignoring the monthly cap
    ///
    /// # Errors
    /// `InvalidInput` for an empty reason, `Persistence` or
    /// `ConcurrentUpdateConflict`
    pub async fn apply_penalty(
        &self,
        employee_id: &EmployeeId,
        magnitude: i64,
        reason: &str,
    ) -> LedgerResult<Award> {
        if reason.trim().is_empty() {
            return Err(LedgerError::invalid_input("penalty reason is required"));
        }
        self.post(employee_id, rules::penalty(magnitude, reason))
            .await
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Summary for the employee, rolling the month over first
    ///
    /// # Errors
    /// `Persistence` or `ConcurrentUpdateConflict`
    pub async fn summary(&self, employee_id: &EmployeeId) -> LedgerResult<LedgerSummary> {
        let record = self.ensure_record(employee_id).await?;
        let record = self.rollover_if_needed(record).await?;
        let now = self.clock.now();

        Ok(LedgerSummary {
            monthly_cap_remaining: record.headroom(self.config.monthly_cap_points),
            is_active: record.is_active_at(now),
            employee_id: record.employee_id,
            total_points: record.total_points,
            monthly_points: record.monthly_points,
            current_month: record.current_month,
            expiry_date: record.expiry_date,
            transaction_count: record.transaction_count,
        })
    }

    /// Top `limit` active ledgers by lifetime points
    ///
    /// Ledgers past their expiry date are left off even when flagged active.
    ///
    /// # Errors
    /// `Persistence`
    pub async fn leaderboard(&self, limit: usize) -> LedgerResult<Vec<LeaderboardEntry>> {
        let now = self.clock.now();
        let mut records = self.store.list(RecordFilter::ActiveAt(now)).await?;
        rank_order(&mut records);

        let mut entries = Vec::with_capacity(limit.min(records.len()));
        for (index, record) in records.into_iter().take(limit).enumerate() {
            let record = record.as_of(now);
            let profile = self.profile(&record.employee_id).await?;
            let recent_activity = self
                .store
                .transactions(&record.employee_id, RECENT_ACTIVITY_LEN)
                .await?;

            entries.push(LeaderboardEntry {
                rank: index + 1,
                employee_name: profile.display_name(),
                email: profile.email,
                employee_id: record.employee_id,
                total_points: record.total_points,
                monthly_points: record.monthly_points,
                recent_activity,
            });
        }

        Ok(entries)
    }

    /// Latest `limit` transactions, newest first
    ///
    /// # Errors
    /// `Persistence`
    pub async fn history(
        &self,
        employee_id: &EmployeeId,
        limit: usize,
    ) -> LedgerResult<Vec<Transaction>> {
        self.ensure_record(employee_id).await?;
        Ok(self.store.transactions(employee_id, limit).await?)
    }

    /// Administrative view; never opens a ledger
    ///
    /// # Errors
    /// `NotFound` for an employee without a ledger, `Persistence`
    pub async fn employee_detail(&self, employee_id: &EmployeeId) -> LedgerResult<EmployeeDetail> {
        let record = self
            .store
            .load(employee_id)
            .await?
            .ok_or_else(|| LedgerError::NotFound(employee_id.clone()))?
            .as_of(self.clock.now());
        let profile = self.profile(employee_id).await?;
        let transactions = self
            .store
            .transactions(employee_id, DETAIL_HISTORY_LEN)
            .await?;

        Ok(EmployeeDetail {
            employee_name: profile.display_name(),
            email: profile.email,
            monthly_cap_remaining: record.headroom(self.config.monthly_cap_points),
            employee_id: record.employee_id,
            total_points: record.total_points,
            monthly_points: record.monthly_points,
            current_month: record.current_month,
            is_active: record.is_active,
            expiry_date: record.expiry_date,
            transactions,
        })
    }

    /// Every ledger, active or not, ranked by lifetime points
    ///
    /// # Errors
    /// `Persistence`
    pub async fn standings(&self) -> LedgerResult<Vec<StandingEntry>> {
        let now = self.clock.now();
        let mut records = self.store.list(RecordFilter::All).await?;
        rank_order(&mut records);

        let mut entries = Vec::with_capacity(records.len());
        for (index, record) in records.into_iter().enumerate() {
            let record = record.as_of(now);
            let profile = self.profile(&record.employee_id).await?;
            let last_transaction_at = self
                .store
                .transactions(&record.employee_id, 1)
                .await?
                .first()
                .map(|tx| tx.created_at);

            entries.push(StandingEntry {
                rank: index + 1,
                employee_name: profile.display_name(),
                email: profile.email,
                is_active: record.is_active_at(now),
                employee_id: record.employee_id,
                total_points: record.total_points,
                monthly_points: record.monthly_points,
                current_month: record.current_month,
                expiry_date: record.expiry_date,
                transaction_count: record.transaction_count,
                last_transaction_at,
            });
        }

        Ok(entries)
    }

    /// Aggregates across every ledger
    ///
    /// # Errors
    /// `Persistence`
    #[allow(clippy::cast_precision_loss)]
    pub async fn system_summary(&self) -> LedgerResult<SystemSummary> {
        let now = self.clock.now();
        let records = self.store.list(RecordFilter::All).await?;

        let total_employees = records.len();
        let total_points_distributed: i64 = records.iter().map(|r| r.total_points).sum();
        let average_points_per_employee = if total_employees == 0 {
            0.0
        } else {
            total_points_distributed as f64 / total_employees as f64
        };

        Ok(SystemSummary {
            total_employees,
            total_points_distributed,
            average_points_per_employee,
            max_points: records.iter().map(|r| r.total_points).max().unwrap_or(0),
            min_points: records.iter().map(|r| r.total_points).min().unwrap_or(0),
            active_employees: records.iter().filter(|r| r.is_active_at(now)).count(),
            monthly_cap_points: self.config.monthly_cap_points,
            expiry_months: self.config.expiry_months,
        })
    }

    /// Set the manual activation flag; never opens a ledger
    ///
    /// # Errors
    /// `NotFound`, `Persistence` or `ConcurrentUpdateConflict`
    pub async fn set_active(
        &self,
        employee_id: &EmployeeId,
        active: bool,
    ) -> LedgerResult<LedgerRecord> {
        let ((), stored) = self
            .mutate(employee_id, Access::ExistingOnly, |record, _| {
                let changed = record.is_active != active;
                record.is_active = active;
                Ok(Mutation {
                    output: (),
                    appended: None,
                    changed,
                })
            })
            .await?;

        info!(employee_id = %employee_id, active, "ledger activation updated");
        Ok(stored)
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    /// Settle `nominal` against the ledger and append its transaction
    async fn post(&self, employee_id: &EmployeeId, nominal: Nominal) -> LedgerResult<Award> {
        let cap = self.config.monthly_cap_points;

        let (award, stored) = self
            .mutate(employee_id, Access::CreateIfMissing, |record, now| {
                let (points, description) = match nominal.metadata {
                    TransactionMetadata::Penalty { .. } => rules::debit(record, &nominal),
                    _ => rules::credit(record, &nominal, cap),
                };
                let transaction =
                    Transaction::new(nominal.metadata.clone(), points, description.clone(), now);
                Ok(Mutation {
                    output: Award {
                        points,
                        description,
                    },
                    appended: Some(transaction),
                    changed: true,
                })
            })
            .await?;

        if award.points < nominal.points && nominal.points > 0 {
            warn!(employee_id = %employee_id, nominal = nominal.points, applied = award.points, "monthly cap reached");
        }
        info!(
            employee_id = %employee_id,
            activity = %nominal.metadata.activity_type(),
            points = award.points,
            total = stored.total_points,
            monthly = stored.monthly_points,
            "points posted"
        );
        Ok(award)
    }

    /// Load, roll over, apply `op` and commit under the employee's writer lock
    ///
    /// `op` is re-run on a fresh load after a version conflict.
    async fn mutate<T, F>(
        &self,
        employee_id: &EmployeeId,
        access: Access,
        op: F,
    ) -> LedgerResult<(T, LedgerRecord)>
    where
        F: FnMut(&mut LedgerRecord, DateTime<Utc>) -> LedgerResult<Mutation<T>>,
    {
        let writer = self.writer(employee_id).await;
        let result = self.commit_with_retry(employee_id, access, op).await;
        drop(writer);
        self.release_writer(employee_id);
        result
    }

    async fn commit_with_retry<T, F>(
        &self,
        employee_id: &EmployeeId,
        access: Access,
        mut op: F,
    ) -> LedgerResult<(T, LedgerRecord)>
    where
        F: FnMut(&mut LedgerRecord, DateTime<Utc>) -> LedgerResult<Mutation<T>>,
    {
        let mut attempts = 0;

        loop {
            attempts += 1;

            let mut record = match access {
                Access::CreateIfMissing => self.ensure_record(employee_id).await?,
                Access::ExistingOnly => self
                    .store
                    .load(employee_id)
                    .await?
                    .ok_or_else(|| LedgerError::NotFound(employee_id.clone()))?,
            };
            let expected_version = record.version;
            let now = self.clock.now();

            let rolled = record.roll_over(now);
            if rolled {
                debug!(employee_id = %employee_id, month = %record.current_month, "monthly points rolled over");
            }

            let mutation = op(&mut record, now)?;
            if !rolled && !mutation.changed {
                return Ok((mutation.output, record));
            }
            record.updated_at = now;

            match self
                .store
                .commit(record, expected_version, mutation.appended)
                .await
            {
                Ok(stored) => return Ok((mutation.output, stored)),
                Err(err) if err.is_conflict() && attempts < MAX_COMMIT_ATTEMPTS => {
                    warn!(employee_id = %employee_id, attempt = attempts, "ledger changed since load, retrying");
                }
                Err(err) if err.is_conflict() => {
                    warn!(employee_id = %employee_id, attempts, "giving up after repeated conflicts");
                    return Err(LedgerError::ConcurrentUpdateConflict {
                        employee_id: employee_id.clone(),
                        attempts,
                    });
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    /// Acquire the writer lock for one employee
    async fn writer(&self, employee_id: &EmployeeId) -> OwnedMutexGuard<()> {
        let lock = Arc::clone(&self.writers.entry(employee_id.clone()).or_default());
        lock.lock_owned().await
    }

    /// Drop the employee's lock entry once no writer holds or awaits it
    ///
    /// Waiters clone the `Arc` under the map's shard lock, so a count of one
    /// means the map holds the only reference. An entry left behind by a
    /// cancelled write is pruned by the next write for that employee.
    fn release_writer(&self, employee_id: &EmployeeId) {
        self.writers
            .remove_if(employee_id, |_, lock| Arc::strong_count(lock) == 1);
    }

    async fn profile(&self, employee_id: &EmployeeId) -> LedgerResult<EmployeeProfile> {
        Ok(self
            .directory
            .profile(employee_id)
            .await?
            .unwrap_or_default())
    }
}

/// Lifetime points descending, employee id ascending on ties
fn rank_order(records: &mut [LedgerRecord]) {
    records.sort_by(|a, b| {
        b.total_points
            .cmp(&a.total_points)
            .then_with(|| a.employee_id.cmp(&b.employee_id))
    });
}
