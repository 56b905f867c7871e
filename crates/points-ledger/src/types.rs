//! Core types for the points ledger
//!
//! Defines:
//! - Employee and transaction identifiers
//! - Calendar-month tokens
//! - Activity enumerations (attendance, updates, tasks, milestones)
//! - The ledger counters record and its transactions

use crate::error::LedgerError;
use chrono::{DateTime, Datelike, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::SystemTime;
use ulid::Ulid;

/// Opaque employee identifier, the unique key of a ledger
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EmployeeId(String);

impl EmployeeId {
    /// Wrap an identifier
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw identifier
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EmployeeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EmployeeId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for EmployeeId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Transaction identifier (ULID, sortable by creation time)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TransactionId(pub Ulid);

impl TransactionId {
    /// Generate an id whose timestamp component is `at`
    #[inline]
    #[must_use]
    pub fn at(at: DateTime<Utc>) -> Self {
        Self(Ulid::from_datetime(SystemTime::from(at)))
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Calendar month token, rendered `YYYY-MM`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MonthKey {
    year: i32,
    month: u32,
}

impl MonthKey {
    /// Create month token
    ///
    /// # Errors
    /// `InvalidInput` if `month` is not in `1..=12`
    pub fn new(year: i32, month: u32) -> Result<Self, LedgerError> {
        if !(1..=12).contains(&month) {
            return Err(LedgerError::invalid_input(format!(
                "month {month} is outside 1..=12"
            )));
        }
        Ok(Self { year, month })
    }

    /// Month containing `at`
    #[inline]
    #[must_use]
    pub fn of(at: DateTime<Utc>) -> Self {
        Self {
            year: at.year(),
            month: at.month(),
        }
    }

    /// Calendar year
    #[inline]
    #[must_use]
    pub fn year(&self) -> i32 {
        self.year
    }

    /// Calendar month (1-12)
    #[inline]
    #[must_use]
    pub fn month(&self) -> u32 {
        self.month
    }
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for MonthKey {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || LedgerError::invalid_input(format!("'{s}' is not a YYYY-MM month"));
        let (year, month) = s.split_once('-').ok_or_else(invalid)?;
        if year.len() != 4 || month.len() != 2 {
            return Err(invalid());
        }
        let year = year.parse::<i32>().map_err(|_| invalid())?;
        let month = month.parse::<u32>().map_err(|_| invalid())?;
        Self::new(year, month)
    }
}

impl TryFrom<String> for MonthKey {
    type Error = LedgerError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<MonthKey> for String {
    fn from(month: MonthKey) -> Self {
        month.to_string()
    }
}

/// Kinds of activity that move points
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityType {
    Attendance,
    DailyUpdate,
    Task,
    ProjectCompletion,
    Milestone,
    Penalty,
}

impl ActivityType {
    /// Stable wire name
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Attendance => "attendance",
            Self::DailyUpdate => "daily_update",
            Self::Task => "task",
            Self::ProjectCompletion => "project_completion",
            Self::Milestone => "milestone",
            Self::Penalty => "penalty",
        }
    }
}

impl fmt::Display for ActivityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActivityType {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "attendance" => Ok(Self::Attendance),
            "daily_update" => Ok(Self::DailyUpdate),
            "task" => Ok(Self::Task),
            "project_completion" => Ok(Self::ProjectCompletion),
            "milestone" => Ok(Self::Milestone),
            "penalty" => Ok(Self::Penalty),
            other => Err(LedgerError::invalid_input(format!(
                "unknown activity type '{other}'"
            ))),
        }
    }
}

/// Attendance status as marked by the attendance subsystem
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttendanceStatus {
    Present,
    #[serde(rename = "WFH")]
    Wfh,
    Late,
    #[serde(rename = "Half-day")]
    HalfDay,
    Absent,
    #[serde(rename = "On Leave")]
    OnLeave,
}

impl AttendanceStatus {
    /// Label used by the attendance register
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Present => "Present",
            Self::Wfh => "WFH",
            Self::Late => "Late",
            Self::HalfDay => "Half-day",
            Self::Absent => "Absent",
            Self::OnLeave => "On Leave",
        }
    }
}

impl fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for AttendanceStatus {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Present" => Ok(Self::Present),
            "WFH" => Ok(Self::Wfh),
            "Late" => Ok(Self::Late),
            "Half-day" => Ok(Self::HalfDay),
            "Absent" => Ok(Self::Absent),
            "On Leave" => Ok(Self::OnLeave),
            other => Err(LedgerError::invalid_input(format!(
                "unknown attendance status '{other}'"
            ))),
        }
    }
}

/// Richness of a daily update
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateKind {
    /// Has a checklist or attachments
    Rich,
    /// Plain text only
    Simple,
}

impl UpdateKind {
    /// Classify an update by its content
    #[inline]
    #[must_use]
    pub fn classify(has_checklist: bool, has_attachments: bool) -> Self {
        if has_checklist || has_attachments {
            Self::Rich
        } else {
            Self::Simple
        }
    }

    /// Wire name
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rich => "rich",
            Self::Simple => "simple",
        }
    }
}

impl FromStr for UpdateKind {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "rich" => Ok(Self::Rich),
            "simple" => Ok(Self::Simple),
            other => Err(LedgerError::invalid_input(format!(
                "unknown update type '{other}'"
            ))),
        }
    }
}

/// Task priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    Low,
    Medium,
    High,
}

impl TaskPriority {
    /// Wire name
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl fmt::Display for TaskPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskPriority {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            other => Err(LedgerError::invalid_input(format!(
                "unknown task priority '{other}'"
            ))),
        }
    }
}

/// Task workflow status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
    Cancelled,
}

impl TaskStatus {
    /// Whether moving `from -> to` completes the task
    #[inline]
    #[must_use]
    pub fn completes(from: Self, to: Self) -> bool {
        to == Self::Completed && from != Self::Completed
    }
}

impl FromStr for TaskStatus {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "in-progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(LedgerError::invalid_input(format!(
                "unknown task status '{other}'"
            ))),
        }
    }
}

/// Milestone tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MilestoneTier {
    Standard,
    Premium,
}

impl MilestoneTier {
    /// Title-case label used in descriptions
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Standard => "Standard",
            Self::Premium => "Premium",
        }
    }
}

impl FromStr for MilestoneTier {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "standard" => Ok(Self::Standard),
            "premium" => Ok(Self::Premium),
            other => Err(LedgerError::invalid_input(format!(
                "unknown milestone tier '{other}'"
            ))),
        }
    }
}

/// Activity-specific context stored with a transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TransactionMetadata {
    Attendance { status: AttendanceStatus },
    DailyUpdate { update_type: UpdateKind },
    Task { task_id: String, priority: TaskPriority },
    ProjectCompletion { project_id: String, early: bool },
    Milestone { tier: MilestoneTier },
    Penalty { reason: String },
}

impl TransactionMetadata {
    /// Activity this metadata belongs to
    #[must_use]
    pub fn activity_type(&self) -> ActivityType {
        match self {
            Self::Attendance { .. } => ActivityType::Attendance,
            Self::DailyUpdate { .. } => ActivityType::DailyUpdate,
            Self::Task { .. } => ActivityType::Task,
            Self::ProjectCompletion { .. } => ActivityType::ProjectCompletion,
            Self::Milestone { .. } => ActivityType::Milestone,
            Self::Penalty { .. } => ActivityType::Penalty,
        }
    }
}

/// One immutable entry in an employee's transaction log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub activity_type: ActivityType,
    /// Signed delta actually applied
    pub points: i64,
    pub description: String,
    pub metadata: TransactionMetadata,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    /// Create transaction stamped at `at`
    #[must_use]
    pub fn new(
        metadata: TransactionMetadata,
        points: i64,
        description: impl Into<String>,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: TransactionId::at(at),
            activity_type: metadata.activity_type(),
            points,
            description: description.into(),
            metadata,
            created_at: at,
        }
    }
}

/// Counters record of a ledger
///
/// The transaction log lives beside this record in the store; the two are
/// committed together. `version` is bumped by the store on every commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerRecord {
    pub employee_id: EmployeeId,
    /// Lifetime points, never negative
    pub total_points: i64,
    /// Points earned in `current_month`, never negative
    pub monthly_points: i64,
    pub current_month: MonthKey,
    pub last_reset: DateTime<Utc>,
    pub expiry_date: DateTime<Utc>,
    /// Manual activation flag, independent of expiry
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub version: u64,
    pub transaction_count: u64,
}

impl LedgerRecord {
    /// Fresh record with zeroed counters, expiring `retention` after `now`
    ///
    /// An expiry beyond the representable range saturates to the latest
    /// representable instant.
    #[must_use]
    pub fn open(employee_id: EmployeeId, now: DateTime<Utc>, retention: Duration) -> Self {
        Self {
            employee_id,
            total_points: 0,
            monthly_points: 0,
            current_month: MonthKey::of(now),
            last_reset: now,
            expiry_date: now
                .checked_add_signed(retention)
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
            is_active: true,
            created_at: now,
            updated_at: now,
            version: 0,
            transaction_count: 0,
        }
    }

    /// Reset the monthly accumulator if `now` is in a different month
    ///
    /// Returns whether anything changed.
    pub fn roll_over(&mut self, now: DateTime<Utc>) -> bool {
        let month = MonthKey::of(now);
        if self.current_month == month {
            return false;
        }
        self.current_month = month;
        self.monthly_points = 0;
        self.last_reset = now;
        true
    }

    /// Copy of this record as it reads at `now`, without persisting a rollover
    #[must_use]
    pub fn as_of(&self, now: DateTime<Utc>) -> Self {
        let mut view = self.clone();
        view.roll_over(now);
        view
    }

    /// Remaining monthly headroom under `cap`
    #[inline]
    #[must_use]
    pub fn headroom(&self, cap: i64) -> i64 {
        (cap - self.monthly_points).max(0)
    }

    /// Whether the retention window has passed
    #[inline]
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expiry_date
    }

    /// Stored flag and not yet expired
    #[inline]
    #[must_use]
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.is_active && !self.is_expired(now)
    }
}

/// Result of a scoring operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Award {
    /// Delta applied to the ledger
    pub points: i64,
    pub description: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 9, 0, 0).unwrap()
    }

    #[test]
    fn month_key_display_and_parse() {
        let key = MonthKey::of(at(2026, 3, 14));
        assert_eq!(key.to_string(), "2026-03");
        assert_eq!("2026-03".parse::<MonthKey>().unwrap(), key);
    }

    #[test]
    fn month_key_rejects_malformed() {
        for bad in ["2026-13", "2026-00", "26-03", "2026/03", "2026-3", ""] {
            assert!(
                matches!(bad.parse::<MonthKey>(), Err(LedgerError::InvalidInput(_))),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn month_key_serializes_as_string() {
        let key = MonthKey::new(2025, 11).unwrap();
        assert_eq!(serde_json::to_string(&key).unwrap(), "\"2025-11\"");
        let back: MonthKey = serde_json::from_str("\"2025-11\"").unwrap();
        assert_eq!(back, key);
    }

    #[test]
    fn attendance_labels_parse() {
        assert_eq!("WFH".parse::<AttendanceStatus>().unwrap(), AttendanceStatus::Wfh);
        assert_eq!(
            "Half-day".parse::<AttendanceStatus>().unwrap(),
            AttendanceStatus::HalfDay
        );
        assert_eq!(
            "On Leave".parse::<AttendanceStatus>().unwrap(),
            AttendanceStatus::OnLeave
        );
        assert!("present".parse::<AttendanceStatus>().is_err());
    }

    #[test]
    fn enumerations_reject_unknown_values() {
        assert!("urgent".parse::<TaskPriority>().is_err());
        assert!("gold".parse::<MilestoneTier>().is_err());
        assert!("bonus".parse::<ActivityType>().is_err());
        assert!("fancy".parse::<UpdateKind>().is_err());
        assert!("done".parse::<TaskStatus>().is_err());
    }

    #[test]
    fn update_kind_classification() {
        assert_eq!(UpdateKind::classify(true, false), UpdateKind::Rich);
        assert_eq!(UpdateKind::classify(false, true), UpdateKind::Rich);
        assert_eq!(UpdateKind::classify(false, false), UpdateKind::Simple);
    }

    #[test]
    fn only_transition_into_completed_completes() {
        use TaskStatus::*;
        assert!(TaskStatus::completes(Pending, Completed));
        assert!(TaskStatus::completes(InProgress, Completed));
        assert!(TaskStatus::completes(Cancelled, Completed));
        assert!(!TaskStatus::completes(Completed, Completed));
        assert!(!TaskStatus::completes(Pending, InProgress));
    }

    #[test]
    fn metadata_determines_activity_type() {
        let tx = Transaction::new(
            TransactionMetadata::Penalty {
                reason: "late submission".to_string(),
            },
            -20,
            "Penalty",
            at(2026, 1, 5),
        );
        assert_eq!(tx.activity_type, ActivityType::Penalty);
        assert_eq!(tx.created_at, at(2026, 1, 5));
    }

    #[test]
    fn roll_over_is_idempotent_within_month() {
        let mut record = LedgerRecord::open(EmployeeId::new("e"), at(2026, 1, 5), Duration::days(720));
        record.monthly_points = 40;
        record.total_points = 90;

        assert!(!record.roll_over(at(2026, 1, 31)));
        assert_eq!(record.monthly_points, 40);

        assert!(record.roll_over(at(2026, 2, 1)));
        assert_eq!(record.monthly_points, 0);
        assert_eq!(record.total_points, 90);
        assert_eq!(record.current_month.to_string(), "2026-02");
        assert_eq!(record.last_reset, at(2026, 2, 1));

        assert!(!record.roll_over(at(2026, 2, 20)));
    }

    #[test]
    fn activity_combines_flag_and_expiry() {
        let mut record = LedgerRecord::open(EmployeeId::new("e"), at(2026, 1, 1), Duration::days(30));
        assert!(record.is_active_at(at(2026, 1, 15)));
        assert!(!record.is_active_at(at(2026, 2, 1)));

        record.is_active = false;
        assert!(!record.is_active_at(at(2026, 1, 15)));
    }

    #[test]
    fn headroom_never_negative() {
        let mut record = LedgerRecord::open(EmployeeId::new("e"), at(2026, 1, 1), Duration::days(30));
        record.monthly_points = 198;
        assert_eq!(record.headroom(200), 2);
        record.monthly_points = 250;
        assert_eq!(record.headroom(200), 0);
    }
}
