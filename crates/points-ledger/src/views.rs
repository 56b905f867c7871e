//! Read-side shapes returned by ledger queries

use crate::error::LedgerError;
use crate::types::{Award, EmployeeId, MonthKey, Transaction};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Employee-facing summary of one ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSummary {
    pub employee_id: EmployeeId,
    pub total_points: i64,
    pub monthly_points: i64,
    pub monthly_cap_remaining: i64,
    pub current_month: MonthKey,
    pub expiry_date: DateTime<Utc>,
    /// Stored flag and not yet expired
    pub is_active: bool,
    pub transaction_count: u64,
}

/// One row of the leaderboard
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    /// 1-based
    pub rank: usize,
    pub employee_id: EmployeeId,
    pub employee_name: String,
    pub email: String,
    pub total_points: i64,
    pub monthly_points: i64,
    /// Latest transactions, newest first
    pub recent_activity: Vec<Transaction>,
}

/// Administrative view of one ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployeeDetail {
    pub employee_id: EmployeeId,
    pub employee_name: String,
    pub email: String,
    pub total_points: i64,
    pub monthly_points: i64,
    pub current_month: MonthKey,
    pub monthly_cap_remaining: i64,
    /// Stored flag only
    pub is_active: bool,
    pub expiry_date: DateTime<Utc>,
    pub transactions: Vec<Transaction>,
}

/// One row of the full standings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StandingEntry {
    pub rank: usize,
    pub employee_id: EmployeeId,
    pub employee_name: String,
    pub email: String,
    pub total_points: i64,
    pub monthly_points: i64,
    pub current_month: MonthKey,
    pub is_active: bool,
    pub expiry_date: DateTime<Utc>,
    pub transaction_count: u64,
    pub last_transaction_at: Option<DateTime<Utc>>,
}

/// Aggregate figures across every ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemSummary {
    pub total_employees: usize,
    pub total_points_distributed: i64,
    pub average_points_per_employee: f64,
    pub max_points: i64,
    pub min_points: i64,
    /// Stored flag set and not yet expired
    pub active_employees: usize,
    pub monthly_cap_points: i64,
    pub expiry_months: u32,
}

/// Outcome of a project completion award for one employee
#[derive(Debug)]
pub struct ProjectAward {
    pub employee_id: EmployeeId,
    pub outcome: Result<Award, LedgerError>,
}

impl ProjectAward {
    /// Points applied, zero on failure
    #[inline]
    #[must_use]
    pub fn points(&self) -> i64 {
        self.outcome.as_ref().map_or(0, |award| award.points)
    }
}
