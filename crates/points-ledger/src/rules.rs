//! Scoring rules
//!
//! Pure functions from the point table and activity inputs to a nominal
//! delta, plus the settlement of that delta against a ledger's counters.
//! Nothing here touches storage.

use crate::config::PointsConfig;
use crate::types::{
    AttendanceStatus, LedgerRecord, MilestoneTier, TaskPriority, TransactionMetadata, UpdateKind,
};

/// Most severe penalty applied
pub const PENALTY_FLOOR: i64 = -100;
/// Least severe penalty applied
pub const PENALTY_CEILING: i64 = -20;

const CAPPED_NOTE: &str = " (Capped at monthly limit)";
const FLOORED_NOTE: &str = " (Floored at zero balance)";

/// Delta computed from the point table before settlement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Nominal {
    pub points: i64,
    pub description: String,
    pub metadata: TransactionMetadata,
}

/// How a delta was altered to respect the ledger's bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Adjustment {
    /// Applied as computed
    Exact,
    /// Reduced to the remaining monthly headroom
    Capped,
    /// Raised so no counter goes below zero
    Floored,
}

impl Adjustment {
    /// Suffix appended to the transaction description
    #[must_use]
    pub fn note(&self) -> &'static str {
        match self {
            Self::Exact => "",
            Self::Capped => CAPPED_NOTE,
            Self::Floored => FLOORED_NOTE,
        }
    }
}

/// Attendance delta, or `None` for statuses with no rule
#[must_use]
pub fn attendance(config: &PointsConfig, status: AttendanceStatus, on_time: bool) -> Option<Nominal> {
    let table = &config.attendance;
    let (points, description) = match status {
        AttendanceStatus::Present | AttendanceStatus::Wfh if on_time => (
            table.present.saturating_add(table.on_time),
            format!("Attendance - {status} (On Time)"),
        ),
        AttendanceStatus::Present | AttendanceStatus::Wfh => {
            (table.present, format!("Attendance - {status}"))
        }
        AttendanceStatus::Late => (table.late, "Attendance - Late".to_string()),
        AttendanceStatus::HalfDay => (
            table.present.div_euclid(2),
            "Attendance - Half Day".to_string(),
        ),
        AttendanceStatus::Absent | AttendanceStatus::OnLeave => return None,
    };

    Some(Nominal {
        points,
        description,
        metadata: TransactionMetadata::Attendance { status },
    })
}

/// Daily update delta
#[must_use]
pub fn daily_update(config: &PointsConfig, kind: UpdateKind) -> Nominal {
    let description = match kind {
        UpdateKind::Rich => "Daily Update - Rich (with checklist/attachments)",
        UpdateKind::Simple => "Daily Update - Simple",
    };
    Nominal {
        points: config.update_points(kind),
        description: description.to_string(),
        metadata: TransactionMetadata::DailyUpdate { update_type: kind },
    }
}

/// Task completion delta
#[must_use]
pub fn task_completion(config: &PointsConfig, task_id: &str, priority: TaskPriority) -> Nominal {
    let base = config.tasks.base;
    let bonus = config.priority_bonus(priority);
    Nominal {
        points: base.saturating_add(bonus),
        description: format!(
            "Task Completed - Priority: {} (Base: {base} + Bonus: {bonus})",
            priority.as_str().to_uppercase()
        ),
        metadata: TransactionMetadata::Task {
            task_id: task_id.to_string(),
            priority,
        },
    }
}

/// Per-employee project completion delta
#[must_use]
pub fn project_completion(config: &PointsConfig, project_id: &str, early: bool) -> Nominal {
    let split = config.project_completion.per_employee_split;
    let (points, description) = if early {
        let bonus = config.project_completion.early_bonus;
        (
            split.saturating_add(bonus),
            format!("Project Completed (Early) - {split} base + {bonus} early bonus"),
        )
    } else {
        (split, format!("Project Completed - {split} points"))
    };

    Nominal {
        points,
        description,
        metadata: TransactionMetadata::ProjectCompletion {
            project_id: project_id.to_string(),
            early,
        },
    }
}

/// Milestone delta; `text` is carried into the description
#[must_use]
pub fn milestone(config: &PointsConfig, tier: MilestoneTier, text: &str) -> Nominal {
    let points = config.milestone_points(tier);
    Nominal {
        points,
        description: format!("Milestone: {text} ({} - {points} points)", tier.label()),
        metadata: TransactionMetadata::Milestone { tier },
    }
}

/// Penalty value for a raw magnitude, always in `[PENALTY_FLOOR, PENALTY_CEILING]`
///
/// The caller's sign is ignored.
#[inline]
#[must_use]
pub fn penalty_value(magnitude: i64) -> i64 {
    magnitude
        .saturating_abs()
        .saturating_neg()
        .clamp(PENALTY_FLOOR, PENALTY_CEILING)
}

/// Penalty delta
#[must_use]
pub fn penalty(magnitude: i64, reason: &str) -> Nominal {
    let points = penalty_value(magnitude);
    Nominal {
        points,
        description: format!("Penalty: {reason} ({points} points)"),
        metadata: TransactionMetadata::Penalty {
            reason: reason.to_string(),
        },
    }
}

/// Delta that fits the monthly headroom and keeps counters non-negative
#[must_use]
pub fn settle_capped(nominal: i64, monthly_points: i64, cap: i64) -> (i64, Adjustment) {
    if nominal >= 0 {
        let headroom = cap.saturating_sub(monthly_points).max(0);
        if nominal > headroom {
            return (headroom, Adjustment::Capped);
        }
        return (nominal, Adjustment::Exact);
    }

    // monthly <= total, so flooring against monthly keeps both non-negative
    if monthly_points.saturating_add(nominal) < 0 {
        return (-monthly_points, Adjustment::Floored);
    }
    (nominal, Adjustment::Exact)
}

/// Apply a capped credit (or small debit) to `record`
///
/// Returns the applied delta and the final description.
pub fn credit(record: &mut LedgerRecord, nominal: &Nominal, cap: i64) -> (i64, String) {
    let (applied, adjustment) = settle_capped(nominal.points, record.monthly_points, cap);
    record.total_points = record.total_points.saturating_add(applied);
    record.monthly_points = record.monthly_points.saturating_add(applied);
    (applied, format!("{}{}", nominal.description, adjustment.note()))
}

/// Apply a penalty to `record`, bypassing the cap and flooring both counters
///
/// The returned delta is the penalty value itself; the description notes
/// when a counter was floored.
pub fn debit(record: &mut LedgerRecord, nominal: &Nominal) -> (i64, String) {
    let total = record.total_points.saturating_add(nominal.points);
    let monthly = record.monthly_points.saturating_add(nominal.points);
    let floored = total < 0 || monthly < 0;
    record.total_points = total.max(0);
    record.monthly_points = monthly.max(0);

    let adjustment = if floored {
        Adjustment::Floored
    } else {
        Adjustment::Exact
    };
    (nominal.points, format!("{}{}", nominal.description, adjustment.note()))
}
