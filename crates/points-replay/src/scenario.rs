//! Scenario files and their replay against an in-memory ledger

use anyhow::Context;
use chrono::{DateTime, Duration, Utc};
use points_ledger::{
    AttendanceStatus, Award, Clock, EmployeeDirectory, EmployeeId, EmployeeProfile, FixedClock,
    InMemoryLedgerStore, LeaderboardEntry, LedgerResult, MilestoneTier, PointsConfig,
    PointsLedger, StandingEntry, StaticDirectory, SystemSummary, TaskPriority, TaskStatus,
    UpdateKind,
};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::path::Path;
use std::sync::Arc;

/// A timeline of activity to score
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct Scenario {
    /// Clock value before the first event
    pub(crate) start: DateTime<Utc>,
    #[serde(default)]
    pub(crate) profiles: Vec<ProfileEntry>,
    pub(crate) events: Vec<Event>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ProfileEntry {
    pub(crate) employee_id: EmployeeId,
    #[serde(flatten)]
    pub(crate) profile: EmployeeProfile,
}

/// One scenario step
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub(crate) enum Event {
    Attendance {
        employee_id: EmployeeId,
        status: AttendanceStatus,
        #[serde(default)]
        on_time: bool,
    },
    DailyUpdate {
        employee_id: EmployeeId,
        #[serde(default)]
        has_checklist: bool,
        #[serde(default)]
        has_attachments: bool,
    },
    TaskStatus {
        employee_id: EmployeeId,
        task_id: String,
        priority: TaskPriority,
        from: TaskStatus,
        to: TaskStatus,
    },
    ProjectCompleted {
        project_id: String,
        employee_ids: Vec<EmployeeId>,
        #[serde(default)]
        early: bool,
    },
    Milestone {
        employee_id: EmployeeId,
        tier: MilestoneTier,
        text: String,
    },
    Penalty {
        employee_id: EmployeeId,
        magnitude: i64,
        reason: String,
    },
    SetActive {
        employee_id: EmployeeId,
        active: bool,
    },
    Advance {
        #[serde(default)]
        days: i64,
        #[serde(default)]
        hours: i64,
    },
}

impl Event {
    fn name(&self) -> &'static str {
        match self {
            Self::Attendance { .. } => "attendance",
            Self::DailyUpdate { .. } => "daily_update",
            Self::TaskStatus { .. } => "task_status",
            Self::ProjectCompleted { .. } => "project_completed",
            Self::Milestone { .. } => "milestone",
            Self::Penalty { .. } => "penalty",
            Self::SetActive { .. } => "set_active",
            Self::Advance { .. } => "advance",
        }
    }
}

impl Scenario {
    /// Parse a scenario from JSON text
    pub(crate) fn from_json(source: &str) -> anyhow::Result<Self> {
        serde_json::from_str(source).context("malformed scenario")
    }

    /// Read and parse a scenario file
    pub(crate) fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("reading scenario {}", path.display()))?;
        Self::from_json(&source).with_context(|| format!("in {}", path.display()))
    }
}

/// What happened to one employee at one step
#[derive(Debug, Clone, Serialize)]
pub(crate) struct EventOutcome {
    /// 0-based position in the scenario
    pub(crate) index: usize,
    pub(crate) at: DateTime<Utc>,
    pub(crate) event: &'static str,
    pub(crate) employee_id: Option<EmployeeId>,
    pub(crate) points: Option<i64>,
    pub(crate) detail: String,
    pub(crate) ok: bool,
}

/// Everything a replay produced
#[derive(Debug, Clone, Serialize)]
pub(crate) struct ReplayReport {
    pub(crate) finished_at: DateTime<Utc>,
    pub(crate) events_applied: usize,
    pub(crate) events_failed: usize,
    pub(crate) outcomes: Vec<EventOutcome>,
    pub(crate) leaderboard: Vec<LeaderboardEntry>,
    pub(crate) standings: Vec<StandingEntry>,
    pub(crate) system: SystemSummary,
}

impl ReplayReport {
    #[must_use]
    pub(crate) fn passed(&self) -> bool {
        self.events_failed == 0
    }

    /// Plain-text rendering
    #[must_use]
    pub(crate) fn generate_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Replay Report");
        let _ = writeln!(out, "=============");
        let _ = writeln!(out, "Finished at: {}", self.finished_at.to_rfc3339());
        let _ = writeln!(out, "Events applied: {}", self.events_applied);
        let _ = writeln!(out, "Events failed: {}", self.events_failed);
        let _ = writeln!(out);

        let _ = writeln!(out, "Timeline:");
        for outcome in &self.outcomes {
            let who = outcome
                .employee_id
                .as_ref()
                .map_or_else(|| "-".to_string(), ToString::to_string);
            let points = outcome
                .points
                .map_or_else(String::new, |p| format!(" [{p:+}]"));
            let mark = if outcome.ok { "ok" } else { "FAILED" };
            let _ = writeln!(
                out,
                "  #{:<3} {:<17} {:<10} {mark}{points} {}",
                outcome.index, outcome.event, who, outcome.detail
            );
        }
        let _ = writeln!(out);

        let _ = writeln!(out, "Leaderboard:");
        for row in &self.leaderboard {
            let name = if row.employee_name.is_empty() {
                row.employee_id.to_string()
            } else {
                row.employee_name.clone()
            };
            let _ = writeln!(
                out,
                "  {:>2}. {:<20} total {:>5}  month {:>4}",
                row.rank, name, row.total_points, row.monthly_points
            );
        }
        let _ = writeln!(out);

        let _ = writeln!(out, "Standings:");
        for row in &self.standings {
            let _ = writeln!(
                out,
                "  {:>2}. {:<10} total {:>5}  month {:>4} ({})  tx {:>3}  {}",
                row.rank,
                row.employee_id,
                row.total_points,
                row.monthly_points,
                row.current_month,
                row.transaction_count,
                if row.is_active { "active" } else { "inactive" }
            );
        }
        let _ = writeln!(out);

        let s = &self.system;
        let _ = writeln!(out, "System:");
        let _ = writeln!(out, "  Employees: {} ({} active)", s.total_employees, s.active_employees);
        let _ = writeln!(out, "  Points distributed: {}", s.total_points_distributed);
        let _ = writeln!(out, "  Average: {:.1}", s.average_points_per_employee);
        let _ = writeln!(out, "  Max / Min: {} / {}", s.max_points, s.min_points);
        let _ = writeln!(
            out,
            "  Monthly cap: {}  Retention: {} months",
            s.monthly_cap_points, s.expiry_months
        );
        out
    }
}

/// Replay `scenario` against a fresh in-memory ledger
///
/// Failed steps are reported, not fatal. Only a failure of the final
/// queries aborts the replay.
pub(crate) async fn replay(
    scenario: &Scenario,
    config: PointsConfig,
    leaderboard_limit: usize,
) -> anyhow::Result<ReplayReport> {
    let clock = Arc::new(FixedClock::new(scenario.start));
    let directory = Arc::new(StaticDirectory::new());
    for entry in &scenario.profiles {
        directory.insert(entry.employee_id.clone(), entry.profile.clone());
    }

    let ledger = PointsLedger::new(config, Arc::new(InMemoryLedgerStore::new()), clock.clone())
        .context("building ledger")?
        .with_directory(directory as Arc<dyn EmployeeDirectory>);

    let mut outcomes = Vec::new();
    for (index, event) in scenario.events.iter().enumerate() {
        let at = clock.now();
        let mut note = |employee_id: Option<&EmployeeId>, result: LedgerResult<Option<Award>>| {
            let (points, detail, ok) = match result {
                Ok(Some(award)) => (Some(award.points), award.description, true),
                Ok(None) => (None, "no points".to_string(), true),
                Err(err) => {
                    tracing::warn!(index, error = %err, "scenario step failed");
                    (None, err.to_string(), false)
                }
            };
            outcomes.push(EventOutcome {
                index,
                at,
                event: event.name(),
                employee_id: employee_id.cloned(),
                points,
                detail,
                ok,
            });
        };

        match event {
            Event::Attendance {
                employee_id,
                status,
                on_time,
            } => {
                let result = ledger.award_attendance(employee_id, *status, *on_time).await;
                note(Some(employee_id), result);
            }
            Event::DailyUpdate {
                employee_id,
                has_checklist,
                has_attachments,
            } => {
                let kind = UpdateKind::classify(*has_checklist, *has_attachments);
                let result = ledger.award_daily_update(employee_id, kind).await;
                note(Some(employee_id), result.map(Some));
            }
            Event::TaskStatus {
                employee_id,
                task_id,
                priority,
                from,
                to,
            } => {
                let result = ledger
                    .award_task_transition(employee_id, task_id, *priority, *from, *to)
                    .await;
                note(Some(employee_id), result);
            }
            Event::ProjectCompleted {
                project_id,
                employee_ids,
                early,
            } => {
                for award in ledger
                    .award_project_completion(employee_ids, project_id, *early)
                    .await
                {
                    note(Some(&award.employee_id), award.outcome.map(Some));
                }
            }
            Event::Milestone {
                employee_id,
                tier,
                text,
            } => {
                let result = ledger.award_milestone(employee_id, *tier, text).await;
                note(Some(employee_id), result.map(Some));
            }
            Event::Penalty {
                employee_id,
                magnitude,
                reason,
            } => {
                let result = ledger.apply_penalty(employee_id, *magnitude, reason).await;
                note(Some(employee_id), result.map(Some));
            }
            Event::SetActive {
                employee_id,
                active,
            } => {
                let result = ledger.set_active(employee_id, *active).await.map(|_| {
                    Some(Award {
                        points: 0,
                        description: if *active { "activated" } else { "deactivated" }
                            .to_string(),
                    })
                });
                note(Some(employee_id), result);
            }
            Event::Advance { days, hours } => {
                let target = Duration::try_days(*days)
                    .zip(Duration::try_hours(*hours))
                    .and_then(|(days, hours)| days.checked_add(&hours))
                    .and_then(|delta| at.checked_add_signed(delta));
                let (detail, ok) = match target {
                    Some(target) => {
                        clock.set(target);
                        (format!("clock now {}", target.to_rfc3339()), true)
                    }
                    None => {
                        tracing::warn!(index, days, hours, "clock advance out of range");
                        (format!("cannot advance clock by {days} days {hours} hours"), false)
                    }
                };
                outcomes.push(EventOutcome {
                    index,
                    at,
                    event: event.name(),
                    employee_id: None,
                    points: None,
                    detail,
                    ok,
                });
            }
        }
    }

    let events_failed = outcomes.iter().filter(|o| !o.ok).count();
    Ok(ReplayReport {
        finished_at: clock.now(),
        events_applied: outcomes.len() - events_failed,
        events_failed,
        leaderboard: ledger.leaderboard(leaderboard_limit).await?,
        standings: ledger.standings().await?,
        system: ledger.system_summary().await?,
        outcomes,
    })
}
