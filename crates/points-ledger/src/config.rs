//! Point table configuration
//!
//! A [`PointsConfig`] is built once at process start (defaults, TOML or YAML)
//! and handed to the ledger. It is never mutated afterwards.

use crate::error::ConfigError;
use crate::types::{MilestoneTier, TaskPriority, UpdateKind};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Days counted per retention month
pub const DAYS_PER_RETENTION_MONTH: i64 = 30;

/// Longest accepted retention, in retention months
pub const MAX_EXPIRY_MONTHS: u32 = 1200;

/// Largest magnitude accepted for any point value or the monthly cap
pub const MAX_POINT_VALUE: i64 = 1_000_000;

/// Point values per activity, plus cap and retention
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PointsConfig {
    pub attendance: AttendancePoints,
    pub daily_updates: DailyUpdatePoints,
    pub tasks: TaskPoints,
    pub project_completion: ProjectPoints,
    pub milestones: MilestonePoints,
    /// Ceiling on points earnable in one calendar month
    pub monthly_cap_points: i64,
    /// Ledger retention from creation, in 30-day months
    pub expiry_months: u32,
}

/// Attendance point values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AttendancePoints {
    pub present: i64,
    pub on_time: i64,
    /// Adjustment for a late arrival, usually negative
    pub late: i64,
}

impl Default for AttendancePoints {
    fn default() -> Self {
        Self {
            present: 5,
            on_time: 2,
            late: -1,
        }
    }
}

/// Daily update point values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DailyUpdatePoints {
    pub rich: i64,
    pub simple: i64,
}

impl Default for DailyUpdatePoints {
    fn default() -> Self {
        Self { rich: 3, simple: 1 }
    }
}

/// Task completion point values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TaskPoints {
    pub base: i64,
    pub priority_bonus: PriorityBonus,
}

impl Default for TaskPoints {
    fn default() -> Self {
        Self {
            base: 4,
            priority_bonus: PriorityBonus::default(),
        }
    }
}

/// Bonus on top of the task base, per priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PriorityBonus {
    pub low: i64,
    pub medium: i64,
    pub high: i64,
}

impl Default for PriorityBonus {
    fn default() -> Self {
        Self {
            low: 0,
            medium: 2,
            high: 5,
        }
    }
}

/// Project completion point values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProjectPoints {
    /// Nominal pool of a completed project; bounds the per-employee split
    pub base: i64,
    pub per_employee_split: i64,
    pub early_bonus: i64,
}

impl Default for ProjectPoints {
    fn default() -> Self {
        Self {
            base: 50,
            per_employee_split: 10,
            early_bonus: 10,
        }
    }
}

/// Milestone point values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MilestonePoints {
    pub standard: i64,
    pub premium: i64,
}

impl Default for MilestonePoints {
    fn default() -> Self {
        Self {
            standard: 20,
            premium: 30,
        }
    }
}

impl Default for PointsConfig {
    fn default() -> Self {
        Self {
            attendance: AttendancePoints::default(),
            daily_updates: DailyUpdatePoints::default(),
            tasks: TaskPoints::default(),
            project_completion: ProjectPoints::default(),
            milestones: MilestonePoints::default(),
            monthly_cap_points: 200,
            expiry_months: 24,
        }
    }
}

impl PointsConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With monthly cap
    #[inline]
    #[must_use]
    pub fn with_monthly_cap(mut self, cap: i64) -> Self {
        self.monthly_cap_points = cap;
        self
    }

    /// With retention in months
    #[inline]
    #[must_use]
    pub fn with_expiry_months(mut self, months: u32) -> Self {
        self.expiry_months = months;
        self
    }

    /// With attendance values
    #[inline]
    #[must_use]
    pub fn with_attendance(mut self, attendance: AttendancePoints) -> Self {
        self.attendance = attendance;
        self
    }

    /// Retention period applied to new ledgers
    #[inline]
    #[must_use]
    pub fn retention(&self) -> Duration {
        Duration::try_days(i64::from(self.expiry_months) * DAYS_PER_RETENTION_MONTH)
            .unwrap_or(Duration::MAX)
    }

    /// Task bonus for `priority`
    #[inline]
    #[must_use]
    pub fn priority_bonus(&self, priority: TaskPriority) -> i64 {
        let bonus = &self.tasks.priority_bonus;
        match priority {
            TaskPriority::Low => bonus.low,
            TaskPriority::Medium => bonus.medium,
            TaskPriority::High => bonus.high,
        }
    }

    /// Points for a daily update of `kind`
    #[inline]
    #[must_use]
    pub fn update_points(&self, kind: UpdateKind) -> i64 {
        match kind {
            UpdateKind::Rich => self.daily_updates.rich,
            UpdateKind::Simple => self.daily_updates.simple,
        }
    }

    /// Points for a milestone of `tier`
    #[inline]
    #[must_use]
    pub fn milestone_points(&self, tier: MilestoneTier) -> i64 {
        match tier {
            MilestoneTier::Standard => self.milestones.standard,
            MilestoneTier::Premium => self.milestones.premium,
        }
    }

    /// Every point value in the table, by field name
    fn point_values(&self) -> impl Iterator<Item = (&'static str, i64)> {
        let bonus = self.tasks.priority_bonus;
        [
            ("monthly_cap_points", self.monthly_cap_points),
            ("attendance.present", self.attendance.present),
            ("attendance.on_time", self.attendance.on_time),
            ("attendance.late", self.attendance.late),
            ("daily_updates.rich", self.daily_updates.rich),
            ("daily_updates.simple", self.daily_updates.simple),
            ("tasks.base", self.tasks.base),
            ("tasks.priority_bonus.low", bonus.low),
            ("tasks.priority_bonus.medium", bonus.medium),
            ("tasks.priority_bonus.high", bonus.high),
            ("project_completion.base", self.project_completion.base),
            ("project_completion.per_employee_split", self.project_completion.per_employee_split),
            ("project_completion.early_bonus", self.project_completion.early_bonus),
            ("milestones.standard", self.milestones.standard),
            ("milestones.premium", self.milestones.premium),
        ]
        .into_iter()
    }

    /// Check table constraints
    ///
    /// # Errors
    /// `ConfigError::Invalid` naming the first violated constraint
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: &str| Err(ConfigError::Invalid(msg.to_string()));

        if self.monthly_cap_points <= 0 {
            return invalid("monthly_cap_points must be positive");
        }
        if self.expiry_months == 0 {
            return invalid("expiry_months must be positive");
        }
        if self.expiry_months > MAX_EXPIRY_MONTHS {
            return Err(ConfigError::Invalid(format!(
                "expiry_months exceeds {MAX_EXPIRY_MONTHS}"
            )));
        }
        if let Some((name, _)) = self
            .point_values()
            .find(|(_, value)| value.unsigned_abs() > MAX_POINT_VALUE.unsigned_abs())
        {
            return Err(ConfigError::Invalid(format!(
                "{name} exceeds magnitude {MAX_POINT_VALUE}"
            )));
        }
        if self.attendance.present < 0 || self.attendance.on_time < 0 {
            return invalid("attendance present/on_time must not be negative");
        }
        if self.daily_updates.simple < 0 || self.daily_updates.rich < self.daily_updates.simple {
            return invalid("daily_updates require 0 <= simple <= rich");
        }
        let bonus = &self.tasks.priority_bonus;
        if self.tasks.base < 0 || bonus.low < 0 || bonus.low > bonus.medium || bonus.medium > bonus.high {
            return invalid("tasks require base >= 0 and 0 <= low <= medium <= high");
        }
        let project = &self.project_completion;
        if project.per_employee_split < 0 || project.early_bonus < 0 {
            return invalid("project_completion values must not be negative");
        }
        if project.per_employee_split > project.base {
            return invalid("project_completion per_employee_split exceeds base");
        }
        if self.milestones.standard < 0 || self.milestones.premium < self.milestones.standard {
            return invalid("milestones require 0 <= standard <= premium");
        }
        Ok(())
    }

    /// Parse and validate a TOML table
    ///
    /// # Errors
    /// `Parse` on malformed input, `Invalid` on constraint violations
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate a YAML table
    ///
    /// # Errors
    /// `Parse` on malformed input, `Invalid` on constraint violations
    pub fn from_yaml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_yaml::from_str(source).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a `.toml`, `.yaml` or `.yml` file
    ///
    /// # Errors
    /// `Io`, `UnsupportedFormat`, `Parse` or `Invalid`
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();

        let source =
            std::fs::read_to_string(path).map_err(|e| ConfigError::io_error(path, e))?;

        let config = match extension.as_str() {
            "toml" => Self::from_toml_str(&source)?,
            "yaml" | "yml" => Self::from_yaml_str(&source)?,
            other => return Err(ConfigError::UnsupportedFormat(other.to_string())),
        };

        tracing::debug!(path = %path.display(), "loaded point table");
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn defaults_match_reference_table() {
        let config = PointsConfig::default();
        assert_eq!(config.attendance.present, 5);
        assert_eq!(config.attendance.on_time, 2);
        assert_eq!(config.attendance.late, -1);
        assert_eq!(config.update_points(UpdateKind::Rich), 3);
        assert_eq!(config.update_points(UpdateKind::Simple), 1);
        assert_eq!(config.priority_bonus(TaskPriority::High), 5);
        assert_eq!(config.milestone_points(MilestoneTier::Premium), 30);
        assert_eq!(config.monthly_cap_points, 200);
        assert_eq!(config.retention(), Duration::days(720));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn builder_overrides() {
        let config = PointsConfig::new().with_monthly_cap(50).with_expiry_months(1);
        assert_eq!(config.monthly_cap_points, 50);
        assert_eq!(config.retention(), Duration::days(30));
    }

    #[test]
    fn toml_partial_table_keeps_defaults() {
        let config = PointsConfig::from_toml_str(
            r#"
            monthly_cap_points = 150

            [tasks.priority_bonus]
            high = 8
            "#,
        )
        .unwrap();

        assert_eq!(config.monthly_cap_points, 150);
        assert_eq!(config.priority_bonus(TaskPriority::High), 8);
        assert_eq!(config.priority_bonus(TaskPriority::Medium), 2);
        assert_eq!(config.attendance, AttendancePoints::default());
    }

    #[test]
    fn yaml_table_parses() {
        let config = PointsConfig::from_yaml_str(
            "attendance:\n  present: 6\n  on_time: 1\n  late: -2\nexpiry_months: 12\n",
        )
        .unwrap();
        assert_eq!(config.attendance.present, 6);
        assert_eq!(config.attendance.late, -2);
        assert_eq!(config.expiry_months, 12);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let err = PointsConfig::from_toml_str("referral_bonus = 5").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn invalid_tables_are_rejected() {
        let cases = [
            PointsConfig::new().with_monthly_cap(0),
            PointsConfig::new().with_expiry_months(0),
            PointsConfig {
                milestones: MilestonePoints {
                    standard: 40,
                    premium: 30,
                },
                ..PointsConfig::default()
            },
            PointsConfig {
                project_completion: ProjectPoints {
                    base: 5,
                    per_employee_split: 10,
                    early_bonus: 0,
                },
                ..PointsConfig::default()
            },
        ];

        for config in cases {
            assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
        }
    }

    #[test]
    fn out_of_range_retention_is_rejected() {
        let err = PointsConfig::new()
            .with_expiry_months(4_000_000)
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("expiry_months"));

        let longest = PointsConfig::new().with_expiry_months(MAX_EXPIRY_MONTHS);
        longest.validate().unwrap();
        assert_eq!(
            longest.retention(),
            Duration::days(i64::from(MAX_EXPIRY_MONTHS) * DAYS_PER_RETENTION_MONTH)
        );
        assert_eq!(
            PointsConfig::new().with_expiry_months(u32::MAX).retention(),
            Duration::MAX
        );
    }

    #[test]
    fn oversized_point_values_are_rejected() {
        let huge_cap = PointsConfig::new().with_monthly_cap(i64::MAX);
        let err = huge_cap.validate().unwrap_err();
        assert!(err.to_string().contains("monthly_cap_points"));

        let huge_bonus = PointsConfig {
            tasks: TaskPoints {
                base: 4,
                priority_bonus: PriorityBonus {
                    low: 0,
                    medium: 2,
                    high: i64::MAX,
                },
            },
            ..PointsConfig::default()
        };
        let err = huge_bonus.validate().unwrap_err();
        assert!(err.to_string().contains("tasks.priority_bonus.high"));

        let late = PointsConfig::new().with_attendance(AttendancePoints {
            late: i64::MIN,
            ..AttendancePoints::default()
        });
        assert!(late.validate().is_err());

        let edge = PointsConfig::new().with_monthly_cap(MAX_POINT_VALUE);
        edge.validate().unwrap();
    }

    #[test]
    fn load_by_extension() {
        let dir = tempfile::tempdir().unwrap();

        let toml_path = dir.path().join("points.toml");
        let mut file = std::fs::File::create(&toml_path).unwrap();
        writeln!(file, "monthly_cap_points = 120").unwrap();
        assert_eq!(PointsConfig::load(&toml_path).unwrap().monthly_cap_points, 120);

        let yaml_path = dir.path().join("points.yml");
        std::fs::write(&yaml_path, "monthly_cap_points: 90\n").unwrap();
        assert_eq!(PointsConfig::load(&yaml_path).unwrap().monthly_cap_points, 90);

        let ini_path = dir.path().join("points.ini");
        std::fs::write(&ini_path, "cap=1").unwrap();
        assert!(matches!(
            PointsConfig::load(&ini_path),
            Err(ConfigError::UnsupportedFormat(ext)) if ext == "ini"
        ));

        assert!(matches!(
            PointsConfig::load(dir.path().join("missing.toml")),
            Err(ConfigError::Io { .. })
        ));
    }
}
