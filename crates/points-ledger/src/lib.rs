//! Points Ledger - per-employee gamification scoring
//!
//! Tracks lifetime and monthly points for each employee:
//! - Scores attendance, daily updates, tasks, projects, milestones and penalties
//! - Caps positive monthly earnings and resets the month lazily on access
//! - Keeps an append-only transaction log per employee
//! - Serves summaries, a leaderboard and administrative views
//!
//! # Example
//!
//! ```rust,ignore
//! use points_ledger::prelude::*;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let ledger = PointsLedger::new(
//!     PointsConfig::default(),
//!     Arc::new(InMemoryLedgerStore::new()),
//!     Arc::new(SystemClock),
//! )?;
//!
//! let employee = EmployeeId::new("e-1042");
//! let award = ledger
//!     .award_task_completion(&employee, "task-7", TaskPriority::High)
//!     .await?;
//!
//! println!("{} -> {} points", award.description, award.points);
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod clock;
pub mod config;
pub mod directory;
pub mod error;
pub mod ledger;
pub mod rules;
pub mod store;
pub mod telemetry;
pub mod types;
pub mod views;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{
    AttendancePoints, DailyUpdatePoints, MilestonePoints, PointsConfig, PriorityBonus,
    ProjectPoints, TaskPoints, MAX_EXPIRY_MONTHS, MAX_POINT_VALUE,
};
pub use directory::{EmployeeDirectory, EmployeeProfile, StaticDirectory};
pub use error::{ConfigError, LedgerError, LedgerResult, StoreError, StoreResult};
pub use ledger::{PointsLedger, DETAIL_HISTORY_LEN, MAX_COMMIT_ATTEMPTS, RECENT_ACTIVITY_LEN};
pub use store::{InMemoryLedgerStore, LedgerStore, RecordFilter};
pub use telemetry::{init_tracing, LogFormat};
pub use types::{
    ActivityType, AttendanceStatus, Award, EmployeeId, LedgerRecord, MilestoneTier, MonthKey,
    TaskPriority, TaskStatus, Transaction, TransactionId, TransactionMetadata, UpdateKind,
};
pub use views::{
    EmployeeDetail, LeaderboardEntry, LedgerSummary, ProjectAward, StandingEntry, SystemSummary,
};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with the points ledger
    pub use crate::{
        AttendanceStatus, Award, Clock, EmployeeId, InMemoryLedgerStore, LedgerError,
        LedgerResult, LedgerStore, MilestoneTier, PointsConfig, PointsLedger, SystemClock,
        TaskPriority, TaskStatus, UpdateKind,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
