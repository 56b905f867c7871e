//! Employee directory lookups for read views

use crate::error::StoreResult;
use crate::types::EmployeeId;
use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

/// Display details for an employee
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployeeProfile {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

impl EmployeeProfile {
    /// Create profile
    #[must_use]
    pub fn new(
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        email: impl Into<String>,
    ) -> Self {
        Self {
            first_name: first_name.into(),
            last_name: last_name.into(),
            email: email.into(),
        }
    }

    /// "First Last", trimmed when either part is missing
    #[must_use]
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

/// Source of employee profiles
#[async_trait]
pub trait EmployeeDirectory: Send + Sync {
    /// Profile for `employee_id`, if known
    async fn profile(&self, employee_id: &EmployeeId) -> StoreResult<Option<EmployeeProfile>>;
}

/// Directory backed by an in-memory map
#[derive(Debug, Default)]
pub struct StaticDirectory {
    profiles: DashMap<EmployeeId, EmployeeProfile>,
}

impl StaticDirectory {
    /// Create empty directory
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a profile
    pub fn insert(&self, employee_id: EmployeeId, profile: EmployeeProfile) {
        self.profiles.insert(employee_id, profile);
    }

    /// Builder form of [`insert`](Self::insert)
    #[must_use]
    pub fn with_profile(self, employee_id: impl Into<EmployeeId>, profile: EmployeeProfile) -> Self {
        self.insert(employee_id.into(), profile);
        self
    }
}

#[async_trait]
impl EmployeeDirectory for StaticDirectory {
    async fn profile(&self, employee_id: &EmployeeId) -> StoreResult<Option<EmployeeProfile>> {
        Ok(self.profiles.get(employee_id).map(|p| p.clone()))
    }
}
