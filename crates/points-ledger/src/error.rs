//! Error types for the points ledger
//!
//! Provides error handling for:
//! - Persistence failures and optimistic-concurrency conflicts
//! - Rejected caller input
//! - Configuration loading and validation

use crate::types::EmployeeId;
use std::path::PathBuf;

/// Main ledger error type
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// No ledger exists and the operation may not create one
    #[error("no points ledger for employee {0}")]
    NotFound(EmployeeId),

    /// The persistence collaborator failed
    #[error("persistence failure: {0}")]
    Persistence(#[from] StoreError),

    /// Caller input outside the recognized enumerations
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Commit retries were exhausted against concurrent writers
    #[error("concurrent update conflict for employee {employee_id} after {attempts} attempts")]
    ConcurrentUpdateConflict {
        /// Ledger being written
        employee_id: EmployeeId,
        /// Commit attempts made
        attempts: u32,
    },

    /// Point table rejected
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl LedgerError {
    /// Create invalid input error
    #[inline]
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    /// Check if a caller may retry the operation unchanged
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ConcurrentUpdateConflict { .. }
                | Self::Persistence(StoreError::VersionConflict { .. })
        )
    }
}

/// Errors raised by a [`LedgerStore`](crate::store::LedgerStore)
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// A ledger already exists for this employee
    #[error("duplicate ledger for employee {0}")]
    DuplicateKey(EmployeeId),

    /// The stored record moved on since it was loaded
    #[error("version conflict for employee {employee_id}: expected {expected}, found {actual}")]
    VersionConflict {
        /// Ledger being written
        employee_id: EmployeeId,
        /// Version the writer loaded
        expected: u64,
        /// Version currently stored
        actual: u64,
    },

    /// Commit addressed a ledger that does not exist
    #[error("ledger not found for employee {0}")]
    NotFound(EmployeeId),

    /// Backend-specific failure
    #[error("store backend error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Create backend error
    #[inline]
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend(message.into())
    }

    /// Check if this is an optimistic-concurrency conflict
    #[inline]
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::VersionConflict { .. })
    }
}

/// Errors while loading or validating a point table
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// IO error reading the config file
    #[error("io error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Syntax or shape error in the config document
    #[error("parse error: {0}")]
    Parse(String),

    /// File extension maps to no known format
    #[error("unsupported config format: '{0}'")]
    UnsupportedFormat(String),

    /// Values parsed but violate table constraints
    #[error("invalid point table: {0}")]
    Invalid(String),
}

impl ConfigError {
    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type alias for ledger operations
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Result type alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;
