use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{ModuleId, TrainingModule, TrainingQuestion};
use super::progress::{ProgressKey, TrainingProgress};
use crate::organization::{EmployeeId, OrganizationId};

/// Platform-owned curriculum catalog.
pub trait ModuleCatalog: Send + Sync {
    /// Active modules ordered by curriculum position.
    fn active_modules(&self) -> Result<Vec<TrainingModule>, RepositoryError>;
    fn module(&self, id: &ModuleId) -> Result<Option<TrainingModule>, RepositoryError>;
    fn questions(&self, module_id: &ModuleId) -> Result<Vec<TrainingQuestion>, RepositoryError>;
}

/// Progress store with per-record optimistic concurrency.
///
/// Writers read a record, mutate it, and store it back with the revision they read. A
/// store that observes a different revision must reject the write with `Conflict`.
pub trait ProgressRepository: Send + Sync {
    fn fetch(&self, key: &ProgressKey) -> Result<Option<TrainingProgress>, RepositoryError>;
    /// Store a new record; `Conflict` if the key already exists.
    fn insert(&self, record: TrainingProgress) -> Result<(), RepositoryError>;
    /// Replace a record whose stored revision equals `expected_revision`.
    fn replace(
        &self,
        record: TrainingProgress,
        expected_revision: u64,
    ) -> Result<(), RepositoryError>;
    fn for_employee(&self, employee_id: &EmployeeId)
        -> Result<Vec<TrainingProgress>, RepositoryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record was modified concurrently")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrainingRecordKind {
    Initial,
    Annual,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletedModuleSummary {
    pub module_id: ModuleId,
    pub title: String,
    pub best_score: u8,
    pub attempts: usize,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Finalized compliance record handed to the issuance sink (Labor Code 6401.9(e)).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingRecord {
    pub employee_id: EmployeeId,
    pub employee_name: String,
    pub organization_id: OrganizationId,
    pub kind: TrainingRecordKind,
    pub completed_at: DateTime<Utc>,
    pub next_due_date: NaiveDate,
    pub modules: Vec<CompletedModuleSummary>,
}

/// Persists finalized training records once curriculum completion is confirmed.
pub trait TrainingRecordSink: Send + Sync {
    fn issue(&self, record: TrainingRecord) -> Result<(), RecordSinkError>;
}

#[derive(Debug, thiserror::Error)]
pub enum RecordSinkError {
    #[error("training record sink unavailable: {0}")]
    Unavailable(String),
}
