use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::domain::{ModuleId, QuestionView, SubmittedAnswer, TrainingModule};
use super::grader::{self, GradeOutcome};
use super::progress::{ModuleStatus, ProgressKey, QuestionResult, TrainingProgress};
use super::repository::{
    CompletedModuleSummary, ModuleCatalog, ProgressRepository, RepositoryError, TrainingRecord,
    TrainingRecordKind, TrainingRecordSink,
};
use super::sequencer::{self, ModuleCatalogEntry};
use crate::organization::{DirectoryError, Employee, EmployeeId, OrganizationDirectory};
use crate::reminders::schedule::next_annual_due_date;

/// Optimistic write attempts before a contended progress update gives up.
const MAX_WRITE_ATTEMPTS: usize = 3;

/// Watch beacon sent by the video player.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VideoProgressReport {
    /// Percentage watched, 0-100. Values above 100 are clamped.
    pub video_progress: f64,
    /// Resume position in seconds.
    #[serde(default)]
    pub last_watched_position: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CurriculumCompletion {
    pub kind: TrainingRecordKind,
    pub completed_at: DateTime<Utc>,
    pub next_training_due_date: NaiveDate,
    pub record_issued: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProgressUpdate {
    pub progress: TrainingProgress,
    /// True when this update moved the module into `completed`.
    pub module_completed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub curriculum: Option<CurriculumCompletion>,
}

#[derive(Debug, Clone, Serialize)]
pub struct QuizSubmissionOutcome {
    pub attempt_number: u32,
    pub score: u8,
    pub passed: bool,
    pub correct_count: u32,
    pub total_questions: usize,
    pub best_score: u8,
    /// Module status after this submission is `completed`.
    pub module_completed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempts_remaining: Option<u32>,
    pub per_question_result: Vec<QuestionResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub curriculum: Option<CurriculumCompletion>,
}

/// Owns progress mutation for (employee, module) pairs.
///
/// Lock state is not re-derived here; callers consult [`ProgressTracker::ensure_unlocked`]
/// before forwarding learner activity.
pub struct ProgressTracker<C, P, D, S> {
    catalog: Arc<C>,
    progress: Arc<P>,
    directory: Arc<D>,
    records: Arc<S>,
}

impl<C, P, D, S> ProgressTracker<C, P, D, S>
where
    C: ModuleCatalog + 'static,
    P: ProgressRepository + 'static,
    D: OrganizationDirectory + 'static,
    S: TrainingRecordSink + 'static,
{
    pub fn new(catalog: Arc<C>, progress: Arc<P>, directory: Arc<D>, records: Arc<S>) -> Self {
        Self {
            catalog,
            progress,
            directory,
            records,
        }
    }

    /// Ingest a video beacon, creating the progress record on first contact.
    pub fn report_video_progress(
        &self,
        employee_id: &EmployeeId,
        module_id: &ModuleId,
        report: VideoProgressReport,
        at: DateTime<Utc>,
    ) -> Result<ProgressUpdate, TrainingServiceError> {
        let (pct, position) = validate_video_report(&report)?;
        let mut employee = self.employee(employee_id)?;
        let module = self.active_module(module_id)?;
        let key = ProgressKey::new(employee.id.clone(), module.id.clone());

        let (progress, module_completed) = self.write_progress(&key, |current| {
            let mut record = match current {
                Some(record) => record,
                None => {
                    let mut record = TrainingProgress::new(key.clone(), at);
                    record.advance_status(ModuleStatus::InProgress, at);
                    record
                }
            };
            if record.record_video_progress(pct, position, at) {
                debug!(employee = %key.employee_id, module = %key.module_id, "video watched");
            }
            let completed_now = record.refresh_status(at);
            Ok((record, completed_now))
        })?;

        if module_completed {
            info!(employee = %employee.id, module = %module.id, "module completed");
        }
        self.mark_curriculum_started(&mut employee, at);
        let curriculum = self.close_cycle(&mut employee, at);

        Ok(ProgressUpdate {
            progress,
            module_completed,
            curriculum,
        })
    }

    /// Grade a quiz submission and append it to the attempt history.
    pub fn submit_quiz(
        &self,
        employee_id: &EmployeeId,
        module_id: &ModuleId,
        answers: &[SubmittedAnswer],
        at: DateTime<Utc>,
    ) -> Result<QuizSubmissionOutcome, TrainingServiceError> {
        let mut employee = self.employee(employee_id)?;
        let module = self.active_module(module_id)?;
        let bank = self.catalog.questions(&module.id)?;
        let key = ProgressKey::new(employee.id.clone(), module.id.clone());

        let (progress, (grade, completed_now)) = self.write_progress(&key, |current| {
            let mut record =
                current.ok_or_else(|| TrainingServiceError::PrerequisiteNotMet(module.id.clone()))?;
            if let Some(limit) = module.attempt_limit() {
                if record.attempts_used() >= limit as usize {
                    warn!(
                        employee = %key.employee_id,
                        module = %key.module_id,
                        limit,
                        "quiz attempt limit reached"
                    );
                    return Err(TrainingServiceError::AttemptLimitExceeded {
                        module_id: module.id.clone(),
                        max_attempts: limit,
                    });
                }
            }

            let grade: GradeOutcome = grader::grade(&module, &bank, answers);
            record.record_attempt(&grade, at);
            let completed_now = record.refresh_status(at);
            Ok((record, (grade, completed_now)))
        })?;

        if completed_now {
            info!(employee = %employee.id, module = %module.id, "module completed");
        }
        self.mark_curriculum_started(&mut employee, at);
        let curriculum = self.close_cycle(&mut employee, at);

        Ok(QuizSubmissionOutcome {
            attempt_number: progress
                .quiz_attempts
                .last()
                .map(|attempt| attempt.attempt_number)
                .unwrap_or(0),
            score: grade.score,
            passed: grade.passed,
            correct_count: grade.correct_count,
            total_questions: bank.len(),
            best_score: progress.best_score,
            module_completed: progress.is_completed(),
            attempts_remaining: module.attempts_remaining(progress.attempts_used()),
            per_question_result: grade.results,
            curriculum,
        })
    }

    /// Assign the required curriculum, creating `not_started` records where none exist.
    pub fn assign_training(
        &self,
        employee_id: &EmployeeId,
        due_date: Option<NaiveDate>,
        at: DateTime<Utc>,
    ) -> Result<Vec<TrainingProgress>, TrainingServiceError> {
        let mut employee = self.employee(employee_id)?;
        let mut created = Vec::new();

        for module in self
            .catalog
            .active_modules()?
            .into_iter()
            .filter(|module| module.is_required)
        {
            let mut record =
                TrainingProgress::new(ProgressKey::new(employee.id.clone(), module.id), at);
            record.due_date = due_date;
            record.revision = 1;
            match self.progress.insert(record.clone()) {
                Ok(()) => created.push(record),
                Err(RepositoryError::Conflict) => {}
                Err(err) => return Err(err.into()),
            }
        }

        if !created.is_empty() {
            self.mark_curriculum_started(&mut employee, at);
            info!(employee = %employee.id, assigned = created.len(), "training assigned");
        }
        Ok(created)
    }

    /// Active curriculum with the employee's status and lock state per module.
    pub fn catalog_for(
        &self,
        employee_id: &EmployeeId,
    ) -> Result<Vec<ModuleCatalogEntry>, TrainingServiceError> {
        let employee = self.employee(employee_id)?;
        let modules = self.catalog.active_modules()?;
        let progress = self.progress_by_module(&employee.id)?;
        Ok(sequencer::project_lock_state(&modules, &progress))
    }

    /// Reject activity on modules the employee has not unlocked yet.
    pub fn ensure_unlocked(
        &self,
        employee_id: &EmployeeId,
        module_id: &ModuleId,
    ) -> Result<(), TrainingServiceError> {
        let modules = self.catalog.active_modules()?;
        let progress = self.progress_by_module(employee_id)?;
        match sequencer::is_unlocked(&modules, &progress, module_id) {
            Some(true) => Ok(()),
            Some(false) => Err(TrainingServiceError::ModuleLocked(module_id.clone())),
            None => Err(TrainingServiceError::ModuleNotFound(module_id.clone())),
        }
    }

    /// Question bank for display, without correctness flags.
    pub fn questions_for(
        &self,
        module_id: &ModuleId,
    ) -> Result<Vec<QuestionView>, TrainingServiceError> {
        let module = self.active_module(module_id)?;
        Ok(self
            .catalog
            .questions(&module.id)?
            .iter()
            .map(|question| question.public_view())
            .collect())
    }

    pub fn progress(
        &self,
        employee_id: &EmployeeId,
        module_id: &ModuleId,
    ) -> Result<TrainingProgress, TrainingServiceError> {
        let key = ProgressKey::new(employee_id.clone(), module_id.clone());
        Ok(self
            .progress
            .fetch(&key)?
            .ok_or(RepositoryError::NotFound)?)
    }

    /// Read, mutate, and conditionally store one record, retrying on concurrent writes.
    ///
    /// `mutate` runs against a fresh read on every attempt and must not have side effects
    /// beyond the returned record. Returns the stored record and the mutation output.
    fn write_progress<T>(
        &self,
        key: &ProgressKey,
        mut mutate: impl FnMut(
            Option<TrainingProgress>,
        ) -> Result<(TrainingProgress, T), TrainingServiceError>,
    ) -> Result<(TrainingProgress, T), TrainingServiceError> {
        for attempt in 1..=MAX_WRITE_ATTEMPTS {
            let current = self.progress.fetch(key)?;
            let expected = current.as_ref().map(|record| record.revision);
            let (mut record, output) = mutate(current)?;

            let stored = match expected {
                Some(revision) => {
                    record.revision = revision + 1;
                    self.progress.replace(record.clone(), revision)
                }
                None => {
                    record.revision = 1;
                    self.progress.insert(record.clone())
                }
            };

            match stored {
                Ok(()) => return Ok((record, output)),
                Err(RepositoryError::Conflict) => {
                    debug!(
                        employee = %key.employee_id,
                        module = %key.module_id,
                        attempt,
                        "progress write conflicted, retrying"
                    );
                }
                Err(err) => return Err(err.into()),
            }
        }

        Err(RepositoryError::Conflict.into())
    }

    /// Stamp the employee cache on first activity. A failed write leaves the marker
    /// unset so the next call stamps it again.
    fn mark_curriculum_started(&self, employee: &mut Employee, at: DateTime<Utc>) {
        if employee.training_started_at.is_some() {
            return;
        }
        let mut stamped = employee.clone();
        stamped.training_started_at = Some(at);
        match self.directory.update_employee(stamped.clone()) {
            Ok(()) => {
                *employee = stamped;
                info!(employee = %employee.id, "training path started");
            }
            Err(err) => {
                warn!(employee = %employee.id, error = %err, "training start marker not saved");
            }
        }
    }

    /// Runs after the progress write has committed, so failures are logged rather than
    /// returned; the cycle stays open and the next activity closes it.
    fn close_cycle(
        &self,
        employee: &mut Employee,
        at: DateTime<Utc>,
    ) -> Option<CurriculumCompletion> {
        match self.complete_curriculum_if_done(employee, at) {
            Ok(completion) => completion,
            Err(err) => {
                warn!(
                    employee = %employee.id,
                    error = %err,
                    "curriculum completion check failed"
                );
                None
            }
        }
    }

    /// Close the current cycle once every required module is completed and the employee
    /// cache has not been stamped since the last of those completions.
    ///
    /// Derived from stored state rather than from the call that completed a module, so a
    /// cycle whose write-through failed is closed by the employee's next activity.
    fn complete_curriculum_if_done(
        &self,
        employee: &mut Employee,
        at: DateTime<Utc>,
    ) -> Result<Option<CurriculumCompletion>, TrainingServiceError> {
        let required: Vec<TrainingModule> = self
            .catalog
            .active_modules()?
            .into_iter()
            .filter(|module| module.is_required)
            .collect();
        if required.is_empty() {
            return Ok(None);
        }

        let progress = self.progress_by_module(&employee.id)?;
        let all_completed = required.iter().all(|module| {
            progress
                .get(&module.id)
                .map(TrainingProgress::is_completed)
                .unwrap_or(false)
        });
        if !all_completed {
            return Ok(None);
        }

        let cycle_completed_at = required
            .iter()
            .filter_map(|module| progress.get(&module.id).and_then(|record| record.completed_at))
            .max();
        let last_stamp = employee
            .initial_training_completed_at
            .max(employee.last_annual_training_completed_at);
        if let (Some(stamp), Some(completed)) = (last_stamp, cycle_completed_at) {
            if stamp >= completed {
                return Ok(None);
            }
        }

        let next_due = next_annual_due_date(at.date_naive());
        let mut stamped = employee.clone();
        let kind = if stamped.initial_training_completed_at.is_none() {
            stamped.initial_training_completed_at = Some(at);
            TrainingRecordKind::Initial
        } else {
            stamped.last_annual_training_completed_at = Some(at);
            TrainingRecordKind::Annual
        };
        stamped.next_training_due_date = Some(next_due);
        self.directory.update_employee(stamped.clone())?;
        *employee = stamped;

        let modules = required
            .iter()
            .filter_map(|module| {
                progress.get(&module.id).map(|record| CompletedModuleSummary {
                    module_id: module.id.clone(),
                    title: module.title.clone(),
                    best_score: record.best_score,
                    attempts: record.attempts_used(),
                    completed_at: record.completed_at,
                })
            })
            .collect();

        let record = TrainingRecord {
            employee_id: employee.id.clone(),
            employee_name: employee.name.clone(),
            organization_id: employee.organization_id.clone(),
            kind,
            completed_at: at,
            next_due_date: next_due,
            modules,
        };

        let record_issued = match self.records.issue(record) {
            Ok(()) => true,
            Err(err) => {
                warn!(employee = %employee.id, error = %err, "training record issuance failed");
                false
            }
        };

        info!(
            employee = %employee.id,
            kind = ?kind,
            next_due = %next_due,
            record_issued,
            "curriculum completed"
        );

        Ok(Some(CurriculumCompletion {
            kind,
            completed_at: at,
            next_training_due_date: next_due,
            record_issued,
        }))
    }

    fn progress_by_module(
        &self,
        employee_id: &EmployeeId,
    ) -> Result<HashMap<ModuleId, TrainingProgress>, TrainingServiceError> {
        Ok(self
            .progress
            .for_employee(employee_id)?
            .into_iter()
            .map(|record| (record.key.module_id.clone(), record))
            .collect())
    }

    fn employee(&self, id: &EmployeeId) -> Result<Employee, TrainingServiceError> {
        self.directory
            .employee(id)?
            .ok_or_else(|| TrainingServiceError::EmployeeNotFound(id.clone()))
    }

    fn active_module(&self, id: &ModuleId) -> Result<TrainingModule, TrainingServiceError> {
        self.catalog
            .module(id)?
            .filter(|module| module.is_active)
            .ok_or_else(|| TrainingServiceError::ModuleNotFound(id.clone()))
    }
}

fn validate_video_report(report: &VideoProgressReport) -> Result<(u8, f64), TrainingServiceError> {
    if !report.video_progress.is_finite() || report.video_progress < 0.0 {
        return Err(TrainingServiceError::Validation(
            "video_progress must be a number between 0 and 100".to_string(),
        ));
    }
    if !report.last_watched_position.is_finite() || report.last_watched_position < 0.0 {
        return Err(TrainingServiceError::Validation(
            "last_watched_position must be a non-negative number of seconds".to_string(),
        ));
    }
    // Floor so 89.9 does not count as crossing the 90% mark.
    let pct = report.video_progress.min(100.0).floor() as u8;
    Ok((pct, report.last_watched_position))
}

/// Error raised by the progress tracker.
#[derive(Debug, thiserror::Error)]
pub enum TrainingServiceError {
    #[error("training module {0} not found")]
    ModuleNotFound(ModuleId),
    #[error("employee {0} not found")]
    EmployeeNotFound(EmployeeId),
    #[error("module {0} is locked until the previous module is completed")]
    ModuleLocked(ModuleId),
    #[error("no progress recorded for module {0}; start the video before taking the quiz")]
    PrerequisiteNotMet(ModuleId),
    #[error("attempt limit of {max_attempts} reached for module {module_id}")]
    AttemptLimitExceeded {
        module_id: ModuleId,
        max_attempts: u32,
    },
    #[error("invalid request: {0}")]
    Validation(String),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Directory(#[from] DirectoryError),
}
