use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{ModuleId, QuestionId};
use super::grader::GradeOutcome;
use crate::organization::EmployeeId;

/// Video progress at which the video counts as watched.
pub const VIDEO_COMPLETION_THRESHOLD: u8 = 90;

/// Curriculum status of one module for one employee. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModuleStatus {
    #[default]
    NotStarted,
    InProgress,
    Completed,
}

impl ModuleStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::NotStarted => "not_started",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
        }
    }

    /// Permitted transitions; every other pair (including self-loops) is rejected.
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::NotStarted, Self::InProgress)
                | (Self::NotStarted, Self::Completed)
                | (Self::InProgress, Self::Completed)
        )
    }
}

/// Unique key of a progress record.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProgressKey {
    pub employee_id: EmployeeId,
    pub module_id: ModuleId,
}

impl ProgressKey {
    pub fn new(employee_id: EmployeeId, module_id: ModuleId) -> Self {
        Self {
            employee_id,
            module_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionResult {
    pub question_id: QuestionId,
    pub correct: bool,
    pub points_awarded: u32,
}

/// Append-only audit entry for one graded submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizAttempt {
    pub attempt_number: u32,
    pub score: u8,
    pub passed: bool,
    pub results: Vec<QuestionResult>,
    pub submitted_at: DateTime<Utc>,
}

/// Per-employee, per-module state. Sticky flags and the status only ever advance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingProgress {
    pub key: ProgressKey,
    pub video_progress: u8,
    pub video_completed: bool,
    pub video_completed_at: Option<DateTime<Utc>>,
    /// Resume point in seconds.
    pub last_watched_position: f64,
    pub quiz_attempts: Vec<QuizAttempt>,
    pub quiz_passed: bool,
    pub quiz_passed_at: Option<DateTime<Utc>>,
    pub best_score: u8,
    pub status: ModuleStatus,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub due_date: Option<NaiveDate>,
    pub updated_at: DateTime<Utc>,
    /// Optimistic concurrency token, incremented on every stored write.
    pub revision: u64,
}

impl TrainingProgress {
    pub fn new(key: ProgressKey, at: DateTime<Utc>) -> Self {
        Self {
            key,
            video_progress: 0,
            video_completed: false,
            video_completed_at: None,
            last_watched_position: 0.0,
            quiz_attempts: Vec::new(),
            quiz_passed: false,
            quiz_passed_at: None,
            best_score: 0,
            status: ModuleStatus::NotStarted,
            started_at: at,
            completed_at: None,
            due_date: None,
            updated_at: at,
            revision: 0,
        }
    }

    pub fn attempts_used(&self) -> usize {
        self.quiz_attempts.len()
    }

    pub fn is_completed(&self) -> bool {
        self.status == ModuleStatus::Completed
    }

    /// Apply a watch beacon. Lower or equal percentages leave the stored progress as is.
    ///
    /// Returns `true` only on the call that first crosses the completion threshold.
    pub fn record_video_progress(&mut self, pct: u8, position: f64, at: DateTime<Utc>) -> bool {
        let pct = pct.min(100);
        if pct > self.video_progress {
            self.video_progress = pct;
        }
        self.last_watched_position = position;
        self.updated_at = at;

        if !self.video_completed && self.video_progress >= VIDEO_COMPLETION_THRESHOLD {
            self.video_completed = true;
            self.video_completed_at = Some(at);
            return true;
        }
        false
    }

    /// Append a graded attempt and fold it into the sticky quiz fields.
    pub fn record_attempt(&mut self, grade: &GradeOutcome, at: DateTime<Utc>) -> &QuizAttempt {
        let attempt_number = u32::try_from(self.quiz_attempts.len())
            .unwrap_or(u32::MAX)
            .saturating_add(1);
        self.quiz_attempts.push(QuizAttempt {
            attempt_number,
            score: grade.score,
            passed: grade.passed,
            results: grade.results.clone(),
            submitted_at: at,
        });
        self.best_score = self.best_score.max(grade.score);
        if grade.passed && !self.quiz_passed {
            self.quiz_passed = true;
            self.quiz_passed_at = Some(at);
        }
        self.updated_at = at;

        &self.quiz_attempts[self.quiz_attempts.len() - 1]
    }

    /// Advance the status only if the transition table allows it.
    pub fn advance_status(&mut self, next: ModuleStatus, at: DateTime<Utc>) -> bool {
        if !self.status.can_transition_to(next) {
            return false;
        }
        self.status = next;
        if next == ModuleStatus::Completed && self.completed_at.is_none() {
            self.completed_at = Some(at);
        }
        true
    }

    /// Derive the status from the two completion signals.
    ///
    /// Returns `true` when this call moved the record into `completed`.
    pub fn refresh_status(&mut self, at: DateTime<Utc>) -> bool {
        if self.video_completed && self.quiz_passed {
            return self.advance_status(ModuleStatus::Completed, at);
        }
        if self.has_activity() {
            self.advance_status(ModuleStatus::InProgress, at);
        }
        false
    }

    fn has_activity(&self) -> bool {
        self.video_progress > 0 || self.video_completed || !self.quiz_attempts.is_empty()
    }
}
