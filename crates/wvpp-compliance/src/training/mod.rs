//! Curriculum progression: quiz grading, per-module progress, and module sequencing.

pub mod domain;
pub mod grader;
pub mod progress;
pub mod repository;
pub mod router;
pub mod sequencer;
pub mod service;


pub use domain::{
    ModuleId, OptionId, QuestionId, QuestionOption, QuestionType, QuestionView, SubmittedAnswer,
    TrainingModule, TrainingQuestion,
};
pub use grader::GradeOutcome;
pub use progress::{
    ModuleStatus, ProgressKey, QuestionResult, QuizAttempt, TrainingProgress,
    VIDEO_COMPLETION_THRESHOLD,
};
pub use repository::{
    CompletedModuleSummary, ModuleCatalog, ProgressRepository, RecordSinkError, RepositoryError,
    TrainingRecord, TrainingRecordKind, TrainingRecordSink,
};
pub use router::training_router;
pub use sequencer::ModuleCatalogEntry;
pub use service::{
    CurriculumCompletion, ProgressTracker, ProgressUpdate, QuizSubmissionOutcome,
    TrainingServiceError, VideoProgressReport,
};
