use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, TimeZone, Utc};

use crate::organization::EmployeeId;
use crate::testing::{employee, MemoryDirectory};
use crate::training::domain::{
    ModuleId, OptionId, QuestionId, QuestionOption, QuestionType, SubmittedAnswer,
    TrainingModule, TrainingQuestion,
};
use crate::training::progress::{ProgressKey, TrainingProgress};
use crate::training::repository::{
    ModuleCatalog, ProgressRepository, RecordSinkError, RepositoryError, TrainingRecord,
    TrainingRecordSink,
};
use crate::training::service::{ProgressTracker, VideoProgressReport};

pub(super) type MemoryTracker = ProgressTracker<MemoryCatalog, MemoryProgress, MemoryDirectory, MemorySink>;

pub(super) fn at(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, day, hour, 0, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn module(id: &str, order: u32, max_attempts: u32) -> TrainingModule {
    TrainingModule {
        id: ModuleId(id.to_string()),
        title: format!("Module {order}"),
        description: String::new(),
        order,
        is_required: true,
        is_active: true,
        passing_score: 80,
        max_attempts,
        video_duration_minutes: 15,
    }
}

pub(super) fn question(
    id: &str,
    module_id: &str,
    kind: QuestionType,
    correct: &[&str],
) -> TrainingQuestion {
    let option_ids: &[&str] = match kind {
        QuestionType::TrueFalse => &["true", "false"],
        _ => &["a", "b", "c", "d"],
    };
    TrainingQuestion {
        id: QuestionId(id.to_string()),
        module_id: ModuleId(module_id.to_string()),
        prompt: format!("Prompt {id}"),
        question_type: kind,
        options: option_ids
            .iter()
            .map(|option| QuestionOption {
                id: OptionId(option.to_string()),
                text: option.to_uppercase(),
                is_correct: correct.contains(option),
            })
            .collect(),
        points: 1,
        explanation: None,
    }
}

pub(super) fn answer(question_id: &str, selected: &[&str]) -> SubmittedAnswer {
    SubmittedAnswer {
        question_id: QuestionId(question_id.to_string()),
        selected_option_ids: selected
            .iter()
            .map(|option| OptionId(option.to_string()))
            .collect(),
    }
}

pub(super) fn correct_m1() -> Vec<SubmittedAnswer> {
    vec![answer("q1", &["b"]), answer("q2", &["true"])]
}

pub(super) fn wrong_m1() -> Vec<SubmittedAnswer> {
    vec![answer("q1", &["a"]), answer("q2", &["false"])]
}

pub(super) fn correct_m2() -> Vec<SubmittedAnswer> {
    vec![answer("q3", &["a", "c"])]
}

pub(super) fn video(pct: f64) -> VideoProgressReport {
    VideoProgressReport {
        video_progress: pct,
        last_watched_position: pct * 9.0,
    }
}

pub(super) fn emp(id: &str) -> EmployeeId {
    EmployeeId(id.to_string())
}

pub(super) fn mid(id: &str) -> ModuleId {
    ModuleId(id.to_string())
}

#[derive(Default)]
pub(super) struct MemoryCatalog {
    modules: Mutex<Vec<TrainingModule>>,
    questions: Mutex<Vec<TrainingQuestion>>,
}

impl MemoryCatalog {
    pub(super) fn standard() -> Self {
        let catalog = Self::default();
        catalog.add_module(module("m1", 1, 2));
        catalog.add_module(module("m2", 2, 0));
        catalog.add_question(question("q1", "m1", QuestionType::MultipleChoice, &["b"]));
        catalog.add_question(question("q2", "m1", QuestionType::TrueFalse, &["true"]));
        catalog.add_question(question("q3", "m2", QuestionType::SelectAll, &["a", "c"]));
        catalog
    }

    pub(super) fn add_module(&self, module: TrainingModule) {
        self.modules.lock().expect("catalog mutex poisoned").push(module);
    }

    pub(super) fn add_question(&self, question: TrainingQuestion) {
        self.questions
            .lock()
            .expect("catalog mutex poisoned")
            .push(question);
    }
}

impl ModuleCatalog for MemoryCatalog {
    fn active_modules(&self) -> Result<Vec<TrainingModule>, RepositoryError> {
        let mut modules: Vec<TrainingModule> = self
            .modules
            .lock()
            .expect("catalog mutex poisoned")
            .iter()
            .filter(|module| module.is_active)
            .cloned()
            .collect();
        modules.sort_by_key(|module| module.order);
        Ok(modules)
    }

    fn module(&self, id: &ModuleId) -> Result<Option<TrainingModule>, RepositoryError> {
        Ok(self
            .modules
            .lock()
            .expect("catalog mutex poisoned")
            .iter()
            .find(|module| &module.id == id)
            .cloned())
    }

    fn questions(&self, module_id: &ModuleId) -> Result<Vec<TrainingQuestion>, RepositoryError> {
        Ok(self
            .questions
            .lock()
            .expect("catalog mutex poisoned")
            .iter()
            .filter(|question| &question.module_id == module_id)
            .cloned()
            .collect())
    }
}

/// Progress store that can be told to reject the next N writes as concurrent.
#[derive(Default)]
pub(super) struct MemoryProgress {
    records: Mutex<BTreeMap<ProgressKey, TrainingProgress>>,
    pending_conflicts: AtomicUsize,
    writes: AtomicUsize,
}

impl MemoryProgress {
    pub(super) fn inject_conflicts(&self, count: usize) {
        self.pending_conflicts.store(count, Ordering::SeqCst);
    }

    pub(super) fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub(super) fn stored(&self, employee_id: &str, module_id: &str) -> Option<TrainingProgress> {
        self.records
            .lock()
            .expect("progress mutex poisoned")
            .get(&ProgressKey::new(emp(employee_id), mid(module_id)))
            .cloned()
    }

    fn take_conflict(&self) -> bool {
        self.pending_conflicts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |remaining| {
                remaining.checked_sub(1)
            })
            .is_ok()
    }
}

impl ProgressRepository for MemoryProgress {
    fn fetch(&self, key: &ProgressKey) -> Result<Option<TrainingProgress>, RepositoryError> {
        Ok(self
            .records
            .lock()
            .expect("progress mutex poisoned")
            .get(key)
            .cloned())
    }

    fn insert(&self, record: TrainingProgress) -> Result<(), RepositoryError> {
        if self.take_conflict() {
            return Err(RepositoryError::Conflict);
        }
        let mut guard = self.records.lock().expect("progress mutex poisoned");
        if guard.contains_key(&record.key) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(record.key.clone(), record);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn replace(
        &self,
        record: TrainingProgress,
        expected_revision: u64,
    ) -> Result<(), RepositoryError> {
        if self.take_conflict() {
            return Err(RepositoryError::Conflict);
        }
        let mut guard = self.records.lock().expect("progress mutex poisoned");
        match guard.get(&record.key) {
            Some(stored) if stored.revision == expected_revision => {
                guard.insert(record.key.clone(), record);
                self.writes.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
            Some(_) => Err(RepositoryError::Conflict),
            None => Err(RepositoryError::NotFound),
        }
    }

    fn for_employee(
        &self,
        employee_id: &EmployeeId,
    ) -> Result<Vec<TrainingProgress>, RepositoryError> {
        Ok(self
            .records
            .lock()
            .expect("progress mutex poisoned")
            .values()
            .filter(|record| &record.key.employee_id == employee_id)
            .cloned()
            .collect())
    }
}

#[derive(Default)]
pub(super) struct MemorySink {
    records: Mutex<Vec<TrainingRecord>>,
    failing: AtomicBool,
}

impl MemorySink {
    pub(super) fn fail(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    pub(super) fn records(&self) -> Vec<TrainingRecord> {
        self.records.lock().expect("sink mutex poisoned").clone()
    }
}

impl TrainingRecordSink for MemorySink {
    fn issue(&self, record: TrainingRecord) -> Result<(), RecordSinkError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(RecordSinkError::Unavailable("storage offline".to_string()));
        }
        self.records.lock().expect("sink mutex poisoned").push(record);
        Ok(())
    }
}

pub(super) struct Harness {
    pub(super) tracker: Arc<MemoryTracker>,
    pub(super) catalog: Arc<MemoryCatalog>,
    pub(super) progress: Arc<MemoryProgress>,
    pub(super) directory: Arc<MemoryDirectory>,
    pub(super) sink: Arc<MemorySink>,
}

pub(super) fn harness() -> Harness {
    let catalog = Arc::new(MemoryCatalog::standard());
    let progress = Arc::new(MemoryProgress::default());
    let directory = Arc::new(
        MemoryDirectory::default()
            .with_employee(employee("emp-1", "org-1"))
            .with_employee(employee("emp-2", "org-1")),
    );
    let sink = Arc::new(MemorySink::default());
    let tracker = Arc::new(ProgressTracker::new(
        catalog.clone(),
        progress.clone(),
        directory.clone(),
        sink.clone(),
    ));
    Harness {
        tracker,
        catalog,
        progress,
        directory,
        sink,
    }
}

pub(super) async fn read_json_body(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

pub(super) fn json_request(uri: &str, body: serde_json::Value) -> axum::http::Request<axum::body::Body> {
    axum::http::Request::post(uri)
        .header(axum::http::header::CONTENT_TYPE, "application/json")
        .body(axum::body::Body::from(body.to_string()))
        .expect("request builds")
}
