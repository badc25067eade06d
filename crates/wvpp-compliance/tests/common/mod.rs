//! Collaborator fakes shared by the integration suites. Only the public API is used.
#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, NaiveDate, TimeZone, Utc};

use wvpp_compliance::organization::{
    DirectoryError, Employee, EmployeeId, Incident, IncidentId, InvestigationStatus,
    Organization, OrganizationDirectory, OrganizationId, OrganizationPage, PlanId, WvppPlan,
};
use wvpp_compliance::reminders::{Notifier, NotifierError, ReminderNotification};
use wvpp_compliance::training::{
    ModuleCatalog, ModuleId, OptionId, ProgressKey, ProgressRepository, ProgressTracker,
    QuestionId, QuestionOption, QuestionType, RecordSinkError, RepositoryError, SubmittedAnswer,
    TrainingModule, TrainingProgress, TrainingQuestion, TrainingRecord, TrainingRecordSink,
};

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

pub fn at(y: i32, m: u32, d: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, hour, 0, 0)
        .single()
        .expect("valid timestamp")
}

pub fn organization(id: &str) -> Organization {
    Organization {
        id: OrganizationId(id.to_string()),
        name: format!("Org {id}"),
        contact_email: Some(format!("compliance@{id}.example.com")),
        next_plan_review_due_date: None,
        last_plan_review_date: None,
    }
}

pub fn employee(id: &str, organization: &str) -> Employee {
    Employee {
        id: EmployeeId(id.to_string()),
        organization_id: OrganizationId(organization.to_string()),
        name: format!("Worker {id}"),
        email: Some(format!("{id}@staff.example.com")),
        active: true,
        training_started_at: None,
        initial_training_completed_at: None,
        last_annual_training_completed_at: None,
        next_training_due_date: None,
    }
}

pub fn incident(id: &str, organization: &str, occurred_on: NaiveDate, open: bool) -> Incident {
    Incident {
        id: IncidentId(id.to_string()),
        organization_id: OrganizationId(organization.to_string()),
        occurred_on,
        summary: format!("Logged incident {id}"),
        investigation: if open {
            InvestigationStatus::Open
        } else {
            InvestigationStatus::Closed
        },
    }
}

pub fn plan(organization: &str) -> WvppPlan {
    WvppPlan {
        id: PlanId(format!("{organization}-plan")),
        organization_id: OrganizationId(organization.to_string()),
        active: true,
        published_on: Some(date(2024, 7, 1)),
    }
}

#[derive(Default)]
struct DirectoryState {
    organizations: BTreeMap<OrganizationId, Organization>,
    employees: BTreeMap<EmployeeId, Employee>,
    incidents: Vec<Incident>,
    plans: Vec<WvppPlan>,
    flagged: HashMap<OrganizationId, usize>,
    reports: HashMap<OrganizationId, usize>,
}

#[derive(Default)]
pub struct Directory {
    state: Mutex<DirectoryState>,
    listing_down: AtomicBool,
    rosters_down: Mutex<HashSet<OrganizationId>>,
}

impl Directory {
    pub fn add_organization(&self, organization: Organization) {
        self.lock().organizations.insert(organization.id.clone(), organization);
    }

    pub fn add_employee(&self, employee: Employee) {
        self.lock().employees.insert(employee.id.clone(), employee);
    }

    pub fn add_incident(&self, incident: Incident) {
        self.lock().incidents.push(incident);
    }

    pub fn add_plan(&self, plan: WvppPlan) {
        self.lock().plans.push(plan);
    }

    pub fn set_counters(&self, organization: &str, flagged: usize, reports: usize) {
        let id = OrganizationId(organization.to_string());
        let mut state = self.lock();
        state.flagged.insert(id.clone(), flagged);
        state.reports.insert(id, reports);
    }

    pub fn take_listing_down(&self) {
        self.listing_down.store(true, Ordering::SeqCst);
    }

    pub fn take_roster_down(&self, organization: &str) {
        self.rosters_down
            .lock()
            .expect("directory mutex poisoned")
            .insert(OrganizationId(organization.to_string()));
    }

    pub fn employee_record(&self, id: &str) -> Employee {
        self.lock()
            .employees
            .get(&EmployeeId(id.to_string()))
            .cloned()
            .expect("employee present")
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, DirectoryState> {
        self.state.lock().expect("directory mutex poisoned")
    }
}

impl OrganizationDirectory for Directory {
    fn organizations(
        &self,
        after: Option<&OrganizationId>,
        limit: usize,
    ) -> Result<OrganizationPage, DirectoryError> {
        if self.listing_down.load(Ordering::SeqCst) {
            return Err(DirectoryError::Unavailable("listing offline".to_string()));
        }
        let state = self.lock();
        let mut remaining = state
            .organizations
            .values()
            .filter(|org| after.map_or(true, |cursor| &org.id > cursor));
        let organizations: Vec<Organization> = remaining.by_ref().take(limit).cloned().collect();
        let next_cursor = if remaining.next().is_some() {
            organizations.last().map(|org| org.id.clone())
        } else {
            None
        };
        Ok(OrganizationPage {
            organizations,
            next_cursor,
        })
    }

    fn organization(&self, id: &OrganizationId) -> Result<Option<Organization>, DirectoryError> {
        Ok(self.lock().organizations.get(id).cloned())
    }

    fn update_organization(&self, organization: Organization) -> Result<(), DirectoryError> {
        let mut state = self.lock();
        match state.organizations.get_mut(&organization.id) {
            Some(slot) => {
                *slot = organization;
                Ok(())
            }
            None => Err(DirectoryError::NotFound {
                entity: "organization",
            }),
        }
    }

    fn employees(&self, organization: &OrganizationId) -> Result<Vec<Employee>, DirectoryError> {
        if self
            .rosters_down
            .lock()
            .expect("directory mutex poisoned")
            .contains(organization)
        {
            return Err(DirectoryError::Unavailable("roster offline".to_string()));
        }
        Ok(self
            .lock()
            .employees
            .values()
            .filter(|employee| &employee.organization_id == organization)
            .cloned()
            .collect())
    }

    fn employee(&self, id: &EmployeeId) -> Result<Option<Employee>, DirectoryError> {
        Ok(self.lock().employees.get(id).cloned())
    }

    fn update_employee(&self, employee: Employee) -> Result<(), DirectoryError> {
        let mut state = self.lock();
        match state.employees.get_mut(&employee.id) {
            Some(slot) => {
                *slot = employee;
                Ok(())
            }
            None => Err(DirectoryError::NotFound { entity: "employee" }),
        }
    }

    fn incidents(&self, organization: &OrganizationId) -> Result<Vec<Incident>, DirectoryError> {
        Ok(self
            .lock()
            .incidents
            .iter()
            .filter(|incident| &incident.organization_id == organization)
            .cloned()
            .collect())
    }

    fn active_plan(
        &self,
        organization: &OrganizationId,
    ) -> Result<Option<WvppPlan>, DirectoryError> {
        Ok(self
            .lock()
            .plans
            .iter()
            .find(|plan| &plan.organization_id == organization && plan.active)
            .cloned())
    }

    fn pending_flagged_questions(
        &self,
        organization: &OrganizationId,
    ) -> Result<usize, DirectoryError> {
        Ok(self.lock().flagged.get(organization).copied().unwrap_or(0))
    }

    fn new_anonymous_reports(
        &self,
        organization: &OrganizationId,
    ) -> Result<usize, DirectoryError> {
        Ok(self.lock().reports.get(organization).copied().unwrap_or(0))
    }
}

#[derive(Default)]
pub struct Outbox {
    sent: Mutex<Vec<ReminderNotification>>,
    bounce: Mutex<HashSet<String>>,
}

impl Outbox {
    pub fn bounce(&self, recipient: &str) {
        self.bounce
            .lock()
            .expect("outbox mutex poisoned")
            .insert(recipient.to_string());
    }

    pub fn sent(&self) -> Vec<ReminderNotification> {
        self.sent.lock().expect("outbox mutex poisoned").clone()
    }
}

impl Notifier for Outbox {
    fn send(&self, notification: &ReminderNotification) -> Result<(), NotifierError> {
        if self
            .bounce
            .lock()
            .expect("outbox mutex poisoned")
            .contains(&notification.recipient)
        {
            return Err(NotifierError::Rejected(notification.recipient.clone()));
        }
        self.sent
            .lock()
            .expect("outbox mutex poisoned")
            .push(notification.clone());
        Ok(())
    }
}

/// Two-module curriculum: `intro` (one question, two attempts) then `response` (unlimited).
#[derive(Default)]
pub struct Catalog {
    modules: Vec<TrainingModule>,
    questions: Vec<TrainingQuestion>,
}

impl Catalog {
    pub fn two_modules() -> Self {
        let module = |id: &str, order: u32, max_attempts: u32| TrainingModule {
            id: ModuleId(id.to_string()),
            title: format!("Module {id}"),
            description: String::new(),
            order,
            is_required: true,
            is_active: true,
            passing_score: 70,
            max_attempts,
            video_duration_minutes: 10,
        };
        let question = |id: &str, module_id: &str, correct: &str| TrainingQuestion {
            id: QuestionId(id.to_string()),
            module_id: ModuleId(module_id.to_string()),
            prompt: format!("Prompt {id}"),
            question_type: QuestionType::MultipleChoice,
            options: ["a", "b", "c"]
                .iter()
                .map(|option| QuestionOption {
                    id: OptionId(option.to_string()),
                    text: option.to_uppercase(),
                    is_correct: *option == correct,
                })
                .collect(),
            points: 1,
            explanation: None,
        };

        Self {
            modules: vec![module("intro", 1, 2), module("response", 2, 0)],
            questions: vec![question("intro-1", "intro", "b"), question("response-1", "response", "c")],
        }
    }
}

impl ModuleCatalog for Catalog {
    fn active_modules(&self) -> Result<Vec<TrainingModule>, RepositoryError> {
        let mut modules: Vec<TrainingModule> =
            self.modules.iter().filter(|m| m.is_active).cloned().collect();
        modules.sort_by_key(|module| module.order);
        Ok(modules)
    }

    fn module(&self, id: &ModuleId) -> Result<Option<TrainingModule>, RepositoryError> {
        Ok(self.modules.iter().find(|module| &module.id == id).cloned())
    }

    fn questions(&self, module_id: &ModuleId) -> Result<Vec<TrainingQuestion>, RepositoryError> {
        Ok(self
            .questions
            .iter()
            .filter(|question| &question.module_id == module_id)
            .cloned()
            .collect())
    }
}

pub fn answer(question_id: &str, option: &str) -> SubmittedAnswer {
    SubmittedAnswer {
        question_id: QuestionId(question_id.to_string()),
        selected_option_ids: vec![OptionId(option.to_string())],
    }
}

#[derive(Default)]
pub struct Progress {
    records: Mutex<BTreeMap<ProgressKey, TrainingProgress>>,
}

impl ProgressRepository for Progress {
    fn fetch(&self, key: &ProgressKey) -> Result<Option<TrainingProgress>, RepositoryError> {
        Ok(self.records.lock().expect("progress mutex poisoned").get(key).cloned())
    }

    fn insert(&self, record: TrainingProgress) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("progress mutex poisoned");
        if guard.contains_key(&record.key) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(record.key.clone(), record);
        Ok(())
    }

    fn replace(
        &self,
        record: TrainingProgress,
        expected_revision: u64,
    ) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("progress mutex poisoned");
        match guard.get(&record.key) {
            Some(stored) if stored.revision == expected_revision => {
                guard.insert(record.key.clone(), record);
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
pub struct Records {
    issued: Mutex<Vec<TrainingRecord>>,
    offline: AtomicBool,
}

impl Records {
    pub fn go_offline(&self) {
        self.offline.store(true, Ordering::SeqCst);
    }

    pub fn issued(&self) -> Vec<TrainingRecord> {
        self.issued.lock().expect("records mutex poisoned").clone()
    }
}

impl TrainingRecordSink for Records {
    fn issue(&self, record: TrainingRecord) -> Result<(), RecordSinkError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(RecordSinkError::Unavailable("archive offline".to_string()));
        }
        self.issued.lock().expect("records mutex poisoned").push(record);
        Ok(())
    }
}

pub type Tracker = ProgressTracker<Catalog, Progress, Directory, Records>;

pub struct TrainingFixture {
    pub tracker: Arc<Tracker>,
    pub directory: Arc<Directory>,
    pub records: Arc<Records>,
}

pub fn training_fixture() -> TrainingFixture {
    let directory = Arc::new(Directory::default());
    directory.add_organization(organization("acme"));
    directory.add_employee(employee("rosa", "acme"));
    let records = Arc::new(Records::default());
    let tracker = Arc::new(ProgressTracker::new(
        Arc::new(Catalog::two_modules()),
        Arc::new(Progress::default()),
        directory.clone(),
        records.clone(),
    ));
    TrainingFixture {
        tracker,
        directory,
        records,
    }
}
