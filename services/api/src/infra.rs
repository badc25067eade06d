use chrono::{DateTime, NaiveDate, Utc};
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use tracing::info;
use wvpp_compliance::compliance::ComplianceService;
use wvpp_compliance::config::ReminderConfig;
use wvpp_compliance::organization::{
    DirectoryError, Employee, EmployeeId, Incident, IncidentId, InvestigationStatus,
    Organization, OrganizationDirectory, OrganizationId, OrganizationPage, PlanId, WvppPlan,
};
use wvpp_compliance::reminders::{
    Notifier, NotifierError, ReminderDispatcher, ReminderEndpoint, ReminderNotification,
};
use wvpp_compliance::training::{
    ModuleCatalog, ModuleId, OptionId, ProgressKey, ProgressRepository, ProgressTracker,
    QuestionId, QuestionOption, QuestionType, RecordSinkError, RepositoryError, TrainingModule,
    TrainingProgress, TrainingQuestion, TrainingRecord, TrainingRecordSink,
};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

pub(crate) type Tracker = ProgressTracker<
    InMemoryModuleCatalog,
    InMemoryProgressRepository,
    InMemoryDirectory,
    InMemoryRecordSink,
>;
pub(crate) type Reminders = ReminderEndpoint<InMemoryDirectory, LoggingNotifier>;
pub(crate) type Compliance = ComplianceService<InMemoryDirectory>;

/// Every domain service wired against the in-memory adapters.
#[derive(Clone)]
pub(crate) struct Services {
    pub(crate) tracker: Arc<Tracker>,
    pub(crate) reminders: Arc<Reminders>,
    pub(crate) compliance: Arc<Compliance>,
    pub(crate) catalog: Arc<InMemoryModuleCatalog>,
    pub(crate) records: Arc<InMemoryRecordSink>,
    pub(crate) notifier: Arc<LoggingNotifier>,
}

impl Services {
    pub(crate) fn in_memory(reminders: &ReminderConfig, directory: InMemoryDirectory) -> Self {
        let catalog = Arc::new(InMemoryModuleCatalog::sb553());
        let progress = Arc::new(InMemoryProgressRepository::default());
        let directory = Arc::new(directory);
        let records = Arc::new(InMemoryRecordSink::default());
        let notifier = Arc::new(LoggingNotifier::default());

        let tracker = Arc::new(ProgressTracker::new(
            catalog.clone(),
            progress,
            directory.clone(),
            records.clone(),
        ));
        let dispatcher =
            ReminderDispatcher::new(directory.clone(), notifier.clone(), reminders.page_size);
        let reminder_endpoint = Arc::new(ReminderEndpoint::new(
            dispatcher,
            reminders.cron_secret.clone(),
        ));
        let compliance = Arc::new(ComplianceService::new(directory));

        Self {
            tracker,
            reminders: reminder_endpoint,
            compliance,
            catalog,
            records,
            notifier,
        }
    }
}

#[derive(Default)]
pub(crate) struct InMemoryModuleCatalog {
    modules: Vec<TrainingModule>,
    questions: Vec<TrainingQuestion>,
}

impl InMemoryModuleCatalog {
    /// Baseline SB 553 curriculum: four required modules, each a video plus a short quiz.
    pub(crate) fn sb553() -> Self {
        let modules = vec![
            module(
                "wvpp-overview",
                1,
                "Your Workplace Violence Prevention Plan",
                "Where the written plan lives, who administers it, and how to obtain a copy.",
                12,
            ),
            module(
                "hazard-recognition",
                2,
                "Recognizing workplace violence hazards",
                "The four types of workplace violence and the warning signs that precede them.",
                15,
            ),
            module(
                "reporting-incidents",
                3,
                "Reporting concerns and incidents",
                "How to report hazards and incidents, and protection from retaliation.",
                10,
            ),
            module(
                "emergency-response",
                4,
                "Responding to an active threat",
                "Alerting, evacuation, sheltering, and obtaining help after an incident.",
                14,
            ),
        ];

        let questions = vec![
            question(
                "wvpp-overview-1",
                "wvpp-overview",
                "Employees may obtain a copy of the written plan at no cost.",
                QuestionType::TrueFalse,
                &[("true", "True", true), ("false", "False", false)],
            ),
            question(
                "wvpp-overview-2",
                "wvpp-overview",
                "Who is responsible for implementing the plan at your workplace?",
                QuestionType::MultipleChoice,
                &[
                    ("a", "Local law enforcement", false),
                    ("b", "The person or team named in the plan", true),
                    ("c", "Each employee individually", false),
                ],
            ),
            question(
                "hazard-recognition-1",
                "hazard-recognition",
                "Select every recognized type of workplace violence.",
                QuestionType::SelectAll,
                &[
                    ("a", "Violence by a stranger with criminal intent", true),
                    ("b", "Violence by a customer or client", true),
                    ("c", "Violence by a current or former coworker", true),
                    ("d", "A disagreement about scheduling", false),
                ],
            ),
            question(
                "hazard-recognition-2",
                "hazard-recognition",
                "Which is a common warning sign of escalating behavior?",
                QuestionType::MultipleChoice,
                &[
                    ("a", "Repeated verbal threats", true),
                    ("b", "Taking a scheduled break", false),
                    ("c", "Asking for clarification", false),
                ],
            ),
            question(
                "reporting-incidents-1",
                "reporting-incidents",
                "Your employer may not retaliate against you for reporting a concern.",
                QuestionType::TrueFalse,
                &[("true", "True", true), ("false", "False", false)],
            ),
            question(
                "reporting-incidents-2",
                "reporting-incidents",
                "Which details belong in an incident report?",
                QuestionType::SelectAll,
                &[
                    ("a", "Date, time, and location", true),
                    ("b", "What happened and who was involved", true),
                    ("c", "Your personal opinion of the coworker", false),
                ],
            ),
            question(
                "emergency-response-1",
                "emergency-response",
                "What should you do first when you can safely leave an active threat?",
                QuestionType::MultipleChoice,
                &[
                    ("a", "Evacuate and alert others when safe", true),
                    ("b", "Confront the person", false),
                    ("c", "Finish your current task", false),
                ],
            ),
        ];

        Self { modules, questions }
    }
}

fn module(id: &str, order: u32, title: &str, description: &str, minutes: u32) -> TrainingModule {
    TrainingModule {
        id: ModuleId(id.to_string()),
        title: title.to_string(),
        description: description.to_string(),
        order,
        is_required: true,
        is_active: true,
        passing_score: 80,
        max_attempts: 3,
        video_duration_minutes: minutes,
    }
}

fn question(
    id: &str,
    module_id: &str,
    prompt: &str,
    question_type: QuestionType,
    options: &[(&str, &str, bool)],
) -> TrainingQuestion {
    TrainingQuestion {
        id: QuestionId(id.to_string()),
        module_id: ModuleId(module_id.to_string()),
        prompt: prompt.to_string(),
        question_type,
        options: options
            .iter()
            .map(|(option_id, text, is_correct)| QuestionOption {
                id: OptionId(option_id.to_string()),
                text: text.to_string(),
                is_correct: *is_correct,
            })
            .collect(),
        points: 1,
        explanation: None,
    }
}

impl ModuleCatalog for InMemoryModuleCatalog {
    fn active_modules(&self) -> Result<Vec<TrainingModule>, RepositoryError> {
        let mut modules: Vec<TrainingModule> = self
            .modules
            .iter()
            .filter(|module| module.is_active)
            .cloned()
            .collect();
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

#[derive(Default, Clone)]
pub(crate) struct InMemoryProgressRepository {
    records: Arc<Mutex<HashMap<ProgressKey, TrainingProgress>>>,
}

impl ProgressRepository for InMemoryProgressRepository {
    fn fetch(&self, key: &ProgressKey) -> Result<Option<TrainingProgress>, RepositoryError> {
        let guard = self.records.lock().map_err(poisoned)?;
        Ok(guard.get(key).cloned())
    }

    fn insert(&self, record: TrainingProgress) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().map_err(poisoned)?;
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
        let mut guard = self.records.lock().map_err(poisoned)?;
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
        let guard = self.records.lock().map_err(poisoned)?;
        Ok(guard
            .values()
            .filter(|record| &record.key.employee_id == employee_id)
            .cloned()
            .collect())
    }
}

fn poisoned<T>(_: std::sync::PoisonError<T>) -> RepositoryError {
    RepositoryError::Unavailable("progress store lock poisoned".to_string())
}

fn directory_poisoned<T>(_: std::sync::PoisonError<T>) -> DirectoryError {
    DirectoryError::Unavailable("directory lock poisoned".to_string())
}

#[derive(Default)]
pub(crate) struct DirectoryState {
    organizations: BTreeMap<OrganizationId, Organization>,
    employees: BTreeMap<EmployeeId, Employee>,
    incidents: Vec<Incident>,
    plans: Vec<WvppPlan>,
    flagged_questions: HashMap<OrganizationId, usize>,
    anonymous_reports: HashMap<OrganizationId, usize>,
}

#[derive(Default)]
pub(crate) struct InMemoryDirectory {
    state: Mutex<DirectoryState>,
}

impl InMemoryDirectory {
    /// A single clinic with a published plan, three employees, and two logged incidents.
    pub(crate) fn sample(today: NaiveDate) -> Self {
        let org_id = OrganizationId("harbor-clinic".to_string());
        let days = chrono::Duration::days;
        let mut state = DirectoryState::default();

        state.organizations.insert(
            org_id.clone(),
            Organization {
                id: org_id.clone(),
                name: "Harbor Community Clinic".to_string(),
                contact_email: Some("safety@harborclinic.example.com".to_string()),
                next_plan_review_due_date: Some(today + days(30)),
                last_plan_review_date: Some(today - days(335)),
            },
        );
        state.plans.push(WvppPlan {
            id: PlanId("harbor-clinic-wvpp".to_string()),
            organization_id: org_id.clone(),
            active: true,
            published_on: Some(today - days(335)),
        });

        let staff = [
            ("ana-ruiz", "Ana Ruiz", None),
            ("ben-okafor", "Ben Okafor", Some(today + days(7))),
            ("chloe-tran", "Chloe Tran", Some(today - days(7))),
        ];
        for (id, name, due) in staff {
            let completed = due.map(|due: NaiveDate| start_of_day(due - days(365)));
            state.employees.insert(
                EmployeeId(id.to_string()),
                Employee {
                    id: EmployeeId(id.to_string()),
                    organization_id: org_id.clone(),
                    name: name.to_string(),
                    email: Some(format!("{id}@harborclinic.example.com")),
                    active: true,
                    training_started_at: completed,
                    initial_training_completed_at: completed,
                    last_annual_training_completed_at: None,
                    next_training_due_date: due,
                },
            );
        }

        state.incidents.push(Incident {
            id: IncidentId("inc-lobby-threat".to_string()),
            organization_id: org_id.clone(),
            occurred_on: today - days(14),
            summary: "Visitor made verbal threats at reception".to_string(),
            investigation: InvestigationStatus::Open,
        });
        state.incidents.push(Incident {
            id: IncidentId("inc-parking-lot".to_string()),
            organization_id: org_id.clone(),
            occurred_on: today - days(60),
            summary: "Aggressive confrontation in the parking lot".to_string(),
            investigation: InvestigationStatus::Closed,
        });
        state.flagged_questions.insert(org_id.clone(), 1);
        state.anonymous_reports.insert(org_id, 0);

        Self {
            state: Mutex::new(state),
        }
    }
}

pub(crate) fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(chrono::NaiveTime::MIN).and_utc()
}

impl OrganizationDirectory for InMemoryDirectory {
    fn organizations(
        &self,
        after: Option<&OrganizationId>,
        limit: usize,
    ) -> Result<OrganizationPage, DirectoryError> {
        let state = self.state.lock().map_err(directory_poisoned)?;
        let organizations: Vec<Organization> = state
            .organizations
            .values()
            .filter(|org| after.map_or(true, |cursor| &org.id > cursor))
            .take(limit)
            .cloned()
            .collect();
        let next_cursor = (organizations.len() == limit)
            .then(|| organizations.last().map(|org| org.id.clone()))
            .flatten();
        Ok(OrganizationPage {
            organizations,
            next_cursor,
        })
    }

    fn organization(&self, id: &OrganizationId) -> Result<Option<Organization>, DirectoryError> {
        let state = self.state.lock().map_err(directory_poisoned)?;
        Ok(state.organizations.get(id).cloned())
    }

    fn update_organization(&self, organization: Organization) -> Result<(), DirectoryError> {
        let mut state = self.state.lock().map_err(directory_poisoned)?;
        let slot = state
            .organizations
            .get_mut(&organization.id)
            .ok_or(DirectoryError::NotFound {
                entity: "organization",
            })?;
        *slot = organization;
        Ok(())
    }

    fn employees(&self, organization: &OrganizationId) -> Result<Vec<Employee>, DirectoryError> {
        let state = self.state.lock().map_err(directory_poisoned)?;
        Ok(state
            .employees
            .values()
            .filter(|employee| &employee.organization_id == organization)
            .cloned()
            .collect())
    }

    fn employee(&self, id: &EmployeeId) -> Result<Option<Employee>, DirectoryError> {
        let state = self.state.lock().map_err(directory_poisoned)?;
        Ok(state.employees.get(id).cloned())
    }

    fn update_employee(&self, employee: Employee) -> Result<(), DirectoryError> {
        let mut state = self.state.lock().map_err(directory_poisoned)?;
        let slot = state
            .employees
            .get_mut(&employee.id)
            .ok_or(DirectoryError::NotFound { entity: "employee" })?;
        *slot = employee;
        Ok(())
    }

    fn incidents(&self, organization: &OrganizationId) -> Result<Vec<Incident>, DirectoryError> {
        let state = self.state.lock().map_err(directory_poisoned)?;
        Ok(state
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
        let state = self.state.lock().map_err(directory_poisoned)?;
        Ok(state
            .plans
            .iter()
            .find(|plan| &plan.organization_id == organization && plan.active)
            .cloned())
    }

    fn pending_flagged_questions(
        &self,
        organization: &OrganizationId,
    ) -> Result<usize, DirectoryError> {
        let state = self.state.lock().map_err(directory_poisoned)?;
        Ok(state
            .flagged_questions
            .get(organization)
            .copied()
            .unwrap_or(0))
    }

    fn new_anonymous_reports(
        &self,
        organization: &OrganizationId,
    ) -> Result<usize, DirectoryError> {
        let state = self.state.lock().map_err(directory_poisoned)?;
        Ok(state
            .anonymous_reports
            .get(organization)
            .copied()
            .unwrap_or(0))
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryRecordSink {
    records: Arc<Mutex<Vec<TrainingRecord>>>,
}

impl TrainingRecordSink for InMemoryRecordSink {
    fn issue(&self, record: TrainingRecord) -> Result<(), RecordSinkError> {
        let mut guard = self
            .records
            .lock()
            .map_err(|_| RecordSinkError::Unavailable("record store lock poisoned".to_string()))?;
        guard.push(record);
        Ok(())
    }
}

impl InMemoryRecordSink {
    pub(crate) fn records(&self) -> Vec<TrainingRecord> {
        self.records
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

/// Notifier that logs each message instead of delivering it.
#[derive(Default, Clone)]
pub(crate) struct LoggingNotifier {
    outbox: Arc<Mutex<Vec<ReminderNotification>>>,
}

impl Notifier for LoggingNotifier {
    fn send(&self, notification: &ReminderNotification) -> Result<(), NotifierError> {
        info!(
            template = %notification.template,
            recipient = %notification.recipient,
            organization = %notification.organization_id,
            "notification queued"
        );
        let mut guard = self
            .outbox
            .lock()
            .map_err(|_| NotifierError::Transport("outbox lock poisoned".to_string()))?;
        guard.push(notification.clone());
        Ok(())
    }
}

impl LoggingNotifier {
    pub(crate) fn outbox(&self) -> Vec<ReminderNotification> {
        self.outbox
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}
