//! In-memory collaborators shared by unit tests across modules.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use chrono::NaiveDate;

use crate::organization::{
    DirectoryError, Employee, EmployeeId, Incident, IncidentId, InvestigationStatus,
    Organization, OrganizationDirectory, OrganizationId, OrganizationPage, PlanId, WvppPlan,
};

pub(crate) fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

pub(crate) fn organization(id: &str) -> Organization {
    Organization {
        id: OrganizationId(id.to_string()),
        name: format!("Organization {id}"),
        contact_email: Some(format!("safety@{id}.example.com")),
        next_plan_review_due_date: None,
        last_plan_review_date: None,
    }
}

pub(crate) fn employee(id: &str, organization: &str) -> Employee {
    Employee {
        id: EmployeeId(id.to_string()),
        organization_id: OrganizationId(organization.to_string()),
        name: format!("Employee {id}"),
        email: Some(format!("{id}@example.com")),
        active: true,
        training_started_at: None,
        initial_training_completed_at: None,
        last_annual_training_completed_at: None,
        next_training_due_date: None,
    }
}

pub(crate) fn incident(id: &str, organization: &str, occurred_on: NaiveDate, open: bool) -> Incident {
    Incident {
        id: IncidentId(id.to_string()),
        organization_id: OrganizationId(organization.to_string()),
        occurred_on,
        summary: format!("Incident {id}"),
        investigation: if open {
            InvestigationStatus::Open
        } else {
            InvestigationStatus::Closed
        },
    }
}

pub(crate) fn active_plan(organization: &str) -> WvppPlan {
    WvppPlan {
        id: PlanId(format!("plan-{organization}")),
        organization_id: OrganizationId(organization.to_string()),
        active: true,
        published_on: Some(date(2024, 7, 1)),
    }
}

#[derive(Default)]
pub(crate) struct MemoryDirectory {
    organizations: Mutex<BTreeMap<OrganizationId, Organization>>,
    employees: Mutex<BTreeMap<EmployeeId, Employee>>,
    incidents: Mutex<Vec<Incident>>,
    plans: Mutex<Vec<WvppPlan>>,
    flagged_questions: Mutex<HashMap<OrganizationId, usize>>,
    anonymous_reports: Mutex<HashMap<OrganizationId, usize>>,
    unavailable_rosters: Mutex<HashSet<OrganizationId>>,
    failing_employee_writes: AtomicUsize,
}

impl MemoryDirectory {
    pub(crate) fn with_organization(self, organization: Organization) -> Self {
        self.organizations
            .lock()
            .expect("directory mutex poisoned")
            .insert(organization.id.clone(), organization);
        self
    }

    pub(crate) fn with_employee(self, employee: Employee) -> Self {
        self.employees
            .lock()
            .expect("directory mutex poisoned")
            .insert(employee.id.clone(), employee);
        self
    }

    pub(crate) fn with_incident(self, incident: Incident) -> Self {
        self.incidents
            .lock()
            .expect("directory mutex poisoned")
            .push(incident);
        self
    }

    pub(crate) fn with_plan(self, plan: WvppPlan) -> Self {
        self.plans.lock().expect("directory mutex poisoned").push(plan);
        self
    }

    pub(crate) fn with_counters(self, organization: &str, flagged: usize, reports: usize) -> Self {
        let id = OrganizationId(organization.to_string());
        self.flagged_questions
            .lock()
            .expect("directory mutex poisoned")
            .insert(id.clone(), flagged);
        self.anonymous_reports
            .lock()
            .expect("directory mutex poisoned")
            .insert(id, reports);
        self
    }

    pub(crate) fn with_unavailable_roster(self, organization: &str) -> Self {
        self.unavailable_rosters
            .lock()
            .expect("directory mutex poisoned")
            .insert(OrganizationId(organization.to_string()));
        self
    }

    /// Reject the next `count` employee updates as unavailable.
    pub(crate) fn fail_employee_writes(&self, count: usize) {
        self.failing_employee_writes.store(count, Ordering::SeqCst);
    }

    pub(crate) fn stored_employee(&self, id: &str) -> Employee {
        self.employees
            .lock()
            .expect("directory mutex poisoned")
            .get(&EmployeeId(id.to_string()))
            .cloned()
            .expect("employee present")
    }

    pub(crate) fn stored_organization(&self, id: &str) -> Organization {
        self.organizations
            .lock()
            .expect("directory mutex poisoned")
            .get(&OrganizationId(id.to_string()))
            .cloned()
            .expect("organization present")
    }
}

impl OrganizationDirectory for MemoryDirectory {
    fn organizations(
        &self,
        after: Option<&OrganizationId>,
        limit: usize,
    ) -> Result<OrganizationPage, DirectoryError> {
        let guard = self.organizations.lock().expect("directory mutex poisoned");
        let organizations: Vec<Organization> = guard
            .values()
            .filter(|org| after.map(|cursor| &org.id > cursor).unwrap_or(true))
            .take(limit)
            .cloned()
            .collect();
        let next_cursor = if organizations.len() == limit {
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
        Ok(self
            .organizations
            .lock()
            .expect("directory mutex poisoned")
            .get(id)
            .cloned())
    }

    fn update_organization(&self, organization: Organization) -> Result<(), DirectoryError> {
        let mut guard = self.organizations.lock().expect("directory mutex poisoned");
        match guard.get_mut(&organization.id) {
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
            .unavailable_rosters
            .lock()
            .expect("directory mutex poisoned")
            .contains(organization)
        {
            return Err(DirectoryError::Unavailable("roster offline".to_string()));
        }
        Ok(self
            .employees
            .lock()
            .expect("directory mutex poisoned")
            .values()
            .filter(|employee| &employee.organization_id == organization)
            .cloned()
            .collect())
    }

    fn employee(&self, id: &EmployeeId) -> Result<Option<Employee>, DirectoryError> {
        Ok(self
            .employees
            .lock()
            .expect("directory mutex poisoned")
            .get(id)
            .cloned())
    }

    fn update_employee(&self, employee: Employee) -> Result<(), DirectoryError> {
        if self
            .failing_employee_writes
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |remaining| {
                remaining.checked_sub(1)
            })
            .is_ok()
        {
            return Err(DirectoryError::Unavailable("directory blip".to_string()));
        }
        let mut guard = self.employees.lock().expect("directory mutex poisoned");
        match guard.get_mut(&employee.id) {
            Some(slot) => {
                *slot = employee;
                Ok(())
            }
            None => Err(DirectoryError::NotFound { entity: "employee" }),
        }
    }

    fn incidents(&self, organization: &OrganizationId) -> Result<Vec<Incident>, DirectoryError> {
        Ok(self
            .incidents
            .lock()
            .expect("directory mutex poisoned")
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
            .plans
            .lock()
            .expect("directory mutex poisoned")
            .iter()
            .find(|plan| &plan.organization_id == organization && plan.active)
            .cloned())
    }

    fn pending_flagged_questions(
        &self,
        organization: &OrganizationId,
    ) -> Result<usize, DirectoryError> {
        Ok(self
            .flagged_questions
            .lock()
            .expect("directory mutex poisoned")
            .get(organization)
            .copied()
            .unwrap_or(0))
    }

    fn new_anonymous_reports(
        &self,
        organization: &OrganizationId,
    ) -> Result<usize, DirectoryError> {
        Ok(self
            .anonymous_reports
            .lock()
            .expect("directory mutex poisoned")
            .get(organization)
            .copied()
            .unwrap_or(0))
    }
}
