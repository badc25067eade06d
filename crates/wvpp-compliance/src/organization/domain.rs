use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier wrapper for tenant organizations.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OrganizationId(pub String);

/// Identifier wrapper for employees.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EmployeeId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IncidentId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlanId(pub String);

impl fmt::Display for OrganizationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for EmployeeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Organization carrying the annual plan review schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    pub id: OrganizationId,
    pub name: String,
    /// Compliance contact receiving plan review and incident follow-up reminders.
    pub contact_email: Option<String>,
    pub next_plan_review_due_date: Option<NaiveDate>,
    pub last_plan_review_date: Option<NaiveDate>,
}

/// Employee with write-through caches of the curriculum completion dates.
///
/// The cached dates are refreshed whenever every required module reaches `completed`;
/// progress records remain the source of truth.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employee {
    pub id: EmployeeId,
    pub organization_id: OrganizationId,
    pub name: String,
    pub email: Option<String>,
    pub active: bool,
    pub training_started_at: Option<DateTime<Utc>>,
    pub initial_training_completed_at: Option<DateTime<Utc>>,
    pub last_annual_training_completed_at: Option<DateTime<Utc>>,
    pub next_training_due_date: Option<NaiveDate>,
}

impl Employee {
    /// Trained means initial training is done and the annual refresher has not lapsed.
    pub fn is_trained(&self, today: NaiveDate) -> bool {
        self.initial_training_completed_at.is_some()
            && self
                .next_training_due_date
                .map(|due| due >= today)
                .unwrap_or(true)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvestigationStatus {
    Open,
    Closed,
}

impl InvestigationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
        }
    }
}

/// Logged workplace violence incident (Labor Code 6401.9 violent incident log entry).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Incident {
    pub id: IncidentId,
    pub organization_id: OrganizationId,
    pub occurred_on: NaiveDate,
    pub summary: String,
    pub investigation: InvestigationStatus,
}

impl Incident {
    pub fn is_open(&self) -> bool {
        self.investigation == InvestigationStatus::Open
    }
}

/// Workplace Violence Prevention Plan document metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WvppPlan {
    pub id: PlanId,
    pub organization_id: OrganizationId,
    pub active: bool,
    pub published_on: Option<NaiveDate>,
}
