//! Pure due-date arithmetic shared by the reminder tick and the completion handlers.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::organization::{Employee, Incident, Organization};

/// Days between an annual completion event and the next due date.
pub const ANNUAL_CYCLE_DAYS: i64 = 365;
/// Days-before-due on which training reminders go out.
pub const TRAINING_DUE_THRESHOLDS: [i64; 3] = [30, 7, 1];
/// Days-before-due on which plan review reminders go out.
pub const ANNUAL_REVIEW_THRESHOLDS: [i64; 2] = [30, 7];
/// Days-past-due on which overdue training reminders go out.
pub const OVERDUE_TOUCHPOINTS: [i64; 2] = [0, 7];
pub const INCIDENT_FOLLOWUP_CADENCE_DAYS: i64 = 7;

pub fn next_annual_due_date(completed_on: NaiveDate) -> NaiveDate {
    completed_on + Duration::days(ANNUAL_CYCLE_DAYS)
}

/// Exact membership, not "at or under": 29 days out is not a 30-day reminder.
pub fn is_reminder_day(days_until_due: i64, thresholds: &[i64]) -> bool {
    thresholds.contains(&days_until_due)
}

/// Overdue reminders fire on the day the deadline lapses and once more a week later.
pub fn is_overdue_reminder_day(days_overdue: i64) -> bool {
    OVERDUE_TOUCHPOINTS.contains(&days_overdue)
}

/// Weekly follow-up for as long as the investigation stays open.
pub fn is_incident_followup_day(days_since_incident: i64, investigation_open: bool) -> bool {
    investigation_open
        && days_since_incident > 0
        && days_since_incident % INCIDENT_FOLLOWUP_CADENCE_DAYS == 0
}

/// Signed whole days from `today` until `due` (negative once past).
pub fn days_until(today: NaiveDate, due: NaiveDate) -> i64 {
    (due - today).num_days()
}

/// Reminder categories with the day offset that triggered them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReminderKind {
    TrainingDue { days_until_due: i64 },
    TrainingOverdue { days_overdue: i64 },
    PlanReviewDue { days_until_due: i64 },
    IncidentFollowup { days_since_incident: i64 },
}

impl ReminderKind {
    pub const fn template(self) -> &'static str {
        match self {
            Self::TrainingDue { .. } => "training_due_reminder",
            Self::TrainingOverdue { .. } => "training_overdue_reminder",
            Self::PlanReviewDue { .. } => "plan_review_reminder",
            Self::IncidentFollowup { .. } => "incident_followup_reminder",
        }
    }
}

/// Training reminder due for an active employee today, if any.
pub fn employee_reminder(employee: &Employee, today: NaiveDate) -> Option<ReminderKind> {
    if !employee.active {
        return None;
    }
    let due = employee.next_training_due_date?;
    let days = days_until(today, due);
    if days > 0 {
        is_reminder_day(days, &TRAINING_DUE_THRESHOLDS)
            .then_some(ReminderKind::TrainingDue { days_until_due: days })
    } else {
        let days_overdue = -days;
        is_overdue_reminder_day(days_overdue).then_some(ReminderKind::TrainingOverdue { days_overdue })
    }
}

pub fn plan_review_reminder(organization: &Organization, today: NaiveDate) -> Option<ReminderKind> {
    let due = organization.next_plan_review_due_date?;
    let days = days_until(today, due);
    is_reminder_day(days, &ANNUAL_REVIEW_THRESHOLDS)
        .then_some(ReminderKind::PlanReviewDue { days_until_due: days })
}

pub fn incident_reminder(incident: &Incident, today: NaiveDate) -> Option<ReminderKind> {
    let days_since_incident = (today - incident.occurred_on).num_days();
    is_incident_followup_day(days_since_incident, incident.is_open())
        .then_some(ReminderKind::IncidentFollowup { days_since_incident })
}
