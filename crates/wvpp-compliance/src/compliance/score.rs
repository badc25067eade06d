use chrono::{Months, NaiveDate};
use serde::Serialize;

use crate::organization::{Employee, Incident, Organization, OrganizationId, WvppPlan};
use crate::reminders::schedule::days_until;

/// Deadlines this close (inclusive) raise an informational alert.
pub const DEADLINE_WINDOW_DAYS: i64 = 30;
/// A lapsed plan review still earns partial credit if the last review is this recent.
pub const REVIEW_GRACE_MONTHS: u32 = 18;

/// Everything the scorer reads for one organization.
#[derive(Debug, Clone)]
pub struct ComplianceSnapshot {
    pub organization: Organization,
    pub active_plan: Option<WvppPlan>,
    pub employees: Vec<Employee>,
    pub incidents: Vec<Incident>,
    pub pending_flagged_questions: usize,
    pub new_anonymous_reports: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PillarScores {
    pub plan: u8,
    pub training: u8,
    pub review: u8,
    pub incident: u8,
}

impl PillarScores {
    /// Unweighted mean rounded half up.
    pub fn overall(&self) -> u8 {
        let sum = u32::from(self.plan)
            + u32::from(self.training)
            + u32::from(self.review)
            + u32::from(self.incident);
        ((sum + 2) / 4).min(100) as u8
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertSeverity {
    Critical,
    Warning,
    Info,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertCode {
    NoActivePlan,
    PlanReviewOverdue,
    PlanReviewUnscheduled,
    OpenIncidents,
    UntrainedEmployees,
    FlaggedQuestionsPending,
    AnonymousReportsNew,
    DeadlineApproaching,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComplianceAlert {
    pub severity: AlertSeverity,
    pub code: AlertCode,
    pub message: String,
}

impl ComplianceAlert {
    fn new(severity: AlertSeverity, code: AlertCode, message: impl Into<String>) -> Self {
        Self {
            severity,
            code,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeadlineKind {
    PlanReview,
    EmployeeTraining,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComplianceDeadline {
    pub kind: DeadlineKind,
    /// Organization or employee identifier.
    pub subject: String,
    pub label: String,
    pub due_date: NaiveDate,
    /// Negative once overdue.
    pub days_remaining: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComplianceScore {
    pub organization_id: OrganizationId,
    pub computed_on: NaiveDate,
    pub overall: u8,
    pub pillars: PillarScores,
    pub alerts: Vec<ComplianceAlert>,
    pub deadlines: Vec<ComplianceDeadline>,
}

/// Score an organization as of `today`. Reads only the snapshot.
pub fn score(snapshot: &ComplianceSnapshot, today: NaiveDate) -> ComplianceScore {
    let pillars = PillarScores {
        plan: plan_pillar(snapshot),
        training: training_pillar(snapshot, today),
        review: review_pillar(snapshot, today),
        incident: incident_pillar(&snapshot.incidents),
    };
    let deadlines = deadlines(snapshot, today);
    let alerts = alerts(snapshot, &deadlines, today);

    ComplianceScore {
        organization_id: snapshot.organization.id.clone(),
        computed_on: today,
        overall: pillars.overall(),
        pillars,
        alerts,
        deadlines,
    }
}

fn plan_pillar(snapshot: &ComplianceSnapshot) -> u8 {
    if snapshot.active_plan.is_some() {
        100
    } else {
        0
    }
}

fn training_pillar(snapshot: &ComplianceSnapshot, today: NaiveDate) -> u8 {
    let (trained, active) = training_counts(&snapshot.employees, today);
    if active == 0 {
        return plan_pillar(snapshot);
    }
    rounded_percent(trained, active)
}

/// Full credit only while the next review is strictly in the future. A review due today
/// falls back to the 18-month grace check, though it does not yet raise an overdue alert.
fn review_pillar(snapshot: &ComplianceSnapshot, today: NaiveDate) -> u8 {
    let organization = &snapshot.organization;
    match organization.next_plan_review_due_date {
        Some(due) if due > today => 100,
        Some(_) => {
            let recently_reviewed = match (
                organization.last_plan_review_date,
                today.checked_sub_months(Months::new(REVIEW_GRACE_MONTHS)),
            ) {
                (Some(last), Some(cutoff)) => last >= cutoff,
                _ => false,
            };
            if recently_reviewed {
                50
            } else {
                0
            }
        }
        None if snapshot.active_plan.is_some() => 50,
        None => 0,
    }
}

fn incident_pillar(incidents: &[Incident]) -> u8 {
    if incidents.is_empty() {
        return 100;
    }
    let closed = incidents.iter().filter(|incident| !incident.is_open()).count();
    rounded_percent(closed, incidents.len())
}

fn training_counts(employees: &[Employee], today: NaiveDate) -> (usize, usize) {
    employees
        .iter()
        .filter(|employee| employee.active)
        .fold((0, 0), |(trained, active), employee| {
            (trained + usize::from(employee.is_trained(today)), active + 1)
        })
}

fn rounded_percent(part: usize, whole: usize) -> u8 {
    if whole == 0 {
        return 0;
    }
    let part = part.min(whole) as u64;
    let whole = whole as u64;
    ((200 * part + whole) / (2 * whole)) as u8
}

fn deadlines(snapshot: &ComplianceSnapshot, today: NaiveDate) -> Vec<ComplianceDeadline> {
    let mut deadlines = Vec::new();
    let organization = &snapshot.organization;

    if let Some(due) = organization.next_plan_review_due_date {
        deadlines.push(ComplianceDeadline {
            kind: DeadlineKind::PlanReview,
            subject: organization.id.0.clone(),
            label: "Annual WVPP review".to_string(),
            due_date: due,
            days_remaining: days_until(today, due),
        });
    }

    for employee in snapshot.employees.iter().filter(|employee| employee.active) {
        if let Some(due) = employee.next_training_due_date {
            deadlines.push(ComplianceDeadline {
                kind: DeadlineKind::EmployeeTraining,
                subject: employee.id.0.clone(),
                label: format!("Annual training for {}", employee.name),
                due_date: due,
                days_remaining: days_until(today, due),
            });
        }
    }

    deadlines.sort_by(|a, b| {
        a.due_date
            .cmp(&b.due_date)
            .then_with(|| a.subject.cmp(&b.subject))
    });
    deadlines
}

fn alerts(
    snapshot: &ComplianceSnapshot,
    deadlines: &[ComplianceDeadline],
    today: NaiveDate,
) -> Vec<ComplianceAlert> {
    let mut alerts = Vec::new();
    let organization = &snapshot.organization;

    if snapshot.active_plan.is_none() {
        alerts.push(ComplianceAlert::new(
            AlertSeverity::Critical,
            AlertCode::NoActivePlan,
            "No active Workplace Violence Prevention Plan is published",
        ));
    }

    match organization.next_plan_review_due_date {
        Some(due) if due < today => alerts.push(ComplianceAlert::new(
            AlertSeverity::Critical,
            AlertCode::PlanReviewOverdue,
            format!("Annual plan review was due on {due}"),
        )),
        None if snapshot.active_plan.is_some() => alerts.push(ComplianceAlert::new(
            AlertSeverity::Warning,
            AlertCode::PlanReviewUnscheduled,
            "No annual plan review is scheduled",
        )),
        _ => {}
    }

    let open = snapshot
        .incidents
        .iter()
        .filter(|incident| incident.is_open())
        .count();
    if open > 0 {
        alerts.push(ComplianceAlert::new(
            AlertSeverity::Warning,
            AlertCode::OpenIncidents,
            format!("{open} incident investigation(s) still open"),
        ));
    }

    let (trained, active) = training_counts(&snapshot.employees, today);
    if trained < active {
        alerts.push(ComplianceAlert::new(
            AlertSeverity::Warning,
            AlertCode::UntrainedEmployees,
            format!("{} of {active} active employee(s) are not trained", active - trained),
        ));
    }

    if snapshot.new_anonymous_reports > 0 {
        alerts.push(ComplianceAlert::new(
            AlertSeverity::Warning,
            AlertCode::AnonymousReportsNew,
            format!(
                "{} new anonymous report(s) awaiting review",
                snapshot.new_anonymous_reports
            ),
        ));
    }

    if snapshot.pending_flagged_questions > 0 {
        alerts.push(ComplianceAlert::new(
            AlertSeverity::Info,
            AlertCode::FlaggedQuestionsPending,
            format!(
                "{} flagged training question(s) need a human answer",
                snapshot.pending_flagged_questions
            ),
        ));
    }

    for deadline in deadlines
        .iter()
        .filter(|d| (0..=DEADLINE_WINDOW_DAYS).contains(&d.days_remaining))
    {
        alerts.push(ComplianceAlert::new(
            AlertSeverity::Info,
            AlertCode::DeadlineApproaching,
            format!(
                "{} due in {} day(s) on {}",
                deadline.label, deadline.days_remaining, deadline.due_date
            ),
        ));
    }

    alerts.sort_by_key(|alert| alert.severity);
    alerts
}
